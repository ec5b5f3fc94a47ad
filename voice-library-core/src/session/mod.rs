pub mod capture;
pub mod draft;
pub mod library;
pub mod playback;
pub mod workspace;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Park the current timer thread for `interval`.
///
/// Returns `false` as soon as `running` is cleared. Owners unpark the thread
/// after clearing the flag so a stop never waits out a full interval.
pub(crate) fn wait_for_tick(running: &AtomicBool, interval: Duration) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::park_timeout(deadline - now);
    }
}
