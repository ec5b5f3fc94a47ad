use std::time::Duration;

/// Level the recorder reports for silence or when metering is unavailable.
pub const SILENCE_DB: f32 = -160.0;

/// Maps raw dBFS samples to waveform bar heights.
///
/// Levels at or below `floor_db` render as `min_height`; 0 dBFS renders as
/// `max_height`; everything between is linear. The stored samples are never
/// modified, only their presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformScale {
    pub floor_db: f32,
    pub min_height: f32,
    pub max_height: f32,
}

impl Default for WaveformScale {
    fn default() -> Self {
        Self {
            floor_db: -80.0,
            min_height: 5.0,
            max_height: 35.0,
        }
    }
}

impl WaveformScale {
    pub fn bar_height(&self, level_db: f32) -> f32 {
        if level_db.is_nan() || level_db < self.floor_db {
            return self.min_height;
        }
        let ratio = ((level_db - self.floor_db) / -self.floor_db).min(1.0);
        (ratio * self.max_height).max(self.min_height)
    }

    pub fn bar_heights(&self, samples: &[f32]) -> Vec<f32> {
        samples.iter().map(|&db| self.bar_height(db)).collect()
    }
}

/// Indices of the bars that carry a flag.
///
/// Bar `i` covers the instant `i * spacing`; a flag lands on the first
/// bar within `tolerance` of its offset. Flags outside the waveform are skipped.
pub fn flag_bar_indices(flags_ms: &[u64], bar_count: usize, spacing: Duration, tolerance: Duration) -> Vec<usize> {
    let interval_ms = spacing.as_secs_f64() * 1000.0;
    let tolerance_ms = tolerance.as_secs_f64() * 1000.0;
    if interval_ms <= 0.0 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = flags_ms
        .iter()
        .filter_map(|&flag| {
            let flag = flag as f64;
            let first = ((flag - tolerance_ms).max(0.0) / interval_ms).ceil();
            let bar_ms = first * interval_ms;
            let index = first as usize;
            (index < bar_count && (bar_ms - flag).abs() <= tolerance_ms).then_some(index)
        })
        .collect();
    indices.dedup();
    indices
}

/// Time covered by one bar of a take lasting `duration_ms` drawn as
/// `bar_count` bars. Falls back to `fallback` when either is zero.
pub fn bar_interval(duration_ms: u64, bar_count: usize, fallback: Duration) -> Duration {
    if duration_ms == 0 || bar_count == 0 {
        return fallback;
    }
    Duration::from_nanos(duration_ms.saturating_mul(1_000_000) / bar_count as u64)
}

/// Display label `MM:SS` for a duration in milliseconds.
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn silence_is_minimum_height() {
        let scale = WaveformScale::default();
        assert_relative_eq!(scale.bar_height(SILENCE_DB), 5.0);
        assert_relative_eq!(scale.bar_height(-80.0), 5.0);
        assert_relative_eq!(scale.bar_height(f32::NAN), 5.0);
    }

    #[test]
    fn full_scale_is_maximum_height() {
        let scale = WaveformScale::default();
        assert_relative_eq!(scale.bar_height(0.0), 35.0);
        assert_relative_eq!(scale.bar_height(6.0), 35.0);
    }

    #[test]
    fn midpoint_is_linear() {
        let scale = WaveformScale::default();
        assert_relative_eq!(scale.bar_height(-40.0), 17.5);
        // Small ratios are lifted to the minimum.
        assert_relative_eq!(scale.bar_height(-75.0), 5.0);
    }

    #[test]
    fn bar_heights_preserve_length() {
        let samples = [-160.0, -40.0, 0.0];
        let heights = WaveformScale::default().bar_heights(&samples);
        assert_eq!(heights.len(), 3);
        assert_eq!(samples, [-160.0, -40.0, 0.0]);
    }

    #[test]
    fn flags_map_to_nearest_bar() {
        let interval = Duration::from_millis(75);
        let tolerance = Duration::from_millis(50);
        // 0 → bar 0, 150 → bar 2, 1000 → bar 13 (975ms), 10_000 past the end.
        let indices = flag_bar_indices(&[0, 150, 1000, 10_000], 20, interval, tolerance);
        assert_eq!(indices, vec![0, 2, 13]);
    }

    #[test]
    fn bar_interval_follows_take_length() {
        let fallback = Duration::from_millis(75);
        assert_eq!(bar_interval(3_000, 40, fallback), Duration::from_millis(75));
        assert_eq!(bar_interval(0, 40, fallback), fallback);
        assert_eq!(bar_interval(3_000, 0, fallback), fallback);
    }

    #[test]
    fn flags_map_onto_fractional_spacing() {
        // 41 bars over 3s put bar 16 at about 1171ms.
        let interval = bar_interval(3_000, 41, Duration::from_secs(3600));
        let indices = flag_bar_indices(&[1_200, 2_950], 41, interval, Duration::from_millis(50));
        assert_eq!(indices, vec![16, 40]);
    }

    #[test]
    fn format_duration_pads() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(7_900), "00:07");
        assert_eq!(format_duration(61_000), "01:01");
        assert_eq!(format_duration(3_600_000), "60:00");
    }
}
