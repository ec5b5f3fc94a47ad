use crate::models::error::LibraryError;

/// Persistent string key-value storage supplied by the platform.
///
/// Mobile hosts back this with their preferences store; the core ships a
/// JSON-file and an in-memory implementation.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, LibraryError>;

    fn set(&self, key: &str, value: &str) -> Result<(), LibraryError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), LibraryError>;
}
