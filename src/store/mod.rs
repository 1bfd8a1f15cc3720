pub mod crop_cache;
pub mod memory_crop_cache;
pub mod persistent_crop_cache;
pub mod persistent_store;
pub mod records;
pub mod sources;

use std::fmt;

/// I/O failure in a record, blob or cache backend. Always surfaced to the
/// caller, never swallowed.
#[derive(Debug)]
pub struct StoreError {
    pub reason: String,
}

impl StoreError {
    pub fn new(reason: impl Into<String>) -> Self {
        StoreError {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for StoreError {}

impl From<fjall::Error> for StoreError {
    fn from(err: fjall::Error) -> Self {
        StoreError::new(format!("persistent store error: {}", err))
    }
}

impl From<postcard::Error> for StoreError {
    fn from(err: postcard::Error) -> Self {
        StoreError::new(format!("record encoding error: {}", err))
    }
}
