use thiserror::Error;

use super::keys::Family;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be read; callers treat this as a miss.
    #[error("cache read failed: {message}")]
    Read { message: String },
    /// A response could not be captured or stored; callers serve it uncached.
    #[error("cache store failed: {message}")]
    Store { message: String },
    /// Keys of an invalidated family could not be removed and may serve stale data.
    #[error("invalidation of `{family}` left {failed} key(s) in place: {message}")]
    Invalidation {
        family: Family,
        failed: usize,
        message: String,
    },
}

impl CacheError {
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}
