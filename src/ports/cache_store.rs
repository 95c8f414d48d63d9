use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for cache store operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CacheError {
    /// The store could not be reached
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// CacheStore defines the port for a string key-value store with expiry
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Fetch a live value
    ///
    /// # Returns
    /// `None` for missing or expired keys
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value that expires after `ttl`
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;
}
