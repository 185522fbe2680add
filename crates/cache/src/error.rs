//! Error types for cache operations and configuration loading.

use std::io;

use crate::key::CacheKey;

/// Errors returned by [`BoundedResourceCache`](crate::BoundedResourceCache) operations.
///
/// Every variant is raised before the cache is mutated, so a failed call
/// leaves the cache exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// A single entry may never be larger than the whole cache.
    #[error("entry size {size} exceeds cache capacity {capacity}")]
    InvalidSize { size: usize, capacity: usize },

    /// Raised under [`ResizePolicy::Reject`](crate::ResizePolicy::Reject) when an
    /// existing key is re-inserted with a different size.
    #[error("key {key} is cached with size {current}, cannot re-insert with size {requested}")]
    SizeMismatch {
        key: CacheKey,
        current: usize,
        requested: usize,
    },
}

/// Errors that can occur while building or loading a [`CacheConfig`](crate::CacheConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key {0}")]
    InvalidValue(String),
    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T, E = CacheError> = std::result::Result<T, E>;
