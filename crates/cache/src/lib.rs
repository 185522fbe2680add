//! Timelapse Colorizer Cache Library
//!
//! Size-bounded LRU cache for disposable resources such as decoded frame
//! textures, with key reservations that keep chosen entries from being evicted.

pub mod bounded;
pub mod config;
pub mod dispose;
pub mod error;
pub mod key;
pub mod stats;

pub use bounded::{BoundedResourceCache, Iter};
pub use config::{CacheConfig, ResizePolicy, DEFAULT_CAPACITY};
pub use dispose::Disposable;
pub use error::{CacheError, ConfigError, Result};
pub use key::CacheKey;
pub use stats::{CachePressure, CacheStats};
