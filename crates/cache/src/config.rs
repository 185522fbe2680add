//! Cache configuration.
//!
//! A [`CacheConfig`] can be built programmatically, read from environment
//! variables, or loaded from a TOML file. Capacity is fixed once a cache is
//! built from it.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default capacity, in caller-defined size units.
pub const DEFAULT_CAPACITY: usize = 30;

const ENV_CAPACITY: &str = "COLORIZER_CACHE_CAPACITY";
const ENV_RESIZE_POLICY: &str = "COLORIZER_CACHE_RESIZE_POLICY";
const ENV_CLEAR_RESERVATIONS: &str = "COLORIZER_CACHE_CLEAR_RESERVATIONS";

/// What `insert` does when an existing key is re-inserted with a size that
/// differs from the one already charged for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizePolicy {
    /// Replace the value and keep charging the original size. The new size is
    /// ignored and no eviction runs. Callers that need a different size must
    /// remove the key first.
    #[default]
    KeepExisting,
    /// Refuse the re-insert with [`CacheError::SizeMismatch`](crate::CacheError::SizeMismatch).
    Reject,
    /// Charge the new size and evict other entries if the cache is now over
    /// capacity. The re-inserted entry itself is never evicted by this pass.
    Adjust,
}

impl ResizePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizePolicy::KeepExisting => "keep-existing",
            ResizePolicy::Reject => "reject",
            ResizePolicy::Adjust => "adjust",
        }
    }
}

impl fmt::Display for ResizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResizePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-existing" | "keep_existing" | "keep" => Ok(ResizePolicy::KeepExisting),
            "reject" => Ok(ResizePolicy::Reject),
            "adjust" => Ok(ResizePolicy::Adjust),
            _ => Err(ConfigError::InvalidValue("resize_policy".to_string())),
        }
    }
}

/// Configuration for a [`BoundedResourceCache`](crate::BoundedResourceCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum total size of cached entries
    pub capacity: usize,
    /// Handling of size changes on re-insertion
    pub resize_policy: ResizePolicy,
    /// Whether `dispose()` also empties the reserved key set
    pub clear_reservations_on_dispose: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            resize_policy: ResizePolicy::default(),
            clear_reservations_on_dispose: false,
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with the given capacity and default policies.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_resize_policy(mut self, policy: ResizePolicy) -> Self {
        self.resize_policy = policy;
        self
    }

    pub fn with_clear_reservations_on_dispose(mut self, clear: bool) -> Self {
        self.clear_reservations_on_dispose = clear;
        self
    }

    /// Checks that the configuration can back a cache.
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroCapacity`] if `capacity` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Returns the default configuration file location for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/timelapse-colorizer/cache.toml
    /// - Linux: ~/.config/timelapse-colorizer/cache.toml
    /// - Windows: %APPDATA%\timelapse-colorizer\cache.toml
    pub fn default_config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("timelapse-colorizer").join("cache.toml")
        } else {
            PathBuf::from("cache.toml")
        }
    }

    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Environment variables:
    /// - `COLORIZER_CACHE_CAPACITY`: capacity in size units (default: 30)
    /// - `COLORIZER_CACHE_RESIZE_POLICY`: `keep-existing`, `reject` or `adjust`
    /// - `COLORIZER_CACHE_CLEAR_RESERVATIONS`: `true` or `false`
    ///
    /// # Errors
    /// Returns an error if any variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var(ENV_CAPACITY) {
            config.capacity = val
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue(ENV_CAPACITY.to_string()))?;
        }

        if let Ok(val) = std::env::var(ENV_RESIZE_POLICY) {
            config.resize_policy = val
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_RESIZE_POLICY.to_string()))?;
        }

        if let Ok(val) = std::env::var(ENV_CLEAR_RESERVATIONS) {
            config.clear_reservations_on_dispose = val
                .trim()
                .parse::<bool>()
                .map_err(|_| ConfigError::InvalidValue(ENV_CLEAR_RESERVATIONS.to_string()))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format (every key optional):
    /// ```toml
    /// capacity = 30
    /// resize_policy = "keep-existing"
    /// clear_reservations_on_dispose = false
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes configuration to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
