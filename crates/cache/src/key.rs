//! Canonical cache keys.
//!
//! Frames are usually addressed by number while other resources use string
//! identifiers. Both forms are folded into one canonical string so that `7`
//! and `"7"` refer to the same entry.

use std::borrow::Borrow;
use std::fmt;

/// A canonical string key identifying one cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a key from its canonical string form.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&String> for CacheKey {
    fn from(key: &String) -> Self {
        Self(key.clone())
    }
}

impl From<&CacheKey> for CacheKey {
    fn from(key: &CacheKey) -> Self {
        key.clone()
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CacheKey {
                fn from(key: $ty) -> Self {
                    Self(key.to_string())
                }
            }
        )*
    };
}

impl_from_integer!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl From<f64> for CacheKey {
    /// Integral floats collapse to their integer form (`3.0` becomes `"3"`),
    /// matching the key a caller would get from the integer itself.
    ///
    /// Magnitudes of at least 1e21 or below 1e-6 use exponent notation with
    /// an explicit sign (`1e21` becomes `"1e+21"`, `1e-7` becomes `"1e-7"`),
    /// so numeric keys match string keys written in that common form.
    fn from(key: f64) -> Self {
        let canonical = if key == 0.0 {
            // -0.0 and 0.0 are the same frame
            "0".to_owned()
        } else if key == f64::INFINITY {
            "Infinity".to_owned()
        } else if key == f64::NEG_INFINITY {
            "-Infinity".to_owned()
        } else if key.abs() >= 1e21 || key.abs() < 1e-6 {
            signed_exponent(key)
        } else {
            key.to_string()
        };
        Self(canonical)
    }
}

/// Shortest exponent form with the exponent sign always written.
fn signed_exponent(key: f64) -> String {
    let formatted = format!("{key:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => formatted,
    }
}

impl From<f32> for CacheKey {
    fn from(key: f32) -> Self {
        Self::from(f64::from(key))
    }
}
