//! Disposal hook for cached resources.

/// A value that may own resources needing explicit release when it leaves
/// the cache (GPU textures, file handles, decoded buffers).
///
/// The hook is optional: the default implementation does nothing, so plain
/// values opt in with an empty impl:
///
/// ```
/// use colorizer_cache::Disposable;
///
/// struct FrameStats {
///     min: f32,
///     max: f32,
/// }
///
/// impl Disposable for FrameStats {}
/// ```
///
/// The cache calls [`dispose`](Disposable::dispose) exactly once per entry,
/// when the entry is evicted or when the whole cache is disposed. It is never
/// called while the entry is reserved. Taking ownership of `self` means a
/// disposed value cannot be disposed twice or observed afterwards.
///
/// Values handed back to the caller are not disposed by the cache: the
/// previous value returned when a key is re-inserted, and values taken out
/// with `remove`. Dispose those yourself if they hold external resources.
pub trait Disposable: Sized {
    fn dispose(self) {}
}

impl<T: Disposable> Disposable for Box<T> {
    fn dispose(self) {
        (*self).dispose();
    }
}

impl<T: Disposable> Disposable for Option<T> {
    fn dispose(self) {
        if let Some(value) = self {
            value.dispose();
        }
    }
}

impl Disposable for () {}
impl Disposable for String {}
