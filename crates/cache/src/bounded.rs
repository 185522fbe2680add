//! Size-bounded LRU cache with reservations
//!
//! Holds expensive, disposable resources (decoded frame textures) under a
//! fixed size budget. When an insert pushes the total size over the budget,
//! the least recently used entries are evicted and disposed until it fits.
//!
//! Keys can be *reserved*: a reserved entry is taken out of the recency
//! order so it is never evicted, while its size keeps counting against the
//! budget. Releasing a reservation puts the entry back at the most recently
//! used end.
//!
//! Entries live in an arena of slots linked by index into a doubly-linked
//! recency list, so promotion and eviction are O(1) with no unsafe code.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::iter::FusedIterator;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, trace};

use crate::config::{CacheConfig, ResizePolicy, DEFAULT_CAPACITY};
use crate::dispose::Disposable;
use crate::error::{CacheError, ConfigError, Result};
use crate::key::CacheKey;
use crate::stats::CacheStats;

/// Null link in the recency list.
const NIL: usize = usize::MAX;

/// One arena slot. A free slot has no value and sits on the free list.
struct Node<V> {
    key: CacheKey,
    value: Option<V>,
    size: usize,
    prev: usize,
    next: usize,
    /// Whether the node is currently part of the recency list
    linked: bool,
}

/// Size-bounded LRU cache with reservations.
///
/// Not internally synchronized: mutating operations take `&mut self`, so a
/// cache shared between threads must sit behind the caller's own lock.
///
/// Dropping the cache drops its values without calling their disposal hooks.
/// Call [`dispose`](Self::dispose) first when values hold external resources.
///
/// # Example
///
/// ```
/// use colorizer_cache::{BoundedResourceCache, Disposable};
///
/// struct Frame(Vec<u8>);
/// impl Disposable for Frame {}
///
/// let mut cache = BoundedResourceCache::new(3);
/// cache.insert(1, Frame(vec![0; 16]), 1).unwrap();
/// cache.insert(2, Frame(vec![0; 16]), 1).unwrap();
/// cache.insert(3, Frame(vec![0; 16]), 1).unwrap();
///
/// // Keep frame 1 loaded no matter what gets inserted next
/// cache.set_reserved_keys(["1"]);
/// cache.insert(4, Frame(vec![0; 16]), 1).unwrap();
///
/// assert!(cache.contains(1));
/// assert!(!cache.contains(2)); // least recently used, evicted
/// assert_eq!(cache.size(), 3);
/// ```
pub struct BoundedResourceCache<V> {
    capacity: usize,
    occupied: usize,
    resize_policy: ResizePolicy,
    clear_reservations_on_dispose: bool,

    /// Key to arena index, for every stored entry
    table: HashMap<CacheKey, usize>,
    slots: Vec<Node<V>>,
    free: Vec<usize>,

    /// Head of the recency list
    most_recent: usize,
    /// Tail of the recency list, next eviction candidate
    least_recent: usize,
    /// Number of linked nodes
    listed: usize,

    reserved: HashSet<CacheKey>,
    stats: CacheStats,
}

impl<V> fmt::Debug for BoundedResourceCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedResourceCache")
            .field("capacity", &self.capacity)
            .field("occupied", &self.occupied)
            .field("len", &self.table.len())
            .field("reserved", &self.reserved.len())
            .field("resize_policy", &self.resize_policy)
            .finish()
    }
}

impl<V> Default for BoundedResourceCache<V> {
    /// Create a cache with the default capacity of 30
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<V> BoundedResourceCache<V> {
    /// Create a cache holding at most `capacity` size units, with the
    /// default policies.
    ///
    /// # Panics
    /// Panics if `capacity` is 0. Use [`from_config`](Self::from_config) to
    /// get an error instead.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be > 0");
        Self::build(CacheConfig::new(capacity))
    }

    /// Create a cache from a validated configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroCapacity`] if the configured capacity is 0.
    pub fn from_config(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CacheConfig) -> Self {
        Self {
            capacity: config.capacity,
            occupied: 0,
            resize_policy: config.resize_policy,
            clear_reservations_on_dispose: config.clear_reservations_on_dispose,
            table: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            most_recent: NIL,
            least_recent: NIL,
            listed: 0,
            reserved: HashSet::new(),
            stats: CacheStats {
                capacity: config.capacity,
                ..Default::default()
            },
        }
    }

    /// Total size charged by stored entries, reserved ones included.
    pub fn size(&self) -> usize {
        self.occupied
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn resize_policy(&self) -> ResizePolicy {
        self.resize_policy
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Look up a value, marking it most recently used.
    ///
    /// Reserved entries are returned without being moved; they sit outside
    /// the recency order until released.
    pub fn get(&mut self, key: impl Into<CacheKey>) -> Option<&V> {
        let idx = self.lookup(key.into())?;
        self.slots[idx].value.as_ref()
    }

    /// Mutable lookup, with the same promotion rules as [`get`](Self::get).
    pub fn get_mut(&mut self, key: impl Into<CacheKey>) -> Option<&mut V> {
        let idx = self.lookup(key.into())?;
        self.slots[idx].value.as_mut()
    }

    fn lookup(&mut self, key: CacheKey) -> Option<usize> {
        match self.table.get(&key) {
            Some(&idx) => {
                self.stats.hits += 1;
                if self.slots[idx].linked {
                    self.move_to_front(idx);
                }
                Some(idx)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Look up a value without touching recency or statistics.
    pub fn peek(&self, key: impl Into<CacheKey>) -> Option<&V> {
        let idx = *self.table.get(&key.into())?;
        self.slots[idx].value.as_ref()
    }

    /// Check for an entry without touching recency or statistics.
    pub fn contains(&self, key: impl Into<CacheKey>) -> bool {
        self.table.contains_key(&key.into())
    }

    /// Size charged for an entry, if present.
    pub fn entry_size(&self, key: impl Into<CacheKey>) -> Option<usize> {
        self.table
            .get(&key.into())
            .map(|&idx| self.slots[idx].size)
    }

    /// Whether `key` is in the reserved set, whether or not it has an entry.
    pub fn is_reserved(&self, key: impl Into<CacheKey>) -> bool {
        self.reserved.contains(&key.into())
    }

    /// The current reserved set, in no particular order.
    pub fn reserved_keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.reserved.iter()
    }

    /// Entries outside the reserved set, most recently used first.
    ///
    /// Iterate in reverse for eviction order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: &self.slots,
            front: self.most_recent,
            back: self.least_recent,
            remaining: self.listed,
        }
    }

    /// Snapshot of usage counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.table.len(),
            reserved_count: self.table.len() - self.listed,
            occupied: self.occupied,
            capacity: self.capacity,
            ..self.stats
        }
    }

    /// Zero the hit, miss, insertion, replacement and eviction counters.
    pub fn reset_stats(&mut self) {
        self.stats = CacheStats {
            capacity: self.capacity,
            ..Default::default()
        };
    }

    /// Take an entry out of the cache and hand its value back.
    ///
    /// The disposal hook is not called: the caller now owns the value. The
    /// key keeps its reservation, if it had one.
    pub fn remove(&mut self, key: impl Into<CacheKey>) -> Option<V> {
        let idx = self.table.remove(&key.into())?;
        self.unlink(idx);
        let (_, value, size) = self.release(idx);
        self.occupied -= size;
        value
    }

    // --- Internal linked-list operations ---

    /// Store a node in a free slot, or grow the arena.
    fn alloc(&mut self, key: CacheKey, value: V, size: usize) -> usize {
        let node = Node {
            key,
            value: Some(value),
            size,
            prev: NIL,
            next: NIL,
            linked: false,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = node;
                idx
            }
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            }
        }
    }

    /// Empty a slot and return its contents. The node must already be unlinked.
    fn release(&mut self, idx: usize) -> (CacheKey, Option<V>, usize) {
        let node = &mut self.slots[idx];
        let key = mem::take(&mut node.key);
        let value = node.value.take();
        let size = mem::take(&mut node.size);
        self.free.push(idx);
        (key, value, size)
    }

    /// Detach a node from the recency list. No-op for unlinked nodes.
    fn unlink(&mut self, idx: usize) {
        if !self.slots[idx].linked {
            return;
        }

        let prev = self.slots[idx].prev;
        let next = self.slots[idx].next;

        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.most_recent = next;
        }

        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.least_recent = prev;
        }

        let node = &mut self.slots[idx];
        node.prev = NIL;
        node.next = NIL;
        node.linked = false;
        self.listed -= 1;
    }

    /// Link a detached node at the most recently used end.
    fn push_front(&mut self, idx: usize) {
        if self.slots[idx].linked {
            return;
        }

        let node = &mut self.slots[idx];
        node.prev = NIL;
        node.next = self.most_recent;
        node.linked = true;

        if self.most_recent != NIL {
            self.slots[self.most_recent].prev = idx;
        }
        self.most_recent = idx;

        if self.least_recent == NIL {
            self.least_recent = idx;
        }
        self.listed += 1;
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.most_recent == idx {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }
}

impl<V: Disposable> BoundedResourceCache<V> {
    /// Store `value` under `key`, charging `size` units against the capacity.
    ///
    /// A new key is charged `size` and least recently used entries are
    /// evicted and disposed until the cache fits again. The new entry is
    /// never evicted by its own insert, so reserved entries can leave the
    /// cache over capacity afterwards.
    ///
    /// An existing key has its value replaced and, unless reserved, becomes
    /// most recently used. The previous value is returned without being
    /// disposed; dropping it skips its hook, so call
    /// [`Disposable::dispose`] on it when it holds external resources.
    /// How a differing `size` is treated depends on the [`ResizePolicy`];
    /// by default the original size stays charged.
    ///
    /// # Errors
    /// - [`CacheError::InvalidSize`] if `size` exceeds the capacity.
    /// - [`CacheError::SizeMismatch`] under [`ResizePolicy::Reject`] when an
    ///   existing key is re-inserted with a different size.
    ///
    /// Neither error mutates the cache.
    #[must_use = "the replaced value is returned, not disposed"]
    pub fn insert(
        &mut self,
        key: impl Into<CacheKey>,
        value: V,
        size: usize,
    ) -> Result<Option<V>> {
        let key = key.into();
        if size > self.capacity {
            return Err(CacheError::InvalidSize {
                size,
                capacity: self.capacity,
            });
        }

        match self.table.get(&key) {
            Some(&idx) => self.replace(idx, key, value, size),
            None => {
                self.insert_new(key, value, size);
                Ok(None)
            }
        }
    }

    /// Insert with a size of one unit, for caches that count entries.
    #[must_use = "the replaced value is returned, not disposed"]
    pub fn insert_one(&mut self, key: impl Into<CacheKey>, value: V) -> Result<Option<V>> {
        self.insert(key, value, 1)
    }

    fn insert_new(&mut self, key: CacheKey, value: V, size: usize) {
        let reserved = self.reserved.contains(&key);
        let idx = self.alloc(key.clone(), value, size);
        self.table.insert(key, idx);
        self.occupied += size;
        self.stats.insertions += 1;

        // Linked before eviction so a panicking hook leaves the node in place
        if !reserved {
            self.push_front(idx);
        }
        self.evict_to_fit(idx);
        self.log_over_capacity();
    }

    fn replace(
        &mut self,
        idx: usize,
        key: CacheKey,
        value: V,
        size: usize,
    ) -> Result<Option<V>> {
        let current = self.slots[idx].size;
        let resized = current != size;

        if resized {
            match self.resize_policy {
                ResizePolicy::KeepExisting => {
                    trace!(key = %key, current, requested = size, "keeping original entry size");
                }
                ResizePolicy::Reject => {
                    return Err(CacheError::SizeMismatch {
                        key,
                        current,
                        requested: size,
                    });
                }
                ResizePolicy::Adjust => {}
            }
        }

        let previous = self.slots[idx].value.replace(value);
        self.stats.replacements += 1;

        if self.slots[idx].linked {
            self.move_to_front(idx);
        }

        if resized && self.resize_policy == ResizePolicy::Adjust {
            self.occupied = self.occupied - current + size;
            self.slots[idx].size = size;
            self.evict_to_fit(idx);
        }
        self.log_over_capacity();

        Ok(previous)
    }

    /// Replace the reserved key set.
    ///
    /// Entries whose key becomes reserved leave the recency order and are
    /// never evicted; they still count towards [`size`](Self::size). Entries
    /// whose key is released rejoin at the most recently used end. Keys
    /// without an entry are remembered and take effect when inserted.
    ///
    /// The relative order of several entries released in one call is
    /// unspecified.
    pub fn set_reserved_keys<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<CacheKey>,
    {
        let next: HashSet<CacheKey> = keys.into_iter().map(Into::into).collect();

        let to_detach: Vec<usize> = next
            .iter()
            .filter(|key| !self.reserved.contains(*key))
            .filter_map(|key| self.table.get(key).copied())
            .collect();
        let to_attach: Vec<usize> = self
            .reserved
            .iter()
            .filter(|key| !next.contains(*key))
            .filter_map(|key| self.table.get(key).copied())
            .collect();

        if !to_detach.is_empty() || !to_attach.is_empty() {
            trace!(
                reserved = to_detach.len(),
                released = to_attach.len(),
                "updating reserved entries"
            );
        }

        for idx in to_detach {
            self.unlink(idx);
        }
        for idx in to_attach {
            self.push_front(idx);
        }
        self.reserved = next;
    }

    /// Dispose every stored value, reserved ones included, and empty the
    /// cache.
    ///
    /// The reserved key set survives unless the cache was configured with
    /// `clear_reservations_on_dispose`.
    ///
    /// # Panics
    /// If a disposal hook panics, the remaining values are still disposed
    /// and the first panic is resumed afterwards. The cache is empty either
    /// way.
    pub fn dispose(&mut self) {
        if self.table.is_empty() && !self.clear_reservations_on_dispose {
            return;
        }

        debug!(
            entries = self.table.len(),
            occupied = self.occupied,
            "disposing cache"
        );

        self.table.clear();
        self.free.clear();
        self.most_recent = NIL;
        self.least_recent = NIL;
        self.listed = 0;
        self.occupied = 0;
        if self.clear_reservations_on_dispose {
            self.reserved.clear();
        }

        // Bookkeeping is reset before any hook runs
        let slots = mem::take(&mut self.slots);
        let mut first_panic = None;
        for node in slots {
            let Some(value) = node.value else { continue };
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| value.dispose())) {
                debug!(key = %node.key, "disposal hook panicked");
                first_panic.get_or_insert(payload);
            }
        }
        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }

    /// Evict least recently used entries until the cache fits or nothing
    /// evictable is left. The `keep` node is never evicted.
    ///
    /// Each entry is detached and uncharged before its hook runs, so a
    /// panicking hook stops the pass but leaves the cache consistent.
    fn evict_to_fit(&mut self, keep: usize) {
        while self.occupied > self.capacity {
            if !self.evict_lru(keep) {
                break;
            }
        }
    }

    /// Evict the tail of the recency list. Returns false if the list is
    /// empty or its tail is `keep`.
    fn evict_lru(&mut self, keep: usize) -> bool {
        let idx = self.least_recent;
        if idx == NIL || idx == keep {
            return false;
        }

        self.unlink(idx);
        let (key, value, size) = self.release(idx);
        self.table.remove(&key);
        self.occupied -= size;
        self.stats.evictions += 1;

        debug!(key = %key, size, occupied = self.occupied, "evicted cache entry");

        if let Some(value) = value {
            value.dispose();
        }
        true
    }

    fn log_over_capacity(&self) {
        if self.occupied > self.capacity {
            debug!(
                occupied = self.occupied,
                capacity = self.capacity,
                reserved = self.table.len() - self.listed,
                "cache over capacity with nothing left to evict"
            );
        }
    }
}

/// Iterator over non-reserved entries, most recently used first.
///
/// Yields `(key, value, size)`.
pub struct Iter<'a, V> {
    slots: &'a [Node<V>],
    front: usize,
    back: usize,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a CacheKey, &'a V, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slots = self.slots;
        let node = &slots[self.front];
        self.front = node.next;
        self.remaining -= 1;
        node.value.as_ref().map(|value| (&node.key, value, node.size))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> DoubleEndedIterator for Iter<'a, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slots = self.slots;
        let node = &slots[self.back];
        self.back = node.prev;
        self.remaining -= 1;
        node.value.as_ref().map(|value| (&node.key, value, node.size))
    }
}

impl<'a, V> ExactSizeIterator for Iter<'a, V> {}

impl<'a, V> FusedIterator for Iter<'a, V> {}
