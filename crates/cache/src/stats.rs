//! Cache usage statistics.

/// Capacity pressure level derived from utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CachePressure {
    /// Utilization below 50%
    Low,
    /// Utilization 50-75%
    Moderate,
    /// Utilization 75-90%
    High,
    /// Utilization above 90%, including over-capacity
    Critical,
}

impl CachePressure {
    /// Get the pressure level from a utilization ratio (0.0 and up)
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization < 0.5 {
            CachePressure::Low
        } else if utilization < 0.75 {
            CachePressure::Moderate
        } else if utilization < 0.90 {
            CachePressure::High
        } else {
            CachePressure::Critical
        }
    }

    /// Returns true if the next insert is likely to evict something
    pub fn near_capacity(&self) -> bool {
        matches!(self, CachePressure::High | CachePressure::Critical)
    }
}

/// Snapshot of cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries currently stored, reserved ones included
    pub entry_count: usize,

    /// Number of stored entries whose key is reserved
    pub reserved_count: usize,

    /// Total size charged by stored entries
    pub occupied: usize,

    /// Fixed capacity of the cache
    pub capacity: usize,

    /// Lookups that found an entry
    pub hits: u64,

    /// Lookups that found nothing
    pub misses: u64,

    /// New keys inserted
    pub insertions: u64,

    /// Existing keys whose value was replaced
    pub replacements: u64,

    /// Entries evicted to stay within capacity
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Calculate capacity utilization. Can exceed 1.0 while an oversized
    /// entry or reserved entries hold the cache over budget.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.occupied as f64 / self.capacity as f64
        }
    }

    pub fn pressure(&self) -> CachePressure {
        CachePressure::from_utilization(self.utilization())
    }

    /// Returns true if the cache currently holds more than its capacity
    pub fn over_capacity(&self) -> bool {
        self.occupied > self.capacity
    }
}
