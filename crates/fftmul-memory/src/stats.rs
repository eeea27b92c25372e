//! Atomic pool statistics for lock-free usage tracking.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Statistics for scratch pool usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of acquisitions served from the pool.
    pub hits: u64,
    /// Number of acquisitions that had to allocate.
    pub misses: u64,
    /// Number of released buffers dropped (too large or class full).
    pub evictions: u64,
    /// Largest buffer length (in doubles) handed out so far.
    pub high_water: usize,
}

impl PoolStats {
    /// Total acquisitions, served or allocated.
    #[must_use]
    pub fn acquisitions(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of acquisitions served from the pool, `0.0` before the first.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        match self.acquisitions() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }
}

/// Atomic pool statistics for lock-free updates.
pub struct AtomicPoolStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    high_water: AtomicUsize,
}

impl AtomicPoolStats {
    /// Create new zeroed stats.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            high_water: AtomicUsize::new(0),
        }
    }

    /// Take a snapshot of current stats.
    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            high_water: self.high_water.load(Ordering::Relaxed),
        }
    }

    /// Increment hit counter.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment eviction counter.
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Raise the high-water mark to `len` if it is larger.
    pub fn record_len(&self, len: usize) {
        self.high_water.fetch_max(len, Ordering::Relaxed);
    }
}

impl Default for AtomicPoolStats {
    fn default() -> Self {
        Self::new()
    }
}
