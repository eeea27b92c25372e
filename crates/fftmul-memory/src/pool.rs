//! Scratch buffer pool with size classes for transform workspaces.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::stats::{AtomicPoolStats, PoolStats};

/// Smallest size class, in doubles (one 4096-element transform).
const MIN_CLASS: usize = 4096;

/// Pool of `Vec<f64>` scratch buffers, organized by size class (power of 4).
///
/// Fresh buffers are allocated at the requested length and filed under the
/// largest class their capacity covers. Buffers come back with arbitrary
/// contents; callers overwrite every position they read.
pub struct ScratchPool {
    pools: Mutex<HashMap<usize, Vec<Vec<f64>>>>,
    max_len: usize,
    max_per_class: usize,
    stats: AtomicPoolStats,
}

impl ScratchPool {
    /// Create a new pool that keeps at most `max_per_class` buffers per class
    /// and never retains buffers longer than `max_len` doubles.
    #[must_use]
    pub fn new(max_len: usize, max_per_class: usize) -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
            max_len,
            max_per_class,
            stats: AtomicPoolStats::new(),
        }
    }

    /// Get a buffer of exactly `len` doubles, reusing a pooled allocation
    /// when one large enough is available.
    pub fn acquire(&self, len: usize) -> Vec<f64> {
        self.stats.record_len(len);
        let pooled = Self::take(&mut self.pools.lock(), len);
        let mut buf = if let Some(buf) = pooled {
            self.stats.record_hit();
            buf
        } else {
            self.stats.record_miss();
            Vec::with_capacity(len.max(MIN_CLASS))
        };
        buf.resize(len, 0.0);
        buf
    }

    /// Pop a pooled buffer holding at least `len` doubles. Every buffer in
    /// the class above `len` qualifies; the class below is scanned.
    fn take(pools: &mut HashMap<usize, Vec<Vec<f64>>>, len: usize) -> Option<Vec<f64>> {
        if let Some(buf) = pools.get_mut(&Self::size_class(len)).and_then(Vec::pop) {
            return Some(buf);
        }
        let pool = pools.get_mut(&Self::floor_class(len))?;
        let at = pool.iter().position(|buf| buf.capacity() >= len)?;
        Some(pool.swap_remove(at))
    }

    /// Return a buffer to the pool.
    pub fn release(&self, buf: Vec<f64>) {
        let capacity = buf.capacity();
        if capacity > self.max_len || capacity < MIN_CLASS {
            self.stats.record_eviction();
            return;
        }

        let class = Self::floor_class(capacity);
        let mut pools = self.pools.lock();
        let pool = pools.entry(class).or_default();
        if pool.len() < self.max_per_class {
            pool.push(buf);
        } else {
            self.stats.record_eviction();
        }
    }

    /// Size class serving a request of `len` doubles (next power of 4).
    fn size_class(len: usize) -> usize {
        let mut class = MIN_CLASS;
        while class < len {
            class *= 4;
        }
        class
    }

    /// Largest class a buffer of `capacity` doubles can serve.
    fn floor_class(capacity: usize) -> usize {
        let mut class = MIN_CLASS;
        while class * 4 <= capacity {
            class *= 4;
        }
        class
    }

    /// Get total number of pooled buffers.
    #[must_use]
    pub fn total_pooled(&self) -> usize {
        self.pools.lock().values().map(Vec::len).sum()
    }

    /// Get the number of bytes held by pooled buffers.
    #[must_use]
    pub fn pooled_bytes(&self) -> usize {
        self.pools
            .lock()
            .values()
            .flatten()
            .map(|buf| buf.capacity() * std::mem::size_of::<f64>())
            .sum()
    }

    /// Get a snapshot of pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    /// Clear all pooled buffers, releasing memory.
    pub fn clear(&self) {
        self.pools.lock().clear();
    }

    /// Pre-populate the pool with `count` buffers of `len` doubles.
    pub fn warm(&self, len: usize, count: usize) {
        let len = len.max(MIN_CLASS);
        if len > self.max_len {
            return;
        }
        let mut pools = self.pools.lock();
        let pool = pools.entry(Self::floor_class(len)).or_default();
        let ready = pool.iter().filter(|buf| buf.capacity() >= len).count();
        let to_add = count
            .min(self.max_per_class)
            .saturating_sub(ready)
            .min(self.max_per_class.saturating_sub(pool.len()));
        for _ in 0..to_add {
            pool.push(Vec::with_capacity(len));
        }
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new(1 << 30, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pool_acquire_release() {
        let pool = ScratchPool::default();
        let buf = pool.acquire(10_000);
        assert_eq!(buf.len(), 10_000);
        pool.release(buf);
        assert_eq!(pool.total_pooled(), 1);
    }

    #[test]
    fn size_class_computation() {
        assert_eq!(ScratchPool::size_class(0), 4096);
        assert_eq!(ScratchPool::size_class(4096), 4096);
        assert_eq!(ScratchPool::size_class(4097), 16_384);
        assert_eq!(ScratchPool::size_class(16_384), 16_384);
        assert_eq!(ScratchPool::size_class(16_385), 65_536);
    }

    #[test]
    fn floor_class_computation() {
        assert_eq!(ScratchPool::floor_class(4096), 4096);
        assert_eq!(ScratchPool::floor_class(16_383), 4096);
        assert_eq!(ScratchPool::floor_class(16_384), 16_384);
        assert_eq!(ScratchPool::floor_class(70_000), 65_536);
    }

    #[test]
    fn pool_stats_tracking() {
        let pool = ScratchPool::default();

        // Miss: nothing in pool
        let buf = pool.acquire(5000);
        let stats = pool.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.high_water, 5000);

        // Release and re-acquire something that fits: should be a hit
        pool.release(buf);
        let _ = pool.acquire(4500);
        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn misses_allocate_the_requested_length() {
        let pool = ScratchPool::default();
        let buf = pool.acquire(20_000);
        assert!(buf.capacity() >= 20_000);
        assert!(buf.capacity() < ScratchPool::size_class(20_000));
        pool.release(buf);

        // Same class, but the pooled buffer is too short
        let bigger = pool.acquire(60_000);
        assert_eq!(pool.stats().misses, 2);
        assert_eq!(pool.total_pooled(), 1);
        pool.release(bigger);

        let again = pool.acquire(20_000);
        assert!(again.capacity() >= 20_000);
        assert_eq!(pool.stats().hits, 1);
    }

    #[test]
    fn pool_stats_eviction_too_large() {
        let pool = ScratchPool::new(8192, 4);
        pool.release(Vec::with_capacity(1 << 20));
        assert_eq!(pool.stats().evictions, 1);
        assert_eq!(pool.total_pooled(), 0);
    }

    #[test]
    fn pool_stats_eviction_pool_full() {
        let pool = ScratchPool::new(1 << 20, 2);
        pool.release(Vec::with_capacity(4096));
        pool.release(Vec::with_capacity(4096));
        pool.release(Vec::with_capacity(4096)); // class 4096 is full
        assert_eq!(pool.stats().evictions, 1);
        assert_eq!(pool.total_pooled(), 2);
    }

    #[test]
    fn pool_clear_and_bytes() {
        let pool = ScratchPool::default();
        pool.release(Vec::with_capacity(4096));
        assert!(pool.pooled_bytes() >= 4096 * 8);
        pool.clear();
        assert_eq!(pool.total_pooled(), 0);
        assert_eq!(pool.pooled_bytes(), 0);
    }

    #[test]
    fn pool_warm() {
        let pool = ScratchPool::default();
        pool.warm(20_000, 3);
        assert_eq!(pool.total_pooled(), 3);

        // Warming again should not add duplicates beyond count
        pool.warm(20_000, 3);
        assert_eq!(pool.total_pooled(), 3);

        let _ = pool.acquire(20_000);
        assert_eq!(pool.stats().hits, 1);
    }

    proptest! {
        #[test]
        fn acquire_returns_requested_len(len in 0usize..200_000) {
            let pool = ScratchPool::default();
            let buf = pool.acquire(len);
            prop_assert_eq!(buf.len(), len);
            prop_assert!(buf.capacity() >= len);
            pool.release(buf);
            let again = pool.acquire(len);
            prop_assert_eq!(again.len(), len);
        }
    }
}
