//! Shared memory controller.

use crate::consts::{CACHE_CAPACITY, MEMORY_SIZE, SEGMENT_COUNT, SEGMENT_SIZE};
use crate::params::Params;

use slate_asm::{Fault, RawInstruction, Word};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Snapshot of the controller's access counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryStats {
    /// Counted reads, cache hits included.
    pub reads: u64,
    /// Counted writes, bulk loads included.
    pub writes: u64,
    /// Reads served from the cache.
    pub cache_hits: u64,
}

impl MemoryStats {
    /// Fraction of reads served from the cache, in percent.
    pub fn hit_rate(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.reads as f64 * 100.0
        }
    }
}

/// Bounded write-through cache with deterministic insertion-order
/// eviction.
#[derive(Debug)]
struct WordCache {
    entries: HashMap<Word, Word>,
    order: VecDeque<Word>,
    capacity: usize,
}

impl WordCache {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn get(&self, addr: Word) -> Option<Word> {
        self.entries.get(&addr).copied()
    }

    fn insert(&mut self, addr: Word, value: Word) {
        if self.entries.insert(addr, value).is_some() {
            return;
        }

        if self.entries.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }

        self.order.push_back(addr);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Thread-safe shared memory with segmented read locks, a global write
/// lock, and a bounded write-through cache.
///
/// The backing array is word-atomic, so a concurrent reader observes
/// either the pre-write or the post-write value of an address, never a
/// torn word. Writes are totally ordered by the write lock; the writer
/// updates the cache under the cache lock before releasing it, so any
/// read acquiring the cache lock afterwards sees the new value.
#[derive(Debug)]
pub struct MemoryController {
    memory: Box<[AtomicU32]>,
    segment_locks: [Mutex<()>; SEGMENT_COUNT],
    write_lock: Mutex<()>,
    cache: Mutex<WordCache>,
    reads: AtomicU64,
    writes: AtomicU64,
    cache_hits: AtomicU64,
    stats_enabled: AtomicBool,
}

impl MemoryController {
    /// Create a controller with the given memory size (in byte addresses)
    /// and cache capacity (in entries).
    pub fn new(size: usize, cache_capacity: usize) -> Self {
        Self {
            memory: (0..size).map(|_| AtomicU32::new(0)).collect(),
            segment_locks: std::array::from_fn(|_| Mutex::new(())),
            write_lock: Mutex::new(()),
            cache: Mutex::new(WordCache::with_capacity(cache_capacity)),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            stats_enabled: AtomicBool::new(false),
        }
    }

    /// Create a controller from simulation parameters.
    pub fn with_params(params: &Params) -> Self {
        let controller = Self::new(params.memory_size, params.cache_capacity);
        controller.enable_stats(params.stats_enabled);

        controller
    }

    /// Memory size in byte addresses.
    pub fn size(&self) -> usize {
        self.memory.len()
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    const fn segment(addr: Word) -> usize {
        (addr as usize / SEGMENT_SIZE) % SEGMENT_COUNT
    }

    fn count(&self, counter: &AtomicU64) {
        if self.stats_enabled.load(Ordering::Relaxed) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Read the word at `addr`; out-of-range addresses read as zero.
    pub fn read(&self, addr: Word) -> Word {
        {
            let cache = Self::lock(&self.cache);
            if let Some(value) = cache.get(addr) {
                drop(cache);
                self.count(&self.cache_hits);
                self.count(&self.reads);

                return value;
            }
        }

        let _segment = Self::lock(&self.segment_locks[Self::segment(addr)]);

        match self.memory.get(addr as usize) {
            Some(cell) => {
                // Load while holding the cache lock: a miss that loaded
                // first could re-insert a stale word over a concurrent
                // writer's fresh one.
                let mut cache = Self::lock(&self.cache);
                let value = cell.load(Ordering::Acquire);
                cache.insert(addr, value);
                drop(cache);
                self.count(&self.reads);

                value
            }
            None => 0,
        }
    }

    /// Write the word at `addr`, writing through to the cache. Returns
    /// false, without mutating, when the address is out of range.
    pub fn write(&self, addr: Word, value: Word) -> bool {
        let _write = Self::lock(&self.write_lock);

        match self.memory.get(addr as usize) {
            Some(cell) => {
                cell.store(value, Ordering::Release);
                Self::lock(&self.cache).insert(addr, value);
                self.count(&self.writes);

                true
            }
            None => false,
        }
    }

    /// Write a program image at consecutive word-aligned addresses under
    /// the write lock. Fails without mutating when the image would run
    /// past the end of memory.
    pub fn bulk_load(&self, words: &[Word], start_addr: Word) -> Result<(), Fault> {
        let _write = Self::lock(&self.write_lock);

        let end = (start_addr as usize)
            .checked_add(words.len().saturating_mul(RawInstruction::LEN))
            .ok_or(Fault::MemoryOutOfRange)?;
        if end > self.memory.len() {
            return Err(Fault::MemoryOutOfRange);
        }

        let mut cache = Self::lock(&self.cache);
        for (offset, word) in words.iter().enumerate() {
            let addr = start_addr + (offset as Word) * RawInstruction::LEN as Word;
            self.memory[addr as usize].store(*word, Ordering::Release);
            cache.insert(addr, *word);
        }
        drop(cache);

        if self.stats_enabled.load(Ordering::Relaxed) {
            self.writes.fetch_add(words.len() as u64, Ordering::Relaxed);
        }

        tracing::debug!(start_addr, words = words.len(), "bulk load");

        Ok(())
    }

    /// Drop every cache entry.
    pub fn flush_cache(&self) {
        Self::lock(&self.cache).clear();
    }

    /// Enable or disable the access counters. Disabling clears them.
    pub fn enable_stats(&self, enabled: bool) {
        self.stats_enabled.store(enabled, Ordering::Relaxed);

        if !enabled {
            self.reads.store(0, Ordering::Relaxed);
            self.writes.store(0, Ordering::Relaxed);
            self.cache_hits.store(0, Ordering::Relaxed);
        }
    }

    /// Snapshot the access counters.
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Emit the access counters as telemetry. No-op while stats are
    /// disabled.
    pub fn print_stats(&self) {
        if !self.stats_enabled.load(Ordering::Relaxed) {
            return;
        }

        let stats = self.stats();
        tracing::info!(
            reads = stats.reads,
            writes = stats.writes,
            cache_hits = stats.cache_hits,
            hit_rate = format_args!("{:.2}%", stats.hit_rate()),
            "memory controller statistics"
        );
    }
}

impl Default for MemoryController {
    fn default() -> Self {
        Self::new(MEMORY_SIZE, CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_evicts_in_insertion_order() {
        let mut cache = WordCache::with_capacity(2);

        cache.insert(0, 10);
        cache.insert(4, 11);
        cache.insert(8, 12);

        assert_eq!(cache.get(0), None);
        assert_eq!(cache.get(4), Some(11));
        assert_eq!(cache.get(8), Some(12));
    }

    #[test]
    fn cache_overwrite_does_not_evict() {
        let mut cache = WordCache::with_capacity(2);

        cache.insert(0, 10);
        cache.insert(4, 11);
        cache.insert(0, 20);

        assert_eq!(cache.get(0), Some(20));
        assert_eq!(cache.get(4), Some(11));
    }

    #[test]
    fn segments_cover_the_address_space() {
        assert_eq!(MemoryController::segment(0), 0);
        assert_eq!(MemoryController::segment(63), 0);
        assert_eq!(MemoryController::segment(64), 1);
        assert_eq!(MemoryController::segment(1023), 15);
        assert_eq!(MemoryController::segment(1024), 0);
    }
}
