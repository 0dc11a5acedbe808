//! Configuration constants and pool tuning knobs.

use std::time::Duration;

/// Size of a page in bytes (8KB).
///
/// Every page buffer in the pool is exactly this size, and every page
/// position in a backing file is a multiple of it.
///
/// 8KB keeps documents-per-page reasonable while staying a small multiple
/// of the OS page size, so buffers stay friendly to the page cache.
pub const PAGE_SIZE: usize = 8192;

/// Sentinel byte offset meaning "no position assigned yet".
///
/// A freshly allocated page keeps this value until the caller picks a
/// file offset for it.
pub const POSITION_UNDEFINED: u64 = u64::MAX;

/// Tuning parameters for a [`BufferPool`](crate::buffer::BufferPool).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Soft cap on the number of allocated page buffers.
    ///
    /// Once this many buffers exist and the free list is empty, the pool
    /// tries to evict unshared clean pages before allocating more. The
    /// pool still grows past the cap when every buffer is held or dirty;
    /// capacity is memory pressure, not a correctness bound.
    pub capacity: usize,

    /// How long an acquisition waits for a contended page before giving
    /// up with [`Error::LockTimeout`](crate::common::Error::LockTimeout).
    pub lock_timeout: Duration,

    /// Maximum number of buffers reclaimed per eviction scan.
    pub reclaim_batch: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            // 1024 * 8KB = 8MB of page memory
            capacity: 1024,
            lock_timeout: Duration::from_secs(10),
            reclaim_batch: 16,
        }
    }
}
