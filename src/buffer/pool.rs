//! Buffer pool - page identity and access arbitration.
//!
//! The [`BufferPool`] is the single source of truth for which buffer
//! represents which page. It provides:
//! - Page caching between the backing files and memory
//! - Shared/exclusive acquisition with a strict release contract
//! - Timestamp-ordered eviction of unshared clean pages
//! - Dirty-page write-back per file origin

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::buffer::page_buffer::{AccessMode, PageBuffer, ShareState};
use crate::buffer::page_guard::{ExclusivePage, SharedPage};
use crate::buffer::stats::PoolStats;
use crate::common::{Error, FileOrigin, PageAddress, PagePosition, PoolConfig, Result};
use crate::storage::DiskManager;

/// Owns every page buffer and arbitrates all access to them.
///
/// # Architecture
/// ```text
/// ┌────────────────────────────────────────────────────────────────┐
/// │                         BufferPool                             │
/// │  ┌────────────────────┐   ┌─────────────────────────────────┐  │
/// │  │ index              │   │ arena: Vec<Arc<PageBuffer>>     │  │
/// │  │ PageAddress → buf  │──▶│ [Buf0] [Buf1] [Buf2] ...        │  │
/// │  └────────────────────┘   └─────────────────────────────────┘  │
/// │  ┌────────────────────┐   ┌──────────────┐  ┌──────────────┐   │
/// │  │ free_list          │   │ pending      │  │ disk         │   │
/// │  │ recycled buffers   │   │ loads        │  │ DiskManager  │   │
/// │  └────────────────────┘   └──────────────┘  └──────────────┘   │
/// └────────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread safety
/// - `index`: `RwLock` — many lookups, few installs/removals
/// - `free_list`, `arena`, `pending`: `Mutex` — always modified
/// - per-buffer state: its own mutex + condvar inside [`PageBuffer`]
/// - `stats`, clocks: atomics
///
/// Blocking waits (contended acquisition, in-flight loads) and disk I/O
/// always happen with no pool-wide lock held; the index lock is only
/// taken for lookups, installs and compare-and-remove during eviction.
///
/// # Usage
/// ```ignore
/// let disk = DiskManager::open("db.folio", "db.log")?;
/// let pool = BufferPool::new(disk, PoolConfig::default());
///
/// let mut page = pool.new_page(FileOrigin::Data);
/// page.set_page_id(1);
/// page.set_position(PagePosition::new(0));
/// drop(page); // installed, marked dirty
///
/// pool.flush(FileOrigin::Data)?;
/// ```
pub struct BufferPool {
    /// Every buffer ever allocated. Buffers are recycled, never dropped
    /// before the pool itself (arena pattern).
    arena: Mutex<Vec<Arc<PageBuffer>>>,

    /// Maps each active page to its buffer. At most one entry per
    /// address, ever.
    index: RwLock<HashMap<PageAddress, Arc<PageBuffer>>>,

    /// Unbound buffers ready for reuse (LIFO for cache locality).
    free_list: Mutex<Vec<Arc<PageBuffer>>>,

    /// Addresses whose fill from disk is in flight. A provisional claim:
    /// concurrent misses for the same page wait here instead of loading
    /// twice.
    pending: Mutex<HashSet<PageAddress>>,
    pending_done: Condvar,

    /// Handles all backing-file I/O.
    disk: DiskManager,

    /// Source of buffer unique ids; monotonic, never reused.
    next_buffer_id: AtomicU64,

    /// Logical access clock; drives eviction ordering.
    clock: AtomicU64,

    /// Performance counters.
    stats: PoolStats,

    config: PoolConfig,
}

impl BufferPool {
    /// Create a pool over the given disk manager.
    ///
    /// # Panics
    /// Panics if `config.capacity` or `config.reclaim_batch` is 0.
    pub fn new(disk: DiskManager, config: PoolConfig) -> Self {
        assert!(config.capacity > 0, "capacity must be > 0");
        assert!(config.reclaim_batch > 0, "reclaim_batch must be > 0");

        Self {
            arena: Mutex::new(Vec::new()),
            index: RwLock::new(HashMap::new()),
            free_list: Mutex::new(Vec::new()),
            pending: Mutex::new(HashSet::new()),
            pending_done: Condvar::new(),
            disk,
            next_buffer_id: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            stats: PoolStats::new(),
            config,
        }
    }

    // ========================================================================
    // Public API: page acquisition
    // ========================================================================

    /// Acquire a page for reading (shared access).
    ///
    /// Cache hits succeed immediately while the page is free or already
    /// shared; while a writer holds the page the call blocks until the
    /// writer releases or the configured timeout elapses. On a miss the
    /// page is filled from its backing file first.
    ///
    /// # Errors
    /// - `Error::LockTimeout` if a writer held the page for too long
    /// - `Error::PageNotFound` / `Error::Io` from the fill on a miss
    pub fn get_shared(
        &self,
        position: PagePosition,
        origin: FileOrigin,
    ) -> Result<SharedPage<'_>> {
        let address = PageAddress::new(position, origin);
        let buffer = self.lookup_or_load(address, AccessMode::Shared)?;
        let content = buffer.content().read_arc();

        Ok(SharedPage::new(self, buffer, content))
    }

    /// Acquire a page for writing (exclusive access).
    ///
    /// Succeeds only once no other holder remains; blocks until then or
    /// until the configured timeout. The page is marked dirty on release
    /// if its content was mutated.
    ///
    /// # Errors
    /// Same as [`get_shared`](Self::get_shared).
    pub fn get_exclusive(
        &self,
        position: PagePosition,
        origin: FileOrigin,
    ) -> Result<ExclusivePage<'_>> {
        let address = PageAddress::new(position, origin);
        let buffer = self.lookup_or_load(address, AccessMode::Exclusive)?;
        let content = buffer.content().write_arc();

        Ok(ExclusivePage::new(self, buffer, content, true))
    }

    /// Allocate a page for content not yet backed by a file position.
    ///
    /// Always granted exclusive; the content starts zeroed. Assign a
    /// position through the guard before dropping it to install the page
    /// into the pool; an unpositioned page is discarded on release.
    pub fn new_page(&self, origin: FileOrigin) -> ExclusivePage<'_> {
        assert!(
            origin != FileOrigin::None,
            "new_page needs a backing file origin"
        );

        let buffer = self.draw_buffer();
        buffer.bind(
            PageAddress::new(PagePosition::UNDEFINED, origin),
            AccessMode::Exclusive,
            self.tick(),
        );

        let mut content = buffer.content().write_arc();
        // Recycled buffers keep their old bytes; a new page must not
        // leak them to the caller
        content.reset();

        ExclusivePage::new(self, buffer, content, false)
    }

    // ========================================================================
    // Public API: write-back
    // ========================================================================

    /// Persist every dirty page of one origin and fsync that file.
    ///
    /// Does not evict. A page stays marked dirty until its write
    /// completes, so the eviction scan never reclaims a buffer whose
    /// bytes are still on their way to disk.
    ///
    /// # Errors
    /// I/O errors from the backing file; the failed page keeps its dirty
    /// flag and the pool stays consistent.
    pub fn flush(&self, origin: FileOrigin) -> Result<()> {
        let targets: Vec<(PageAddress, Arc<PageBuffer>)> = {
            let index = self.index.read();
            index
                .iter()
                .filter(|(address, _)| address.origin == origin)
                .map(|(address, buffer)| (*address, Arc::clone(buffer)))
                .collect()
        };

        let mut wrote = false;
        for (address, buffer) in targets {
            // The content read lock serializes against an active writer
            // and keeps a racing miss's fill blocked behind this write
            let content = buffer.content().read_arc();
            {
                let inner = buffer.lock_inner();
                if !inner.dirty || inner.address != address {
                    continue;
                }
            }

            // Dirty stays set through the write so the eviction scan's
            // compare-and-remove cannot recycle the buffer mid-write-back;
            // on failure the page simply remains dirty
            self.disk.write_page(address, &content)?;
            buffer.lock_inner().dirty = false;
            drop(content);

            PoolStats::bump(&self.stats.pages_written);
            wrote = true;
        }

        if wrote {
            self.disk.sync(origin)?;
        }
        Ok(())
    }

    /// Addresses of the currently dirty pages of one origin, for the
    /// checkpoint layer.
    pub fn dirty_addresses(&self, origin: FileOrigin) -> Vec<PageAddress> {
        let index = self.index.read();
        index
            .iter()
            .filter(|(address, buffer)| address.origin == origin && buffer.is_dirty())
            .map(|(address, _)| *address)
            .collect()
    }

    // ========================================================================
    // Public API: introspection
    // ========================================================================

    /// Pool statistics.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Number of pages in the active index.
    pub fn cached_pages(&self) -> usize {
        self.index.read().len()
    }

    /// Number of buffers on the free list.
    pub fn free_buffers(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Number of buffers allocated over the pool's lifetime.
    pub fn allocated_buffers(&self) -> usize {
        self.arena.lock().len()
    }

    /// Access the disk manager (checkpoint/replay logic reads the log
    /// file directly through it).
    pub fn disk(&self) -> &DiskManager {
        &self.disk
    }

    // ========================================================================
    // Internal: called by guards on drop
    // ========================================================================

    pub(crate) fn release_shared_hold(&self, buffer: &PageBuffer) {
        buffer.release_shared();
    }

    /// Finish an exclusive hold.
    ///
    /// `installed` is false for pages born through [`new_page`]: if the
    /// caller assigned a position the page is installed into the index
    /// here, otherwise the buffer is discarded back to the free list.
    pub(crate) fn finish_exclusive(
        &self,
        buffer: &Arc<PageBuffer>,
        dirty: bool,
        installed: bool,
    ) {
        if installed {
            buffer.release_exclusive(dirty);
            return;
        }

        // Identity is stable here: we still hold the exclusive mode
        let address = buffer.address();
        if address.is_bound() {
            {
                let mut index = self.index.write();
                let prev = index.insert(address, Arc::clone(buffer));
                assert!(
                    prev.is_none(),
                    "duplicate page identity {address} installed by new-page release"
                );
            }
            buffer.release_exclusive(dirty);
        } else {
            // Abandoned before placement
            buffer.release_exclusive(false);
            buffer.recycle();
            self.free_list.lock().push(Arc::clone(buffer));
        }
    }

    // ========================================================================
    // Internal: lookup and load
    // ========================================================================

    #[inline]
    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Resolve an address to an acquired buffer: index hit, waiting on an
    /// in-flight load, or loading from disk ourselves.
    fn lookup_or_load(&self, address: PageAddress, mode: AccessMode) -> Result<Arc<PageBuffer>> {
        assert!(
            address.is_bound(),
            "page requests need a defined position and origin"
        );
        let deadline = Instant::now() + self.config.lock_timeout;

        loop {
            // Fast path: active index hit
            let hit = self.index.read().get(&address).cloned();
            if let Some(buffer) = hit {
                // Contended waits happen on the buffer's own condvar,
                // with no pool-wide lock held
                match buffer.acquire(address, mode, deadline, self.tick()) {
                    Ok(true) => {
                        PoolStats::bump(&self.stats.cache_hits);
                        return Ok(buffer);
                    }
                    // Recycled out from under us; retry the lookup
                    Ok(false) => continue,
                    Err(e) => {
                        PoolStats::bump(&self.stats.lock_timeouts);
                        return Err(e);
                    }
                }
            }

            // Miss: claim the load, or wait for whoever holds the claim
            {
                let mut pending = self.pending.lock();
                if self.index.read().contains_key(&address) {
                    // Installed between our lookup and the claim
                    continue;
                }
                if pending.contains(&address) {
                    if self
                        .pending_done
                        .wait_until(&mut pending, deadline)
                        .timed_out()
                    {
                        PoolStats::bump(&self.stats.lock_timeouts);
                        return Err(Error::LockTimeout(address));
                    }
                    continue;
                }
                pending.insert(address);
            }

            let result = self.load_page(address, mode);

            // Drop the claim and wake peers regardless of outcome
            self.pending.lock().remove(&address);
            self.pending_done.notify_all();

            if result.is_ok() {
                PoolStats::bump(&self.stats.cache_misses);
            }
            return result;
        }
    }

    /// Fill a buffer from disk and install it with `mode` already
    /// granted. Runs with the pending claim held and no pool lock.
    fn load_page(&self, address: PageAddress, mode: AccessMode) -> Result<Arc<PageBuffer>> {
        let buffer = self.draw_buffer();

        {
            let mut content = buffer.content().write_arc();
            if let Err(e) = self.disk.read_page(address, &mut content) {
                drop(content);
                // Never installed: identity is still unbound, so the
                // buffer goes straight back to the free list
                self.free_list.lock().push(buffer);
                return Err(e);
            }
        }
        PoolStats::bump(&self.stats.pages_read);

        buffer.bind(address, mode, self.tick());

        let mut index = self.index.write();
        let prev = index.insert(address, Arc::clone(&buffer));
        assert!(prev.is_none(), "duplicate page identity {address} in active index");

        Ok(buffer)
    }

    // ========================================================================
    // Internal: buffer supply and eviction
    // ========================================================================

    /// Get a buffer to fill: free list, eviction, or fresh allocation.
    fn draw_buffer(&self) -> Arc<PageBuffer> {
        if let Some(buffer) = self.free_list.lock().pop() {
            PoolStats::bump(&self.stats.recycles);
            return buffer;
        }

        if self.allocated_buffers() >= self.config.capacity {
            self.reclaim();
            if let Some(buffer) = self.free_list.lock().pop() {
                PoolStats::bump(&self.stats.recycles);
                return buffer;
            }
            // Everything is held or dirty: grow past capacity rather
            // than deadlock the caller
        }

        let id = self.next_buffer_id.fetch_add(1, Ordering::Relaxed);
        let buffer = Arc::new(PageBuffer::new(id));
        self.arena.lock().push(Arc::clone(&buffer));
        buffer
    }

    /// Eviction scan: return unshared clean buffers to the free list,
    /// oldest access first.
    ///
    /// Each candidate's state is re-verified under its own lock while
    /// the index write lock is held (compare-and-remove), so a buffer
    /// acquired, re-addressed or dirtied after the snapshot is skipped.
    fn reclaim(&self) -> usize {
        let mut candidates: Vec<(PageAddress, Arc<PageBuffer>)> = {
            let index = self.index.read();
            index
                .iter()
                .map(|(address, buffer)| (*address, Arc::clone(buffer)))
                .collect()
        };
        candidates.sort_by_key(|(_, buffer)| buffer.timestamp());

        let mut reclaimed = 0;
        for (address, buffer) in candidates {
            if reclaimed >= self.config.reclaim_batch {
                break;
            }

            {
                let mut index = self.index.write();
                let mut inner = buffer.lock_inner();
                if inner.state != ShareState::Free || inner.dirty || inner.address != address {
                    continue;
                }
                index.remove(&address);
                // Identity reset happens under the same lock as the
                // state check; an acquirer sleeping on this buffer wakes
                // to an address mismatch instead of a stale page
                inner.address = PageAddress::UNBOUND;
            }
            buffer.notify_waiters();

            self.free_list.lock().push(buffer);
            PoolStats::bump(&self.stats.evictions);
            reclaimed += 1;
        }
        reclaimed
    }
}

impl Drop for BufferPool {
    /// Teardown audit: the arena owns every buffer, and every buffer
    /// must have been released.
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        for buffer in self.arena.get_mut().iter() {
            assert!(
                buffer.share_state() == ShareState::Free,
                "page buffer {} still held at pool teardown",
                buffer.unique_id()
            );
        }
    }
}
