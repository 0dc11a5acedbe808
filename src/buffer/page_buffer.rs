//! PageBuffer - the fundamental unit of the pool.
//!
//! A [`PageBuffer`] pairs one [`PageData`] region with the identity and
//! concurrency metadata the pool needs: a stable unique id, the page
//! address it currently represents, its [`ShareState`], a dirty flag and
//! a logical access timestamp.
//!
//! The share state machine is the single arbitration mechanism. Identity
//! and state live under one mutex so an acquisition that slept through a
//! recycle observes the address change, and an eviction that races an
//! acquisition observes the state change. Content access is only handed
//! out after a successful state transition, through a read/write lock
//! matching the granted mode.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};

use crate::common::{Error, PageAddress, Result};
use crate::storage::page_data::PageData;

/// How a caller wants to hold a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Concurrent read access; any number of holders.
    Shared,
    /// Sole write access; excludes every other holder.
    Exclusive,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Shared => write!(f, "shared"),
            AccessMode::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// Concurrency state of a page buffer.
///
/// A tagged variant instead of a signed counter with a magic negative
/// sentinel: `Shared(0)` cannot be constructed by the transitions below,
/// and exclusive is a distinct state rather than a sign convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareState {
    /// Unheld; acquirable in either mode and eligible for eviction.
    Free,
    /// Held by `n >= 1` concurrent readers.
    Shared(u32),
    /// Held by exactly one writer.
    Exclusive,
}

/// Identity and state fields guarded by the per-buffer mutex.
pub(crate) struct BufferInner {
    /// Current share state.
    pub state: ShareState,
    /// Which page this buffer represents, or `PageAddress::UNBOUND`
    /// while on the free list / before first placement.
    pub address: PageAddress,
    /// Content mutated since last persisted.
    pub dirty: bool,
}

/// A page buffer: one page worth of memory plus pool metadata.
///
/// Buffers are created by the pool, recycled through its free list, and
/// destroyed only at pool teardown. `unique_id` survives recycling even
/// though address, state and content are reset.
pub struct PageBuffer {
    /// Immutable, pool-unique, never reused.
    unique_id: u64,

    /// State + identity + dirty flag, all under one lock.
    inner: Mutex<BufferInner>,

    /// Signalled whenever the buffer becomes free or changes identity.
    freed: Condvar,

    /// Logical clock value of the last successful acquisition.
    timestamp: AtomicU64,

    /// Page content. The read/write lock mirrors the granted mode; the
    /// `Arc` lets guards own their content lock without borrowing the
    /// buffer.
    data: Arc<RwLock<PageData>>,
}

impl PageBuffer {
    pub(crate) fn new(unique_id: u64) -> Self {
        Self {
            unique_id,
            inner: Mutex::new(BufferInner {
                state: ShareState::Free,
                address: PageAddress::UNBOUND,
                dirty: false,
            }),
            freed: Condvar::new(),
            timestamp: AtomicU64::new(0),
            data: Arc::new(RwLock::new(PageData::new())),
        }
    }

    /// Stable identity of the physical buffer across its reuse history.
    #[inline]
    pub fn unique_id(&self) -> u64 {
        self.unique_id
    }

    /// Logical clock of the last acquisition; drives eviction ordering.
    #[inline]
    pub(crate) fn timestamp(&self) -> u64 {
        self.timestamp.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn content(&self) -> &Arc<RwLock<PageData>> {
        &self.data
    }

    #[inline]
    pub(crate) fn lock_inner(&self) -> MutexGuard<'_, BufferInner> {
        self.inner.lock()
    }

    /// Wake every thread waiting for this buffer to become free.
    ///
    /// Also called after an identity change so sleeping acquirers can
    /// observe that the buffer was recycled under them.
    #[inline]
    pub(crate) fn notify_waiters(&self) {
        self.freed.notify_all();
    }

    /// Current share state (snapshot).
    pub fn share_state(&self) -> ShareState {
        self.inner.lock().state
    }

    /// Current address (snapshot).
    pub fn address(&self) -> PageAddress {
        self.inner.lock().address
    }

    /// Whether content has been mutated since last persisted.
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    // ========================================================================
    // Acquisition
    // ========================================================================

    /// Try to acquire `mode` on this buffer while it still represents
    /// `address`, blocking until `deadline` when contended.
    ///
    /// Returns `Ok(true)` on success, `Ok(false)` when the buffer was
    /// recycled to a different address mid-wait (the caller must retry
    /// its index lookup), and `Err(LockTimeout)` past the deadline. A
    /// timed-out request leaves no trace in the state machine.
    pub(crate) fn acquire(
        &self,
        address: PageAddress,
        mode: AccessMode,
        deadline: Instant,
        clock: u64,
    ) -> Result<bool> {
        let mut inner = self.inner.lock();
        loop {
            if inner.address != address {
                return Ok(false);
            }

            let granted = match (mode, inner.state) {
                (AccessMode::Shared, ShareState::Free) => {
                    inner.state = ShareState::Shared(1);
                    true
                }
                (AccessMode::Shared, ShareState::Shared(n)) => {
                    inner.state = ShareState::Shared(n + 1);
                    true
                }
                (AccessMode::Exclusive, ShareState::Free) => {
                    inner.state = ShareState::Exclusive;
                    true
                }
                _ => false,
            };

            if granted {
                self.timestamp.store(clock, Ordering::Relaxed);
                return Ok(true);
            }

            if self.freed.wait_until(&mut inner, deadline).timed_out() {
                return Err(Error::LockTimeout(address));
            }
        }
    }

    /// Bind a buffer just drawn from the free list to `address` and grant
    /// `mode` immediately. Used on the miss path, before the buffer is
    /// visible in the index.
    pub(crate) fn bind(&self, address: PageAddress, mode: AccessMode, clock: u64) {
        let mut inner = self.inner.lock();
        assert!(
            inner.state == ShareState::Free && inner.address == PageAddress::UNBOUND,
            "bind of page buffer {} that is not a recycled free buffer",
            self.unique_id
        );
        inner.address = address;
        inner.dirty = false;
        inner.state = match mode {
            AccessMode::Shared => ShareState::Shared(1),
            AccessMode::Exclusive => ShareState::Exclusive,
        };
        self.timestamp.store(clock, Ordering::Relaxed);
    }

    /// Reset identity before returning the buffer to the free list.
    ///
    /// The caller must already have verified (under the inner lock it
    /// took for the compare-and-remove) that the buffer is free; this
    /// re-asserts it.
    pub(crate) fn recycle(&self) {
        let mut inner = self.inner.lock();
        assert!(
            inner.state == ShareState::Free,
            "recycle of page buffer {} while {:?}",
            self.unique_id,
            inner.state
        );
        inner.address = PageAddress::UNBOUND;
        inner.dirty = false;
        drop(inner);
        // Sleeping acquirers must re-check identity
        self.freed.notify_all();
    }

    // ========================================================================
    // Release (strict contract)
    // ========================================================================

    /// Drop one shared hold.
    ///
    /// # Panics
    /// Panics when the buffer is not currently shared: a caller may only
    /// release a mode it successfully acquired, and a count reaching
    /// zero twice means two layers think they own the same release.
    pub(crate) fn release_shared(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            ShareState::Shared(1) => {
                inner.state = ShareState::Free;
                drop(inner);
                self.freed.notify_all();
            }
            ShareState::Shared(n) => {
                inner.state = ShareState::Shared(n - 1);
            }
            other => panic!(
                "shared release of page buffer {} in state {:?}",
                self.unique_id, other
            ),
        }
    }

    /// Drop the exclusive hold, recording whether content was mutated.
    ///
    /// # Panics
    /// Panics when the buffer is not exclusively held.
    pub(crate) fn release_exclusive(&self, dirty: bool) {
        let mut inner = self.inner.lock();
        assert!(
            inner.state == ShareState::Exclusive,
            "exclusive release of page buffer {} in state {:?}",
            self.unique_id,
            inner.state
        );
        inner.state = ShareState::Free;
        if dirty {
            inner.dirty = true;
        }
        drop(inner);
        self.freed.notify_all();
    }
}

impl fmt::Debug for PageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PageBuffer")
            .field("unique_id", &self.unique_id)
            .field("address", &inner.address)
            .field("state", &inner.state)
            .field("dirty", &inner.dirty)
            .field("timestamp", &self.timestamp())
            .finish()
    }
}
