//! RAII guards for page access.
//!
//! - [`SharedPage`] - shared read access (any number of holders)
//! - [`ExclusivePage`] - sole write access, dirty-tracked
//!
//! A guard is the proof of a successful acquisition: page content is
//! unreachable without one, and dropping it releases exactly the mode it
//! holds. The content lock inside each guard mirrors the granted mode,
//! so even a hypothetical state-machine bug cannot produce a torn read.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::RawRwLock;

use crate::buffer::page_buffer::PageBuffer;
use crate::buffer::pool::BufferPool;
use crate::common::{FileOrigin, PagePosition};
use crate::storage::page_data::PageData;

/// Guard for shared read access to a page.
///
/// Multiple `SharedPage`s for the same page coexist. The hold is
/// released when the guard drops.
///
/// # Example
/// ```ignore
/// let page = pool.get_shared(position, FileOrigin::Data)?;
/// let id = page.page_id();
/// // drops here, share count decremented
/// ```
pub struct SharedPage<'a> {
    /// Pool reference for release on drop.
    pool: &'a BufferPool,
    /// The buffer this guard holds.
    buffer: Arc<PageBuffer>,
    /// Content lock matching the shared mode.
    content: ArcRwLockReadGuard<RawRwLock, PageData>,
}

impl<'a> SharedPage<'a> {
    pub(crate) fn new(
        pool: &'a BufferPool,
        buffer: Arc<PageBuffer>,
        content: ArcRwLockReadGuard<RawRwLock, PageData>,
    ) -> Self {
        Self {
            pool,
            buffer,
            content,
        }
    }

    /// File position of this page.
    pub fn position(&self) -> PagePosition {
        self.buffer.address().position
    }

    /// Backing file of this page.
    pub fn origin(&self) -> FileOrigin {
        self.buffer.address().origin
    }

    /// Unique id of the physical buffer holding this page.
    pub fn buffer_id(&self) -> u64 {
        self.buffer.unique_id()
    }
}

impl Deref for SharedPage<'_> {
    type Target = PageData;

    #[inline]
    fn deref(&self) -> &PageData {
        &self.content
    }
}

impl Drop for SharedPage<'_> {
    fn drop(&mut self) {
        self.pool.release_shared_hold(&self.buffer);
    }
}

/// Guard for exclusive write access to a page.
///
/// Only one `ExclusivePage` exists per page at a time. Any mutation
/// through the guard marks the page dirty on release.
///
/// Pages born through [`BufferPool::new_page`] start without a file
/// position; assign one with [`set_position`](Self::set_position) before
/// dropping the guard, or the page is discarded.
///
/// # Example
/// ```ignore
/// let mut page = pool.get_exclusive(position, FileOrigin::Data)?;
/// page.write_u32(16, 7);
/// // drops here: marked dirty, hold released
/// ```
pub struct ExclusivePage<'a> {
    /// Pool reference for release on drop.
    pool: &'a BufferPool,
    /// The buffer this guard holds.
    buffer: Arc<PageBuffer>,
    /// Content lock matching the exclusive mode.
    content: ArcRwLockWriteGuard<RawRwLock, PageData>,
    /// Content was mutated through this guard.
    dirty: bool,
    /// False for new pages that still need installing on release.
    installed: bool,
}

impl<'a> ExclusivePage<'a> {
    pub(crate) fn new(
        pool: &'a BufferPool,
        buffer: Arc<PageBuffer>,
        content: ArcRwLockWriteGuard<RawRwLock, PageData>,
        installed: bool,
    ) -> Self {
        Self {
            pool,
            buffer,
            content,
            dirty: false,
            installed,
        }
    }

    /// File position of this page; undefined for a new page until
    /// [`set_position`](Self::set_position) is called.
    pub fn position(&self) -> PagePosition {
        self.buffer.address().position
    }

    /// Backing file of this page.
    pub fn origin(&self) -> FileOrigin {
        self.buffer.address().origin
    }

    /// Unique id of the physical buffer holding this page.
    pub fn buffer_id(&self) -> u64 {
        self.buffer.unique_id()
    }

    /// Assign the file position of a freshly allocated page.
    ///
    /// # Panics
    /// Panics if the page came from the active index rather than
    /// [`BufferPool::new_page`], or if a position was already assigned;
    /// placement is decided exactly once, by the allocation layer.
    pub fn set_position(&mut self, position: PagePosition) {
        assert!(
            !self.installed,
            "position of page buffer {} is already fixed",
            self.buffer.unique_id()
        );
        let mut inner = self.buffer.lock_inner();
        assert!(
            !inner.address.position.is_defined(),
            "page buffer {} was already positioned at {}",
            self.buffer.unique_id(),
            inner.address.position
        );
        inner.address.position = position;
    }
}

impl Deref for ExclusivePage<'_> {
    type Target = PageData;

    #[inline]
    fn deref(&self) -> &PageData {
        &self.content
    }
}

impl DerefMut for ExclusivePage<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut PageData {
        // Reaching mutable content is what makes the page dirty
        self.dirty = true;
        &mut self.content
    }
}

impl Drop for ExclusivePage<'_> {
    fn drop(&mut self) {
        self.pool
            .finish_exclusive(&self.buffer, self.dirty, self.installed);
    }
}
