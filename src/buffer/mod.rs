//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between the storage
//! engine's collaborators and the backing files. It owns every page
//! buffer, arbitrates shared/exclusive access per page, and recycles
//! buffer memory through a free list.
//!
//! # Components
//! - [`BufferPool`] - page identity index, acquisition, eviction, flush
//! - [`PageBuffer`] - one page of memory plus identity and share state
//! - [`SharedPage`] / [`ExclusivePage`] - RAII guards for page access
//! - [`PoolStats`] - performance counters

mod page_buffer;
mod page_guard;
mod pool;
mod stats;

pub use page_buffer::{AccessMode, PageBuffer, ShareState};
pub use page_guard::{ExclusivePage, SharedPage};
pub use pool::BufferPool;
pub use stats::{PoolStats, StatsSnapshot};
