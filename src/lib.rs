//! foliodb - page buffer pool and concurrency control for an embedded
//! document database storage engine.
//!
//! # Architecture
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │              Transaction / Query layer (external)          │
//! └──────────────────────────┬─────────────────────────────────┘
//!                            │ get/new/release pages
//! ┌──────────────────────────▼─────────────────────────────────┐
//! │                  Buffer Pool (buffer/)                     │
//! │   PageAddress index · ShareState arbitration · eviction    │
//! │   BufferPool + PageBuffer + SharedPage/ExclusivePage       │
//! └──────────────────────────┬─────────────────────────────────┘
//!                            │ fill / persist pages
//! ┌──────────────────────────▼─────────────────────────────────┐
//! │                 Storage layer (storage/)                   │
//! │        DiskManager over the data and log files             │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every page is a fixed-size block of one of two logical files (main
//! data store or write-ahead log). The pool keeps at most one buffer per
//! `(position, origin)`, enforces single-writer/multiple-reader access
//! per page through a tagged share state, and recycles unshared buffers
//! under memory pressure without ever reclaiming a page someone holds.
//!
//! # Modules
//! - [`common`] - shared primitives (addresses, config, errors)
//! - [`buffer`] - buffer pool, page buffers, guards, statistics
//! - [`storage`] - backing-file I/O and the page byte accessor
//!
//! # Quick start
//! ```no_run
//! use foliodb::{BufferPool, DiskManager, FileOrigin, PagePosition, PoolConfig};
//!
//! let disk = DiskManager::open("my.db", "my.log").unwrap();
//! let pool = BufferPool::new(disk, PoolConfig::default());
//!
//! // Allocate a page, place it, write through the typed accessor
//! let mut page = pool.new_page(FileOrigin::Data);
//! page.set_page_id(1);
//! page.set_position(PagePosition::new(0));
//! drop(page);
//!
//! pool.flush(FileOrigin::Data).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{PoolConfig, PAGE_SIZE};
pub use common::{Error, FileOrigin, PageAddress, PagePosition, Result};

pub use buffer::{
    AccessMode, BufferPool, ExclusivePage, PageBuffer, PoolStats, ShareState, SharedPage,
    StatsSnapshot,
};
pub use storage::{DiskManager, PageData, PageKind};
