//! Storage layer - backing-file I/O and page content.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - page I/O over the data and log files
//! - [`page_data`] - the fixed-size byte window and typed accessor

mod disk_manager;
pub mod page_data;

pub use disk_manager::DiskManager;
pub use page_data::{PageData, PageKind};
