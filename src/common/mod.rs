//! Common types and utilities shared across foliodb.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and pool tuning
//! - Error types
//! - Page identity (position, origin, address)

mod address;
pub mod config;
pub mod error;

pub use address::{FileOrigin, PageAddress, PagePosition};
pub use config::{PoolConfig, PAGE_SIZE};
pub use error::{Error, Result};
