//! Error types for foliodb.
//!
//! Only *recoverable* conditions are represented here: I/O failures and
//! acquisition timeouts surface as [`Error`] values and unwind cleanly.
//! Protocol violations (double release, evict-while-shared, duplicate
//! page identity) and out-of-range page accesses indicate a bug in a
//! calling layer; those are asserted and abort the process rather than
//! being handed back as a value a caller could swallow.

use thiserror::Error;

use crate::common::address::PageAddress;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable errors surfaced by the buffer pool and disk layer.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a backing file read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page lies beyond the end of its backing file.
    #[error("page {0} not found in backing file")]
    PageNotFound(PageAddress),

    /// Waited longer than the configured timeout for page access.
    ///
    /// The caller's pool state is exactly as if the request was never
    /// made; retrying or aborting the transaction are both safe.
    #[error("timed out waiting for access to page {0}")]
    LockTimeout(PageAddress),
}
