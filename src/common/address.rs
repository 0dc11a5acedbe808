//! Page identity types: file origin, file position, and their pairing.

use std::fmt;

use crate::common::config::{PAGE_SIZE, POSITION_UNDEFINED};

/// Which backing file a page belongs to.
///
/// The storage engine keeps two logical files: the main data store and
/// the write-ahead log. `None` is the identity of a recycled or
/// never-assigned buffer and never appears in the pool's active index.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOrigin {
    /// Buffer is not bound to any file.
    #[default]
    None,
    /// Main data store file.
    Data,
    /// Write-ahead log file.
    Log,
}

impl fmt::Display for FileOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOrigin::None => write!(f, "none"),
            FileOrigin::Data => write!(f, "data"),
            FileOrigin::Log => write!(f, "log"),
        }
    }
}

/// Byte offset of a page within a backing file.
///
/// Always a multiple of [`PAGE_SIZE`] once defined. A freshly allocated
/// page holds the `UNDEFINED` sentinel until the caller assigns a real
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PagePosition(u64);

impl PagePosition {
    /// Position of a page that has not been placed in a file yet.
    pub const UNDEFINED: PagePosition = PagePosition(POSITION_UNDEFINED);

    /// Create a position from a byte offset.
    ///
    /// # Panics
    /// Panics if the offset is not aligned to [`PAGE_SIZE`]. Alignment
    /// mistakes are offset-arithmetic bugs in the caller, not runtime
    /// conditions.
    #[inline]
    pub fn new(offset: u64) -> Self {
        assert!(
            offset % PAGE_SIZE as u64 == 0,
            "page position {offset} is not aligned to the page size"
        );
        PagePosition(offset)
    }

    /// Position of the `n`th page in a file.
    ///
    /// # Panics
    /// Panics if the resulting byte offset overflows `u64`.
    #[inline]
    pub fn from_page_number(n: u64) -> Self {
        let offset = n
            .checked_mul(PAGE_SIZE as u64)
            .expect("page number overflows the file offset space");
        PagePosition(offset)
    }

    /// Byte offset within the backing file.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.0
    }

    /// Whether this position has been assigned.
    #[inline]
    pub fn is_defined(&self) -> bool {
        *self != Self::UNDEFINED
    }
}

impl fmt::Display for PagePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_defined() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "<undefined>")
        }
    }
}

/// The pool-wide identity of an active page: where it lives and in which
/// file. At most one buffer per address exists in the active index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageAddress {
    pub position: PagePosition,
    pub origin: FileOrigin,
}

impl PageAddress {
    /// Identity of a buffer on the free list.
    pub const UNBOUND: PageAddress = PageAddress {
        position: PagePosition::UNDEFINED,
        origin: FileOrigin::None,
    };

    #[inline]
    pub fn new(position: PagePosition, origin: FileOrigin) -> Self {
        PageAddress { position, origin }
    }

    /// Whether both position and origin are assigned.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.position.is_defined() && self.origin != FileOrigin::None
    }
}

impl fmt::Display for PageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.position, self.origin)
    }
}
