//! Page content: the fixed-size byte window and its typed accessor.
//!
//! [`PageData`] is the raw 8KB region a page buffer manages. All reads
//! and writes go through bounds-checked typed accessors; an access past
//! the end of the page is an offset-arithmetic bug in the caller and
//! panics rather than returning an error.
//!
//! Only two content offsets are meaningful to this layer:
//! - bytes 0–3: page identifier (u32, little-endian)
//! - byte 4: page type tag ([`PageKind`])
//!
//! The rest of the layout belongs to higher layers.

use std::fmt;

use crate::common::config::PAGE_SIZE;

/// Tag stored at byte 4 of every page, identifying its role to the
/// layers above the buffer pool.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Unused or freshly zeroed page.
    #[default]
    Empty = 0,
    /// Database header page.
    Header = 1,
    /// Collection metadata page.
    Collection = 2,
    /// Index node page.
    Index = 3,
    /// Document data page.
    Data = 4,
}

impl PageKind {
    /// Convert from the raw tag byte, mapping unknown values to `Empty`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageKind::Header,
            2 => PageKind::Collection,
            3 => PageKind::Index,
            4 => PageKind::Data,
            _ => PageKind::Empty,
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::Empty => write!(f, "empty"),
            PageKind::Header => write!(f, "header"),
            PageKind::Collection => write!(f, "collection"),
            PageKind::Index => write!(f, "index"),
            PageKind::Data => write!(f, "data"),
        }
    }
}

/// A page of content (8KB).
///
/// This is the fundamental unit of I/O between the backing files and
/// memory. Page buffers hold exactly one `PageData` each; the buffer
/// pool arbitrates who may touch it.
///
/// All multi-byte values are little-endian.
pub struct PageData {
    bytes: [u8; PAGE_SIZE],
}

/// Offset of the page identifier within a page.
const OFFSET_PAGE_ID: usize = 0;
/// Offset of the page type tag within a page.
const OFFSET_PAGE_KIND: usize = 4;

impl PageData {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            bytes: [0u8; PAGE_SIZE],
        }
    }

    /// Size of a page in bytes.
    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }

    /// Whole page as an immutable byte slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Whole page as a mutable byte slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.bytes.fill(0);
    }

    #[inline]
    fn check_range(offset: usize, len: usize) {
        assert!(
            offset + len <= PAGE_SIZE,
            "page access out of range: offset {offset} + {len} exceeds page size {PAGE_SIZE}"
        );
    }

    // ========================================================================
    // Typed reads
    // ========================================================================

    /// Read `len` bytes starting at `offset`.
    #[inline]
    pub fn read_bytes(&self, offset: usize, len: usize) -> &[u8] {
        Self::check_range(offset, len);
        &self.bytes[offset..offset + len]
    }

    #[inline]
    pub fn read_u8(&self, offset: usize) -> u8 {
        Self::check_range(offset, 1);
        self.bytes[offset]
    }

    #[inline]
    pub fn read_u16(&self, offset: usize) -> u16 {
        Self::check_range(offset, 2);
        u16::from_le_bytes(self.bytes[offset..offset + 2].try_into().unwrap())
    }

    #[inline]
    pub fn read_u32(&self, offset: usize) -> u32 {
        Self::check_range(offset, 4);
        u32::from_le_bytes(self.bytes[offset..offset + 4].try_into().unwrap())
    }

    #[inline]
    pub fn read_u64(&self, offset: usize) -> u64 {
        Self::check_range(offset, 8);
        u64::from_le_bytes(self.bytes[offset..offset + 8].try_into().unwrap())
    }

    #[inline]
    pub fn read_i64(&self, offset: usize) -> i64 {
        Self::check_range(offset, 8);
        i64::from_le_bytes(self.bytes[offset..offset + 8].try_into().unwrap())
    }

    // ========================================================================
    // Typed writes
    // ========================================================================

    /// Write `src` starting at `offset`.
    #[inline]
    pub fn write_bytes(&mut self, offset: usize, src: &[u8]) {
        Self::check_range(offset, src.len());
        self.bytes[offset..offset + src.len()].copy_from_slice(src);
    }

    #[inline]
    pub fn write_u8(&mut self, offset: usize, value: u8) {
        Self::check_range(offset, 1);
        self.bytes[offset] = value;
    }

    #[inline]
    pub fn write_u16(&mut self, offset: usize, value: u16) {
        self.write_bytes(offset, &value.to_le_bytes());
    }

    #[inline]
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.write_bytes(offset, &value.to_le_bytes());
    }

    #[inline]
    pub fn write_u64(&mut self, offset: usize, value: u64) {
        self.write_bytes(offset, &value.to_le_bytes());
    }

    #[inline]
    pub fn write_i64(&mut self, offset: usize, value: i64) {
        self.write_bytes(offset, &value.to_le_bytes());
    }

    // ========================================================================
    // Fixed-layout fields
    // ========================================================================

    /// Page identifier stored at bytes 0–3.
    #[inline]
    pub fn page_id(&self) -> u32 {
        self.read_u32(OFFSET_PAGE_ID)
    }

    #[inline]
    pub fn set_page_id(&mut self, id: u32) {
        self.write_u32(OFFSET_PAGE_ID, id);
    }

    /// Page type tag stored at byte 4.
    #[inline]
    pub fn page_kind(&self) -> PageKind {
        PageKind::from_u8(self.read_u8(OFFSET_PAGE_KIND))
    }

    #[inline]
    pub fn set_page_kind(&mut self, kind: PageKind) {
        self.write_u8(OFFSET_PAGE_KIND, kind as u8);
    }
}

impl Default for PageData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_data_new_is_zeroed() {
        let page = PageData::new();
        assert_eq!(page.as_slice()[0], 0);
        assert_eq!(page.as_slice()[PAGE_SIZE - 1], 0);
        assert_eq!(page.page_id(), 0);
        assert_eq!(page.page_kind(), PageKind::Empty);
    }

    #[test]
    fn test_typed_roundtrip() {
        let mut page = PageData::new();

        page.write_u8(100, 0xAB);
        page.write_u16(101, 0xBEEF);
        page.write_u32(200, 0xDEADBEEF);
        page.write_u64(300, 0x0123_4567_89AB_CDEF);
        page.write_i64(400, -42);

        assert_eq!(page.read_u8(100), 0xAB);
        assert_eq!(page.read_u16(101), 0xBEEF);
        assert_eq!(page.read_u32(200), 0xDEADBEEF);
        assert_eq!(page.read_u64(300), 0x0123_4567_89AB_CDEF);
        assert_eq!(page.read_i64(400), -42);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut page = PageData::new();
        page.write_u32(0, 0x04030201);

        assert_eq!(page.as_slice()[0], 0x01);
        assert_eq!(page.as_slice()[1], 0x02);
        assert_eq!(page.as_slice()[2], 0x03);
        assert_eq!(page.as_slice()[3], 0x04);
    }

    #[test]
    fn test_write_at_last_byte() {
        let mut page = PageData::new();
        page.write_u8(PAGE_SIZE - 1, 0xFF);
        assert_eq!(page.read_u8(PAGE_SIZE - 1), 0xFF);
    }

    #[test]
    #[should_panic(expected = "page access out of range")]
    fn test_read_past_end_panics() {
        let page = PageData::new();
        let _ = page.read_u32(PAGE_SIZE - 3);
    }

    #[test]
    #[should_panic(expected = "page access out of range")]
    fn test_write_past_end_panics() {
        let mut page = PageData::new();
        page.write_u64(PAGE_SIZE - 7, 1);
    }

    #[test]
    fn test_header_fields() {
        let mut page = PageData::new();
        page.set_page_id(77);
        page.set_page_kind(PageKind::Collection);

        assert_eq!(page.page_id(), 77);
        assert_eq!(page.page_kind(), PageKind::Collection);
        // Fixed layout: id at 0, tag at 4
        assert_eq!(page.as_slice()[0], 77);
        assert_eq!(page.as_slice()[4], 2);
    }

    #[test]
    fn test_page_kind_from_u8() {
        assert_eq!(PageKind::from_u8(0), PageKind::Empty);
        assert_eq!(PageKind::from_u8(1), PageKind::Header);
        assert_eq!(PageKind::from_u8(2), PageKind::Collection);
        assert_eq!(PageKind::from_u8(3), PageKind::Index);
        assert_eq!(PageKind::from_u8(4), PageKind::Data);
        assert_eq!(PageKind::from_u8(255), PageKind::Empty);
    }

    #[test]
    fn test_reset() {
        let mut page = PageData::new();
        page.write_bytes(500, b"hello");
        page.reset();
        assert_eq!(page.read_bytes(500, 5), &[0, 0, 0, 0, 0]);
    }
}
