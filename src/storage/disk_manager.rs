//! Disk manager: low-level page I/O over the two backing files.
//!
//! The [`DiskManager`] owns the main data store file and the write-ahead
//! log file and moves whole pages between them and memory. It knows
//! nothing about caching or sharing; the buffer pool layers that on top.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, FileOrigin, PageAddress, Result};
use crate::storage::page_data::PageData;

/// One backing file plus its tracked length.
///
/// Length is kept in memory so reads can be bounds-checked without a
/// `stat` per call. `write_page` may extend the file; the length only
/// grows.
struct FileChannel {
    file: File,
    len: u64,
}

impl FileChannel {
    fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

/// Manages page I/O for a single database: one data file, one log file.
///
/// # File layout
/// Both files are arrays of [`PAGE_SIZE`] pages; a page's position is its
/// byte offset and is always a multiple of the page size:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Page    │ Page    │ Page    │  ...    │
/// │ @0      │ @8192   │ @16384  │         │
/// └─────────┴─────────┴─────────┴─────────┘
/// ```
///
/// # Thread safety
/// Each file sits behind its own mutex, so data-file and log-file I/O
/// can proceed concurrently while access to a single file is serialized.
///
/// # Durability
/// `write_page` does not fsync; callers batch writes and call
/// [`sync`](DiskManager::sync) once per flush. Individual page writes are
/// not assumed atomic across a crash.
pub struct DiskManager {
    data: Mutex<FileChannel>,
    log: Mutex<FileChannel>,
    /// Test-only switch that makes every `write_page` fail, for
    /// exercising write-back error paths.
    #[cfg(test)]
    fail_writes: std::sync::atomic::AtomicBool,
}

impl DiskManager {
    /// Open a database's backing files, creating them when missing.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(data_path: P, log_path: Q) -> Result<Self> {
        Ok(Self {
            data: Mutex::new(FileChannel::open(data_path.as_ref())?),
            log: Mutex::new(FileChannel::open(log_path.as_ref())?),
            #[cfg(test)]
            fail_writes: std::sync::atomic::AtomicBool::new(false),
        })
    }

    #[cfg(test)]
    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::Relaxed);
    }

    fn channel(&self, origin: FileOrigin) -> &Mutex<FileChannel> {
        match origin {
            FileOrigin::Data => &self.data,
            FileOrigin::Log => &self.log,
            // An unbound buffer has no file to talk to; reaching here is
            // a caller bug, not an I/O condition.
            FileOrigin::None => panic!("no backing file for origin 'none'"),
        }
    }

    /// Read the page at `address` into `page`.
    ///
    /// # Errors
    /// `Error::PageNotFound` when the position lies past the end of the
    /// file; `Error::Io` on a medium error.
    pub fn read_page(&self, address: PageAddress, page: &mut PageData) -> Result<()> {
        assert!(address.is_bound(), "read_page on unbound address");

        let mut ch = self.channel(address.origin).lock();
        let offset = address.position.offset();

        if offset + PAGE_SIZE as u64 > ch.len {
            return Err(Error::PageNotFound(address));
        }

        ch.file.seek(SeekFrom::Start(offset))?;
        ch.file.read_exact(page.as_mut_slice())?;

        Ok(())
    }

    /// Write `page` to `address`, extending the file when the position
    /// lies at or past its current end.
    pub fn write_page(&self, address: PageAddress, page: &PageData) -> Result<()> {
        assert!(address.is_bound(), "write_page on unbound address");

        #[cfg(test)]
        if self.fail_writes.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "write failure requested by test",
            )));
        }

        let mut ch = self.channel(address.origin).lock();
        let offset = address.position.offset();

        ch.file.seek(SeekFrom::Start(offset))?;
        ch.file.write_all(page.as_slice())?;
        ch.len = ch.len.max(offset + PAGE_SIZE as u64);

        Ok(())
    }

    /// fsync one backing file.
    pub fn sync(&self, origin: FileOrigin) -> Result<()> {
        let ch = self.channel(origin).lock();
        ch.file.sync_all()?;
        Ok(())
    }

    /// Number of whole pages currently in a backing file.
    pub fn page_count(&self, origin: FileOrigin) -> u64 {
        self.channel(origin).lock().len / PAGE_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PagePosition;
    use tempfile::tempdir;

    fn create_dm() -> (DiskManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::open(dir.path().join("test.db"), dir.path().join("test.log")).unwrap();
        (dm, dir)
    }

    fn addr(n: u64, origin: FileOrigin) -> PageAddress {
        PageAddress::new(PagePosition::from_page_number(n), origin)
    }

    #[test]
    fn test_open_creates_empty_files() {
        let (dm, _dir) = create_dm();
        assert_eq!(dm.page_count(FileOrigin::Data), 0);
        assert_eq!(dm.page_count(FileOrigin::Log), 0);
    }

    #[test]
    fn test_write_and_read_page() {
        let (dm, _dir) = create_dm();

        let mut page = PageData::new();
        page.set_page_id(7);
        page.write_bytes(100, b"document");

        dm.write_page(addr(0, FileOrigin::Data), &page).unwrap();

        let mut read_back = PageData::new();
        dm.read_page(addr(0, FileOrigin::Data), &mut read_back).unwrap();
        assert_eq!(read_back.page_id(), 7);
        assert_eq!(read_back.read_bytes(100, 8), b"document");
    }

    #[test]
    fn test_read_past_end_fails() {
        let (dm, _dir) = create_dm();

        let mut page = PageData::new();
        let result = dm.read_page(addr(3, FileOrigin::Data), &mut page);
        assert!(matches!(result, Err(Error::PageNotFound(_))));
    }

    #[test]
    fn test_origins_are_separate_files() {
        let (dm, _dir) = create_dm();

        let mut data_page = PageData::new();
        data_page.set_page_id(1);
        let mut log_page = PageData::new();
        log_page.set_page_id(2);

        dm.write_page(addr(0, FileOrigin::Data), &data_page).unwrap();
        dm.write_page(addr(0, FileOrigin::Log), &log_page).unwrap();

        let mut page = PageData::new();
        dm.read_page(addr(0, FileOrigin::Data), &mut page).unwrap();
        assert_eq!(page.page_id(), 1);
        dm.read_page(addr(0, FileOrigin::Log), &mut page).unwrap();
        assert_eq!(page.page_id(), 2);
    }

    #[test]
    fn test_write_extends_file() {
        let (dm, _dir) = create_dm();

        let page = PageData::new();
        dm.write_page(addr(4, FileOrigin::Data), &page).unwrap();
        assert_eq!(dm.page_count(FileOrigin::Data), 5);

        // Pages 0..4 exist as holes and read back zeroed
        let mut hole = PageData::new();
        dm.read_page(addr(1, FileOrigin::Data), &mut hole).unwrap();
        assert_eq!(hole.page_id(), 0);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let data_path = dir.path().join("test.db");
        let log_path = dir.path().join("test.log");

        {
            let dm = DiskManager::open(&data_path, &log_path).unwrap();
            let mut page = PageData::new();
            page.write_bytes(0, b"persistent!");
            dm.write_page(addr(0, FileOrigin::Data), &page).unwrap();
            dm.sync(FileOrigin::Data).unwrap();
        }

        {
            let dm = DiskManager::open(&data_path, &log_path).unwrap();
            assert_eq!(dm.page_count(FileOrigin::Data), 1);
            let mut page = PageData::new();
            dm.read_page(addr(0, FileOrigin::Data), &mut page).unwrap();
            assert_eq!(page.read_bytes(0, 11), b"persistent!");
        }
    }

    #[test]
    #[should_panic(expected = "unbound address")]
    fn test_origin_none_panics() {
        let (dm, _dir) = create_dm();
        let mut page = PageData::new();
        let _ = dm.read_page(
            PageAddress::new(PagePosition::new(0), FileOrigin::None),
            &mut page,
        );
    }
}
