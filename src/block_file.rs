//! Positional page I/O against a single named backing file.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::config::PAGE_SIZE;
use crate::error::{Result, StorageError};

/// A single backing file, read and written one fixed-size page at a time.
///
/// Tracks `num_pages` (derived from file length) and keeps an observable
/// read/write log of every page index touched, so tests can bound I/O.
pub struct BlockFile {
    file: std::fs::File,
    num_pages: u32,
    reads: Vec<u32>,
    writes: Vec<u32>,
}

impl BlockFile {
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let len = file.metadata()?.len();
        let num_pages = if len == 0 {
            file.set_len(PAGE_SIZE as u64)?;
            1
        } else if len % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::CorruptFile(format!(
                "file size {} is not a multiple of {}",
                len, PAGE_SIZE
            )));
        } else {
            (len / PAGE_SIZE as u64) as u32
        };

        Ok(Self {
            file,
            num_pages,
            reads: Vec::new(),
            writes: Vec::new(),
        })
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    pub fn reads(&self) -> &[u32] {
        &self.reads
    }

    pub fn writes(&self) -> &[u32] {
        &self.writes
    }

    pub fn read_page(&mut self, idx: u32, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        debug!("read_page {}", idx);
        self.file.seek(SeekFrom::Start(idx as u64 * PAGE_SIZE as u64))?;
        self.file.read_exact(buf)?;
        self.reads.push(idx);
        Ok(())
    }

    pub fn write_page(&mut self, idx: u32, buf: &[u8; PAGE_SIZE]) -> Result<()> {
        debug!("write_page {}", idx);
        self.file.seek(SeekFrom::Start(idx as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(buf)?;
        self.writes.push(idx);
        if idx >= self.num_pages {
            self.num_pages = idx + 1;
        }
        Ok(())
    }

    /// Appends one zeroed page and returns its index.
    pub fn allocate_page(&mut self) -> Result<u32> {
        let idx = self.num_pages;
        self.write_page(idx, &[0u8; PAGE_SIZE])?;
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn fresh_file_has_one_page() {
        let tmp = NamedTempFile::new().unwrap();
        let bf = BlockFile::open_or_create(tmp.path()).unwrap();
        assert_eq!(bf.num_pages(), 1);
    }

    #[test]
    fn round_trip_page() {
        let tmp = NamedTempFile::new().unwrap();
        let mut bf = BlockFile::open_or_create(tmp.path()).unwrap();
        let mut page = [0u8; PAGE_SIZE];
        page[0] = 0xAB;
        bf.write_page(0, &page).unwrap();

        let mut back = [0u8; PAGE_SIZE];
        bf.read_page(0, &mut back).unwrap();
        assert_eq!(back[0], 0xAB);
        assert_eq!(bf.reads(), &[0]);
        assert_eq!(bf.writes(), &[0]);
    }

    #[test]
    fn allocate_page_grows_num_pages() {
        let tmp = NamedTempFile::new().unwrap();
        let mut bf = BlockFile::open_or_create(tmp.path()).unwrap();
        assert_eq!(bf.allocate_page().unwrap(), 1);
        assert_eq!(bf.num_pages(), 2);
    }

    #[test]
    fn rejects_non_page_multiple_size() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let f = std::fs::OpenOptions::new()
                .write(true)
                .open(tmp.path())
                .unwrap();
            f.set_len(100).unwrap();
        }
        assert!(BlockFile::open_or_create(tmp.path()).is_err());
    }
}
