//! Fixed-capacity LRU page cache shared by heap and B+Tree files.
//!
//! No pinning: the single-threaded contract means a page reference is valid
//! only until the next `get_page` call, which the borrow checker enforces
//! since `get_page` borrows `&mut self`.

use std::collections::HashMap;

use log::debug;

use crate::catalog::Catalog;
use crate::config::{DEFAULT_NUM_PAGES, PAGE_SIZE};
use crate::error::{Result, StorageError};
use crate::lru::LruList;
use crate::types::PageId;

struct Frame {
    bytes: Box<[u8; PAGE_SIZE]>,
    dirty: bool,
}

pub struct BufferPool {
    capacity: usize,
    frames: HashMap<PageId, Frame>,
    lru: LruList<PageId>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_NUM_PAGES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            frames: HashMap::new(),
            lru: LruList::new(),
        }
    }

    /// Returns a mutable reference to `pid`'s bytes, loading it via `catalog`
    /// on a miss and evicting the LRU frame first if the pool is full.
    pub fn get_page(&mut self, catalog: &mut Catalog, pid: PageId) -> Result<&mut [u8; PAGE_SIZE]> {
        if !self.frames.contains_key(&pid) {
            if self.frames.len() >= self.capacity {
                self.evict_one(catalog)?;
            }
            let mut bytes = Box::new([0u8; PAGE_SIZE]);
            catalog
                .block_file_mut(&pid.file)?
                .read_page(pid.page_index, &mut bytes)?;
            self.frames.insert(pid.clone(), Frame { bytes, dirty: false });
        }
        self.lru.touch(pid.clone());
        Ok(&mut self.frames.get_mut(&pid).unwrap().bytes)
    }

    pub fn mark_dirty(&mut self, pid: &PageId) {
        if let Some(frame) = self.frames.get_mut(pid) {
            frame.dirty = true;
        }
    }

    pub fn is_dirty(&self, pid: &PageId) -> Result<bool> {
        self.frames
            .get(pid)
            .map(|f| f.dirty)
            .ok_or_else(|| StorageError::NotResident(pid.clone()))
    }

    pub fn contains(&self, pid: &PageId) -> bool {
        self.frames.contains_key(pid)
    }

    /// Drops a resident frame without writing it back.
    pub fn discard(&mut self, pid: &PageId) {
        self.frames.remove(pid);
        self.lru.remove(pid);
    }

    pub fn flush(&mut self, catalog: &mut Catalog, pid: &PageId) -> Result<()> {
        if let Some(frame) = self.frames.get_mut(pid) {
            if frame.dirty {
                catalog
                    .block_file_mut(&pid.file)?
                    .write_page(pid.page_index, &frame.bytes)?;
                frame.dirty = false;
            }
        }
        Ok(())
    }

    /// Flushes every resident dirty frame belonging to `name`.
    pub fn flush_file(&mut self, catalog: &mut Catalog, name: &str) -> Result<()> {
        let pids: Vec<PageId> = self
            .frames
            .iter()
            .filter(|(pid, frame)| pid.file == name && frame.dirty)
            .map(|(pid, _)| pid.clone())
            .collect();
        for pid in pids {
            self.flush(catalog, &pid)?;
        }
        Ok(())
    }

    /// Flushes every resident dirty frame. Called by `Database::drop`.
    pub fn shutdown(&mut self, catalog: &mut Catalog) -> Result<()> {
        let pids: Vec<PageId> = self
            .frames
            .iter()
            .filter(|(_, frame)| frame.dirty)
            .map(|(pid, _)| pid.clone())
            .collect();
        debug!("shutting down buffer pool, flushing {} dirty frames", pids.len());
        for pid in pids {
            self.flush(catalog, &pid)?;
        }
        Ok(())
    }

    fn evict_one(&mut self, catalog: &mut Catalog) -> Result<()> {
        let victim = match self.lru.pop_lru() {
            Some(v) => v,
            None => return Ok(()),
        };
        if let Some(frame) = self.frames.remove(&victim) {
            if frame.dirty {
                let bf = catalog
                    .block_file_mut(&victim.file)
                    .map_err(|_| StorageError::CatalogMissing(victim.clone()))?;
                bf.write_page(victim.page_index, &frame.bytes)?;
            }
        }
        debug!("evicted {}", victim);
        Ok(())
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, TupleDesc};
    use tempfile::NamedTempFile;

    fn schema() -> TupleDesc {
        TupleDesc::new(vec![FieldKind::Int], vec!["id".into()]).unwrap()
    }

    #[test]
    fn evicts_at_most_m_minus_n() {
        let mut catalog = Catalog::new();
        let mut files = Vec::new();
        for _ in 0..5 {
            let tmp = NamedTempFile::new().unwrap();
            let path = tmp.path().to_str().unwrap().to_string();
            catalog.add_heap(&path, schema()).unwrap();
            files.push((tmp, path));
        }
        // give each file 2 pages so we can reference 10 distinct pages total
        for (_, path) in &files {
            catalog.heap_meta_mut(path).unwrap().block_file.allocate_page().unwrap();
        }

        let mut pool = BufferPool::with_capacity(3);
        let mut evictions = 0usize;
        for (_, path) in &files {
            for page in 0..2u32 {
                let before = pool_len(&pool);
                pool.get_page(&mut catalog, PageId::new(path.clone(), page)).unwrap();
                if pool_len(&pool) <= before {
                    evictions += 1;
                }
            }
        }
        // 10 unique pages, capacity 3: at most 10 - 3 = 7 evictions
        assert!(evictions <= 7);
    }

    fn pool_len(pool: &BufferPool) -> usize {
        pool.frames.len()
    }

    #[test]
    fn dirty_roundtrips_through_flush() {
        let mut catalog = Catalog::new();
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap().to_string();
        catalog.add_heap(&path, schema()).unwrap();

        let mut pool = BufferPool::with_capacity(2);
        let pid = PageId::new(path.clone(), 0);
        {
            let page = pool.get_page(&mut catalog, pid.clone()).unwrap();
            page[0] = 0x42;
        }
        pool.mark_dirty(&pid);
        assert!(pool.is_dirty(&pid).unwrap());
        pool.flush(&mut catalog, &pid).unwrap();
        assert!(!pool.is_dirty(&pid).unwrap());

        pool.discard(&pid);
        let page = pool.get_page(&mut catalog, pid).unwrap();
        assert_eq!(page[0], 0x42);
    }

    #[test]
    fn is_dirty_fails_when_not_resident() {
        let pool = BufferPool::with_capacity(2);
        let pid = PageId::new("nope".to_string(), 0);
        assert!(pool.is_dirty(&pid).is_err());
    }
}
