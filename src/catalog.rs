//! Name-to-file ownership map. The buffer pool consults the catalog on
//! eviction to locate the block file backing a resident page.

use std::collections::HashMap;

use log::info;

use crate::block_file::BlockFile;
use crate::buffer_pool::BufferPool;
use crate::error::{Result, StorageError};
use crate::schema::TupleDesc;

pub struct HeapMeta {
    pub block_file: BlockFile,
    pub schema: TupleDesc,
    pub last_page: u32,
}

pub struct BTreeMeta {
    pub block_file: BlockFile,
    pub schema: TupleDesc,
    pub key_field: usize,
}

pub enum TableEntry {
    Heap(HeapMeta),
    BTree(BTreeMeta),
}

impl TableEntry {
    pub fn block_file(&self) -> &BlockFile {
        match self {
            TableEntry::Heap(m) => &m.block_file,
            TableEntry::BTree(m) => &m.block_file,
        }
    }

    pub fn block_file_mut(&mut self) -> &mut BlockFile {
        match self {
            TableEntry::Heap(m) => &mut m.block_file,
            TableEntry::BTree(m) => &mut m.block_file,
        }
    }

    pub fn schema(&self) -> &TupleDesc {
        match self {
            TableEntry::Heap(m) => &m.schema,
            TableEntry::BTree(m) => &m.schema,
        }
    }
}

#[derive(Default)]
pub struct Catalog {
    tables: HashMap<String, TableEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    pub fn add_heap(&mut self, name: &str, schema: TupleDesc) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(StorageError::NameExists(name.into()));
        }
        let block_file = BlockFile::open_or_create(name)?;
        let last_page = block_file.num_pages() - 1;
        self.tables.insert(
            name.into(),
            TableEntry::Heap(HeapMeta {
                block_file,
                schema,
                last_page,
            }),
        );
        info!("added heap file '{}'", name);
        Ok(())
    }

    pub fn add_btree(&mut self, name: &str, schema: TupleDesc, key_field: usize) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(StorageError::NameExists(name.into()));
        }
        let block_file = BlockFile::open_or_create(name)?;
        self.tables.insert(
            name.into(),
            TableEntry::BTree(BTreeMeta {
                block_file,
                schema,
                key_field,
            }),
        );
        info!("added btree file '{}'", name);
        Ok(())
    }

    /// Flushes the file's resident pages through `pool`, then removes and
    /// returns the entry.
    pub fn remove(&mut self, pool: &mut BufferPool, name: &str) -> Result<TableEntry> {
        pool.flush_file(self, name)?;
        self.tables
            .remove(name)
            .ok_or_else(|| StorageError::NoSuchFile(name.into()))
    }

    pub fn get(&self, name: &str) -> Result<&TableEntry> {
        self.tables
            .get(name)
            .ok_or_else(|| StorageError::NoSuchFile(name.into()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut TableEntry> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StorageError::NoSuchFile(name.into()))
    }

    pub fn block_file_mut(&mut self, name: &str) -> Result<&mut BlockFile> {
        Ok(self.get_mut(name)?.block_file_mut())
    }

    pub fn heap_meta(&self, name: &str) -> Result<&HeapMeta> {
        match self.get(name)? {
            TableEntry::Heap(m) => Ok(m),
            TableEntry::BTree(_) => Err(StorageError::InvariantViolation(format!(
                "'{}' is a B+Tree file, not a heap file",
                name
            ))),
        }
    }

    pub fn heap_meta_mut(&mut self, name: &str) -> Result<&mut HeapMeta> {
        match self.get_mut(name)? {
            TableEntry::Heap(m) => Ok(m),
            TableEntry::BTree(_) => Err(StorageError::InvariantViolation(format!(
                "'{}' is a B+Tree file, not a heap file",
                name
            ))),
        }
    }

    pub fn btree_meta(&self, name: &str) -> Result<&BTreeMeta> {
        match self.get(name)? {
            TableEntry::BTree(m) => Ok(m),
            TableEntry::Heap(_) => Err(StorageError::InvariantViolation(format!(
                "'{}' is a heap file, not a B+Tree file",
                name
            ))),
        }
    }
}
