//! B+Tree leaf page: packed, sorted rows plus a forward sibling link.
//!
//! Layout: `[u32 size, u32 next_leaf, row area]`. Unlike the heap page, this
//! is NOT a slotted-bitmap page: rows are kept contiguous and sorted by key,
//! matching the on-disk format chosen in SPEC_FULL.md rather than the
//! slotted layout used elsewhere in this codebase's B+Tree pages.

use std::convert::TryInto;

use crate::config::PAGE_SIZE;
use crate::error::Result;
use crate::schema::{Tuple, TupleDesc};

const HEADER_SIZE: usize = 8;

pub fn capacity(schema: &TupleDesc) -> usize {
    (PAGE_SIZE - HEADER_SIZE) / schema.row_width()
}

/// Outcome of attempting an upsert into a leaf page.
pub enum LeafInsertOutcome {
    /// The row was written in place; `now_full` tells the caller whether
    /// the page has just reached capacity and must be split before the
    /// next distinct-key insert.
    Inserted { now_full: bool },
    /// The page was already full and the key was not already present;
    /// nothing was written. The caller must split first.
    Full,
}

pub struct LeafPageView<'a> {
    schema: &'a TupleDesc,
    key_field: usize,
    buf: &'a mut [u8; PAGE_SIZE],
    capacity: usize,
}

impl<'a> LeafPageView<'a> {
    pub fn new(schema: &'a TupleDesc, key_field: usize, buf: &'a mut [u8; PAGE_SIZE]) -> Self {
        let capacity = capacity(schema);
        let mut view = Self {
            schema,
            key_field,
            buf,
            capacity,
        };
        // A freshly zeroed page (from block-file extension) has size == 0,
        // which is always <= capacity, so this only fires for genuinely
        // corrupt/uninitialized bytes.
        if view.raw_size() as usize > capacity {
            view.set_size(0);
            view.set_next_leaf(0);
        }
        view
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.raw_size() as usize
    }

    fn raw_size(&self) -> u32 {
        u32::from_ne_bytes(self.buf[0..4].try_into().unwrap())
    }

    fn set_size(&mut self, size: u32) {
        self.buf[0..4].copy_from_slice(&size.to_ne_bytes());
    }

    pub fn next_leaf(&self) -> u32 {
        u32::from_ne_bytes(self.buf[4..8].try_into().unwrap())
    }

    pub fn set_next_leaf(&mut self, next: u32) {
        self.buf[4..8].copy_from_slice(&next.to_ne_bytes());
    }

    fn row_start(&self, pos: usize) -> usize {
        HEADER_SIZE + pos * self.schema.row_width()
    }

    pub fn key_at(&self, pos: usize) -> i32 {
        let off = self.row_start(pos) + self.schema.offset(self.key_field);
        i32::from_ne_bytes(self.buf[off..off + 4].try_into().unwrap())
    }

    pub fn get(&self, pos: usize) -> Tuple {
        let width = self.schema.row_width();
        let start = self.row_start(pos);
        self.schema.deserialize(&self.buf[start..start + width])
    }

    fn write_row(&mut self, pos: usize, tuple: &Tuple) -> Result<()> {
        let width = self.schema.row_width();
        let start = self.row_start(pos);
        self.schema.serialize(tuple, &mut self.buf[start..start + width])
    }

    /// Appends `tuple` as the new last row without checking sort order;
    /// used when rebuilding a page from an already-sorted list during a
    /// file-level split.
    pub fn push_row(&mut self, tuple: &Tuple) -> Result<()> {
        let pos = self.size();
        self.write_row(pos, tuple)?;
        self.set_size((pos + 1) as u32);
        Ok(())
    }

    /// Empties the page's row count. Does not touch `next_leaf`.
    pub fn clear(&mut self) {
        self.set_size(0);
    }

    /// Upserts `tuple` in sorted position.
    pub fn insert(&mut self, tuple: &Tuple) -> Result<LeafInsertOutcome> {
        let k = tuple.key(self.key_field);
        let size = self.size();

        let mut lo = 0usize;
        let mut hi = size;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.key_at(mid) >= k {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        let pos = lo;

        if pos < size && self.key_at(pos) == k {
            self.write_row(pos, tuple)?;
            return Ok(LeafInsertOutcome::Inserted { now_full: size == self.capacity });
        }

        if size == self.capacity {
            return Ok(LeafInsertOutcome::Full);
        }

        for i in (pos..size).rev() {
            let width = self.schema.row_width();
            let (from, to) = (self.row_start(i), self.row_start(i + 1));
            self.buf.copy_within(from..from + width, to);
        }
        self.write_row(pos, tuple)?;
        self.set_size((size + 1) as u32);
        Ok(LeafInsertOutcome::Inserted { now_full: size + 1 == self.capacity })
    }

    /// Moves the right half of this page's rows into `new_page`, which must
    /// be freshly zeroed. Returns the separator key (the new page's first
    /// row's key). `new_page.next_leaf` is set to this page's current
    /// `next_leaf`; this page's own `next_leaf` is left for the caller to
    /// repoint at the new page.
    pub fn split(&mut self, new_page: &mut LeafPageView) -> Result<i32> {
        let n = self.size();
        let m = n / 2;
        let width = self.schema.row_width();

        for i in 0..(n - m) {
            let mut tmp = vec![0u8; width];
            let src = self.row_start(m + i);
            tmp.copy_from_slice(&self.buf[src..src + width]);
            let dst = new_page.row_start(i);
            new_page.buf[dst..dst + width].copy_from_slice(&tmp);
        }
        new_page.set_size((n - m) as u32);
        new_page.set_next_leaf(self.next_leaf());
        self.set_size(m as u32);
        Ok(new_page.key_at(0))
    }
}
