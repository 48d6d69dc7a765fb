//! Slotted heap page: an MSB-first bitmap directory over fixed-width rows.

use crate::config::PAGE_SIZE;
use crate::error::{Result, StorageError};
use crate::schema::{Tuple, TupleDesc};

/// Largest `c` such that `c * (row_width*8) + c <= PAGE_SIZE*8`; the `+1`
/// per row reserves one header bit.
pub fn capacity(schema: &TupleDesc) -> usize {
    (PAGE_SIZE * 8) / (schema.row_width() * 8 + 1)
}

fn header_len(cap: usize) -> usize {
    (cap + 7) / 8
}

fn row_area_start(schema: &TupleDesc, cap: usize) -> usize {
    PAGE_SIZE - cap * schema.row_width()
}

/// A typed, borrowing view over one heap page's raw bytes.
pub struct HeapPageView<'a> {
    schema: &'a TupleDesc,
    buf: &'a mut [u8; PAGE_SIZE],
    capacity: usize,
    row_area_start: usize,
}

impl<'a> HeapPageView<'a> {
    pub fn new(schema: &'a TupleDesc, buf: &'a mut [u8; PAGE_SIZE]) -> Self {
        let capacity = capacity(schema);
        let row_area_start = row_area_start(schema, capacity);
        Self {
            schema,
            buf,
            capacity,
            row_area_start,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        let byte = self.buf[slot / 8];
        let bit = 7 - (slot % 8);
        (byte >> bit) & 1 == 1
    }

    fn set_slot(&mut self, slot: usize, used: bool) {
        let byte = &mut self.buf[slot / 8];
        let bit = 7 - (slot % 8);
        if used {
            *byte |= 1 << bit;
        } else {
            *byte &= !(1 << bit);
        }
    }

    fn row_bytes(&mut self, slot: usize) -> &mut [u8] {
        let width = self.schema.row_width();
        let start = self.row_area_start + slot * width;
        &mut self.buf[start..start + width]
    }

    /// Inserts at the first free slot, scanning left to right. Returns the
    /// slot used, or `None` if the page is full.
    pub fn insert(&mut self, tuple: &Tuple) -> Result<Option<usize>> {
        if !self.schema.is_compatible(tuple) {
            return Err(StorageError::SchemaMismatch(
                "tuple does not match heap page schema".into(),
            ));
        }
        for slot in 0..self.capacity {
            if !self.is_slot_used(slot) {
                self.schema.serialize(tuple, self.row_bytes(slot))?;
                self.set_slot(slot, true);
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    pub fn delete(&mut self, slot: usize) -> Result<()> {
        self.check_slot(slot)?;
        let width = self.schema.row_width();
        self.row_bytes(slot).iter_mut().for_each(|b| *b = 0);
        self.set_slot(slot, false);
        Ok(())
    }

    pub fn get(&mut self, slot: usize) -> Result<Tuple> {
        self.check_slot(slot)?;
        let row = self.row_bytes(slot);
        Ok(self.schema.deserialize(row))
    }

    fn check_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.capacity || !self.is_slot_used(slot) {
            return Err(StorageError::BadSlot {
                slot,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn end(&self) -> usize {
        self.capacity
    }

    pub fn begin(&self) -> usize {
        self.next_from(0)
    }

    /// Advances from `slot` (inclusive) to the next occupied slot, or `end()`.
    pub fn next_from(&self, slot: usize) -> usize {
        let mut s = slot;
        while s < self.capacity {
            if self.is_slot_used(s) {
                return s;
            }
            s += 1;
        }
        self.capacity
    }

    pub fn next(&self, slot: usize) -> usize {
        self.next_from(slot + 1)
    }
}
