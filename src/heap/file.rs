//! Heap file operations: append-on-last-page insertion, full-file iteration.
//!
//! Expressed as free functions over `(&mut BufferPool, &mut Catalog, name)`
//! rather than methods on a struct borrowed out of the catalog, so that
//! looking up a file's metadata and asking the buffer pool for one of its
//! pages never requires two live borrows of the catalog at once.

use log::debug;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::heap::page::HeapPageView;
use crate::schema::{Tuple, TupleDesc};
use crate::types::PageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapRecordId {
    pub page: u32,
    pub slot: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapIter {
    pub page: u32,
    pub slot: usize,
}

pub fn insert(
    pool: &mut BufferPool,
    catalog: &mut Catalog,
    name: &str,
    tuple: &Tuple,
) -> Result<HeapRecordId> {
    loop {
        let last_page = catalog.heap_meta(name)?.last_page;
        let schema = catalog.heap_meta(name)?.schema.clone();
        let pid = PageId::new(name, last_page);

        let slot = {
            let buf = pool.get_page(catalog, pid.clone())?;
            let mut view = HeapPageView::new(&schema, buf);
            view.insert(tuple)?
        };

        match slot {
            Some(slot) => {
                pool.mark_dirty(&pid);
                return Ok(HeapRecordId {
                    page: last_page,
                    slot,
                });
            }
            None => {
                let new_idx = catalog.block_file_mut(name)?.allocate_page()?;
                catalog.heap_meta_mut(name)?.last_page = new_idx;
                debug!("heap file '{}' grew to page {}", name, new_idx);
            }
        }
    }
}

pub fn delete(pool: &mut BufferPool, catalog: &mut Catalog, name: &str, rid: HeapRecordId) -> Result<()> {
    let schema = catalog.heap_meta(name)?.schema.clone();
    let pid = PageId::new(name, rid.page);
    let buf = pool.get_page(catalog, pid.clone())?;
    let mut view = HeapPageView::new(&schema, buf);
    view.delete(rid.slot)?;
    pool.mark_dirty(&pid);
    Ok(())
}

pub fn get(pool: &mut BufferPool, catalog: &mut Catalog, name: &str, rid: HeapRecordId) -> Result<Tuple> {
    let schema = catalog.heap_meta(name)?.schema.clone();
    let pid = PageId::new(name, rid.page);
    let buf = pool.get_page(catalog, pid)?;
    let mut view = HeapPageView::new(&schema, buf);
    view.get(rid.slot)
}

pub fn begin(pool: &mut BufferPool, catalog: &mut Catalog, name: &str) -> Result<HeapIter> {
    let schema = catalog.heap_meta(name)?.schema.clone();
    let num_pages = catalog.get(name)?.block_file().num_pages();
    let (page, slot) = scan_for_next(pool, catalog, name, &schema, 0, 0, num_pages)?;
    Ok(HeapIter { page, slot })
}

pub fn end(catalog: &mut Catalog, name: &str) -> Result<HeapIter> {
    let num_pages = catalog.get(name)?.block_file().num_pages();
    Ok(HeapIter { page: num_pages, slot: 0 })
}

pub fn advance(pool: &mut BufferPool, catalog: &mut Catalog, name: &str, it: HeapIter) -> Result<HeapIter> {
    let schema = catalog.heap_meta(name)?.schema.clone();
    let num_pages = catalog.get(name)?.block_file().num_pages();
    let (page, slot) = scan_for_next(pool, catalog, name, &schema, it.page, it.slot + 1, num_pages)?;
    Ok(HeapIter { page, slot })
}

fn scan_for_next(
    pool: &mut BufferPool,
    catalog: &mut Catalog,
    name: &str,
    schema: &TupleDesc,
    start_page: u32,
    start_slot: usize,
    num_pages: u32,
) -> Result<(u32, usize)> {
    let mut page = start_page;
    let mut slot_start = start_slot;
    while page < num_pages {
        let pid = PageId::new(name, page);
        let buf = pool.get_page(catalog, pid)?;
        let view = HeapPageView::new(schema, buf);
        let found = view.next_from(slot_start);
        if found != view.end() {
            return Ok((page, found));
        }
        page += 1;
        slot_start = 0;
    }
    Ok((num_pages, 0))
}
