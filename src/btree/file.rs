//! B+Tree file driver: root-at-page-0 invariant, insert with split
//! propagation, leaf-chain iteration.
//!
//! Like the heap file, these are free functions over
//! `(&mut BufferPool, &mut Catalog, name)` rather than methods on a struct
//! borrowed out of the catalog, see `crate::heap::file` for why. A second,
//! sharper constraint applies here: splitting a page requires reading one
//! page's contents and writing them into another, but the buffer pool never
//! lets two pages be borrowed at once (no pinning). So every split first
//! extracts the donor page's contents into an owned `Vec`, drops that
//! borrow, then fetches the recipient page in a separate call.

use log::{debug, info};

use crate::btree::index_page::IndexPageView;
use crate::btree::leaf_page::{LeafInsertOutcome, LeafPageView};
use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::error::{Result, StorageError};
use crate::schema::Tuple;
use crate::types::PageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeIter {
    pub page: u32,
    pub slot: usize,
}

pub fn insert(pool: &mut BufferPool, catalog: &mut Catalog, name: &str, tuple: &Tuple) -> Result<()> {
    let schema = catalog.btree_meta(name)?.schema.clone();
    let key_field = catalog.btree_meta(name)?.key_field;
    let root_pid = PageId::new(name, 0);

    let bootstrap = {
        let buf = pool.get_page(catalog, root_pid.clone())?;
        let view = IndexPageView::new(buf);
        view.size() == 0 && !view.children_are_index() && view.child(0) == 0
    };

    if bootstrap {
        let leaf_idx = catalog.block_file_mut(name)?.allocate_page()?;
        let leaf_pid = PageId::new(name, leaf_idx);
        {
            let buf = pool.get_page(catalog, leaf_pid.clone())?;
            let mut leaf = LeafPageView::new(&schema, key_field, buf);
            leaf.insert(tuple)?;
        }
        pool.mark_dirty(&leaf_pid);
        {
            let buf = pool.get_page(catalog, root_pid.clone())?;
            let mut root = IndexPageView::new(buf);
            root.set_child(0, leaf_idx);
            root.set_children_are_index(false);
        }
        pool.mark_dirty(&root_pid);
        info!("btree '{}' bootstrapped with leaf {}", name, leaf_idx);
        return Ok(());
    }

    let key = tuple.key(key_field);
    let (mut path, leaf_idx) = descend_to_leaf(pool, catalog, name, key)?;
    let leaf_pid = PageId::new(name, leaf_idx);

    let outcome = {
        let buf = pool.get_page(catalog, leaf_pid.clone())?;
        let mut leaf = LeafPageView::new(&schema, key_field, buf);
        leaf.insert(tuple)?
    };
    pool.mark_dirty(&leaf_pid);

    let (needs_split, extra) = match outcome {
        LeafInsertOutcome::Inserted { now_full } => (now_full, None),
        LeafInsertOutcome::Full => (true, Some(tuple.clone())),
    };
    if !needs_split {
        return Ok(());
    }

    let mut rows: Vec<Tuple> = {
        let buf = pool.get_page(catalog, leaf_pid.clone())?;
        let leaf = LeafPageView::new(&schema, key_field, buf);
        (0..leaf.size()).map(|i| leaf.get(i)).collect()
    };
    if let Some(extra) = extra {
        rows.push(extra);
    }
    rows.sort_by_key(|t| t.key(key_field));

    let old_next_leaf = {
        let buf = pool.get_page(catalog, leaf_pid.clone())?;
        let leaf = LeafPageView::new(&schema, key_field, buf);
        leaf.next_leaf()
    };

    let new_leaf_idx = catalog.block_file_mut(name)?.allocate_page()?;
    let new_leaf_pid = PageId::new(name, new_leaf_idx);
    let m = rows.len() / 2;

    {
        let buf = pool.get_page(catalog, leaf_pid.clone())?;
        let mut leaf = LeafPageView::new(&schema, key_field, buf);
        leaf.clear();
        for t in &rows[..m] {
            leaf.push_row(t)?;
        }
        leaf.set_next_leaf(new_leaf_idx);
    }
    pool.mark_dirty(&leaf_pid);

    let mut sep;
    {
        let buf = pool.get_page(catalog, new_leaf_pid.clone())?;
        let mut new_leaf = LeafPageView::new(&schema, key_field, buf);
        new_leaf.clear();
        for t in &rows[m..] {
            new_leaf.push_row(t)?;
        }
        new_leaf.set_next_leaf(old_next_leaf);
        sep = new_leaf.key_at(0);
    }
    pool.mark_dirty(&new_leaf_pid);
    debug!("leaf {} split, new leaf {}, separator {}", leaf_idx, new_leaf_idx, sep);

    let mut child = new_leaf_idx;

    loop {
        let parent_idx = match path.pop() {
            Some(idx) => idx,
            None => {
                root_split(pool, catalog, name, sep, child)?;
                return Ok(());
            }
        };
        let parent_pid = PageId::new(name, parent_idx);

        let parent_full = {
            let buf = pool.get_page(catalog, parent_pid.clone())?;
            let mut parent = IndexPageView::new(buf);
            parent.insert(sep, child)
        };
        pool.mark_dirty(&parent_pid);

        if !parent_full {
            return Ok(());
        }

        let (keys, children, children_are_index) = {
            let buf = pool.get_page(catalog, parent_pid.clone())?;
            let view = IndexPageView::new(buf);
            let (k, c) = view.keys_and_children();
            (k, c, view.children_are_index())
        };

        let n = keys.len();
        let mm = n / 2;
        let new_sep = keys[mm];
        let left_keys = &keys[..mm];
        let left_children = &children[..=mm];
        let right_keys = &keys[mm + 1..];
        let right_children = &children[mm + 1..];

        let new_parent_idx = catalog.block_file_mut(name)?.allocate_page()?;
        let new_parent_pid = PageId::new(name, new_parent_idx);
        {
            let buf = pool.get_page(catalog, new_parent_pid.clone())?;
            let mut new_parent = IndexPageView::new(buf);
            new_parent.write_all(right_keys, right_children, children_are_index);
        }
        pool.mark_dirty(&new_parent_pid);
        {
            let buf = pool.get_page(catalog, parent_pid.clone())?;
            let mut parent = IndexPageView::new(buf);
            parent.write_all(left_keys, left_children, children_are_index);
        }
        pool.mark_dirty(&parent_pid);
        debug!("index {} split, new index {}, separator {}", parent_idx, new_parent_idx, new_sep);

        sep = new_sep;
        child = new_parent_idx;
    }
}

/// Preserves I1 (page 0 is always the root): copies the root's current
/// contents into a fresh page, then overwrites the root with a new single
/// separator pointing at the copy and at the newly split-off sibling.
fn root_split(pool: &mut BufferPool, catalog: &mut Catalog, name: &str, sep: i32, right_child: u32) -> Result<()> {
    let root_pid = PageId::new(name, 0);

    let (old_keys, old_children, old_children_are_index) = {
        let buf = pool.get_page(catalog, root_pid.clone())?;
        let view = IndexPageView::new(buf);
        let (k, c) = view.keys_and_children();
        (k, c, view.children_are_index())
    };

    let left_idx = catalog.block_file_mut(name)?.allocate_page()?;
    let left_pid = PageId::new(name, left_idx);
    {
        let buf = pool.get_page(catalog, left_pid.clone())?;
        let mut left = IndexPageView::new(buf);
        left.write_all(&old_keys, &old_children, old_children_are_index);
    }
    pool.mark_dirty(&left_pid);

    {
        let buf = pool.get_page(catalog, root_pid.clone())?;
        let mut root = IndexPageView::new(buf);
        root.write_all(&[sep], &[left_idx, right_child], true);
    }
    pool.mark_dirty(&root_pid);
    info!("btree '{}' root split, preserved page 0, old root copied to {}", name, left_idx);
    Ok(())
}

/// Descends from the root, recording the ancestor index-page path
/// (root-first), and returns that path plus the leaf page index holding (or
/// that would hold) `key`.
fn descend_to_leaf(
    pool: &mut BufferPool,
    catalog: &mut Catalog,
    name: &str,
    key: i32,
) -> Result<(Vec<u32>, u32)> {
    let mut path = Vec::new();
    let mut cur = 0u32;
    loop {
        let (is_index, child) = {
            let buf = pool.get_page(catalog, PageId::new(name, cur))?;
            let view = IndexPageView::new(buf);
            let pos = view.child_for_key(key);
            (view.children_are_index(), view.child(pos))
        };
        path.push(cur);
        if !is_index {
            return Ok((path, child));
        }
        cur = child;
    }
}

pub fn get(pool: &mut BufferPool, catalog: &mut Catalog, name: &str, it: BTreeIter) -> Result<Tuple> {
    let schema = catalog.btree_meta(name)?.schema.clone();
    let key_field = catalog.btree_meta(name)?.key_field;
    let buf = pool.get_page(catalog, PageId::new(name, it.page))?;
    let leaf = LeafPageView::new(&schema, key_field, buf);
    Ok(leaf.get(it.slot))
}

/// Descends the leftmost spine from the root to the first leaf.
pub fn begin(pool: &mut BufferPool, catalog: &mut Catalog, name: &str) -> Result<BTreeIter> {
    let mut cur = 0u32;
    let leaf_idx = loop {
        let (is_index, child0) = {
            let buf = pool.get_page(catalog, PageId::new(name, cur))?;
            let view = IndexPageView::new(buf);
            (view.children_are_index(), view.child(0))
        };
        if !is_index {
            break child0;
        }
        cur = child0;
    };

    let empty = {
        let schema = catalog.btree_meta(name)?.schema.clone();
        let key_field = catalog.btree_meta(name)?.key_field;
        let buf = pool.get_page(catalog, PageId::new(name, leaf_idx))?;
        let leaf = LeafPageView::new(&schema, key_field, buf);
        leaf.size() == 0
    };
    if empty {
        return end(catalog, name);
    }
    Ok(BTreeIter { page: leaf_idx, slot: 0 })
}

pub fn end(catalog: &mut Catalog, name: &str) -> Result<BTreeIter> {
    let num_pages = catalog.get(name)?.block_file().num_pages();
    Ok(BTreeIter { page: num_pages, slot: 0 })
}

pub fn advance(pool: &mut BufferPool, catalog: &mut Catalog, name: &str, it: BTreeIter) -> Result<BTreeIter> {
    let schema = catalog.btree_meta(name)?.schema.clone();
    let key_field = catalog.btree_meta(name)?.key_field;

    let (next_leaf, size) = {
        let buf = pool.get_page(catalog, PageId::new(name, it.page))?;
        let leaf = LeafPageView::new(&schema, key_field, buf);
        (leaf.next_leaf(), leaf.size())
    };

    if it.slot + 1 < size {
        return Ok(BTreeIter { page: it.page, slot: it.slot + 1 });
    }
    if next_leaf == 0 {
        return end(catalog, name);
    }
    Ok(BTreeIter { page: next_leaf, slot: 0 })
}

pub fn delete(_pool: &mut BufferPool, _catalog: &mut Catalog, _name: &str, _it: BTreeIter) -> Result<()> {
    Err(StorageError::DeleteNotSupported)
}
