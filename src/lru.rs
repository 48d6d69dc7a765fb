//! A page-id-keyed LRU recency list: O(1) access, insert, and remove via a
//! doubly-linked arena with a free-slot list for node reuse.

use std::collections::HashMap;
use std::hash::Hash;

pub struct LruList<K> {
    positions: HashMap<K, usize>,
    nodes: Vec<Node<K>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_slots: Vec<usize>,
}

struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K: Eq + Hash + Clone> LruList<K> {
    pub fn new() -> Self {
        Self {
            positions: HashMap::new(),
            nodes: Vec::new(),
            head: None,
            tail: None,
            free_slots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    /// Records an access to `key`, making it most-recently-used. Inserts it
    /// if not already present.
    pub fn touch(&mut self, key: K) {
        if let Some(&pos) = self.positions.get(&key) {
            self.move_to_front(pos);
        } else {
            self.insert(key);
        }
    }

    /// Removes `key` from the list, if present.
    pub fn remove(&mut self, key: &K) {
        if let Some(pos) = self.positions.remove(key) {
            self.unlink(pos);
            self.free_slots.push(pos);
        }
    }

    /// Returns the least-recently-used key without removing it.
    pub fn peek_lru(&self) -> Option<&K> {
        self.tail.map(|pos| &self.nodes[pos].key)
    }

    /// Removes and returns the least-recently-used key.
    pub fn pop_lru(&mut self) -> Option<K> {
        let pos = self.tail?;
        let key = self.nodes[pos].key.clone();
        self.remove(&key);
        Some(key)
    }

    fn insert(&mut self, key: K) {
        let pos = if let Some(pos) = self.free_slots.pop() {
            self.nodes[pos] = Node {
                key: key.clone(),
                prev: None,
                next: self.head,
            };
            pos
        } else {
            let pos = self.nodes.len();
            self.nodes.push(Node {
                key: key.clone(),
                prev: None,
                next: self.head,
            });
            pos
        };

        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(pos);
        }
        self.head = Some(pos);
        if self.tail.is_none() {
            self.tail = Some(pos);
        }
        self.positions.insert(key, pos);
    }

    fn move_to_front(&mut self, pos: usize) {
        if self.head == Some(pos) {
            return;
        }
        self.unlink(pos);
        self.nodes[pos].prev = None;
        self.nodes[pos].next = self.head;
        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(pos);
        }
        self.head = Some(pos);
        if self.tail.is_none() {
            self.tail = Some(pos);
        }
    }

    fn unlink(&mut self, pos: usize) {
        let (prev, next) = (self.nodes[pos].prev, self.nodes[pos].next);
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_in_lru_order() {
        let mut l: LruList<u32> = LruList::new();
        l.touch(1);
        l.touch(2);
        l.touch(3);
        assert_eq!(l.peek_lru(), Some(&1));
        l.touch(1);
        assert_eq!(l.peek_lru(), Some(&2));
        assert_eq!(l.pop_lru(), Some(2));
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn remove_from_middle() {
        let mut l: LruList<u32> = LruList::new();
        l.touch(1);
        l.touch(2);
        l.touch(3);
        l.remove(&2);
        assert_eq!(l.len(), 2);
        assert_eq!(l.pop_lru(), Some(1));
        assert_eq!(l.pop_lru(), Some(3));
    }

    #[test]
    fn empty_list() {
        let l: LruList<u32> = LruList::new();
        assert_eq!(l.peek_lru(), None);
    }
}
