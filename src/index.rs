//! The LRU index: an access-ordered mapping from key to [`Entry`].
//!
//! Access order is maintained with the same trick a `LinkedHashMap` in
//! access-order mode uses: every lookup that should count as a "touch"
//! removes the entry and reinserts it, which places it at the tail of
//! [`indexmap::IndexMap`]'s iteration order. The front of the map is always
//! the eviction candidate; the back is the most recently used entry.

use indexmap::IndexMap;

use crate::entry::Entry;

#[derive(Default)]
pub(crate) struct LruIndex {
    map: IndexMap<String, Entry>,
}

impl LruIndex {
    pub(crate) fn new() -> Self {
        Self { map: IndexMap::new() }
    }

    pub(crate) fn peek(&self, key: &str) -> Option<&Entry> {
        self.map.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.map.get_mut(key)
    }

    /// Moves `key` to the most-recently-used position if present. Returns
    /// `true` if it was present.
    pub(crate) fn promote(&mut self, key: &str) -> bool {
        match self.map.shift_remove_entry(key) {
            Some((k, v)) => {
                self.map.insert(k, v);
                true
            }
            None => false,
        }
    }

    /// Promotes `key` if present; otherwise inserts a fresh entry at the
    /// tail. Either way, returns a mutable reference to the entry, now at
    /// the tail.
    pub(crate) fn get_or_insert_promote(&mut self, key: &str, value_count: usize) -> &mut Entry {
        if !self.promote(key) {
            self.map.insert(key.to_string(), Entry::new(value_count));
        }
        self.map
            .get_mut(key)
            .expect("key was just inserted or promoted")
    }

    /// Returns the entry for `key`, inserting a fresh one at the tail if
    /// absent. Unlike [`Self::get_or_insert_promote`], an *existing*
    /// entry's position is left untouched — only a genuinely new entry has
    /// no prior position to preserve.
    pub(crate) fn get_or_insert(&mut self, key: &str, value_count: usize) -> &mut Entry {
        if !self.map.contains_key(key) {
            self.map.insert(key.to_string(), Entry::new(value_count));
        }
        self.map
            .get_mut(key)
            .expect("key was just inserted or already present")
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Entry> {
        self.map.shift_remove(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    /// Iterates front (least-recently-used) to back (most-recently-used).
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.map.iter()
    }

    /// Sum of `lengths` across every readable entry.
    pub(crate) fn total_size(&self) -> u64 {
        self.map
            .values()
            .filter(|e| e.readable)
            .map(|e| e.lengths.iter().sum::<u64>())
            .sum()
    }
}
