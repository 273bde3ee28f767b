//! Address-to-index table
//!
//! Each distinct address string gets the next free index the first time it is
//! seen. Indices start at 0, are handed out in first-seen order, and stay bound
//! for the lifetime of the table. Freeing an address does not unbind it.

use rustc_hash::FxHashMap;

/// First-seen-order mapping from raw addresses to small indices
#[derive(Debug, Clone, Default)]
pub struct AddressTable {
    indices: FxHashMap<String, usize>,
    order: Vec<String>,
    next: usize,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `address`, assigning the next one if it hasn't been seen
    pub fn index_or_assign(&mut self, address: &str) -> usize {
        if let Some(&index) = self.indices.get(address) {
            return index;
        }

        let index = self.next;
        self.indices.insert(address.to_string(), index);
        self.order.push(address.to_string());
        self.next += 1;
        index
    }

    /// Index for `address` if it has been seen, without assigning
    pub fn lookup(&self, address: &str) -> Option<usize> {
        self.indices.get(address).copied()
    }

    /// Index that the next unseen address will receive
    pub fn next_index(&self) -> usize {
        self.next
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Address bound to `index`
    pub fn address_of(&self, index: usize) -> Option<&str> {
        self.order.get(index).map(String::as_str)
    }

    /// `(address, index)` pairs in assignment order
    pub fn entries(&self) -> impl Iterator<Item = (&str, usize)> {
        self.order
            .iter()
            .enumerate()
            .map(|(index, address)| (address.as_str(), index))
    }
}
