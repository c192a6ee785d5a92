//! Write-Back Cache - pending row changes not yet reconciled to disk
//!
//! The cache holds every row inserted or updated since the last flush,
//! along with tombstones for rows deleted since then. It is consulted
//! before the backing file on every read: an entry here always wins over
//! whatever the file still contains for the same key.

use rowlite_core::Value;
use std::collections::BTreeMap;

/// Entry value in the cache - a pending row or a tombstone (deletion marker)
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// Full field tuple to write at the next flush
    Present(Vec<Value>),
    /// Row is deleted; the file line is dropped at the next flush
    Tombstone,
}

impl CacheEntry {
    /// Returns the pending data, or `None` for a tombstone
    pub fn data(&self) -> Option<&[Value]> {
        match self {
            CacheEntry::Present(data) => Some(data),
            CacheEntry::Tombstone => None,
        }
    }

    /// Returns true if this entry marks a deletion
    pub fn is_tombstone(&self) -> bool {
        matches!(self, CacheEntry::Tombstone)
    }
}

/// WriteCache - key-ordered map of pending row changes
///
/// Keys are minted in increasing order, so iteration order is also
/// insertion order for new rows.
#[derive(Debug, Default)]
pub struct WriteCache {
    entries: BTreeMap<u64, CacheEntry>,
}

impl WriteCache {
    /// Creates a new empty cache
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts or replaces a pending row
    pub fn put(&mut self, key: u64, data: Vec<Value>) {
        self.entries.insert(key, CacheEntry::Present(data));
    }

    /// Marks a key as deleted with a tombstone
    pub fn delete(&mut self, key: u64) {
        self.entries.insert(key, CacheEntry::Tombstone);
    }

    /// Retrieves the entry for a key
    ///
    /// Returns:
    /// - `Some(Some(data))` if the key has a pending row
    /// - `Some(None)` if the key was deleted (tombstone)
    /// - `None` if the key is not in the cache
    pub fn get(&self, key: u64) -> Option<Option<&[Value]>> {
        self.entries.get(&key).map(CacheEntry::data)
    }

    /// Returns the raw entry for a key
    pub fn entry(&self, key: u64) -> Option<&CacheEntry> {
        self.entries.get(&key)
    }

    /// Returns true if the key has any entry, tombstones included
    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Returns the number of entries in the cache
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of tombstones
    pub fn tombstones(&self) -> usize {
        self.entries.values().filter(|e| e.is_tombstone()).count()
    }

    /// Returns an iterator over all entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &CacheEntry)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Returns an iterator over pending rows, skipping tombstones
    pub fn present(&self) -> impl Iterator<Item = (u64, &[Value])> {
        self.iter()
            .filter_map(|(key, entry)| entry.data().map(|data| (key, data)))
    }

    /// Clears the cache
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
