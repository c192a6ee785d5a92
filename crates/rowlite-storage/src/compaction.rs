//! Compaction - merging the write-back cache into the data region
//!
//! A flush rebuilds the data region in one pass over the file. Each line
//! is kept, replaced by its pending row, or dropped for a tombstone.
//! Pending rows whose keys never appeared in the file are appended last.

use crate::cache::{CacheEntry, WriteCache};
use crate::codec;
use rowlite_core::Schema;
use std::collections::HashSet;
use tracing::warn;

/// Statistics for one compaction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// File lines carried over unchanged
    pub retained: u64,
    /// File lines replaced by a pending row
    pub replaced: u64,
    /// File lines dropped for a tombstone
    pub removed: u64,
    /// Pending rows appended after the existing lines
    pub appended: u64,
    /// Tombstones for keys never written to the file
    pub discarded: u64,
}

/// Result of merging the cache into the data region
#[derive(Debug, Clone, Default)]
pub struct Compaction {
    /// The rebuilt data region, in write order
    pub lines: Vec<Vec<u8>>,
    /// What the pass did
    pub stats: CompactionStats,
}

/// Merges the cache into the existing data lines.
///
/// Output order: surviving and substituted lines in original file order,
/// then new rows in cache key order. Lines whose key cannot be read are
/// carried over byte for byte.
pub fn compact<I>(data_lines: I, cache: &WriteCache, schema: &Schema) -> Compaction
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut out = Compaction::default();
    let mut seen = HashSet::new();

    for line in data_lines {
        let Some(key) = codec::leading_key(&line) else {
            warn!(
                line = %String::from_utf8_lossy(&line),
                "Keeping data line with unreadable key"
            );
            out.stats.retained += 1;
            out.lines.push(line);
            continue;
        };

        match cache.entry(key) {
            Some(CacheEntry::Tombstone) => {
                seen.insert(key);
                out.stats.removed += 1;
            }
            Some(CacheEntry::Present(data)) => {
                seen.insert(key);
                out.lines.push(codec::encode_row(key, data, schema).into_bytes());
                out.stats.replaced += 1;
            }
            None => {
                out.lines.push(line);
                out.stats.retained += 1;
            }
        }
    }

    for (key, entry) in cache.iter() {
        if seen.contains(&key) {
            continue;
        }
        match entry {
            CacheEntry::Present(data) => {
                out.lines.push(codec::encode_row(key, data, schema).into_bytes());
                out.stats.appended += 1;
            }
            CacheEntry::Tombstone => out.stats.discarded += 1,
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowlite_core::{FieldType, Value};

    fn people() -> Schema {
        Schema::new(vec!["name", "age"], vec![FieldType::String, FieldType::Integer]).unwrap()
    }

    fn row(name: &str, age: i64) -> Vec<Value> {
        vec![Value::from(name), Value::Integer(age)]
    }

    fn lines(raw: &[&str]) -> Vec<Vec<u8>> {
        raw.iter().map(|l| l.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_compact_empty_cache_keeps_file() {
        let cache = WriteCache::new();
        let out = compact(lines(&["0,alice,30", "1,bob,25"]), &cache, &people());
        assert_eq!(out.lines, lines(&["0,alice,30", "1,bob,25"]));
        assert_eq!(out.stats.retained, 2);
    }

    #[test]
    fn test_compact_merges_in_file_order() {
        let mut cache = WriteCache::new();
        cache.put(4, row("erin", 22));
        cache.put(1, row("bob", 26));
        cache.delete(0);
        cache.put(3, row("dave", 50));

        let out = compact(
            lines(&["0,alice,30", "1,bob,25", "2,carol,41"]),
            &cache,
            &people(),
        );

        assert_eq!(
            out.lines,
            lines(&["1,bob,26", "2,carol,41", "3,dave,50", "4,erin,22"])
        );
        assert_eq!(
            out.stats,
            CompactionStats {
                retained: 1,
                replaced: 1,
                removed: 1,
                appended: 2,
                discarded: 0,
            }
        );
    }

    #[test]
    fn test_compact_drops_tombstones_for_unpersisted_keys() {
        let mut cache = WriteCache::new();
        cache.put(5, row("frank", 33));
        cache.delete(5);
        cache.delete(9);

        let out = compact(lines(&["0,alice,30"]), &cache, &people());
        assert_eq!(out.lines, lines(&["0,alice,30"]));
        assert_eq!(out.stats.discarded, 2);
    }

    #[test]
    fn test_compact_keeps_unreadable_lines() {
        let mut cache = WriteCache::new();
        cache.delete(0);

        let out = compact(lines(&["0,alice,30", "garbage"]), &cache, &people());
        assert_eq!(out.lines, lines(&["garbage"]));
        assert_eq!(out.stats.removed, 1);
        assert_eq!(out.stats.retained, 1);
    }

    #[test]
    fn test_compact_carries_non_utf8_lines_verbatim() {
        let mut cache = WriteCache::new();
        cache.put(2, row("carol", 42));
        cache.put(3, row("dave", 50));

        let corrupt = b"1,b\xff\xfeb,25".to_vec();
        let unkeyed = b"\xff\xfe".to_vec();
        let input = vec![
            b"0,alice,30".to_vec(),
            corrupt.clone(),
            unkeyed.clone(),
            b"2,carol,41".to_vec(),
        ];

        let out = compact(input, &cache, &people());
        assert_eq!(
            out.lines,
            vec![
                b"0,alice,30".to_vec(),
                corrupt,
                unkeyed,
                b"2,carol,42".to_vec(),
                b"3,dave,50".to_vec(),
            ]
        );
        assert_eq!(out.stats.retained, 3);
        assert_eq!(out.stats.replaced, 1);
        assert_eq!(out.stats.appended, 1);
    }
}
