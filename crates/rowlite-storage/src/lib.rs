//! # RowLite Storage Engine
//!
//! Flat-file storage engine for RowLite.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of RowLite.**
//!
//! Users should depend on the main [`rowlite`](https://crates.io/crates/rowlite) crate
//! instead, which provides the stable public API. This crate's API may change
//! without notice between minor versions.
//!
//! ---
//!
//! A store is a single text file: a five-line metadata block followed by
//! one comma-separated line per row. The engine keeps recent changes in a
//! write-back cache and folds them into the file on flush:
//!
//! - **Codec**: text encoding of metadata and rows
//! - **Key Generator**: monotonically increasing row keys
//! - **Write Cache**: pending upserts and tombstones
//! - **Compaction**: merging the cache into the data region
//! - **Record File**: the seek/scan layer over the file handle
//!
//! ## Architecture
//!
//! ```text
//! Writes → WriteCache (memory) ──flush──→ store file (rewritten in place)
//! Reads  → WriteCache, then linear scan of the data region
//! ```

use rowlite_core::format::METADATA_LINES;
use rowlite_core::{Error, Result, Schema, Value};
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::path::Path;
use tracing::{debug, error, info, warn};

pub mod cache;
pub mod codec;
pub mod compaction;
pub mod file;
pub mod keygen;

pub use cache::{CacheEntry, WriteCache};
pub use codec::Metadata;
pub use compaction::{Compaction, CompactionStats};
pub use file::{MemoryFile, RecordFile, TextFile};
pub use keygen::KeyGenerator;

/// Durability of a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Call fsync after every rewrite (strongest durability)
    Sync,
    /// Hand the rewrite to the OS without fsync (faster, unsafe for power loss)
    Buffered,
}

/// Storage engine configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Sync mode for flushes
    pub sync_mode: SyncMode,
    /// Allow `create` to truncate an existing file
    pub overwrite: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Sync,
            overwrite: false,
        }
    }
}

/// Rows keyed by row key, as returned by bulk reads
pub type RowMap = BTreeMap<u64, Vec<Value>>;

/// Storage engine over a single record file
///
/// Presents the cache and the file as one logical row set. Every read
/// consults the cache first; the file is only rewritten by [`flush`].
///
/// [`flush`]: StorageEngine::flush
pub struct StorageEngine<F: RecordFile = TextFile> {
    /// Open file, `None` once closed
    file: Option<F>,
    /// Field layout
    schema: Option<Schema>,
    /// Key generator
    keygen: KeyGenerator,
    /// Pending changes
    cache: WriteCache,
    /// Logical row count, cache included
    row_count: u64,
}

impl StorageEngine<TextFile> {
    /// Open an existing store file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, StorageConfig::default())
    }

    /// Open an existing store file with custom configuration
    ///
    /// Fails with [`Error::NotFound`] if the file does not exist, and with
    /// [`Error::ParseFailure`] or [`Error::SchemaMismatch`] if its metadata
    /// block is malformed.
    pub fn open_with_config(path: impl AsRef<Path>, config: StorageConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = TextFile::open(path, config.sync_mode)?;
        let engine = Self::attach(file)?;
        info!(
            path = %path.display(),
            rows = engine.row_count,
            "Opened store"
        );
        Ok(engine)
    }

    /// Create a new store file with the given schema
    pub fn create(path: impl AsRef<Path>, schema: Schema) -> Result<Self> {
        Self::create_with_config(path, schema, StorageConfig::default())
    }

    /// Create a new store file with custom configuration
    pub fn create_with_config(
        path: impl AsRef<Path>,
        schema: Schema,
        config: StorageConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = TextFile::create(path, config.sync_mode, config.overwrite)?;
        let engine = Self::initialize(file, schema)?;
        info!(path = %path.display(), fields = engine.schema_fields(), "Created store");
        Ok(engine)
    }
}

impl StorageEngine<MemoryFile> {
    /// Create a store held entirely in memory
    pub fn in_memory(schema: Schema) -> Result<Self> {
        Self::initialize(MemoryFile::new(), schema)
    }
}

impl<F: RecordFile> StorageEngine<F> {
    /// Attach to a record file that already holds a metadata block
    pub fn attach(mut file: F) -> Result<Self> {
        let meta = codec::parse_metadata(&file.read_metadata()?)?;
        Ok(Self {
            file: Some(file),
            schema: Some(meta.schema),
            keygen: KeyGenerator::with_watermark(meta.watermark),
            cache: WriteCache::new(),
            row_count: meta.row_count,
        })
    }

    /// Write a fresh metadata block to a record file and attach to it
    pub fn initialize(mut file: F, schema: Schema) -> Result<Self> {
        let meta = Metadata::fresh(schema);
        file.rewrite(&codec::encode_metadata(&meta), &[])?;
        Ok(Self {
            file: Some(file),
            schema: Some(meta.schema),
            keygen: KeyGenerator::with_watermark(meta.watermark),
            cache: WriteCache::new(),
            row_count: 0,
        })
    }

    fn schema_fields(&self) -> usize {
        self.schema.as_ref().map_or(0, Schema::num_fields)
    }

    /// Flush pending changes and release the file
    ///
    /// Closing a closed store does nothing. The handle is released even
    /// when the final flush fails; the flush error is returned.
    pub fn close(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }

        let result = if self.cache.is_empty() {
            Ok(())
        } else {
            self.flush().map(|_| ())
        };
        if let Err(e) = &result {
            error!(error = %e, "Flush on close failed, pending changes are lost");
        }

        self.file = None;
        self.schema = None;
        self.keygen = KeyGenerator::Uninitialized;
        self.cache.clear();
        self.row_count = 0;
        info!("Closed store");

        result
    }

    /// Insert a new row, returning its key
    ///
    /// The row lives in the cache until the next flush. Strings containing
    /// a line break are rejected with [`Error::InvalidInput`].
    pub fn add_row(&mut self, data: Vec<Value>) -> Result<u64> {
        if self.file.is_none() {
            return Err(Error::NotOpen);
        }
        let schema = self.schema.as_ref().ok_or(Error::NotOpen)?;
        schema.check_row(&data)?;

        let key = self.keygen.mint()?;
        self.cache.put(key, data);
        self.row_count += 1;
        debug!(key, "Added row");
        Ok(key)
    }

    /// Delete a row
    ///
    /// A row already in the cache is tombstoned directly. Otherwise the
    /// file is scanned for the key; the row is never decoded.
    pub fn remove_row(&mut self, key: u64) -> Result<()> {
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;

        match self.cache.entry(key) {
            Some(CacheEntry::Present(_)) => {}
            Some(CacheEntry::Tombstone) => {
                return Err(Error::NotFound(format!("key {}", key)));
            }
            None => {
                let found = file.scan(|line| {
                    if codec::leading_key(line) == Some(key) {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                })?;
                if found.is_none() {
                    return Err(Error::NotFound(format!("key {}", key)));
                }
            }
        }

        self.cache.delete(key);
        self.row_count = self.row_count.saturating_sub(1);
        debug!(key, "Removed row");
        Ok(())
    }

    /// Check that the file holds at least a full metadata block
    fn validate_file(file: &mut F) -> Result<()> {
        let lines = file.line_count()?;
        if lines < METADATA_LINES {
            return Err(Error::ParseFailure(format!(
                "file has {} lines, metadata needs {}",
                lines, METADATA_LINES
            )));
        }
        Ok(())
    }

    /// Find the data of a row by key
    ///
    /// Returns `None` if the row does not exist or is pending deletion.
    pub fn find_key(&mut self, key: u64) -> Result<Option<Vec<Value>>> {
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;
        let schema = self.schema.as_ref().ok_or(Error::NotOpen)?;
        Self::validate_file(file)?;

        if let Some(cached) = self.cache.get(key) {
            return Ok(cached.map(<[Value]>::to_vec));
        }
        if self.row_count == 0 {
            return Ok(None);
        }

        let found = file.scan(|line| {
            if codec::leading_key(line) == Some(key) {
                ControlFlow::Break(codec::decode_row(line, schema))
            } else {
                ControlFlow::Continue(())
            }
        })?;

        match found {
            Some(Ok(row)) => Ok(Some(row.data)),
            Some(Err(e)) => Err(Error::Decode(e)),
            None => Ok(None),
        }
    }

    /// Find every row whose `field_id` column equals `value`
    ///
    /// Undecodable file rows are logged and skipped. Cache entries take
    /// precedence over the file rows they shadow.
    pub fn find_by_field(&mut self, field_id: &str, value: &Value) -> Result<RowMap> {
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;
        let schema = self.schema.as_ref().ok_or(Error::NotOpen)?;
        let index = schema.resolve(field_id, value)?;
        Self::validate_file(file)?;

        let mut rows = RowMap::new();
        if self.row_count == 0 {
            return Ok(rows);
        }

        file.for_each_line(|line| match codec::decode_row(line, schema) {
            Ok(row) if row.data[index] == *value => {
                rows.insert(row.key, row.data);
            }
            Ok(_) => {}
            Err(e) => warn!(
                error = %e,
                line = %String::from_utf8_lossy(line),
                "Skipping undecodable row"
            ),
        })?;

        for (key, entry) in self.cache.iter() {
            rows.remove(&key);
            if let CacheEntry::Present(data) = entry {
                if data[index] == *value {
                    rows.insert(key, data.clone());
                }
            }
        }

        Ok(rows)
    }

    /// Return every live row
    ///
    /// Undecodable file rows are logged and skipped. Tombstoned keys are
    /// left out even while their line is still in the file.
    pub fn find_all(&mut self) -> Result<RowMap> {
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;
        let schema = self.schema.as_ref().ok_or(Error::NotOpen)?;
        Self::validate_file(file)?;

        let mut rows = RowMap::new();
        if self.row_count == 0 {
            return Ok(rows);
        }

        file.for_each_line(|line| match codec::decode_row(line, schema) {
            Ok(row) => {
                rows.insert(row.key, row.data);
            }
            Err(e) => warn!(
                error = %e,
                line = %String::from_utf8_lossy(line),
                "Skipping undecodable row"
            ),
        })?;

        for (key, entry) in self.cache.iter() {
            match entry {
                CacheEntry::Present(data) => {
                    rows.insert(key, data.clone());
                }
                CacheEntry::Tombstone => {
                    rows.remove(&key);
                }
            }
        }

        Ok(rows)
    }

    /// Set one field of a row
    ///
    /// A row found only in the file is decoded, edited and stored in the
    /// cache as a full pending row, which replaces the file line at flush.
    pub fn update(&mut self, key: u64, field_id: &str, value: Value) -> Result<()> {
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;
        let schema = self.schema.as_ref().ok_or(Error::NotOpen)?;
        let index = schema.resolve(field_id, &value)?;
        value.check_framing()?;

        let mut data = match self.cache.entry(key) {
            Some(CacheEntry::Present(data)) => data.clone(),
            Some(CacheEntry::Tombstone) => {
                return Err(Error::NotFound(format!("key {}", key)));
            }
            None => {
                let found = file.scan(|line| {
                    if codec::leading_key(line) == Some(key) {
                        ControlFlow::Break(codec::decode_row(line, schema))
                    } else {
                        ControlFlow::Continue(())
                    }
                })?;
                match found {
                    Some(row) => row?.data,
                    None => return Err(Error::NotFound(format!("key {}", key))),
                }
            }
        };

        data[index] = value;
        self.cache.put(key, data);
        debug!(key, field = field_id, "Updated row");
        Ok(())
    }

    /// Merge the cache into the file and clear it
    ///
    /// Fails if the cache is empty. The whole file is rewritten: the
    /// metadata block, surviving and updated lines in file order, then new
    /// rows. The cache is cleared only once the rewrite succeeded.
    pub fn flush(&mut self) -> Result<CompactionStats> {
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;
        let schema = self.schema.as_ref().ok_or(Error::NotOpen)?;
        if self.cache.is_empty() {
            return Err(Error::InvalidOperation("cache is empty".to_string()));
        }

        let compaction = compaction::compact(file.data_lines()?, &self.cache, schema);

        let meta = Metadata {
            schema: schema.clone(),
            watermark: self.keygen.watermark().ok_or(Error::InvalidGenerator)?,
            row_count: self.row_count,
        };
        file.rewrite(&codec::encode_metadata(&meta), &compaction.lines)?;
        self.cache.clear();

        let stats = compaction.stats;
        info!(
            rows = self.row_count,
            retained = stats.retained,
            replaced = stats.replaced,
            removed = stats.removed,
            appended = stats.appended,
            "Flushed cache"
        );
        Ok(stats)
    }

    /// Replace the schema of an empty store
    ///
    /// On an open store the metadata block is rewritten right away with an
    /// empty data region; the watermark is kept so keys are never reused.
    pub fn set_schema(&mut self, schema: Schema) -> Result<()> {
        if self.row_count > 0 {
            return Err(Error::NotEmpty);
        }

        if let Some(file) = self.file.as_mut() {
            let meta = Metadata {
                schema,
                watermark: self.keygen.watermark().ok_or(Error::InvalidGenerator)?,
                row_count: 0,
            };
            file.rewrite(&codec::encode_metadata(&meta), &[])?;
            self.cache.clear();
            self.schema = Some(meta.schema);
        } else {
            self.schema = Some(schema);
        }
        Ok(())
    }

    /// Current schema, if any
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Number of live rows, pending changes included
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Returns true while a file is attached
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Returns true if the store holds no rows
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// The write-back cache
    pub fn cache(&self) -> &WriteCache {
        &self.cache
    }

    /// The attached record file
    pub fn file(&self) -> Option<&F> {
        self.file.as_ref()
    }

    /// Get storage statistics
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            row_count: self.row_count,
            pending_rows: self.cache.len() - self.cache.tombstones(),
            pending_deletes: self.cache.tombstones(),
            watermark: self.keygen.watermark(),
        }
    }
}

impl<F: RecordFile> Default for StorageEngine<F> {
    /// A closed engine with no schema
    fn default() -> Self {
        Self {
            file: None,
            schema: None,
            keygen: KeyGenerator::Uninitialized,
            cache: WriteCache::new(),
            row_count: 0,
        }
    }
}

impl<F: RecordFile> Drop for StorageEngine<F> {
    fn drop(&mut self) {
        // Best effort flush of pending changes
        if self.file.is_some() && !self.cache.is_empty() {
            if let Err(e) = self.flush() {
                error!(error = %e, "Flush on drop failed");
            }
        }
    }
}

/// Storage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Live rows, pending changes included
    pub row_count: u64,
    /// Pending inserts and updates in the cache
    pub pending_rows: usize,
    /// Pending deletions in the cache
    pub pending_deletes: usize,
    /// Key generator watermark, if a store is attached
    pub watermark: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowlite_core::FieldType;
    use std::cell::Cell;
    use std::io;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Memory file whose rewrites fail while `failing` is set
    struct FailingFile {
        inner: MemoryFile,
        failing: Rc<Cell<bool>>,
    }

    impl RecordFile for FailingFile {
        fn line_count(&mut self) -> Result<usize> {
            self.inner.line_count()
        }

        fn read_metadata(&mut self) -> Result<Vec<String>> {
            self.inner.read_metadata()
        }

        fn scan<B, V>(&mut self, visit: V) -> Result<Option<B>>
        where
            V: FnMut(&[u8]) -> ControlFlow<B>,
        {
            self.inner.scan(visit)
        }

        fn rewrite(&mut self, metadata: &[String], data: &[Vec<u8>]) -> Result<()> {
            if self.failing.get() {
                return Err(Error::Io(io::Error::other("disk full")));
            }
            self.inner.rewrite(metadata, data)
        }
    }

    fn failing_engine() -> (StorageEngine<FailingFile>, Rc<Cell<bool>>) {
        let failing = Rc::new(Cell::new(false));
        let file = FailingFile {
            inner: MemoryFile::new(),
            failing: Rc::clone(&failing),
        };
        (StorageEngine::initialize(file, people()).unwrap(), failing)
    }

    fn people() -> Schema {
        Schema::new(vec!["name", "age"], vec![FieldType::String, FieldType::Integer]).unwrap()
    }

    fn person(name: &str, age: i64) -> Vec<Value> {
        vec![Value::from(name), Value::Integer(age)]
    }

    #[test]
    fn test_storage_engine_basic() {
        let mut engine = StorageEngine::in_memory(people()).unwrap();

        let alice = engine.add_row(person("alice", 30)).unwrap();
        let bob = engine.add_row(person("bob", 25)).unwrap();

        assert_eq!((alice, bob), (0, 1));
        assert_eq!(engine.find_key(alice).unwrap(), Some(person("alice", 30)));
        assert_eq!(engine.find_key(bob).unwrap(), Some(person("bob", 25)));
        assert_eq!(engine.find_key(7).unwrap(), None);
        assert_eq!(engine.row_count(), 2);
    }

    #[test]
    fn test_storage_engine_rejects_wrong_shape() {
        let mut engine = StorageEngine::in_memory(people()).unwrap();

        assert!(matches!(
            engine.add_row(vec![Value::from("alice")]),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            engine.add_row(vec![Value::Integer(30), Value::from("alice")]),
            Err(Error::TypeMismatch(_))
        ));
        assert_eq!(engine.row_count(), 0);
        assert_eq!(engine.stats().watermark, Some(-1));
    }

    #[test]
    fn test_storage_engine_remove_from_cache() {
        let mut engine = StorageEngine::in_memory(people()).unwrap();

        let key = engine.add_row(person("alice", 30)).unwrap();
        engine.remove_row(key).unwrap();

        assert_eq!(engine.find_key(key).unwrap(), None);
        assert_eq!(engine.row_count(), 0);
        assert!(matches!(engine.remove_row(key), Err(Error::NotFound(_))));
        assert!(matches!(engine.remove_row(99), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_storage_engine_flush_writes_file() {
        let mut engine = StorageEngine::in_memory(people()).unwrap();

        engine.add_row(person("alice", 30)).unwrap();
        engine.add_row(person("bob", 25)).unwrap();
        let stats = engine.flush().unwrap();

        assert_eq!(stats.appended, 2);
        assert!(engine.cache().is_empty());
        assert_eq!(
            engine.file().unwrap().lines(),
            &["2", "name,age,", "str,int,", "1", "2", "0,alice,30", "1,bob,25"]
        );
    }

    #[test]
    fn test_storage_engine_flush_requires_changes() {
        let mut engine = StorageEngine::in_memory(people()).unwrap();
        assert!(matches!(engine.flush(), Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_storage_engine_update_file_resident_row() {
        let mut engine = StorageEngine::in_memory(people()).unwrap();
        let key = engine.add_row(person("alice", 30)).unwrap();
        engine.flush().unwrap();

        engine.update(key, "age", Value::Integer(31)).unwrap();

        assert_eq!(
            engine.cache().entry(key),
            Some(&CacheEntry::Present(person("alice", 31)))
        );
        assert_eq!(engine.find_key(key).unwrap(), Some(person("alice", 31)));

        engine.flush().unwrap();
        assert_eq!(
            engine.file().unwrap().lines()[METADATA_LINES..],
            ["0,alice,31"]
        );
    }

    #[test]
    fn test_storage_engine_update_type_mismatch() {
        let mut engine = StorageEngine::in_memory(people()).unwrap();
        let key = engine.add_row(person("alice", 30)).unwrap();

        assert!(matches!(
            engine.update(key, "age", Value::from("thirty")),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            engine.update(key, "height", Value::Integer(180)),
            Err(Error::UnknownField(_))
        ));
        assert_eq!(engine.find_key(key).unwrap(), Some(person("alice", 30)));
    }

    #[test]
    fn test_storage_engine_closed_operations() {
        let mut engine = StorageEngine::in_memory(people()).unwrap();
        engine.add_row(person("alice", 30)).unwrap();
        engine.close().unwrap();

        assert!(!engine.is_open());
        assert!(engine.schema().is_none());
        assert!(engine.close().is_ok());
        assert!(matches!(engine.add_row(person("bob", 25)), Err(Error::NotOpen)));
        assert!(matches!(engine.find_key(0), Err(Error::NotOpen)));
        assert!(matches!(engine.find_all(), Err(Error::NotOpen)));
        assert!(matches!(engine.remove_row(0), Err(Error::NotOpen)));
        assert!(matches!(engine.flush(), Err(Error::NotOpen)));
    }

    #[test]
    fn test_storage_engine_attach_rejects_short_metadata() {
        let file = MemoryFile::from_lines(["2", "name,age,"]);
        let err = StorageEngine::attach(file).err().unwrap();
        assert!(matches!(err, Error::ParseFailure(_)));
    }

    #[test]
    fn test_default_engine_is_closed() {
        let mut engine: StorageEngine = StorageEngine::default();
        assert!(!engine.is_open());
        assert!(engine.is_empty());
        assert!(matches!(engine.add_row(Vec::new()), Err(Error::NotOpen)));
        assert_eq!(engine.stats(), StorageStats::default());
    }

    #[test]
    fn test_set_schema() {
        let mut engine = StorageEngine::in_memory(people()).unwrap();
        let scores = Schema::new(vec!["score"], vec![FieldType::Float]).unwrap();

        engine.set_schema(scores.clone()).unwrap();
        assert_eq!(engine.schema(), Some(&scores));
        assert_eq!(engine.file().unwrap().lines()[..3], ["1", "score,", "float,"]);

        engine.add_row(vec![Value::Float(1.5)]).unwrap();
        assert!(matches!(engine.set_schema(people()), Err(Error::NotEmpty)));
    }

    #[test]
    fn test_storage_engine_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.db");

        {
            let mut engine = StorageEngine::create(&path, people()).unwrap();
            engine.add_row(person("alice", 30)).unwrap();
            engine.close().unwrap();
        }

        let mut engine = StorageEngine::open(&path).unwrap();
        assert_eq!(engine.row_count(), 1);
        assert_eq!(engine.find_key(0).unwrap(), Some(person("alice", 30)));
        assert_eq!(engine.add_row(person("bob", 25)).unwrap(), 1);
    }

    #[test]
    fn test_storage_engine_flushes_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.db");

        {
            let mut engine = StorageEngine::create(&path, people()).unwrap();
            engine.add_row(person("alice", 30)).unwrap();
            // No close
        }

        let mut engine = StorageEngine::open(&path).unwrap();
        assert_eq!(engine.find_key(0).unwrap(), Some(person("alice", 30)));
    }

    #[test]
    fn test_failed_flush_keeps_pending_changes() {
        let (mut engine, failing) = failing_engine();
        engine.add_row(person("alice", 30)).unwrap();
        engine.add_row(person("bob", 25)).unwrap();
        engine.remove_row(1).unwrap();

        failing.set(true);
        assert!(matches!(engine.flush(), Err(Error::Io(_))));
        assert_eq!(engine.cache().len(), 2);
        assert_eq!(engine.row_count(), 1);
        assert_eq!(engine.find_key(0).unwrap(), Some(person("alice", 30)));
        assert_eq!(engine.find_key(1).unwrap(), None);

        failing.set(false);
        engine.flush().unwrap();
        assert!(engine.cache().is_empty());
        assert_eq!(
            engine.file().unwrap().inner.lines()[METADATA_LINES..],
            ["0,alice,30"]
        );
    }

    #[test]
    fn test_close_releases_file_when_flush_fails() {
        let (mut engine, failing) = failing_engine();
        engine.add_row(person("alice", 30)).unwrap();

        failing.set(true);
        assert!(matches!(engine.close(), Err(Error::Io(_))));
        assert!(!engine.is_open());
        assert!(engine.file().is_none());
        assert!(engine.cache().is_empty());

        assert!(engine.close().is_ok());
        assert!(matches!(engine.add_row(person("bob", 25)), Err(Error::NotOpen)));
    }

    #[test]
    fn test_line_breaks_are_rejected() {
        let mut engine = StorageEngine::in_memory(people()).unwrap();

        assert!(matches!(
            engine.add_row(person("x\n7,mallory", 1)),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(engine.row_count(), 0);
        assert_eq!(engine.stats().watermark, Some(-1));

        let key = engine.add_row(person("alice", 30)).unwrap();
        engine.flush().unwrap();
        assert!(matches!(
            engine.update(key, "name", Value::from("x\r\n7,mallory")),
            Err(Error::InvalidInput(_))
        ));
        assert!(engine.cache().is_empty());
        assert_eq!(engine.find_key(key).unwrap(), Some(person("alice", 30)));
    }
}
