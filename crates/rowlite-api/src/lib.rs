//! # RowLite
//!
//! A minimal embedded record store: typed rows in a single text file,
//! with a write-back cache in front of it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rowlite::{Database, FieldType, Schema, Value};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = Schema::new(vec!["name", "age"], vec![FieldType::String, FieldType::Integer])?;
//!     let db = Database::create("./people.db", schema)?;
//!
//!     // Insert a row; the store assigns its key
//!     let key = db.add_row(vec![Value::from("alice"), Value::Integer(30)])?;
//!
//!     // Look it up again
//!     if let Some(row) = db.find_key(key)? {
//!         println!("{}: {:?}", key, row);
//!     }
//!
//!     // Edit a single field, then persist
//!     db.update(key, "age", Value::Integer(31))?;
//!     db.flush()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Store Modes
//!
//! ```rust,no_run
//! use rowlite::{Database, FieldType, Schema};
//!
//! let schema = Schema::new(vec!["label"], vec![FieldType::String])?;
//!
//! // Existing store file
//! let persistent_db = Database::open("./labels.db")?;
//!
//! // In-memory store (data lost on exit)
//! let memory_db = Database::in_memory(schema)?;
//! # Ok::<(), rowlite::Error>(())
//! ```
//!
//! ## File Format
//!
//! Five metadata lines (field count, field ids, field type tags, key
//! watermark, row count) followed by one `key,value,...` line per row.
//! Changes stay in the cache until [`Database::flush`] or
//! [`Database::close`] rewrites the file.

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

pub mod logging;
pub mod validate;

// Re-export core types
pub use rowlite_core::{DecodeError, Error, FieldType, Result, Row, Schema, Value};

// Storage components
pub use rowlite_storage::{
    CompactionStats, MemoryFile, RecordFile, RowMap, StorageConfig, StorageEngine, StorageStats,
    SyncMode, TextFile,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Record file backing a database
pub enum StoreFile {
    /// Lines held in memory
    Memory(MemoryFile),
    /// Store file on disk
    Disk(TextFile),
}

impl RecordFile for StoreFile {
    fn line_count(&mut self) -> Result<usize> {
        match self {
            StoreFile::Memory(file) => file.line_count(),
            StoreFile::Disk(file) => file.line_count(),
        }
    }

    fn read_metadata(&mut self) -> Result<Vec<String>> {
        match self {
            StoreFile::Memory(file) => file.read_metadata(),
            StoreFile::Disk(file) => file.read_metadata(),
        }
    }

    fn scan<B, V>(&mut self, visit: V) -> Result<Option<B>>
    where
        V: FnMut(&[u8]) -> ControlFlow<B>,
    {
        match self {
            StoreFile::Memory(file) => file.scan(visit),
            StoreFile::Disk(file) => file.scan(visit),
        }
    }

    fn rewrite(&mut self, metadata: &[String], data: &[Vec<u8>]) -> Result<()> {
        match self {
            StoreFile::Memory(file) => file.rewrite(metadata, data),
            StoreFile::Disk(file) => file.rewrite(metadata, data),
        }
    }
}

/// The main database handle.
///
/// Wraps one storage engine. Thread-safe and can be cloned to share
/// across threads; every call takes the engine lock for its duration.
///
/// # Examples
///
/// ```rust,no_run
/// use rowlite::{Database, Value};
///
/// let db = Database::open("./people.db")?;
/// let adults = db.find_by_field("age", &Value::Integer(18))?;
/// println!("{} rows", adults.len());
/// # Ok::<(), rowlite::Error>(())
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<Mutex<StorageEngine<StoreFile>>>,
}

impl Database {
    fn from_engine(engine: StorageEngine<StoreFile>) -> Self {
        Database {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn engine(&self) -> Result<MutexGuard<'_, StorageEngine<StoreFile>>> {
        self.inner.lock().map_err(|_| Error::LockPoisoned)
    }

    /// Opens an existing store file.
    ///
    /// # Errors
    ///
    /// Returns Error::NotFound if the file does not exist, and
    /// Error::ParseFailure or Error::SchemaMismatch if its metadata block
    /// is malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, StorageConfig::default())
    }

    /// Opens an existing store file with custom configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StorageConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = TextFile::open(path, config.sync_mode)?;
        let engine = StorageEngine::attach(StoreFile::Disk(file))?;
        info!(path = %path.display(), rows = engine.row_count(), "Opened database");
        Ok(Self::from_engine(engine))
    }

    /// Creates a new store file with the given schema.
    ///
    /// # Errors
    ///
    /// Returns Error::AlreadyExists if the file exists.
    pub fn create<P: AsRef<Path>>(path: P, schema: Schema) -> Result<Self> {
        Self::create_with_config(path, schema, StorageConfig::default())
    }

    /// Creates a new store file with custom configuration.
    ///
    /// With `config.overwrite` set, an existing file is replaced.
    pub fn create_with_config<P: AsRef<Path>>(
        path: P,
        schema: Schema,
        config: StorageConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = TextFile::create(path, config.sync_mode, config.overwrite)?;
        let engine = StorageEngine::initialize(StoreFile::Disk(file), schema)?;
        info!(path = %path.display(), "Created database");
        Ok(Self::from_engine(engine))
    }

    /// Creates an in-memory database.
    ///
    /// Flushes rewrite a line buffer instead of a file; data is lost when
    /// the database is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rowlite::{Database, FieldType, Schema, Value};
    ///
    /// let schema = Schema::new(vec!["n"], vec![FieldType::Integer])?;
    /// let db = Database::in_memory(schema)?;
    /// let key = db.add_row(vec![Value::Integer(7)])?;
    /// assert_eq!(db.find_key(key)?, Some(vec![Value::Integer(7)]));
    /// # Ok::<(), rowlite::Error>(())
    /// ```
    pub fn in_memory(schema: Schema) -> Result<Self> {
        let engine = StorageEngine::initialize(StoreFile::Memory(MemoryFile::new()), schema)?;
        Ok(Self::from_engine(engine))
    }

    /// Inserts a row and returns its key.
    ///
    /// # Errors
    ///
    /// Returns Error::TypeMismatch if the row does not fit the schema, and
    /// Error::InvalidInput for string values the file format cannot hold.
    pub fn add_row(&self, data: Vec<Value>) -> Result<u64> {
        validate::validate_row(&data)?;
        self.engine()?.add_row(data)
    }

    /// Parses one text field per column and inserts the row.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rowlite::{Database, FieldType, Schema, Value};
    ///
    /// let schema = Schema::new(vec!["name", "age"], vec![FieldType::String, FieldType::Integer])?;
    /// let db = Database::in_memory(schema)?;
    /// let key = db.add_text_row(&["alice", "30"])?;
    /// assert_eq!(db.find_key(key)?, Some(vec![Value::from("alice"), Value::Integer(30)]));
    /// # Ok::<(), rowlite::Error>(())
    /// ```
    pub fn add_text_row(&self, fields: &[&str]) -> Result<u64> {
        let mut engine = self.engine()?;
        let schema = engine.schema().ok_or(Error::NotOpen)?;
        let data = validate::parse_row(fields, schema)?;
        engine.add_row(data)
    }

    /// Deletes the row with the given key.
    pub fn remove_row(&self, key: u64) -> Result<()> {
        self.engine()?.remove_row(key)
    }

    /// Returns the row with the given key, or `None` if it does not exist.
    pub fn find_key(&self, key: u64) -> Result<Option<Vec<Value>>> {
        self.engine()?.find_key(key)
    }

    /// Returns every row whose field equals `value`.
    pub fn find_by_field(&self, field_id: &str, value: &Value) -> Result<RowMap> {
        self.engine()?.find_by_field(field_id, value)
    }

    /// Returns every live row, ordered by key.
    pub fn find_all(&self) -> Result<RowMap> {
        self.engine()?.find_all()
    }

    /// Replaces one field of an existing row.
    pub fn update(&self, key: u64, field_id: &str, value: Value) -> Result<()> {
        validate::validate_value(&value)?;
        self.engine()?.update(key, field_id, value)
    }

    /// Writes pending changes to the file.
    ///
    /// # Errors
    ///
    /// Returns Error::InvalidOperation if nothing is pending.
    pub fn flush(&self) -> Result<CompactionStats> {
        self.engine()?.flush()
    }

    /// Flushes pending changes and releases the file.
    ///
    /// Every clone of this handle sees the closed store afterwards.
    pub fn close(&self) -> Result<()> {
        self.engine()?.close()
    }

    /// Replaces the schema of an empty store.
    pub fn set_schema(&self, schema: Schema) -> Result<()> {
        self.engine()?.set_schema(schema)
    }

    /// Returns a copy of the current schema.
    pub fn schema(&self) -> Result<Option<Schema>> {
        Ok(self.engine()?.schema().cloned())
    }

    /// Number of live rows, pending changes included.
    pub fn row_count(&self) -> Result<u64> {
        Ok(self.engine()?.row_count())
    }

    /// Returns whether a file is attached.
    pub fn is_open(&self) -> Result<bool> {
        Ok(self.engine()?.is_open())
    }

    /// Returns whether the store holds no rows.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.engine()?.is_empty())
    }

    /// Returns storage statistics.
    pub fn stats(&self) -> Result<StorageStats> {
        Ok(self.engine()?.stats())
    }

    /// Returns whether this database is backed by a file on disk.
    pub fn is_persistent(&self) -> Result<bool> {
        Ok(matches!(self.engine()?.file(), Some(StoreFile::Disk(_))))
    }
}
