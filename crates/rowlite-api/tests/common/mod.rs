// Common test utilities for database integration tests

use rowlite::{FieldType, Schema, Value};
use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary directory holding one store file path
pub struct TestStore {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestStore {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("store.db");
        Self { temp_dir, path }
    }
}

#[allow(dead_code)]
pub fn people() -> Schema {
    Schema::new(vec!["name", "age"], vec![FieldType::String, FieldType::Integer])
        .expect("valid schema")
}

#[allow(dead_code)]
pub fn person(name: &str, age: i64) -> Vec<Value> {
    vec![Value::from(name), Value::Integer(age)]
}
