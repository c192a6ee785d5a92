// Common test utilities for storage integration tests

use rowlite_core::{FieldType, Schema, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture that owns a temporary directory holding one store file
pub struct StoreFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl StoreFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("people.db");
        Self { temp_dir, path }
    }

    /// Fixture whose store file holds the given raw content
    #[allow(dead_code)]
    pub fn with_content(content: &str) -> Self {
        let fixture = Self::new();
        fs::write(&fixture.path, content).expect("Failed to write store file");
        fixture
    }

    #[allow(dead_code)]
    pub fn contents(&self) -> String {
        fs::read_to_string(&self.path).expect("Failed to read store file")
    }
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// The two-column schema used throughout the tests
#[allow(dead_code)]
pub fn people() -> Schema {
    Schema::new(vec!["name", "age"], vec![FieldType::String, FieldType::Integer])
        .expect("valid schema")
}

#[allow(dead_code)]
pub fn person(name: &str, age: i64) -> Vec<Value> {
    vec![Value::from(name), Value::Integer(age)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_content() {
        let fixture = StoreFixture::with_content("0\n\n\n-1\n0\n");
        assert!(fixture.path.exists());
        assert_eq!(fixture.contents(), "0\n\n\n-1\n0\n");
    }
}
