//! Schema, typed values and rows.
//!
//! A [`Schema`] lists the field identifiers of a store together with the
//! declared [`FieldType`] of each column. Every [`Row`] carries one
//! [`Value`] per field, in schema order.

use crate::error::{DecodeError, Error, Result};
use crate::format::DELIMITER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Signed 64-bit integer (`int`)
    Integer,
    /// 64-bit float (`float`)
    Float,
    /// Opaque text (`str`)
    String,
}

impl FieldType {
    /// The tag written to the metadata block
    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::Integer => "int",
            FieldType::Float => "float",
            FieldType::String => "str",
        }
    }

    /// Maps a metadata tag to a type. Unrecognised tags are strings.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "int" => FieldType::Integer,
            "float" => FieldType::Float,
            _ => FieldType::String,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// String value
    String(String),
}

impl Value {
    /// The type this value belongs to
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Integer(_) => FieldType::Integer,
            Value::Float(_) => FieldType::Float,
            Value::String(_) => FieldType::String,
        }
    }

    /// Parses a text token as a value of the given type.
    ///
    /// Strings pass through verbatim.
    pub fn parse(token: &str, ty: FieldType) -> std::result::Result<Value, DecodeError> {
        let invalid = || DecodeError::InvalidValue {
            token: token.to_string(),
            expected: ty,
        };
        match ty {
            FieldType::Integer => token.parse().map(Value::Integer).map_err(|_| invalid()),
            FieldType::Float => token.parse().map(Value::Float).map_err(|_| invalid()),
            FieldType::String => Ok(Value::String(token.to_string())),
        }
    }

    /// Rejects strings containing a line break.
    ///
    /// A row must stay on one line. Embedded delimiters are allowed: the
    /// row then fails to decode, but no other row appears.
    pub fn check_framing(&self) -> Result<()> {
        match self {
            Value::String(s) if s.contains(['\n', '\r']) => Err(Error::InvalidInput(format!(
                "string value {:?} contains a line break",
                s
            ))),
            _ => Ok(()),
        }
    }
}

/// Canonical text form, as written to a data line.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            // Debug keeps the fractional part ("30.0") and is shortest round-trip
            Value::Float(v) => write!(f, "{:?}", v),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// A persisted or pending row: its key and one value per field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Unique row key
    pub key: u64,
    /// Field values in schema order
    pub data: Vec<Value>,
}

impl Row {
    /// Creates a row
    pub fn new(key: u64, data: Vec<Value>) -> Self {
        Self { key, data }
    }
}

/// Field layout of a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    field_ids: Vec<String>,
    field_types: Vec<FieldType>,
}

impl Schema {
    /// Builds a schema from parallel lists of identifiers and types.
    ///
    /// Identifiers must be unique, non-empty and free of the field
    /// delimiter and line breaks, since the metadata block cannot escape them.
    pub fn new<S: Into<String>>(field_ids: Vec<S>, field_types: Vec<FieldType>) -> Result<Self> {
        let field_ids: Vec<String> = field_ids.into_iter().map(Into::into).collect();
        if field_ids.len() != field_types.len() {
            return Err(Error::SchemaMismatch(format!(
                "{} field ids but {} field types",
                field_ids.len(),
                field_types.len()
            )));
        }

        for (i, id) in field_ids.iter().enumerate() {
            if id.is_empty() || id.contains([DELIMITER, '\n', '\r']) {
                return Err(Error::InvalidInput(format!("invalid field id {:?}", id)));
            }
            if field_ids[..i].contains(id) {
                return Err(Error::InvalidInput(format!("duplicate field id {:?}", id)));
            }
        }

        Ok(Self {
            field_ids,
            field_types,
        })
    }

    /// Schema with no fields
    pub fn empty() -> Self {
        Self {
            field_ids: Vec::new(),
            field_types: Vec::new(),
        }
    }

    /// Number of fields in a row, not counting the key
    pub fn num_fields(&self) -> usize {
        self.field_ids.len()
    }

    /// Field identifiers in column order
    pub fn field_ids(&self) -> &[String] {
        &self.field_ids
    }

    /// Field types in column order
    pub fn field_types(&self) -> &[FieldType] {
        &self.field_types
    }

    /// Column index of a field identifier
    pub fn index_of(&self, field_id: &str) -> Option<usize> {
        self.field_ids.iter().position(|f| f == field_id)
    }

    /// Resolves `field_id` and checks that `value` matches its declared type.
    ///
    /// Returns the column index.
    pub fn resolve(&self, field_id: &str, value: &Value) -> Result<usize> {
        let index = self
            .index_of(field_id)
            .ok_or_else(|| Error::UnknownField(field_id.to_string()))?;
        let expected = self.field_types[index];
        if value.field_type() != expected {
            return Err(Error::TypeMismatch(format!(
                "field '{}' is {} but value is {}",
                field_id,
                expected,
                value.field_type()
            )));
        }
        Ok(index)
    }

    /// Checks that a tuple has one correctly typed value per field.
    pub fn check_row(&self, data: &[Value]) -> Result<()> {
        if data.len() != self.num_fields() {
            return Err(Error::TypeMismatch(format!(
                "expected {} values, got {}",
                self.num_fields(),
                data.len()
            )));
        }
        for ((id, expected), value) in self.field_ids.iter().zip(&self.field_types).zip(data) {
            if value.field_type() != *expected {
                return Err(Error::TypeMismatch(format!(
                    "field '{}' is {} but value is {}",
                    id,
                    expected,
                    value.field_type()
                )));
            }
            value.check_framing()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Schema {
        Schema::new(vec!["name", "age"], vec![FieldType::String, FieldType::Integer]).unwrap()
    }

    #[test]
    fn test_tag_mapping() {
        assert_eq!(FieldType::from_tag("int"), FieldType::Integer);
        assert_eq!(FieldType::from_tag("float"), FieldType::Float);
        assert_eq!(FieldType::from_tag("str"), FieldType::String);
        assert_eq!(FieldType::from_tag("blob"), FieldType::String);
        assert_eq!(FieldType::Float.to_string(), "float");
    }

    #[test]
    fn test_value_text_form() {
        assert_eq!(Value::Integer(-7).to_string(), "-7");
        assert_eq!(Value::Float(30.0).to_string(), "30.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::from("alice").to_string(), "alice");
    }

    #[test]
    fn test_value_parse() {
        assert_eq!(Value::parse("42", FieldType::Integer), Ok(Value::Integer(42)));
        assert_eq!(Value::parse("1.5", FieldType::Float), Ok(Value::Float(1.5)));
        assert_eq!(Value::parse("12", FieldType::Float), Ok(Value::Float(12.0)));
        assert_eq!(
            Value::parse(" 42", FieldType::String),
            Ok(Value::String(" 42".to_string()))
        );
        assert_eq!(
            Value::parse("4.2", FieldType::Integer),
            Err(DecodeError::InvalidValue {
                token: "4.2".to_string(),
                expected: FieldType::Integer,
            })
        );
    }

    #[test]
    fn test_schema_new_rejects_mismatched_lengths() {
        let err = Schema::new(vec!["a", "b", "c"], vec![FieldType::Integer]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }

    #[test]
    fn test_schema_new_rejects_bad_ids() {
        assert!(matches!(
            Schema::new(vec!["a,b"], vec![FieldType::Integer]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Schema::new(vec![""], vec![FieldType::Integer]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Schema::new(vec!["a", "a"], vec![FieldType::Integer, FieldType::Float]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_schema_resolve() {
        let schema = people();
        assert_eq!(schema.num_fields(), 2);
        assert_eq!(schema.resolve("age", &Value::Integer(3)).unwrap(), 1);
        assert!(matches!(
            schema.resolve("age", &Value::from("three")),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            schema.resolve("height", &Value::Integer(3)),
            Err(Error::UnknownField(f)) if f == "height"
        ));
    }

    #[test]
    fn test_schema_check_row() {
        let schema = people();
        assert!(schema
            .check_row(&[Value::from("bob"), Value::Integer(25)])
            .is_ok());
        assert!(matches!(
            schema.check_row(&[Value::from("bob")]),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            schema.check_row(&[Value::Integer(25), Value::from("bob")]),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_check_row_rejects_line_breaks() {
        let schema = people();
        for name in ["x\n7,mallory", "x\r7,mallory", "trailing\r\n"] {
            assert!(matches!(
                schema.check_row(&[Value::from(name), Value::Integer(1)]),
                Err(Error::InvalidInput(_))
            ));
        }
        // Delimiters are a decode problem, not a framing one
        assert!(schema
            .check_row(&[Value::from("smith, john"), Value::Integer(1)])
            .is_ok());
        assert!(Value::Integer(7).check_framing().is_ok());
    }
}
