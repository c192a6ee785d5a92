//! # RowLite Core
//!
//! Core types shared by the RowLite crates: the error type, the schema
//! and value model, and the constants of the on-disk text format.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod format;
pub mod schema;

pub use error::{DecodeError, Error, Result};
pub use schema::{FieldType, Row, Schema, Value};
