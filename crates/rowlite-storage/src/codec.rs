//! Row Codec - text encoding of the metadata block and data lines
//!
//! Rows are written as `key,value1,...,valueN` using each value's
//! canonical text form. Values are not escaped: a string containing the
//! delimiter produces a line with too many tokens, which then fails to
//! decode with [`DecodeError::FieldCount`].

use rowlite_core::format::{self, FRESH_WATERMARK, METADATA_LINES};
use rowlite_core::{DecodeError, Error, FieldType, Result, Row, Schema, Value};

/// Contents of the metadata block
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Field layout
    pub schema: Schema,
    /// Key generator watermark (last minted key, or -1)
    pub watermark: i64,
    /// Logical number of rows
    pub row_count: u64,
}

impl Metadata {
    /// Metadata for a freshly created store
    pub fn fresh(schema: Schema) -> Self {
        Self {
            schema,
            watermark: FRESH_WATERMARK,
            row_count: 0,
        }
    }
}

fn parse_int<T: std::str::FromStr>(line: &str, what: &str) -> Result<T> {
    line.trim()
        .parse()
        .map_err(|_| Error::ParseFailure(format!("unable to parse {} from {:?}", what, line)))
}

/// Parses the metadata block from the first lines of a store file.
///
/// Non-integers where integers are expected yield [`Error::ParseFailure`];
/// field lists whose length disagrees with `numfields` yield
/// [`Error::SchemaMismatch`].
pub fn parse_metadata<S: AsRef<str>>(lines: &[S]) -> Result<Metadata> {
    if lines.len() < METADATA_LINES {
        return Err(Error::ParseFailure(format!(
            "expected {} metadata lines, found {}",
            METADATA_LINES,
            lines.len()
        )));
    }

    let num_fields: usize = parse_int(lines[0].as_ref(), "numfields")?;

    let field_ids: Vec<&str> = format::split_list(lines[1].as_ref()).collect();
    if field_ids.len() != num_fields {
        return Err(Error::SchemaMismatch(format!(
            "numfields is {} but {} field ids are listed",
            num_fields,
            field_ids.len()
        )));
    }

    let field_types: Vec<FieldType> = format::split_list(lines[2].as_ref())
        .map(FieldType::from_tag)
        .collect();
    if field_types.len() != num_fields {
        return Err(Error::SchemaMismatch(format!(
            "numfields is {} but {} field types are listed",
            num_fields,
            field_types.len()
        )));
    }

    let watermark: i64 = parse_int(lines[3].as_ref(), "keygen")?;
    if watermark < FRESH_WATERMARK {
        return Err(Error::ParseFailure(format!(
            "keygen watermark {} is below {}",
            watermark, FRESH_WATERMARK
        )));
    }

    let row_count: u64 = parse_int(lines[4].as_ref(), "numrows")?;

    let schema = Schema::new(field_ids, field_types).map_err(|e| match e {
        Error::InvalidInput(msg) => Error::SchemaMismatch(msg),
        other => other,
    })?;

    Ok(Metadata {
        schema,
        watermark,
        row_count,
    })
}

/// Joins list items, each followed by the delimiter.
fn join_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let mut line = String::new();
    for item in items {
        line.push_str(item);
        line.push(format::DELIMITER);
    }
    line
}

/// Renders the metadata block, one string per line.
pub fn encode_metadata(meta: &Metadata) -> Vec<String> {
    vec![
        meta.schema.num_fields().to_string(),
        join_list(meta.schema.field_ids().iter().map(String::as_str)),
        join_list(meta.schema.field_types().iter().map(|t| t.tag())),
        meta.watermark.to_string(),
        meta.row_count.to_string(),
    ]
}

/// Serializes a row as a data line (without the line terminator).
pub fn encode_row(key: u64, data: &[Value], schema: &Schema) -> String {
    debug_assert_eq!(data.len(), schema.num_fields());
    let mut line = key.to_string();
    for value in data.iter().take(schema.num_fields()) {
        line.push(format::DELIMITER);
        line.push_str(&value.to_string());
    }
    line
}

/// Parses a data line into a row.
///
/// Nothing is returned for a line with any bad token, or with bytes that
/// are not UTF-8.
pub fn decode_row(
    line: impl AsRef<[u8]>,
    schema: &Schema,
) -> std::result::Result<Row, DecodeError> {
    let line = std::str::from_utf8(line.as_ref()).map_err(|_| DecodeError::InvalidUtf8)?;
    let tokens: Vec<&str> = format::split_tokens(line).collect();
    if tokens.len() != schema.num_fields() + 1 {
        return Err(DecodeError::FieldCount {
            expected: schema.num_fields() + 1,
            found: tokens.len(),
        });
    }

    let key = tokens[0]
        .parse()
        .map_err(|_| DecodeError::InvalidKey(tokens[0].to_string()))?;

    let data = tokens[1..]
        .iter()
        .zip(schema.field_types())
        .map(|(token, ty)| Value::parse(token, *ty))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Row { key, data })
}

/// Reads only the key of a data line, without decoding its values.
///
/// Only the key token has to be UTF-8.
pub fn leading_key(line: impl AsRef<[u8]>) -> Option<u64> {
    let line = line.as_ref();
    let end = line
        .iter()
        .position(|&b| b == format::DELIMITER as u8)
        .unwrap_or(line.len());
    std::str::from_utf8(&line[..end]).ok()?.parse().ok()
}
