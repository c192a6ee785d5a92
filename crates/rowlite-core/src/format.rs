//! On-disk layout constants for the RowLite text format.
//!
//! A store file opens with a fixed metadata block followed by the data
//! region, one row per line:
//!
//! ```text
//! line 1: <numfields>
//! line 2: <fieldid1>,<fieldid2>,...,<fieldidN>,
//! line 3: <fieldtype1>,<fieldtype2>,...,<fieldtypeN>,
//! line 4: <key generator watermark>
//! line 5: <numrows>
//! line 6+: <key>,<value1>,...,<valueN>
//! ```

/// Number of metadata lines preceding the data region
pub const METADATA_LINES: usize = 5;

/// Separator between the tokens of a line
pub const DELIMITER: char = ',';

/// Watermark of a store that has not minted any key yet
pub const FRESH_WATERMARK: i64 = -1;

/// Splits a line into tokens, keeping empty tokens.
pub fn split_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(DELIMITER)
}

/// Splits a metadata list line, dropping empty tokens (the trailing
/// delimiter produces one).
pub fn split_list(line: &str) -> impl Iterator<Item = &str> {
    line.split(DELIMITER).filter(|t| !t.is_empty())
}
