/// Input validation for front ends
///
/// The engine type-checks values but cannot escape them: a string that
/// contains the field delimiter or a line break corrupts its data line.
/// These helpers reject such input up front and turn user-entered text
/// into typed values.
use rowlite_core::error::{Error, Result};
use rowlite_core::format::DELIMITER;
use rowlite_core::{FieldType, Schema, Value};

/// Maximum length of a string value in bytes
pub const MAX_STRING_LEN: usize = 64 * 1024; // 64 KB

/// Validates a single value
///
/// # Errors
///
/// Returns Error::InvalidInput for strings that contain the delimiter or a
/// line break, or that exceed [`MAX_STRING_LEN`]
#[inline]
pub fn validate_value(value: &Value) -> Result<()> {
    let Value::String(s) = value else {
        return Ok(());
    };

    if s.contains([DELIMITER, '\n', '\r']) {
        return Err(Error::InvalidInput(format!(
            "String value {:?} contains a delimiter or line break",
            s
        )));
    }

    if s.len() > MAX_STRING_LEN {
        return Err(Error::InvalidInput(format!(
            "String length {} exceeds maximum {}",
            s.len(),
            MAX_STRING_LEN
        )));
    }

    Ok(())
}

/// Validates every value of a row
#[inline]
pub fn validate_row(data: &[Value]) -> Result<()> {
    data.iter().try_for_each(validate_value)
}

/// Parses user-entered text as a value of the given type
///
/// # Errors
///
/// Returns Error::InvalidInput if the text is not a valid literal of the
/// type, or if it fails [`validate_value`]
pub fn parse_value(text: &str, ty: FieldType) -> Result<Value> {
    let trimmed = match ty {
        FieldType::String => text,
        FieldType::Integer | FieldType::Float => text.trim(),
    };
    let value = Value::parse(trimmed, ty).map_err(|e| Error::InvalidInput(e.to_string()))?;
    validate_value(&value)?;
    Ok(value)
}

/// Parses one text field per schema column into a row
///
/// # Errors
///
/// Returns Error::TypeMismatch if the number of fields is wrong, or
/// Error::InvalidInput if a field does not parse
pub fn parse_row(fields: &[&str], schema: &Schema) -> Result<Vec<Value>> {
    if fields.len() != schema.num_fields() {
        return Err(Error::TypeMismatch(format!(
            "expected {} values, got {}",
            schema.num_fields(),
            fields.len()
        )));
    }

    fields
        .iter()
        .zip(schema.field_types())
        .map(|(text, ty)| parse_value(text, *ty))
        .collect()
}
