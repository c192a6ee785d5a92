#![no_main]

use libfuzzer_sys::fuzz_target;
use rowlite_core::{FieldType, Schema};
use rowlite_storage::codec;

fuzz_target!(|data: &[u8]| {
    // Limit input size to prevent timeout
    if data.len() > 64 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Metadata parsing should never panic
    let lines: Vec<&str> = text.lines().collect();
    let _ = codec::parse_metadata(&lines);

    // Neither should row decoding, against a schema covering every type
    if let Ok(schema) = Schema::new(
        vec!["s", "i", "f"],
        vec![FieldType::String, FieldType::Integer, FieldType::Float],
    ) {
        for line in &lines {
            let _ = codec::leading_key(line);
            if let Ok(row) = codec::decode_row(line, &schema) {
                // Re-encoding a decoded row is stable
                let encoded = codec::encode_row(row.key, &row.data, &schema);
                let again = codec::decode_row(&encoded, &schema)
                    .map(|row| codec::encode_row(row.key, &row.data, &schema));
                assert_eq!(again.ok(), Some(encoded));
            }
        }
    }
});
