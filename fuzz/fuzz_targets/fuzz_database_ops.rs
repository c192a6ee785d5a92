#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rowlite::{Database, FieldType, Schema, Value};

#[derive(Arbitrary, Debug)]
enum DbOp {
    Add { name: String, age: i64 },
    Remove { key: u8 },
    Find { key: u8 },
    FindByAge { age: i64 },
    FindAll,
    UpdateAge { key: u8, age: i64 },
    Flush,
}

fuzz_target!(|ops: Vec<DbOp>| {
    let Ok(schema) = Schema::new(vec!["name", "age"], vec![FieldType::String, FieldType::Integer])
    else {
        return;
    };
    // In-memory store for fast fuzzing
    let Ok(db) = Database::in_memory(schema) else {
        return;
    };

    for op in ops.iter().take(100) {
        // Limit operations to prevent timeout
        match op {
            DbOp::Add { name, age } => {
                if name.len() <= 256 {
                    let _ = db.add_row(vec![Value::from(name.as_str()), Value::Integer(*age)]);
                }
            }
            DbOp::Remove { key } => {
                let _ = db.remove_row(u64::from(*key));
            }
            DbOp::Find { key } => {
                let _ = db.find_key(u64::from(*key));
            }
            DbOp::FindByAge { age } => {
                let _ = db.find_by_field("age", &Value::Integer(*age));
            }
            DbOp::FindAll => {
                if let (Ok(all), Ok(count)) = (db.find_all(), db.row_count()) {
                    assert_eq!(all.len() as u64, count);
                }
            }
            DbOp::UpdateAge { key, age } => {
                let _ = db.update(u64::from(*key), "age", Value::Integer(*age));
            }
            DbOp::Flush => {
                let _ = db.flush();
            }
        }
    }
});
