use rowlite::logging::LogConfig;
use rowlite::{Database, FieldType, Schema, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (info level with pretty output to stdout)
    let _guard = LogConfig::info().init();

    println!("=== RowLite Logging Demo ===\n");

    let schema = Schema::new(
        vec!["sku", "price"],
        vec![FieldType::String, FieldType::Float],
    )?;
    let db = Database::in_memory(schema)?;

    println!("\n1. Inserting rows...");
    db.add_row(vec![Value::from("A-100"), Value::Float(9.5)])?;
    db.add_row(vec![Value::from("B-200"), Value::Float(12.0)])?;
    db.add_row(vec![Value::from("C-300"), Value::Float(3.25)])?;

    println!("\n2. Reading rows...");
    if let Some(row) = db.find_key(1)? {
        println!("Found: {:?}", row);
    }

    println!("\n3. Removing a row...");
    db.remove_row(2)?;

    println!("\n4. Flushing the cache...");
    db.flush()?;

    println!("\n5. Closing...");
    db.close()?;

    println!("\n=== Demo Complete ===");
    println!("Check the logs above to see tracing output!");

    Ok(())
}
