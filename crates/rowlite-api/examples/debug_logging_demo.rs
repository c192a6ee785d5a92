use rowlite::logging::LogConfig;
use rowlite::{Database, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Debug-level logging to stdout and a rolling file
    let log_dir = std::env::temp_dir().join("rowlite-demo-logs");
    let _guard = LogConfig::debug()
        .with_both(log_dir.join("rowlite.log"))
        .init();

    println!("=== RowLite Debug Logging Demo ===\n");

    // A store file with one row whose age is not an integer
    let db_path = std::env::temp_dir().join("rowlite-debug-demo.db");
    std::fs::write(
        &db_path,
        "2\nname,age,\nstr,int,\n2\n3\n0,alice,30\n1,bob,unknown\n2,carol,41\n",
    )?;

    let db = Database::open(&db_path)?;

    println!("\n1. Scanning with a corrupt row (watch for the warning)...");
    let all = db.find_all()?;
    println!("Decoded {} of {} rows", all.len(), db.row_count()?);

    println!("\n2. Mutations with debug logs...");
    db.update(0, "age", Value::Integer(31))?;
    db.remove_row(2)?;
    db.add_text_row(&["dave", "52"])?;

    println!("\n3. Flushing...");
    db.close()?;

    std::fs::remove_file(&db_path)?;
    println!("\nLog files written to {}", log_dir.display());
    println!("\n=== Debug Logging Demo Complete ===");

    Ok(())
}
