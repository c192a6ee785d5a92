//! Demonstrates RowLite's persistent storage capabilities.
//!
//! Run with: cargo run -p rowlite --example persistent_demo

use rowlite::{Database, FieldType, Schema, Value};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = "./demo_people.db";

    println!("=== RowLite Persistent Store Demo ===\n");

    // Clean up any previous demo data
    if Path::new(db_path).exists() {
        std::fs::remove_file(db_path)?;
        println!("🧹 Cleaned up previous demo data\n");
    }

    let schema = Schema::new(
        vec!["name", "email", "age"],
        vec![FieldType::String, FieldType::String, FieldType::Integer],
    )?;

    // PART 1: Write rows
    println!("📝 PART 1: Writing rows to the store...");
    {
        let db = Database::create(db_path, schema)?;

        db.add_text_row(&["Alice", "alice@example.com", "34"])?;
        db.add_text_row(&["Bob", "bob@example.com", "27"])?;
        db.add_row(vec![
            Value::from("Carol"),
            Value::from("carol@example.com"),
            Value::Integer(41),
        ])?;

        let stats = db.stats()?;
        println!("   ✅ Added {} rows ({} pending)", stats.row_count, stats.pending_rows);

        // Closing flushes the cache into the file
        db.close()?;
        println!("   📁 Data written to: {}", db_path);
    }
    println!("   🔒 Store closed\n");

    // PART 2: Reopen and verify
    println!("🔓 PART 2: Reopening the store and verifying rows...");
    {
        let db = Database::open(db_path)?;
        println!("   📊 Row count: {}", db.row_count()?);

        for (key, row) in db.find_all()? {
            println!("   {} => {:?}", key, row);
        }

        let bob = db.find_by_field("name", &Value::from("Bob"))?;
        println!("   🔍 Rows named Bob: {:?}", bob.keys().collect::<Vec<_>>());
    }

    // PART 3: Modify and flush
    println!("\n✏️  PART 3: Updating and removing rows...");
    {
        let db = Database::open(db_path)?;
        db.update(0, "age", Value::Integer(35))?;
        db.remove_row(1)?;
        let key = db.add_text_row(&["Dave", "dave@example.com", "52"])?;
        println!("   ➕ New row got key {}", key);

        let stats = db.flush()?;
        println!(
            "   💾 Flushed: {} retained, {} replaced, {} removed, {} appended",
            stats.retained, stats.replaced, stats.removed, stats.appended
        );
    }

    println!("\n📄 File contents:");
    for line in std::fs::read_to_string(db_path)?.lines() {
        println!("   {}", line);
    }

    std::fs::remove_file(db_path)?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
