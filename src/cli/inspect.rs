//! CLI `inspect` command: display one stored document.

use anyhow::Result;

use cvsearch::config::CvConfig;
use cvsearch::store::Store;

pub fn inspect(config: &CvConfig, id: usize) -> Result<()> {
    let store = Store::open(config.store_paths())?;
    let record = store.get(id)?;

    println!("Document: {}", record.id);
    println!("{}", "=".repeat(50));
    for (key, value) in &record.fields {
        println!("  {:<14}{}", format!("{key}:"), value.as_deref().unwrap_or("(none)"));
    }
    println!("  {:<14}{}", "dimension:", record.embedding.len());
    println!();
    println!("Text:");
    for line in record.text.lines() {
        println!("  {line}");
    }
    Ok(())
}
