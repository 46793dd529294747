//! CLI `stats` command: report what the store holds and whether it is consistent.

use anyhow::Result;
use std::path::Path;

use cvsearch::config::CvConfig;
use cvsearch::error::StoreError;
use cvsearch::store::Store;

pub fn stats(config: &CvConfig) -> Result<()> {
    let paths = config.store_paths();

    println!("Store Statistics");
    println!("{}", "=".repeat(40));
    println!("  Index file:     {}", describe_file(&paths.index));
    println!("  Metadata file:  {}", describe_file(&paths.metadata));
    println!("  Model:          {}", config.embedding.model);
    println!();

    match Store::open(paths) {
        Ok(store) if !store.is_initialized() => {
            println!("Store is empty. Run `cvsearch ingest <PATH>` to add documents.");
        }
        Ok(store) => {
            println!("  Documents:      {}", store.len());
            println!(
                "  Dimension:      {}",
                store.dimension().unwrap_or_default()
            );
            let named = store.records().iter().filter(|r| r.name().is_some()).count();
            let with_email = store.records().iter().filter(|r| r.email().is_some()).count();
            println!("  With name:      {named}");
            println!("  With email:     {with_email}");
            println!("  Alignment:      OK");
        }
        Err(e @ StoreError::MisalignedStores { .. }) => {
            println!("  Alignment:      FAILED ({e})");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn describe_file(path: &Path) -> String {
    match std::fs::metadata(path) {
        Ok(meta) => format!("{} ({})", path.display(), format_bytes(meta.len())),
        Err(_) => format!("{} (absent)", path.display()),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
