//! CLI `reset` command: delete the index and metadata after confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use cvsearch::config::CvConfig;
use cvsearch::store::Store;

pub fn reset(config: &CvConfig, assume_yes: bool) -> Result<()> {
    let paths = config.store_paths();

    if !assume_yes {
        println!("WARNING: This will permanently delete every ingested document.");
        println!("Index:    {}", paths.index.display());
        println!("Metadata: {}", paths.metadata.display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if input.trim() != "YES" {
            bail!("reset cancelled");
        }
    }

    Store::reset(&paths)?;
    println!("Index and metadata deleted. Store reset complete.");
    Ok(())
}
