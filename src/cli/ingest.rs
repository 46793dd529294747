//! CLI `ingest` command: read text files, embed them, and append to the store.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use cvsearch::config::CvConfig;
use cvsearch::embedding::{self, EmbeddingProvider};
use cvsearch::extract;
use cvsearch::store::ingest::IngestionService;
use cvsearch::store::Store;

pub async fn ingest(config: &CvConfig, paths: &[PathBuf]) -> Result<()> {
    let documents = extract::read_documents(paths)?;
    if documents.is_empty() {
        println!("No readable .txt or .md documents found.");
        return Ok(());
    }
    println!("Embedding {} document(s)...", documents.len());

    let mut store = Store::open(config.store_paths()).context("failed to open store")?;
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    let normalize = config.embedding.normalize;

    let report = tokio::task::spawn_blocking(move || {
        IngestionService::new(provider.as_ref(), normalize).ingest(&mut store, documents)
    })
    .await??;

    if let Some(r) = &report.recreated {
        println!(
            "WARNING: embedding dimension changed from {} to {}; {} previously stored document(s) were discarded.",
            r.previous_dimension, report.dimension, r.discarded
        );
    }
    println!(
        "Ingested {} document(s) as ids {}..{} (dimension {}). Store now holds {}.",
        report.added, report.ids.start, report.ids.end, report.dimension, report.total
    );
    Ok(())
}
