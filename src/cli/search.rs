use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;

use cvsearch::config::CvConfig;
use cvsearch::embedding::{self, EmbeddingProvider};
use cvsearch::store::search::{SearchOptions, SearchService};
use cvsearch::store::types::StructuredFields;
use cvsearch::store::Store;

/// JSON shape of one hit; the embedding is left out.
#[derive(Debug, Serialize)]
struct HitView {
    id: usize,
    score: f32,
    #[serde(flatten)]
    fields: StructuredFields,
    text: String,
}

/// Run a search from the terminal.
pub async fn search(config: &CvConfig, query: &str, options: SearchOptions, json: bool) -> Result<()> {
    let store = Store::open(config.store_paths())?;
    if !store.is_initialized() || store.is_empty() {
        if json {
            println!("[]");
        } else {
            println!("No documents ingested yet.");
        }
        return Ok(());
    }

    let provider: Arc<dyn EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    let query_text = query.to_string();

    let views: Vec<HitView> = tokio::task::spawn_blocking(move || {
        SearchService::new(provider.as_ref(), options)
            .search(&store, &query_text)
            .map(|hits| {
                hits.into_iter()
                    .map(|h| HitView {
                        id: h.record.id,
                        score: h.score,
                        fields: h.record.fields.clone(),
                        text: h.record.text.clone(),
                    })
                    .collect::<Vec<_>>()
            })
    })
    .await??;

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!(
            "No documents scored at or above {:.2}.",
            options.threshold
        );
        return Ok(());
    }

    println!("Found {} result(s)\n", views.len());
    for (i, hit) in views.iter().enumerate() {
        let label = hit
            .fields
            .get("name")
            .and_then(|v| v.as_deref())
            .or_else(|| hit.fields.get("source").and_then(|v| v.as_deref()))
            .unwrap_or("(unnamed)");
        println!("  {}. [{}] {} (score: {:.4})", i + 1, hit.id, label, hit.score);
        println!("     {}", super::preview(&hit.text, 120));
        println!();
    }

    Ok(())
}
