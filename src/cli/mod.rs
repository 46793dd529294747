pub mod ingest;
pub mod inspect;
pub mod reset;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::io::AsyncWriteExt;

use cvsearch::config::EmbeddingConfig;

const HF_BASE: &str = "https://huggingface.co/sentence-transformers";

/// Download the configured model's ONNX export and tokenizer into the cache.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    let dir = cvsearch::embedding::local::model_dir(config);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create model dir: {}", dir.display()))?;

    let files = [
        ("onnx/model.onnx", dir.join("model.onnx")),
        ("tokenizer.json", dir.join("tokenizer.json")),
    ];

    for (remote, local) in &files {
        if local.exists() {
            println!("{} already present", local.display());
            continue;
        }
        let url = format!("{HF_BASE}/{}/resolve/main/{remote}", config.model);
        println!("Downloading {remote}...");
        download_file(&url, local).await?;
        println!("Saved to {}", local.display());
    }

    println!("Model {} ready.", config.model);
    Ok(())
}

/// Stream `url` to `dest` with a progress bar, writing to a temp file first.
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download of {url} failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                    .context("invalid progress template")?
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        pb.inc(chunk.len() as u64);
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to move downloaded file into place")?;

    pb.finish_and_clear();
    Ok(())
}

/// Shorten `text` to `max_chars` characters on a char boundary.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &flat[..end]),
        None => flat,
    }
}
