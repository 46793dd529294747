//! Plain-text document loading and structured field extraction.
//!
//! Binary formats (PDF, DOCX) are converted to text upstream; this module reads
//! `.txt` and `.md` files and pulls labelled attributes out of the text.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::WalkDir;

use crate::store::types::{NewDocument, StructuredFields};

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Name:[ \t]*(.*)").expect("valid regex"));
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Email:\s*(\S+@\S+)").expect("valid regex"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Phone:\s*(\+?[0-9\-()\s]+)").expect("valid regex"));

const EXTENSIONS: &[&str] = &["txt", "md"];

/// Extract `name`, `email`, and `phone`. Each key is always present, mapped to
/// `None` when the label is missing.
pub fn structured_fields(text: &str) -> StructuredFields {
    StructuredFields::from([
        ("name".to_string(), capture(&NAME, text)),
        ("email".to_string(), capture(&EMAIL, text)),
        ("phone".to_string(), capture(&PHONE, text)),
    ])
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Build an ingestion document from raw text, with extracted fields.
pub fn document_from_text(text: &str) -> NewDocument {
    let text = text.trim();
    NewDocument {
        text: text.to_string(),
        fields: structured_fields(text),
    }
}

/// Read every supported file under `paths`.
///
/// Directories are scanned one level deep; files are taken as given. Empty or
/// unreadable files are skipped with a warning. Each document records its
/// originating file name under `source`.
pub fn read_documents<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<NewDocument>> {
    let mut documents = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let mut files = WalkDir::new(path)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("failed to list {}", path.display()))?;
            files.retain(|e: &walkdir::DirEntry| e.file_type().is_file() && is_supported(e.path()));
            documents.extend(files.iter().filter_map(|e| read_one(e.path())));
        } else {
            anyhow::ensure!(path.exists(), "no such file or directory: {}", path.display());
            documents.extend(read_one(path));
        }
    }
    Ok(documents)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(e)))
}

fn read_one(path: &Path) -> Option<NewDocument> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
            return None;
        }
    };
    if text.trim().is_empty() {
        tracing::warn!(path = %path.display(), "skipping empty file");
        return None;
    }
    let source = path.file_name().map(|n| n.to_string_lossy().into_owned());
    Some(document_from_text(&text).with_field("source", source))
}
