//! Positionally aligned document table, persisted as one JSON array.

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, StoreError};
use crate::store::persist;
use crate::store::types::{DocumentRecord, NewDocument};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    records: Vec<DocumentRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table at `path`. A missing file yields an empty table.
    ///
    /// Every record's `id` must equal its position; files written with
    /// per-batch numbering are reported as corrupt rather than renumbered.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no metadata file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let records: Vec<DocumentRecord> =
            serde_json::from_str(&json).map_err(|e| StoreError::CorruptMetadata {
                path: PathBuf::from(path),
                reason: e.to_string(),
            })?;

        if let Some((position, record)) = records.iter().enumerate().find(|(i, r)| r.id != *i) {
            return Err(StoreError::CorruptMetadata {
                path: PathBuf::from(path),
                reason: format!("record at position {position} has id {}", record.id),
            });
        }

        tracing::info!(path = %path.display(), count = records.len(), "metadata loaded");
        Ok(Self { records })
    }

    /// Append documents with their embeddings, numbering them from the
    /// current length. Returns the ids assigned.
    pub fn append<I>(&mut self, documents: I) -> Range<usize>
    where
        I: IntoIterator<Item = (NewDocument, Vec<f32>)>,
    {
        let start = self.records.len();
        for (document, embedding) in documents {
            let id = self.records.len();
            self.records.push(document.into_record(id, embedding));
        }
        start..self.records.len()
    }

    pub fn get(&self, position: usize) -> Result<&DocumentRecord> {
        self.records.get(position).ok_or(StoreError::OutOfRange {
            position,
            len: self.records.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    /// Atomically write the whole table to `path`.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        persist::stage(path.as_ref(), &self.to_json(path.as_ref())?)?.commit()
    }

    pub(crate) fn to_json(&self, path: &Path) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.records
            .serialize(&mut ser)
            .map_err(|e| StoreError::io(path, e.into()))?;
        Ok(buf)
    }
}
