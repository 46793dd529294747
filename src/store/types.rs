//! Record types shared by the metadata table and the services.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extracted attributes of a document (e.g. `name`, `email`, `phone`, `source`).
/// A key mapped to `None` was looked for but not found.
pub type StructuredFields = BTreeMap<String, Option<String>>;

/// Keys a structured field may not use, since fields are flattened into the
/// record object next to them.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "text", "embedding"];

/// A persisted document. `id` is its position in both the metadata table and
/// the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: usize,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(flatten)]
    pub fields: StructuredFields,
}

impl DocumentRecord {
    /// Look up a structured field, treating "absent" and "null" alike.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_deref())
    }

    pub fn name(&self) -> Option<&str> {
        self.field("name")
    }

    pub fn email(&self) -> Option<&str> {
        self.field("email")
    }

    pub fn phone(&self) -> Option<&str> {
        self.field("phone")
    }
}

/// A document handed to ingestion, before it has an id or an embedding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDocument {
    pub text: String,
    pub fields: StructuredFields,
}

impl NewDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fields: StructuredFields::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// The first field whose key is in [`RESERVED_FIELDS`].
    pub fn reserved_field(&self) -> Option<&str> {
        self.fields
            .keys()
            .map(String::as_str)
            .find(|key| RESERVED_FIELDS.contains(key))
    }

    pub(crate) fn into_record(self, id: usize, embedding: Vec<f32>) -> DocumentRecord {
        DocumentRecord {
            id,
            text: self.text,
            embedding,
            fields: self.fields,
        }
    }
}
