//! Résumé retrieval over an exact vector index.
//!
//! `cvsearch` ingests plain-text documents, embeds them, and keeps two files in
//! lock-step: a flat inner-product vector index and a JSON table of
//! per-document metadata. Position `i` in one is always position `i` in the
//! other.
//!
//! # Architecture
//!
//! - **Embeddings**: [`embedding::EmbeddingProvider`], with a local ONNX Runtime
//!   implementation; the vector dimension is discovered from the model
//! - **Index**: [`store::index::VectorIndex`], append-only exhaustive search
//! - **Metadata**: [`store::metadata::MetadataStore`], ids equal positions
//! - **Store**: [`store::Store`], the only owner of both files; it commits them
//!   together and resets them together
//! - **Services**: [`store::ingest::IngestionService`] and
//!   [`store::search::SearchService`]
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`embedding`]: text-to-vector providers
//! - [`error`]: the [`StoreError`] taxonomy
//! - [`extract`]: plain-text document loading and field extraction
//! - [`store`]: index, metadata, and the ingest/search services

pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod store;

pub use error::StoreError;
