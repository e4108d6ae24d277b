//! Vector index provider trait
//!
//! The index is an external collaborator: this crate only knows how to
//! upsert chunk embeddings and run similarity queries against it. Index
//! construction and persistence live behind the trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Chunk;

/// A similarity hit returned from the index
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub chunk: Chunk,
    /// Similarity score, higher is closer
    pub score: f32,
}

/// Trait for the external vector index
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Insert or replace a chunk and its embedding, keyed by chunk id
    async fn upsert(&self, chunk: &Chunk, embedding: &[f32]) -> Result<()>;

    /// Return the `k` nearest chunks to `embedding`, best first
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<IndexHit>>;

    /// Delete every chunk ingested from `source_document`; returns the
    /// number of entries removed
    async fn delete_by_source(&self, source_document: &str) -> Result<usize>;

    /// Check if the index is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
