//! Provider abstractions for embeddings, generation, and the vector index
//!
//! Trait-based seams so the engine never depends on a concrete backend.
//! The vector index is always an external collaborator; Ollama ships as the
//! default embedding and generation backend.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod vector_index;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm, OllamaProvider};
pub use vector_index::{IndexHit, VectorIndexProvider};
