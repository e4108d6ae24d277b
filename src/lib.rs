//! jedec-insight: grounded question answering and comparison over JEDEC
//! memory standard documents
//!
//! The pipeline ingests PDF standards with table-preserving extraction,
//! expands queries through a domain synonym and unit dictionary, retrieves
//! per variant from an external vector index, and answers either with a
//! grounded free-text response or a structured parameter comparison.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use jedec_insight::{InsightConfig, InsightEngine};
//! use jedec_insight::providers::OllamaProvider;
//!
//! # async fn run(index: Arc<dyn jedec_insight::providers::VectorIndexProvider>) -> jedec_insight::Result<()> {
//! let config = InsightConfig::default();
//! let (embedder, llm) = OllamaProvider::new(&config.llm, 768)?.split();
//! let engine = InsightEngine::new(config, Arc::new(embedder), index, Arc::new(llm));
//!
//! let report = engine.ingest(&std::fs::read("jesd79-4.pdf")?, "jesd79-4.pdf").await?;
//! println!("ingested {} chunks", report.chunks_created);
//!
//! let response = engine.answer("DDR4 vs DDR5 tCK", None).await?;
//! # Ok(())
//! # }
//! ```

pub mod comparison;
pub mod config;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod expansion;
pub mod extraction;
pub mod generation;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::InsightConfig;
pub use engine::InsightEngine;
pub use error::{Error, Result};
pub use types::{Answer, AnswerResponse, ComparisonResult, IngestReport};

/// Initialize tracing with an env-filtered subscriber. Intended for
/// binaries and integration tests; the library itself never installs a
/// subscriber.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
