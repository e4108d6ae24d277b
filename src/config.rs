//! Configuration for the document-understanding core

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsightConfig {
    /// Chunking and extraction configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Query expansion configuration
    #[serde(default)]
    pub expansion: ExpansionConfig,
    /// LLM (Ollama) configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Comparison engine configuration
    #[serde(default)]
    pub comparison: ComparisonConfig,
    /// Retry policy for external collaborators
    #[serde(default)]
    pub retry: RetryConfig,
}

impl InsightConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Extraction and chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub max_chunk_size: usize,
    /// Minimum chunk size (smaller prose fragments are merged forward or dropped)
    pub min_chunk_size: usize,
    /// Minimum grid dimensions for the table-aware pass to win reconciliation
    pub table_min_rows: usize,
    pub table_min_cols: usize,
    /// Fraction of the region's characters the table cells must account for
    pub table_char_coverage: f64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1500,
            min_chunk_size: 50,
            table_min_rows: 2,
            table_min_cols: 2,
            table_char_coverage: 0.8,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of results to return
    pub default_k: usize,
    /// Per-variant timeout in seconds for embedding + index query
    pub variant_timeout_secs: u64,
    /// Maximum variants queried concurrently
    pub max_concurrent_variants: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            variant_timeout_secs: 30,
            max_concurrent_variants: 4,
        }
    }
}

/// Query expansion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Maximum paraphrase variants requested from the LLM
    pub max_paraphrases: usize,
    /// Hard cap on total variants (original included)
    pub max_variants: usize,
    /// DDR clock-to-transfer-rate multiplier: 1 MHz clock = N MT/s.
    /// 2 for double data rate signaling. This is the only documented
    /// cross-family equivalence; no others are inferred.
    pub ddr_transfer_multiplier: u32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_paraphrases: 3,
            max_variants: 12,
            ddr_transfer_multiplier: 2,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "phi3".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
        }
    }
}

/// Comparison engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Token window around a parameter mention searched for values in prose
    pub prose_window_tokens: usize,
    /// Retrieval k multiplier for comparison-intent queries
    pub k_boost: usize,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            prose_window_tokens: 12,
            k_boost: 2,
        }
    }
}

/// Retry policy configuration, applied uniformly to external collaborator calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per call (1 = no retry)
    pub max_attempts: u32,
    /// Base delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Ceiling on the backoff delay, in milliseconds
    pub max_delay_ms: u64,
    /// Jitter fraction applied to each delay (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            jitter: 0.2,
        }
    }
}
