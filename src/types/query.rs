//! Query-side types: expanded queries, scored chunks, comparison requests

use serde::{Deserialize, Serialize};

use super::chunk::Chunk;

/// An original query plus its rewrite variants. The original is always the
/// first variant; deduplication is case-insensitive and keeps first
/// occurrence, so ordering encodes provenance (synonym and unit rewrites
/// before paraphrases).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandedQuery {
    pub original: String,
    /// All variants to retrieve with, original first
    pub variants: Vec<String>,
}

impl ExpandedQuery {
    pub fn new(original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            variants: vec![original.clone()],
            original,
        }
    }

    /// Append a variant unless an equal one (ignoring case) is present
    pub fn push(&mut self, variant: impl Into<String>) {
        let variant = variant.into();
        let lowered = variant.to_lowercase();
        if !self.variants.iter().any(|v| v.to_lowercase() == lowered) {
            self.variants.push(variant);
        }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn truncate(&mut self, max_variants: usize) {
        self.variants.truncate(max_variants.max(1));
    }
}

/// A retrieved chunk with its similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Which parameters a comparison covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "parameters", rename_all = "snake_case")]
pub enum ParameterSet {
    /// Parameters the query named, canonical names
    Explicit(Vec<String>),
    /// No parameters named; resolve from the retrieved chunks
    Inferred,
}

/// A detected comparison intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRequest {
    /// Canonical entity names, in query appearance order
    pub entities: Vec<String>,
    pub parameters: ParameterSet,
}
