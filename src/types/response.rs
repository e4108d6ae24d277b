//! Response types: ingestion reports, answers, comparison results

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chunk::Chunk;
use crate::dictionary::UnitValue;

/// Non-fatal conditions surfaced alongside results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Some pages failed to extract; the rest of the document was kept
    PartialExtraction { failed_pages: Vec<u32> },
    /// One query variant failed retrieval; other variants still merged
    VariantRetrievalFailed { variant: String, message: String },
    /// Retrieval was cancelled before all variants completed
    RetrievalCancelled { variants_completed: usize },
}

/// Where an answer's evidence came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_document: String,
    pub page_number: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub section_path: Vec<String>,
}

impl SourceRef {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            source_document: chunk.source_document.clone(),
            page_number: chunk.page_number,
            section_path: chunk.section_path.clone(),
        }
    }

    /// Citation text, e.g. "jesd79-4.pdf, Page 12, Section: 4.1 AC Timing"
    pub fn format_citation(&self) -> String {
        let mut parts = vec![self.source_document.clone(), format!("Page {}", self.page_number)];
        if let Some(section) = self.section_path.last() {
            parts.push(format!("Section: {}", section));
        }
        parts.join(", ")
    }
}

/// Report returned from document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_id: Uuid,
    pub source_document: String,
    pub chunks_created: usize,
    pub table_chunks: usize,
    pub prose_chunks: usize,
    /// Chunks deleted from a prior ingestion of the same source
    pub chunks_replaced: usize,
    pub ingested_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// One cell of a comparison table. An entity with no extractable value gets
/// `NotFound`, never a guess and never a dropped column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Value(UnitValue),
    NotFound,
}

impl CellValue {
    /// Rendering used in Markdown tables and narrative prompts
    pub fn display(&self) -> String {
        match self {
            Self::Value(v) => v.to_string(),
            Self::NotFound => "not found".to_string(),
        }
    }
}

/// One parameter row of a comparison, cells aligned to the result's entities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Canonical parameter name
    pub parameter: String,
    /// Shared unit the row's values were converted to; None for
    /// dimensionless parameters
    pub unit: Option<String>,
    pub values: Vec<CellValue>,
}

/// A structured comparison plus its renderings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Canonical entity names, column order of every row
    pub entities: Vec<String>,
    pub rows: Vec<ComparisonRow>,
    /// Pipe-delimited Markdown rendering of the rows
    pub table_markdown: String,
    /// LLM narrative synthesized from the structured rows only
    pub narrative: String,
}

/// The answer payload of a query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    /// Grounded free-text answer
    Direct { text: String },
    /// Structured comparison with table and narrative
    Comparison(ComparisonResult),
}

/// Full response from `answer()`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: Answer,
    /// Evidence chunks behind the answer, deduplicated, best first
    pub sources: Vec<SourceRef>,
    /// Every query variant that was retrieved with, original first
    pub expanded_queries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}
