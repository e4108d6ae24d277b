//! Chunk types with source tracking for citations

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// What kind of content a chunk carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Running prose
    Prose,
    /// A detected table rendered as pipe-delimited Markdown
    Table,
}

/// Shape of a table chunk's grid. The header row counts toward `row_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Header cell texts, left to right
    pub columns: Vec<String>,
    /// Total rows including the header
    pub row_count: usize,
}

/// A retrievable unit of document text. Table chunks hold the table's
/// Markdown rendering; re-parsing it recovers the grid recorded in
/// `table_schema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable id derived from source, page and offset
    pub id: String,
    pub kind: ChunkKind,
    /// Chunk text; Markdown for table chunks
    pub text: String,
    /// Filename the chunk was extracted from
    pub source_document: String,
    /// 1-indexed page number
    pub page_number: u32,
    /// Nearest preceding heading path, outermost first
    pub section_path: Vec<String>,
    /// Grid shape, present on table chunks only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_schema: Option<TableSchema>,
}

impl Chunk {
    /// Stable chunk id: SHA-256 over source, page and character offset.
    /// Re-ingesting the same document produces the same ids, so
    /// delete-then-insert replacement never strands stale entries.
    pub fn make_id(source_document: &str, page_number: u32, char_offset: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source_document.as_bytes());
        hasher.update(b"|");
        hasher.update(page_number.to_le_bytes());
        hasher.update(b"|");
        hasher.update(char_offset.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn prose(
        text: String,
        source_document: &str,
        page_number: u32,
        section_path: Vec<String>,
        char_offset: usize,
    ) -> Self {
        Self {
            id: Self::make_id(source_document, page_number, char_offset),
            kind: ChunkKind::Prose,
            text,
            source_document: source_document.to_string(),
            page_number,
            section_path,
            table_schema: None,
        }
    }

    pub fn table(
        markdown: String,
        schema: TableSchema,
        source_document: &str,
        page_number: u32,
        section_path: Vec<String>,
        char_offset: usize,
    ) -> Self {
        Self {
            id: Self::make_id(source_document, page_number, char_offset),
            kind: ChunkKind::Table,
            text: markdown,
            source_document: source_document.to_string(),
            page_number,
            section_path,
            table_schema: Some(schema),
        }
    }

    pub fn is_table(&self) -> bool {
        self.kind == ChunkKind::Table
    }

    /// Metadata map stored next to the embedding in the vector index
    pub fn to_index_metadata(&self) -> HashMap<String, serde_json::Value> {
        let mut meta = HashMap::new();
        meta.insert("chunk_id".to_string(), serde_json::json!(self.id));
        meta.insert("kind".to_string(), serde_json::json!(self.kind));
        meta.insert(
            "source_document".to_string(),
            serde_json::json!(self.source_document),
        );
        meta.insert("page_number".to_string(), serde_json::json!(self.page_number));
        meta.insert("text".to_string(), serde_json::json!(self.text));
        if !self.section_path.is_empty() {
            meta.insert(
                "section_path".to_string(),
                serde_json::json!(self.section_path),
            );
        }
        if let Some(schema) = &self.table_schema {
            meta.insert("table_columns".to_string(), serde_json::json!(schema.columns));
            meta.insert("table_rows".to_string(), serde_json::json!(schema.row_count));
        }
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_and_offset_sensitive() {
        let a = Chunk::make_id("jesd79-4.pdf", 3, 0);
        let b = Chunk::make_id("jesd79-4.pdf", 3, 0);
        let c = Chunk::make_id("jesd79-4.pdf", 3, 1500);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn table_metadata_includes_schema() {
        let chunk = Chunk::table(
            "| P | DDR4 |\n| --- | --- |\n| tCK | 0.75 ns |".to_string(),
            TableSchema {
                columns: vec!["P".to_string(), "DDR4".to_string()],
                row_count: 2,
            },
            "spec.pdf",
            1,
            vec!["4 AC Timing".to_string()],
            0,
        );
        let meta = chunk.to_index_metadata();
        assert_eq!(meta["table_rows"], serde_json::json!(2));
        assert_eq!(meta["page_number"], serde_json::json!(1));
    }
}
