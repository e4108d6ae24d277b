//! Document extraction: PDF text, table detection, chunking

pub mod chunker;
pub mod pdf;
pub mod tables;

pub use chunker::Chunker;
pub use pdf::{ExtractedDocument, PageText, PdfExtractor};
pub use tables::{parse_markdown_table, render_markdown, TableRegion};
