//! Core data types

pub mod chunk;
pub mod query;
pub mod response;

pub use chunk::{Chunk, ChunkKind, TableSchema};
pub use query::{ComparisonRequest, ExpandedQuery, ParameterSet, ScoredChunk};
pub use response::{
    Answer, AnswerResponse, CellValue, ComparisonResult, ComparisonRow, IngestReport, SourceRef,
    Warning,
};
