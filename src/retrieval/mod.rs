//! Retrieval: per-variant search, retry, and result merging

pub mod aggregator;
pub mod retry;

pub use aggregator::{CancelToken, RetrievalAggregator, RetrievalOutcome};
pub use retry::RetryPolicy;
