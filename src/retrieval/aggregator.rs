//! Multi-variant retrieval with merge-by-best-score
//!
//! Each query variant is embedded and searched independently, bounded by a
//! per-variant timeout and the retry policy. Hits merge by chunk id keeping
//! the best score; first-seen variant order breaks score ties. One failed
//! variant degrades to a warning; only when every variant fails does the
//! whole retrieval fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::config::{RetrievalConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, IndexHit, VectorIndexProvider};
use crate::types::{ExpandedQuery, ScoredChunk, Warning};

use super::retry::RetryPolicy;

/// Cooperative cancellation handle. Cancelling stops variants that have not
/// yet been dispatched; completed variants still merge into the result.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Merged retrieval output
#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    /// Best-first, deduplicated by chunk id, truncated to k
    pub chunks: Vec<ScoredChunk>,
    pub warnings: Vec<Warning>,
}

enum VariantOutcome {
    Hits(Vec<IndexHit>),
    Failed(String),
    Skipped,
}

/// Runs expanded queries against the index and merges the hits
pub struct RetrievalAggregator {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    retry: RetryPolicy,
    config: RetrievalConfig,
}

impl RetrievalAggregator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        config: RetrievalConfig,
        retry_config: &RetryConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            retry: RetryPolicy::from_config(retry_config),
            config,
        }
    }

    /// Retrieve the best `k` chunks across all variants
    pub async fn retrieve(&self, query: &ExpandedQuery, k: usize) -> Result<RetrievalOutcome> {
        self.retrieve_with_cancel(query, k, &CancelToken::new())
            .await
    }

    /// Retrieve with cooperative cancellation; already-completed variants
    /// are merged and returned as partial results.
    pub async fn retrieve_with_cancel(
        &self,
        query: &ExpandedQuery,
        k: usize,
        cancel: &CancelToken,
    ) -> Result<RetrievalOutcome> {
        let timeout = Duration::from_secs(self.config.variant_timeout_secs);

        let outcomes: Vec<(String, VariantOutcome)> = stream::iter(query.variants.clone())
            .map(|variant| {
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (variant, VariantOutcome::Skipped);
                    }
                    let outcome = self.run_variant(&variant, k, timeout).await;
                    (variant, outcome)
                }
            })
            .buffer_unordered(self.config.max_concurrent_variants.max(1))
            .collect()
            .await;

        let mut warnings = Vec::new();
        let mut merged: HashMap<String, (usize, ScoredChunk)> = HashMap::new();
        let mut order = 0usize;
        let mut completed = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for (variant, outcome) in outcomes {
            match outcome {
                VariantOutcome::Hits(hits) => {
                    completed += 1;
                    for hit in hits {
                        let entry = merged.entry(hit.chunk.id.clone());
                        match entry {
                            std::collections::hash_map::Entry::Occupied(mut occupied) => {
                                if hit.score > occupied.get().1.score {
                                    occupied.get_mut().1.score = hit.score;
                                }
                            }
                            std::collections::hash_map::Entry::Vacant(vacant) => {
                                vacant.insert((
                                    order,
                                    ScoredChunk {
                                        chunk: hit.chunk,
                                        score: hit.score,
                                    },
                                ));
                                order += 1;
                            }
                        }
                    }
                }
                VariantOutcome::Failed(message) => {
                    failed += 1;
                    warn!(variant, message, "variant retrieval failed");
                    warnings.push(Warning::VariantRetrievalFailed { variant, message });
                }
                VariantOutcome::Skipped => skipped += 1,
            }
        }

        if skipped > 0 {
            warnings.push(Warning::RetrievalCancelled {
                variants_completed: completed,
            });
        }
        if completed == 0 && failed > 0 && skipped == 0 {
            return Err(Error::NoRetrievableResults);
        }

        let mut chunks: Vec<(usize, ScoredChunk)> = merged.into_values().collect();
        chunks.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        let chunks: Vec<ScoredChunk> = chunks.into_iter().map(|(_, c)| c).take(k).collect();

        debug!(
            variants = query.len(),
            completed,
            failed,
            skipped,
            merged = chunks.len(),
            "retrieval complete"
        );
        Ok(RetrievalOutcome { chunks, warnings })
    }

    async fn run_variant(&self, variant: &str, k: usize, timeout: Duration) -> VariantOutcome {
        let attempt = self.retry.run(|| async {
            let embedding = self.embedder.embed(variant).await?;
            self.index.query(&embedding, k).await
        });

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(hits)) => VariantOutcome::Hits(hits),
            Ok(Err(e)) => VariantOutcome::Failed(e.to_string()),
            Err(_) => VariantOutcome::Failed(format!("timed out after {timeout:?}")),
        }
    }
}
