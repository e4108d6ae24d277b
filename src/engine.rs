//! The top-level engine: document ingestion and grounded answering

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::info;
use uuid::Uuid;

use crate::comparison;
use crate::config::InsightConfig;
use crate::error::{Error, Result};
use crate::expansion::QueryExpander;
use crate::extraction::{Chunker, PdfExtractor};
use crate::generation::PromptBuilder;
use crate::providers::{EmbeddingProvider, LlmProvider, VectorIndexProvider};
use crate::retrieval::{CancelToken, RetrievalAggregator, RetryPolicy};
use crate::types::{Answer, AnswerResponse, ChunkKind, IngestReport, ScoredChunk, SourceRef};

/// Document understanding engine over an external vector index
pub struct InsightEngine {
    config: InsightConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    llm: Arc<dyn LlmProvider>,
    expander: QueryExpander,
    aggregator: RetrievalAggregator,
    chunker: Chunker,
    retry: RetryPolicy,
    llm_timeout: Duration,
}

impl InsightEngine {
    pub fn new(
        config: InsightConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        let llm_timeout = Duration::from_secs(config.llm.timeout_secs);
        let expander = QueryExpander::with_llm(
            config.expansion.clone(),
            Arc::clone(&llm),
            retry.clone(),
            llm_timeout,
        );
        let aggregator = RetrievalAggregator::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
            config.retrieval.clone(),
            &config.retry,
        );
        let chunker = Chunker::new(config.chunking.clone());
        Self {
            config,
            embedder,
            index,
            llm,
            expander,
            aggregator,
            chunker,
            retry,
            llm_timeout,
        }
    }

    /// Generation goes through the same retry policy and timeout as the
    /// other external collaborators.
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.retry
            .run(|| async {
                timeout(self.llm_timeout, self.llm.generate(prompt))
                    .await
                    .map_err(|_| Error::llm("generation timed out"))?
            })
            .await
    }

    /// Ingest a PDF document. Re-ingesting the same source is
    /// delete-then-insert: stale chunks are removed before the new ones go
    /// in.
    pub async fn ingest(&self, data: &[u8], source_document: &str) -> Result<IngestReport> {
        let extracted = PdfExtractor::extract(data, source_document)?;
        let chunks = self.chunker.chunk_document(&extracted, source_document);

        let chunks_replaced = self.index.delete_by_source(source_document).await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            self.index.upsert(chunk, embedding).await?;
        }

        let table_chunks = chunks.iter().filter(|c| c.kind == ChunkKind::Table).count();
        let report = IngestReport {
            document_id: Uuid::new_v4(),
            source_document: source_document.to_string(),
            chunks_created: chunks.len(),
            table_chunks,
            prose_chunks: chunks.len() - table_chunks,
            chunks_replaced,
            ingested_at: chrono::Utc::now(),
            warnings: extracted.warnings,
        };
        info!(
            source_document,
            chunks = report.chunks_created,
            tables = report.table_chunks,
            replaced = report.chunks_replaced,
            "document ingested"
        );
        Ok(report)
    }

    /// Answer a query against the ingested corpus
    pub async fn answer(&self, query: &str, k: Option<usize>) -> Result<AnswerResponse> {
        self.answer_with_cancel(query, k, &CancelToken::new()).await
    }

    /// Answer with cooperative cancellation of the retrieval stage
    pub async fn answer_with_cancel(
        &self,
        query: &str,
        k: Option<usize>,
        cancel: &CancelToken,
    ) -> Result<AnswerResponse> {
        let expanded = self.expander.expand(query).await;
        let comparison_request = comparison::detect(query);

        // Comparisons need evidence for several entities at once, so they
        // retrieve with a boosted k.
        let base_k = k.unwrap_or(self.config.retrieval.default_k);
        let effective_k = if comparison_request.is_some() {
            base_k * self.config.comparison.k_boost.max(1)
        } else {
            base_k
        };

        let outcome = self
            .aggregator
            .retrieve_with_cancel(&expanded, effective_k, cancel)
            .await?;

        let answer = match comparison_request {
            Some(request) => {
                let mut result =
                    comparison::build(&request, &outcome.chunks, &self.config.comparison);
                let prompt =
                    PromptBuilder::comparison_narrative_prompt(&result.entities, &result.rows);
                result.narrative = self.generate(&prompt).await?;
                Answer::Comparison(result)
            }
            None => {
                let prompt = PromptBuilder::grounded_answer_prompt(query, &outcome.chunks);
                let text = self.generate(&prompt).await?;
                Answer::Direct { text }
            }
        };

        Ok(AnswerResponse {
            answer,
            sources: dedup_sources(&outcome.chunks),
            expanded_queries: expanded.variants,
            warnings: outcome.warnings,
        })
    }

    /// Check all external collaborators
    pub async fn health_check(&self) -> Result<bool> {
        Ok(self.embedder.health_check().await?
            && self.index.health_check().await?
            && self.llm.health_check().await?)
    }
}

fn dedup_sources(chunks: &[ScoredChunk]) -> Vec<SourceRef> {
    let mut sources: Vec<SourceRef> = Vec::new();
    for scored in chunks {
        let source = SourceRef::from_chunk(&scored.chunk);
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    sources
}
