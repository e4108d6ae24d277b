//! End-to-end pipeline tests against in-memory providers

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use jedec_insight::config::InsightConfig;
use jedec_insight::error::{Error, Result};
use jedec_insight::providers::{EmbeddingProvider, IndexHit, LlmProvider, VectorIndexProvider};
use jedec_insight::types::{Answer, CellValue, Chunk, TableSchema};
use jedec_insight::InsightEngine;

const DIMS: usize = 64;

/// Deterministic bag-of-words embedder: shared tokens give related texts a
/// higher cosine similarity.
struct HashEmbedder;

fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMS];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        vector[(hasher.finish() % DIMS as u64) as usize] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed_text(text))
    }
    fn dimensions(&self) -> usize {
        DIMS
    }
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
    fn name(&self) -> &str {
        "hash"
    }
}

/// In-memory cosine-similarity index
#[derive(Default)]
struct InMemoryIndex {
    entries: Mutex<HashMap<String, (Chunk, Vec<f32>)>>,
}

#[async_trait]
impl VectorIndexProvider for InMemoryIndex {
    async fn upsert(&self, chunk: &Chunk, embedding: &[f32]) -> Result<()> {
        self.entries
            .lock()
            .expect("lock")
            .insert(chunk.id.clone(), (chunk.clone(), embedding.to_vec()));
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        let entries = self.entries.lock().expect("lock");
        let mut hits: Vec<IndexHit> = entries
            .values()
            .map(|(chunk, stored)| IndexHit {
                chunk: chunk.clone(),
                score: stored.iter().zip(embedding).map(|(a, b)| a * b).sum(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete_by_source(&self, source_document: &str) -> Result<usize> {
        let mut entries = self.entries.lock().expect("lock");
        let before = entries.len();
        entries.retain(|_, (chunk, _)| chunk.source_document != source_document);
        Ok(before - entries.len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Index whose queries always fail
struct DownIndex;

#[async_trait]
impl VectorIndexProvider for DownIndex {
    async fn upsert(&self, _chunk: &Chunk, _embedding: &[f32]) -> Result<()> {
        Ok(())
    }
    async fn query(&self, _embedding: &[f32], _k: usize) -> Result<Vec<IndexHit>> {
        Err(Error::vector_index("index offline"))
    }
    async fn delete_by_source(&self, _source: &str) -> Result<usize> {
        Ok(0)
    }
    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }
    fn name(&self) -> &str {
        "down"
    }
}

const NARRATIVE: &str = "DDR5 runs a shorter clock cycle than DDR4.";
const DIRECT_ANSWER: &str = "The minimum tCK for DDR4 is 0.75 ns [Source: jesd79-4.pdf, Page 1]";

/// LLM double keyed on prompt shape
struct CannedLlm;

#[async_trait]
impl LlmProvider for CannedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.contains("Rewrites:") {
            // No paraphrases; deterministic variants are enough for tests
            Ok(String::new())
        } else if prompt.contains("Narrative:") {
            Ok(NARRATIVE.to_string())
        } else {
            Ok(DIRECT_ANSWER.to_string())
        }
    }
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
    fn name(&self) -> &str {
        "canned"
    }
    fn model(&self) -> &str {
        "canned-1"
    }
}

/// LLM whose first answer-generation call fails; paraphrase prompts succeed
/// immediately so only the answer path is exercised.
#[derive(Default)]
struct FlakyLlm {
    answer_calls: AtomicU32,
}

#[async_trait]
impl LlmProvider for FlakyLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.contains("Rewrites:") {
            return Ok(String::new());
        }
        if self.answer_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(Error::llm("model overloaded"))
        } else {
            Ok(DIRECT_ANSWER.to_string())
        }
    }
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
    fn name(&self) -> &str {
        "flaky"
    }
    fn model(&self) -> &str {
        "flaky-1"
    }
}

fn engine_with(index: Arc<dyn VectorIndexProvider>) -> InsightEngine {
    let mut config = InsightConfig::default();
    config.retry.max_attempts = 1;
    config.retry.base_delay_ms = 1;
    InsightEngine::new(config, Arc::new(HashEmbedder), index, Arc::new(CannedLlm))
}

const TIMING_TABLE: &str = "\
| Parameter | DDR4 | DDR5 |\n\
| --- | --- | --- |\n\
| tCK | 0.75 ns | 0.5 ns |\n\
| VDD | 1.2 V | 1.1 V |";

async fn seed_corpus(index: &InMemoryIndex) {
    let table = Chunk::table(
        TIMING_TABLE.to_string(),
        TableSchema {
            columns: vec!["Parameter".into(), "DDR4".into(), "DDR5".into()],
            row_count: 3,
        },
        "jesd79-4.pdf",
        1,
        vec!["4.1 AC Timing".to_string()],
        0,
    );
    let prose = Chunk::prose(
        "DDR4 devices operate with a minimum tCK of 0.75 ns at the fastest speed bin.".to_string(),
        "jesd79-4.pdf",
        1,
        vec!["4.1 AC Timing".to_string()],
        500,
    );
    for chunk in [table, prose] {
        let embedding = embed_text(&chunk.text);
        index.upsert(&chunk, &embedding).await.expect("seed upsert");
    }
}

#[tokio::test]
async fn comparison_query_returns_structured_table_and_narrative() {
    let index = Arc::new(InMemoryIndex::default());
    seed_corpus(&index).await;
    let engine = engine_with(index);

    let response = engine.answer("DDR4 vs DDR5 tCK", None).await.unwrap();

    let Answer::Comparison(result) = response.answer else {
        panic!("expected a comparison answer");
    };
    assert_eq!(result.entities, vec!["DDR4", "DDR5"]);
    assert_eq!(result.rows.len(), 1);
    let row = &result.rows[0];
    assert_eq!(row.parameter, "tCK");
    match (&row.values[0], &row.values[1]) {
        (CellValue::Value(a), CellValue::Value(b)) => {
            assert_eq!(a.to_string(), "0.75 ns");
            assert_eq!(b.to_string(), "0.5 ns");
        }
        other => panic!("expected both values, got {other:?}"),
    }
    assert_eq!(result.narrative, NARRATIVE);
    assert!(result.table_markdown.contains("| tCK |"));
    assert_eq!(response.expanded_queries[0], "DDR4 vs DDR5 tCK");
    assert!(!response.sources.is_empty());
}

#[tokio::test]
async fn entity_without_data_stays_in_the_table_as_not_found() {
    let index = Arc::new(InMemoryIndex::default());
    seed_corpus(&index).await;
    let engine = engine_with(index);

    let response = engine
        .answer("compare DDR4 and LPDDR4 tCK", None)
        .await
        .unwrap();

    let Answer::Comparison(result) = response.answer else {
        panic!("expected a comparison answer");
    };
    assert_eq!(result.entities, vec!["DDR4", "LPDDR4"]);
    let row = &result.rows[0];
    assert_eq!(row.values.len(), 2);
    assert!(matches!(row.values[0], CellValue::Value(_)));
    assert_eq!(row.values[1], CellValue::NotFound);
    assert!(result.table_markdown.contains("not found"));
}

#[tokio::test]
async fn non_comparison_query_takes_the_direct_path() {
    let index = Arc::new(InMemoryIndex::default());
    seed_corpus(&index).await;
    let engine = engine_with(index);

    let response = engine.answer("What is the tCK of DDR4?", None).await.unwrap();

    match response.answer {
        Answer::Direct { text } => assert_eq!(text, DIRECT_ANSWER),
        other => panic!("expected direct answer, got {other:?}"),
    }
    assert!(!response.sources.is_empty());
    assert!(response.warnings.is_empty());
}

#[tokio::test]
async fn unit_rewrites_show_up_in_expanded_queries() {
    let index = Arc::new(InMemoryIndex::default());
    seed_corpus(&index).await;
    let engine = engine_with(index);

    let response = engine
        .answer("DDR4 parts with tCK of 0.75 ns", None)
        .await
        .unwrap();

    assert_eq!(response.expanded_queries[0], "DDR4 parts with tCK of 0.75 ns");
    assert!(response
        .expanded_queries
        .iter()
        .any(|v| v.contains("750 ps")));
}

#[tokio::test]
async fn transient_generation_failures_are_retried() {
    let index = Arc::new(InMemoryIndex::default());
    seed_corpus(&index).await;

    let mut config = InsightConfig::default();
    config.retry.max_attempts = 3;
    config.retry.base_delay_ms = 1;
    config.retry.jitter = 0.0;
    let llm = Arc::new(FlakyLlm::default());
    let engine = InsightEngine::new(config, Arc::new(HashEmbedder), index, Arc::clone(&llm) as Arc<dyn LlmProvider>);

    let response = engine.answer("What is the tCK of DDR4?", None).await.unwrap();

    match response.answer {
        Answer::Direct { text } => assert_eq!(text, DIRECT_ANSWER),
        other => panic!("expected direct answer, got {other:?}"),
    }
    assert_eq!(llm.answer_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dead_index_yields_no_retrievable_results() {
    let engine = engine_with(Arc::new(DownIndex));
    let result = engine.answer("DDR4 tCK", None).await;
    assert!(matches!(result, Err(Error::NoRetrievableResults)));
}
