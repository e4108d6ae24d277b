//! Ingestion tests over a generated PDF

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use jedec_insight::config::InsightConfig;
use jedec_insight::error::{Error, Result};
use jedec_insight::providers::{EmbeddingProvider, IndexHit, LlmProvider, VectorIndexProvider};
use jedec_insight::types::Chunk;
use jedec_insight::InsightEngine;

const DIMS: usize = 32;

struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; DIMS];
        for token in text.split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % DIMS as u64) as usize] += 1.0;
        }
        Ok(vector)
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

struct CannedLlm;

#[async_trait]
impl LlmProvider for CannedLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(String::new())
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

fn engine() -> InsightEngine {
    InsightEngine::new(
        InsightConfig::default(),
        Arc::new(HashEmbedder),
        Arc::new(InMemoryIndex::default()),
        Arc::new(CannedLlm),
    )
}

/// Minimal single-page PDF with one line of text
fn build_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

#[tokio::test]
async fn ingest_reports_chunk_counts() {
    let pdf = build_pdf("DDR4 devices operate with a minimum tCK of 0.75 nanoseconds.");
    let report = engine().ingest(&pdf, "jesd79-4.pdf").await.unwrap();

    assert_eq!(report.source_document, "jesd79-4.pdf");
    assert!(report.chunks_created >= 1);
    assert_eq!(report.prose_chunks + report.table_chunks, report.chunks_created);
    assert_eq!(report.chunks_replaced, 0);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn reingesting_replaces_previous_chunks() {
    let engine = engine();
    let pdf = build_pdf("DDR4 devices operate with a minimum tCK of 0.75 nanoseconds.");

    let first = engine.ingest(&pdf, "jesd79-4.pdf").await.unwrap();
    let second = engine.ingest(&pdf, "jesd79-4.pdf").await.unwrap();

    assert_eq!(second.chunks_replaced, first.chunks_created);
    assert_eq!(second.chunks_created, first.chunks_created);
}

#[tokio::test]
async fn corrupt_input_is_rejected_up_front() {
    let result = engine().ingest(b"definitely not a pdf", "broken.pdf").await;
    match result {
        Err(Error::DocumentUnreadable { source_document, .. }) => {
            assert_eq!(source_document, "broken.pdf");
        }
        other => panic!("expected DocumentUnreadable, got {other:?}"),
    }
}
