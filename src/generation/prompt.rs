//! Prompt templates for grounded generation

use crate::types::{ComparisonRow, ScoredChunk, SourceRef};

/// Prompt builder for grounded answers, paraphrasing, and comparison narration
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build context from retrieved chunks
    pub fn build_context(chunks: &[ScoredChunk]) -> String {
        let mut context = String::new();
        for (i, scored) in chunks.iter().enumerate() {
            let source = SourceRef::from_chunk(&scored.chunk);
            context.push_str(&format!(
                "[{}] {}\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                source.format_citation(),
                scored.chunk.text
            ));
        }
        context
    }

    /// Build a grounded answer prompt with strict sourcing rules
    pub fn grounded_answer_prompt(question: &str, chunks: &[ScoredChunk]) -> String {
        format!(
            r#"You are a document-grounded assistant for semiconductor memory standards. You ONLY use information from the provided documents.

GROUNDING RULES - FOLLOW THESE EXACTLY:
1. ONLY use information that is EXPLICITLY stated in the CONTEXT below
2. If the answer is not in the context, respond with "This information is not available in the provided documents."
3. NEVER use external knowledge or make inferences beyond what is stated
4. Cite sources inline with each claim: [Source: filename, Page X]
5. Keep numeric values exactly as they appear in the source, units included

CONTEXT FROM DOCUMENTS:
{context}

QUESTION: {question}

Provide a grounded answer using ONLY the document content above:"#,
            context = Self::build_context(chunks),
            question = question
        )
    }

    /// Build a paraphrase prompt for query expansion
    pub fn paraphrase_prompt(query: &str, max_paraphrases: usize) -> String {
        format!(
            r#"Rewrite the following search query about semiconductor memory standards in up to {max_paraphrases} different ways. Keep every product or standard name (such as DDR4 or LPDDR5) exactly as written. Keep all numeric values and units unchanged. Output one rewrite per line with no numbering or commentary.

Query: {query}

Rewrites:"#
        )
    }

    /// Parse paraphrase lines out of an LLM response. Numbering and bullet
    /// prefixes are stripped; blank lines dropped.
    pub fn parse_paraphrases(raw: &str, max_paraphrases: usize) -> Vec<String> {
        raw.lines()
            .map(|line| {
                line.trim()
                    .trim_start_matches(['-', '*', '•'])
                    .trim_start_matches(|c: char| c.is_ascii_digit())
                    .trim_start_matches(['.', ')', ':'])
                    .trim()
                    .to_string()
            })
            .filter(|line| !line.is_empty())
            .take(max_paraphrases)
            .collect()
    }

    /// Build a narrative prompt from structured comparison rows. The LLM
    /// never sees raw chunk text here; it narrates the extracted values
    /// only, so it cannot introduce numbers of its own.
    pub fn comparison_narrative_prompt(entities: &[String], rows: &[ComparisonRow]) -> String {
        let mut lines = Vec::new();
        for row in rows {
            let cells: Vec<String> = entities
                .iter()
                .zip(row.values.iter())
                .map(|(entity, value)| format!("{}: {}", entity, value.display()))
                .collect();
            lines.push(format!("- {} -> {}", row.parameter, cells.join(", ")));
        }

        format!(
            r#"You are summarizing a comparison of semiconductor memory standards. Below are extracted parameter values. Write a short narrative (2-4 sentences) describing the differences.

RULES:
1. Use ONLY the values listed below; do not add any number not shown
2. Where a value is "not found", say the documents do not state it
3. Do not speculate about reasons for the differences

COMPARED: {entities}

VALUES:
{values}

Narrative:"#,
            entities = entities.join(" vs "),
            values = lines.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{parse_value, UnitFamily};
    use crate::types::{CellValue, Chunk};

    #[test]
    fn context_numbers_chunks_with_citations() {
        let chunk = Chunk::prose(
            "tCK minimum is 0.75 ns.".to_string(),
            "jesd79-4.pdf",
            12,
            vec!["4.1 AC Timing".to_string()],
            0,
        );
        let context = PromptBuilder::build_context(&[ScoredChunk { chunk, score: 0.9 }]);
        assert!(context.starts_with("[1] jesd79-4.pdf, Page 12"));
        assert!(context.contains("tCK minimum is 0.75 ns."));
    }

    #[test]
    fn paraphrase_parsing_strips_prefixes() {
        let raw = "1. What is DDR4 cycle time?\n- DDR4 minimum clock period\n\n2) tCK for DDR4";
        let parsed = PromptBuilder::parse_paraphrases(raw, 3);
        assert_eq!(
            parsed,
            vec![
                "What is DDR4 cycle time?",
                "DDR4 minimum clock period",
                "tCK for DDR4"
            ]
        );
    }

    #[test]
    fn paraphrase_parsing_caps_count() {
        let raw = "a\nb\nc\nd";
        assert_eq!(PromptBuilder::parse_paraphrases(raw, 2).len(), 2);
    }

    #[test]
    fn narrative_prompt_contains_only_structured_values() {
        let value = parse_value("0.75 ns", Some(UnitFamily::Time)).unwrap();
        let rows = vec![ComparisonRow {
            parameter: "tCK".to_string(),
            unit: Some("ns".to_string()),
            values: vec![CellValue::Value(value), CellValue::NotFound],
        }];
        let entities = vec!["DDR4".to_string(), "DDR5".to_string()];
        let prompt = PromptBuilder::comparison_narrative_prompt(&entities, &rows);
        assert!(prompt.contains("DDR4: 0.75 ns"));
        assert!(prompt.contains("DDR5: not found"));
        assert!(!prompt.contains("Content:"));
    }
}
