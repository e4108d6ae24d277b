//! Per-(entity, parameter) value extraction from retrieved chunks
//!
//! Table chunks mentioning the entity are scanned first via Markdown
//! re-parse (same-row association), then prose within a bounded token window
//! of a parameter mention. Table evidence beats prose; retrieval score
//! breaks remaining ties. A value that cannot be converted to the
//! parameter's preferred unit is skipped, never guessed.

use regex::Regex;
use tracing::debug;

use crate::config::ComparisonConfig;
use crate::dictionary::{
    convert, parse_bare_number, parse_value, CanonicalTerm, Dictionary, UnitFamily, UnitValue,
};
use crate::extraction::parse_markdown_table;
use crate::types::{CellValue, ScoredChunk};

/// A value found for one (entity, parameter) pair
#[derive(Debug, Clone)]
struct Candidate {
    value: UnitValue,
    from_table: bool,
    score: f32,
}

/// Infer parameters for a comparison with no explicit ones: parameter terms
/// co-occurring with any of the entities in the retrieved chunks, in order
/// of first appearance across the best-scored chunks.
pub fn infer_parameters(entities: &[String], chunks: &[ScoredChunk]) -> Vec<String> {
    let dict = Dictionary::global();
    let mut parameters = Vec::new();

    for scored in chunks {
        let text = chunk_search_text(scored);
        let mentions_entity = dict
            .entities_in(&text)
            .iter()
            .any(|t| entities.iter().any(|e| e == t.name));
        if !mentions_entity {
            continue;
        }
        for term in dict.parameters_in(&text) {
            if !parameters.iter().any(|p| p == term.name) {
                parameters.push(term.name.to_string());
            }
        }
    }
    parameters
}

/// Extract the cell value for one entity and parameter across the retrieved
/// chunks. Returns `NotFound` when no grounded value exists.
pub fn extract_value(
    entity: &str,
    parameter: &CanonicalTerm,
    chunks: &[ScoredChunk],
    config: &ComparisonConfig,
) -> CellValue {
    let mut candidates = Vec::new();

    for scored in chunks {
        if !mentions_entity(scored, entity) {
            continue;
        }
        if scored.chunk.is_table() {
            if let Some(value) = value_from_table(&scored.chunk.text, entity, parameter) {
                candidates.push(Candidate {
                    value,
                    from_table: true,
                    score: scored.score,
                });
            }
        } else if let Some(value) =
            value_from_prose(&scored.chunk.text, parameter, config.prose_window_tokens)
        {
            candidates.push(Candidate {
                value,
                from_table: false,
                score: scored.score,
            });
        }
    }

    // Table beats prose, then retrieval score
    candidates.sort_by(|a, b| {
        b.from_table
            .cmp(&a.from_table)
            .then(b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
    });

    for candidate in candidates {
        match normalize(candidate.value, parameter) {
            Some(value) => return CellValue::Value(value),
            None => {
                debug!(
                    entity,
                    parameter = parameter.name,
                    "candidate not convertible to preferred unit, skipping"
                );
            }
        }
    }
    CellValue::NotFound
}

/// Convert a candidate to the parameter's preferred unit. Dimensionless
/// parameters pass through unchanged.
fn normalize(value: UnitValue, parameter: &CanonicalTerm) -> Option<UnitValue> {
    match parameter.preferred_unit {
        Some(unit) => convert(&value, unit).ok(),
        None => Some(value),
    }
}

fn chunk_search_text(scored: &ScoredChunk) -> String {
    let mut text = scored.chunk.section_path.join(" ");
    text.push(' ');
    text.push_str(&scored.chunk.text);
    text
}

fn mentions_entity(scored: &ScoredChunk, entity: &str) -> bool {
    let dict = Dictionary::global();
    dict.entities_in(&chunk_search_text(scored))
        .iter()
        .any(|t| t.name == entity)
}

/// Pull a value out of a Markdown table. Two layouts are handled: entity
/// columns (header names the entities, parameter labels the rows) and
/// per-entity tables (the entity is named around the table, rows are
/// parameter/value pairs).
fn value_from_table(markdown: &str, entity: &str, parameter: &CanonicalTerm) -> Option<UnitValue> {
    let grid = parse_markdown_table(markdown)?;
    if grid.len() < 2 {
        return None;
    }
    let dict = Dictionary::global();

    let header = &grid[0];
    let entity_col = header.iter().position(|cell| {
        dict.canonicalize(cell)
            .map(|t| t.name == entity)
            .unwrap_or(false)
    });

    let param_row = grid[1..].iter().find(|row| {
        row.first()
            .and_then(|label| dict.canonicalize(label))
            .map(|t| t.name == parameter.name)
            .unwrap_or(false)
    })?;

    if let Some(col) = entity_col {
        let cell = param_row.get(col)?;
        return parse_cell(cell, parameter);
    }

    // No entity column: the whole table belongs to the entity (mention was
    // in the section path or surrounding text); take the first parsable
    // value cell in the row.
    param_row
        .iter()
        .skip(1)
        .find_map(|cell| parse_cell(cell, parameter))
}

fn parse_cell(cell: &str, parameter: &CanonicalTerm) -> Option<UnitValue> {
    match parameter.family {
        Some(UnitFamily::Dimensionless) | None => {
            parse_bare_number(cell).map(UnitValue::dimensionless)
        }
        family => parse_value(cell, family),
    }
}

/// Scan prose for a value within `window_tokens` tokens of a parameter
/// mention.
fn value_from_prose(
    text: &str,
    parameter: &CanonicalTerm,
    window_tokens: usize,
) -> Option<UnitValue> {
    let mention = find_parameter_mention(text, parameter)?;

    let tokens: Vec<(usize, &str)> = text
        .split_whitespace()
        .map(|t| (t.as_ptr() as usize - text.as_ptr() as usize, t))
        .collect();
    let mention_token = tokens
        .iter()
        .position(|(offset, token)| *offset <= mention && mention < offset + token.len())?;

    let start = mention_token.saturating_sub(window_tokens);
    let end = (mention_token + window_tokens + 1).min(tokens.len());
    let window = tokens[start..end]
        .iter()
        .map(|(_, t)| *t)
        .collect::<Vec<_>>()
        .join(" ");

    parse_cell(&window, parameter)
}

/// Byte offset of the first mention of the parameter (any synonym)
fn find_parameter_mention(text: &str, parameter: &CanonicalTerm) -> Option<usize> {
    let mut surfaces: Vec<&str> = parameter.synonyms.to_vec();
    surfaces.push(parameter.name);
    surfaces.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for surface in surfaces {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(surface));
        if let Ok(re) = Regex::new(&pattern) {
            if let Some(m) = re.find(text) {
                return Some(m.start());
            }
        }
    }
    None
}
