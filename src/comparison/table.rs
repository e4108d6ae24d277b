//! Comparison table assembly and rendering

use tracing::debug;

use crate::config::ComparisonConfig;
use crate::dictionary::Dictionary;
use crate::types::{
    CellValue, ComparisonRequest, ComparisonResult, ComparisonRow, ParameterSet, ScoredChunk,
};

use super::extract::{extract_value, infer_parameters};

/// Build the structured comparison for a request from retrieved chunks. The
/// narrative is filled in by the caller; every other field is deterministic.
pub fn build(
    request: &ComparisonRequest,
    chunks: &[ScoredChunk],
    config: &ComparisonConfig,
) -> ComparisonResult {
    let dict = Dictionary::global();

    let parameter_names = match &request.parameters {
        ParameterSet::Explicit(names) => names.clone(),
        ParameterSet::Inferred => infer_parameters(&request.entities, chunks),
    };

    let mut rows = Vec::new();
    for name in parameter_names {
        let Some(parameter) = dict.canonicalize(&name) else {
            debug!(parameter = %name, "unknown parameter skipped");
            continue;
        };
        let values: Vec<CellValue> = request
            .entities
            .iter()
            .map(|entity| extract_value(entity, parameter, chunks, config))
            .collect();
        rows.push(ComparisonRow {
            parameter: parameter.name.to_string(),
            unit: parameter.preferred_unit.map(str::to_string),
            values,
        });
    }

    let table_markdown = render(&request.entities, &rows);
    ComparisonResult {
        entities: request.entities.clone(),
        rows,
        table_markdown,
        narrative: String::new(),
    }
}

/// Render comparison rows as a pipe-delimited Markdown table. Entity
/// columns keep the request's order; absent values render "not found".
pub fn render(entities: &[String], rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!("| Parameter | {} |\n", entities.join(" | ")));
    out.push_str(&format!("|{}\n", " --- |".repeat(entities.len() + 1)));
    for row in rows {
        let cells: Vec<String> = row.values.iter().map(CellValue::display).collect();
        out.push_str(&format!("| {} | {} |\n", row.parameter, cells.join(" | ")));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::parse_markdown_table;
    use crate::types::{Chunk, TableSchema};

    fn scored_table(markdown: &str, section: &str) -> ScoredChunk {
        let grid = parse_markdown_table(markdown).expect("test table parses");
        ScoredChunk {
            chunk: Chunk::table(
                markdown.to_string(),
                TableSchema {
                    columns: grid[0].clone(),
                    row_count: grid.len(),
                },
                "spec.pdf",
                1,
                vec![section.to_string()],
                0,
            ),
            score: 0.9,
        }
    }

    fn request(entities: &[&str], parameters: ParameterSet) -> ComparisonRequest {
        ComparisonRequest {
            entities: entities.iter().map(|e| e.to_string()).collect(),
            parameters,
        }
    }

    const TIMING_TABLE: &str = "\
| Parameter | DDR4 | DDR5 |\n\
| --- | --- | --- |\n\
| tCK | 0.75 ns | 0.5 ns |\n\
| VDD | 1.2 V | 1.1 V |";

    #[test]
    fn explicit_parameters_build_one_row_each() {
        let result = build(
            &request(
                &["DDR4", "DDR5"],
                ParameterSet::Explicit(vec!["tCK".to_string(), "VDD".to_string()]),
            ),
            &[scored_table(TIMING_TABLE, "4.1 AC Timing")],
            &ComparisonConfig::default(),
        );
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].parameter, "tCK");
        assert_eq!(result.rows[0].values.len(), 2);
        assert!(result.table_markdown.contains("| tCK | 0.75 ns | 0.5 ns |"));
    }

    #[test]
    fn inferred_parameters_come_from_the_chunks() {
        let result = build(
            &request(&["DDR4", "DDR5"], ParameterSet::Inferred),
            &[scored_table(TIMING_TABLE, "4.1 AC Timing")],
            &ComparisonConfig::default(),
        );
        let names: Vec<&str> = result.rows.iter().map(|r| r.parameter.as_str()).collect();
        assert!(names.contains(&"tCK"));
        assert!(names.contains(&"VDD"));
    }

    #[test]
    fn absent_entity_keeps_its_column_as_not_found() {
        let result = build(
            &request(
                &["DDR4", "LPDDR4"],
                ParameterSet::Explicit(vec!["tCK".to_string()]),
            ),
            &[scored_table(TIMING_TABLE, "4.1 AC Timing")],
            &ComparisonConfig::default(),
        );
        assert_eq!(result.entities, vec!["DDR4", "LPDDR4"]);
        assert_eq!(result.rows[0].values.len(), 2);
        assert_eq!(result.rows[0].values[1], CellValue::NotFound);
        assert!(result.table_markdown.contains("not found"));
    }

    #[test]
    fn rendered_table_round_trips() {
        let result = build(
            &request(
                &["DDR4", "DDR5"],
                ParameterSet::Explicit(vec!["tCK".to_string()]),
            ),
            &[scored_table(TIMING_TABLE, "4.1 AC Timing")],
            &ComparisonConfig::default(),
        );
        let parsed = parse_markdown_table(&result.table_markdown).expect("renders as a table");
        assert_eq!(parsed[0], vec!["Parameter", "DDR4", "DDR5"]);
        assert_eq!(parsed.len(), 2);
    }
}
