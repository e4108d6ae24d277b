//! Table detection and Markdown rendering
//!
//! Tables in extracted page text are found from line texture: tab runs,
//! pipe delimiters, or aligned multi-space column gaps. A detected grid only
//! wins reconciliation against the plain-text rendering of the same region
//! when it is at least `table_min_rows` x `table_min_cols` and its cells
//! account for at least `table_char_coverage` of the region's non-whitespace
//! characters. Winning grids render to pipe-delimited Markdown; re-parsing
//! that Markdown recovers the same row and column counts.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::config::ChunkingConfig;
use crate::types::TableSchema;

/// A detected table region within a page's text
#[derive(Debug, Clone)]
pub struct TableRegion {
    /// Line range within the page text, end exclusive
    pub start_line: usize,
    pub end_line: usize,
    /// Normalized grid, header row first
    pub rows: Vec<Vec<String>>,
}

impl TableRegion {
    pub fn schema(&self) -> TableSchema {
        TableSchema {
            columns: self.rows.first().cloned().unwrap_or_default(),
            row_count: self.rows.len(),
        }
    }
}

/// Heuristic: a line looks tabular if it has multiple columns separated by
/// tabs, pipes, or runs of 3+ spaces.
pub fn is_tabular_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.len() < 5 {
        return false;
    }
    if trimmed.matches('\t').count() >= 1 && split_cells(trimmed).len() >= 2 {
        return true;
    }
    if trimmed.matches('|').count() >= 2 {
        return true;
    }
    count_multi_space_gaps(trimmed) >= 1 && split_cells(trimmed).len() >= 2
}

/// Count runs of 3+ consecutive spaces separating non-empty segments
fn count_multi_space_gaps(text: &str) -> usize {
    let mut count = 0;
    let mut gap_len = 0;
    let mut in_gap = false;
    for ch in text.chars() {
        if ch == ' ' {
            gap_len += 1;
            if gap_len >= 3 && !in_gap {
                in_gap = true;
                count += 1;
            }
        } else {
            in_gap = false;
            gap_len = 0;
        }
    }
    count
}

/// Split a tabular line into cell texts. Delimiter preference: tabs, then
/// pipes, then multi-space gaps.
fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.contains('\t') {
        return trimmed
            .split('\t')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }
    if trimmed.matches('|').count() >= 2 {
        return trimmed
            .trim_matches('|')
            .split('|')
            .map(|c| c.trim().to_string())
            .collect();
    }
    // Multi-space gaps: split on runs of 3+ spaces
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut space_run = 0;
    for ch in trimmed.chars() {
        if ch == ' ' {
            space_run += 1;
        } else {
            if space_run >= 3 && !current.is_empty() {
                cells.push(current.trim().to_string());
                current.clear();
            }
            space_run = 0;
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }
    cells
}

/// Detect table regions in page text and reconcile against the plain-text
/// rendering. Non-winning runs stay prose.
pub fn detect_tables(text: &str, config: &ChunkingConfig) -> Vec<TableRegion> {
    let lines: Vec<&str> = text.lines().collect();
    let mut regions = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !is_tabular_line(lines[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < lines.len() && is_tabular_line(lines[i]) {
            i += 1;
        }
        let run = &lines[start..i];

        let mut rows: Vec<Vec<String>> = run.iter().map(|l| split_cells(l)).collect();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }

        if rows.len() < config.table_min_rows || width < config.table_min_cols {
            continue;
        }
        if cell_coverage(run, &rows) < config.table_char_coverage {
            continue;
        }

        regions.push(TableRegion {
            start_line: start,
            end_line: i,
            rows,
        });
    }

    regions
}

/// Fraction of the region's non-whitespace characters accounted for by the
/// grid's cells. Low coverage means the delimiters sliced through prose.
/// Pipe delimiters are structural and excluded from the region count.
fn cell_coverage(region_lines: &[&str], rows: &[Vec<String>]) -> f64 {
    let region_chars: usize = region_lines
        .iter()
        .map(|l| {
            l.chars()
                .filter(|c| !c.is_whitespace() && *c != '|')
                .count()
        })
        .sum();
    if region_chars == 0 {
        return 0.0;
    }
    let cell_chars: usize = rows
        .iter()
        .flatten()
        .map(|c| c.chars().filter(|ch| !ch.is_whitespace()).count())
        .sum();
    cell_chars as f64 / region_chars as f64
}

/// Render a grid as a pipe-delimited Markdown table. The first row is the
/// header. Pipes inside cells are escaped so the round trip preserves the
/// grid shape.
pub fn render_markdown(rows: &[Vec<String>]) -> String {
    let Some(header) = rows.first() else {
        return String::new();
    };
    let mut out = String::new();
    out.push_str(&render_row(header));
    out.push('\n');
    out.push_str(&format!("|{}\n", " --- |".repeat(header.len())));
    for row in &rows[1..] {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn render_row(cells: &[String]) -> String {
    let rendered: Vec<String> = cells
        .iter()
        .map(|c| {
            let escaped = c.replace('|', "\\|");
            if escaped.is_empty() {
                " ".to_string()
            } else {
                escaped
            }
        })
        .collect();
    format!("| {} |", rendered.join(" | "))
}

/// Re-parse a Markdown table back into its grid, header row first.
/// Returns `None` when the text holds no table.
pub fn parse_markdown_table(markdown: &str) -> Option<Vec<Vec<String>>> {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut current_row: Vec<String> = Vec::new();
    let mut current_cell = String::new();
    let mut in_cell = false;
    let mut saw_table = false;

    for event in parser {
        match event {
            Event::Start(Tag::Table(_)) => saw_table = true,
            Event::Start(Tag::TableCell) => {
                in_cell = true;
                current_cell.clear();
            }
            Event::End(TagEnd::TableCell) => {
                in_cell = false;
                current_row.push(current_cell.trim().to_string());
            }
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                rows.push(std::mem::take(&mut current_row));
            }
            Event::Text(text) | Event::Code(text) => {
                if in_cell {
                    current_cell.push_str(&text);
                }
            }
            _ => {}
        }
    }

    if saw_table && !rows.is_empty() {
        Some(rows)
    } else {
        None
    }
}
