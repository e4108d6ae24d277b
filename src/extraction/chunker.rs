//! Chunking of extracted pages into retrievable units
//!
//! Prose packs whole sentences up to the size cap. Tables are never split
//! mid-row: an oversize table splits at row boundaries and every split
//! repeats the header row, so a lone row plus its header may exceed the cap.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::Chunk;

use super::pdf::ExtractedDocument;
use super::tables::{detect_tables, render_markdown, TableRegion};

/// Numbered heading, e.g. "4.1 AC Timing Parameters". Depth is the number
/// of dotted components.
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\s+([A-Z][^\n]{2,80})$").expect("heading regex"));

/// Splits extracted pages into prose and table chunks
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Chunk a whole document. Chunks come back in document order; the
    /// heading stack carries across pages.
    pub fn chunk_document(&self, extracted: &ExtractedDocument, source_document: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut section_path: Vec<(usize, String)> = Vec::new();
        let mut offset = 0usize;

        for page in &extracted.pages {
            self.chunk_page(
                &page.text,
                page.number,
                source_document,
                &mut section_path,
                &mut offset,
                &mut chunks,
            );
        }
        chunks
    }

    fn chunk_page(
        &self,
        text: &str,
        page_number: u32,
        source_document: &str,
        section_path: &mut Vec<(usize, String)>,
        offset: &mut usize,
        out: &mut Vec<Chunk>,
    ) {
        let lines: Vec<&str> = text.lines().collect();
        let regions = detect_tables(text, &self.config);
        let mut region_iter = regions.iter().peekable();

        let mut prose_buf: Vec<String> = Vec::new();
        let mut line_idx = 0;

        while line_idx < lines.len() {
            if let Some(region) = region_iter.peek() {
                if region.start_line == line_idx {
                    self.flush_prose(&mut prose_buf, source_document, page_number, section_path, offset, out);
                    self.emit_table(region, source_document, page_number, section_path, offset, out);
                    line_idx = region.end_line;
                    region_iter.next();
                    continue;
                }
            }

            let line = lines[line_idx];
            if let Some(caps) = HEADING_RE.captures(line.trim()) {
                self.flush_prose(&mut prose_buf, source_document, page_number, section_path, offset, out);
                let depth = caps[1].split('.').count();
                section_path.retain(|(d, _)| *d < depth);
                section_path.push((depth, line.trim().to_string()));
            } else if !line.trim().is_empty() {
                prose_buf.push(line.trim().to_string());
            }
            line_idx += 1;
        }

        self.flush_prose(&mut prose_buf, source_document, page_number, section_path, offset, out);
    }

    fn flush_prose(
        &self,
        buf: &mut Vec<String>,
        source_document: &str,
        page_number: u32,
        section_path: &[(usize, String)],
        offset: &mut usize,
        out: &mut Vec<Chunk>,
    ) {
        if buf.is_empty() {
            return;
        }
        let text = buf.join(" ");
        buf.clear();

        let path = path_strings(section_path);
        let mut pieces = pack_sentences(&text, self.config.max_chunk_size);

        // A trailing fragment below the minimum merges backward rather than
        // standing alone.
        if pieces.len() > 1 {
            if let Some(last) = pieces.last() {
                if last.chars().count() < self.config.min_chunk_size {
                    let last = pieces.pop().unwrap_or_default();
                    if let Some(prev) = pieces.last_mut() {
                        prev.push(' ');
                        prev.push_str(&last);
                    }
                }
            }
        }

        for piece in pieces {
            if piece.trim().is_empty() {
                continue;
            }
            out.push(Chunk::prose(
                piece.clone(),
                source_document,
                page_number,
                path.clone(),
                *offset,
            ));
            *offset += piece.chars().count();
        }
    }

    fn emit_table(
        &self,
        region: &TableRegion,
        source_document: &str,
        page_number: u32,
        section_path: &[(usize, String)],
        offset: &mut usize,
        out: &mut Vec<Chunk>,
    ) {
        let path = path_strings(section_path);
        let full = render_markdown(&region.rows);

        if full.chars().count() <= self.config.max_chunk_size || region.rows.len() <= 2 {
            let schema = region.schema();
            out.push(Chunk::table(
                full.clone(),
                schema,
                source_document,
                page_number,
                path,
                *offset,
            ));
            *offset += full.chars().count();
            return;
        }

        // Oversize: split at row boundaries, repeating the header per split
        let header = &region.rows[0];
        let mut rows: Vec<Vec<String>> = vec![header.clone()];
        for row in &region.rows[1..] {
            rows.push(row.clone());
            let rendered = render_markdown(&rows);
            if rendered.chars().count() > self.config.max_chunk_size && rows.len() > 2 {
                // Last row tipped it over; emit without it
                let overflow = rows.pop().unwrap_or_default();
                self.push_table_split(&rows, source_document, page_number, &path_strings(section_path), offset, out);
                rows = vec![header.clone(), overflow];
            }
        }
        if rows.len() > 1 {
            self.push_table_split(&rows, source_document, page_number, &path_strings(section_path), offset, out);
        }
    }

    fn push_table_split(
        &self,
        rows: &[Vec<String>],
        source_document: &str,
        page_number: u32,
        path: &[String],
        offset: &mut usize,
        out: &mut Vec<Chunk>,
    ) {
        let markdown = render_markdown(rows);
        let schema = crate::types::TableSchema {
            columns: rows[0].clone(),
            row_count: rows.len(),
        };
        out.push(Chunk::table(
            markdown.clone(),
            schema,
            source_document,
            page_number,
            path.to_vec(),
            *offset,
        ));
        *offset += markdown.chars().count();
    }
}

fn path_strings(section_path: &[(usize, String)]) -> Vec<String> {
    section_path.iter().map(|(_, s)| s.clone()).collect()
}

/// Pack whole sentences into pieces no longer than `max_len` characters.
/// A single sentence longer than the cap is hard-split at a character
/// boundary.
fn pack_sentences(text: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in text.split_sentence_bounds() {
        let sentence_len = sentence.chars().count();
        if sentence_len > max_len {
            if !current.is_empty() {
                pieces.push(current.trim().to_string());
                current = String::new();
                current_len = 0;
            }
            pieces.extend(hard_split(sentence, max_len));
            continue;
        }
        if current_len + sentence_len > max_len && !current.is_empty() {
            pieces.push(current.trim().to_string());
            current = String::new();
            current_len = 0;
        }
        current.push_str(sentence);
        current_len += sentence_len;
    }
    if !current.trim().is_empty() {
        pieces.push(current.trim().to_string());
    }
    pieces
}

fn hard_split(text: &str, max_len: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_len)
        .map(|c| c.iter().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
