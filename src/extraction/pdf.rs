//! PDF text extraction with per-page fault isolation
//!
//! Pages are extracted independently so one malformed content stream never
//! discards the rest of the document. Page failures accumulate into a
//! `PartialExtraction` warning; a document that yields no text at all is
//! retried with a whole-document extraction pass before being declared
//! unreadable.

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::Warning;

/// Raw text of one page
#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-indexed page number
    pub number: u32,
    pub text: String,
}

/// Extraction output: page texts in document order plus warnings
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub pages: Vec<PageText>,
    pub warnings: Vec<Warning>,
}

/// PDF extractor. Stateless; each call restarts from the raw bytes.
pub struct PdfExtractor;

impl PdfExtractor {
    /// Extract page texts from raw PDF bytes. Fails with
    /// `DocumentUnreadable` for corrupt or encrypted input.
    pub fn extract(data: &[u8], source_document: &str) -> Result<ExtractedDocument> {
        let doc = Document::load_mem(data)
            .map_err(|e| Error::document_unreadable(source_document, e.to_string()))?;

        if doc.is_encrypted() {
            return Err(Error::document_unreadable(
                source_document,
                "document is encrypted",
            ));
        }

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(Error::document_unreadable(
                source_document,
                "document has no pages",
            ));
        }

        let mut pages = Vec::with_capacity(page_numbers.len());
        let mut failed_pages = Vec::new();

        for number in page_numbers {
            match doc.extract_text(&[number]) {
                Ok(text) if !text.trim().is_empty() => {
                    pages.push(PageText { number, text });
                }
                Ok(_) => {
                    debug!(source_document, page = number, "page yielded no text");
                    pages.push(PageText {
                        number,
                        text: String::new(),
                    });
                }
                Err(e) => {
                    warn!(source_document, page = number, error = %e, "page extraction failed");
                    failed_pages.push(number);
                }
            }
        }

        // Some generators defeat per-page extraction entirely; fall back to a
        // whole-document pass split on form feeds before giving up.
        if pages.iter().all(|p| p.text.trim().is_empty()) {
            match pdf_extract::extract_text_from_mem(data) {
                Ok(full_text) if !full_text.trim().is_empty() => {
                    debug!(source_document, "using whole-document extraction fallback");
                    pages = full_text
                        .split('\u{0c}')
                        .enumerate()
                        .map(|(i, text)| PageText {
                            number: i as u32 + 1,
                            text: text.to_string(),
                        })
                        .collect();
                }
                Ok(_) | Err(_) if failed_pages.is_empty() => {
                    // No text anywhere but nothing errored: likely a scanned
                    // document; return the empty pages rather than failing.
                }
                _ => {
                    return Err(Error::document_unreadable(
                        source_document,
                        "no page could be extracted",
                    ));
                }
            }
        }

        let mut warnings = Vec::new();
        if !failed_pages.is_empty() {
            warnings.push(Warning::PartialExtraction {
                failed_pages: failed_pages.clone(),
            });
        }

        Ok(ExtractedDocument { pages, warnings })
    }
}
