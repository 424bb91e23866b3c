//! Text extractors for uploaded CV files, selected by exact content type.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum TextExtractionError {
    #[error("Content type '{0}' is not supported")]
    Unsupported(String),

    #[error("{0}")]
    Failed(String),
}

/// Converts raw file bytes of one content type into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    fn content_type(&self) -> &'static str;

    async fn extract_text(
        &self,
        file: Bytes,
        content_type: &str,
    ) -> Result<String, TextExtractionError>;
}

fn ensure_content_type(
    extractor: &dyn TextExtractor,
    content_type: &str,
) -> Result<(), TextExtractionError> {
    if content_type == extractor.content_type() {
        Ok(())
    } else {
        Err(TextExtractionError::Unsupported(content_type.to_string()))
    }
}

fn log_extracted(format: &str, text: &str) {
    if text.trim().is_empty() {
        warn!(format, "Text extraction resulted in empty text");
    } else {
        info!(format, chars = text.chars().count(), "Extracted text from CV");
    }
}

/// PDF extraction via `pdf-extract`, run on the blocking pool.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    async fn extract_text(
        &self,
        file: Bytes,
        content_type: &str,
    ) -> Result<String, TextExtractionError> {
        ensure_content_type(self, content_type)?;

        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&file))
            .await
            .map_err(|e| TextExtractionError::Failed(format!("PDF extraction task failed: {e}")))?
            .map_err(|e| {
                warn!(error = %e, "Failed to extract PDF text");
                TextExtractionError::Failed(format!("Failed to extract text from PDF file: {e}"))
            })?;

        let text = text.trim().to_string();
        log_extracted("pdf", &text);
        Ok(text)
    }
}

/// DOCX extraction via `docx-rs`: paragraph text one per line, then table
/// cell text joined by spaces with one line per table.
pub struct DocxTextExtractor;

#[async_trait]
impl TextExtractor for DocxTextExtractor {
    fn content_type(&self) -> &'static str {
        DOCX_CONTENT_TYPE
    }

    async fn extract_text(
        &self,
        file: Bytes,
        content_type: &str,
    ) -> Result<String, TextExtractionError> {
        ensure_content_type(self, content_type)?;

        let text = tokio::task::spawn_blocking(move || {
            docx_rs::read_docx(&file)
                .map(|docx| extract_docx_text(&docx))
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| TextExtractionError::Failed(format!("DOCX extraction task failed: {e}")))?
        .map_err(|e| {
            warn!(error = %e, "Failed to read DOCX");
            TextExtractionError::Failed(format!("Failed to extract text from DOCX file: {e}"))
        })?;

        log_extracted("docx", &text);
        Ok(text)
    }
}

fn extract_docx_text(docx: &docx_rs::Docx) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut tables: Vec<&docx_rs::Table> = Vec::new();

    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                let text = paragraph_text(para);
                if !text.trim().is_empty() {
                    lines.push(text);
                }
            }
            docx_rs::DocumentChild::Table(table) => tables.push(table),
            _ => {}
        }
    }

    for table in tables {
        let mut row_text = String::new();
        for row in &table.rows {
            let docx_rs::TableChild::TableRow(tr) = row;
            for cell in &tr.cells {
                let docx_rs::TableRowChild::TableCell(tc) = cell;
                let cell_text: String = tc
                    .children
                    .iter()
                    .filter_map(|c| match c {
                        docx_rs::TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                        _ => None,
                    })
                    .collect();
                if !cell_text.trim().is_empty() {
                    row_text.push_str(&cell_text);
                    row_text.push(' ');
                }
            }
        }
        lines.push(row_text);
    }

    lines.join("\n").trim().to_string()
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut text = String::new();

    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run_text(&mut text, run),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for child in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        push_run_text(&mut text, run);
                    }
                }
            }
            _ => {}
        }
    }

    text
}

fn push_run_text(text: &mut String, run: &docx_rs::Run) {
    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(t) => text.push_str(&t.text),
            docx_rs::RunChild::Tab(_) => text.push(' '),
            _ => {}
        }
    }
}

/// Content-type keyed lookup of text extractors. Exact match only; no sniffing.
pub struct TextExtractorRegistry {
    extractors: HashMap<&'static str, Arc<dyn TextExtractor>>,
}

impl TextExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// PDF and DOCX extractors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(PdfTextExtractor));
        registry.register(Arc::new(DocxTextExtractor));
        registry
    }

    pub fn register(&mut self, extractor: Arc<dyn TextExtractor>) {
        self.extractors.insert(extractor.content_type(), extractor);
    }

    pub fn get_extractor(&self, content_type: &str) -> Option<Arc<dyn TextExtractor>> {
        let extractor = self.extractors.get(content_type).cloned();
        debug!(content_type, found = extractor.is_some(), "Resolved text extractor");
        extractor
    }

    pub fn supports(&self, content_type: &str) -> bool {
        self.extractors.contains_key(content_type)
    }

    pub fn supported_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.extractors.keys().copied().collect();
        types.sort_unstable();
        types
    }
}
