//! PDF text extraction: PDF file or URL → [`DocumentContent`].
//!
//! Two parsers, tried in order:
//!
//! 1. **pdfium** (`pdfium-render`): robust on real-world files, needs the
//!    pdfium shared library at runtime (`PDFIUM_LIB_PATH` or a system copy).
//! 2. **pdf-extract**: pure Rust, always available, weaker on complex layouts.
//!
//! Both are synchronous and CPU-bound, so they run on `spawn_blocking`.
//! Pages are keyed `"1".."N"`; a page without extractable text becomes an
//! empty string, never an error. When no page has any text (a fully scanned
//! PDF) the content is left empty so the pipeline answers with the
//! "couldn't extract readable text" message instead of sending bare page
//! headers to the model. `page_count` still reports every page.

use crate::config::PipelineConfig;
use crate::document::DocumentContent;
use crate::error::DocuChatError;
use crate::pipeline::input;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Which parser produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parser {
    Pdfium,
    PdfExtract,
}

/// The result of extracting one PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub content: DocumentContent,
    pub page_count: usize,
    pub parser: Parser,
}

impl ExtractedDocument {
    fn from_pages(pages: Vec<String>, parser: Parser) -> Self {
        let page_count = pages.len();
        let content = if pages.iter().all(|text| text.trim().is_empty()) {
            debug!("No text on any of {} pages; treating as image-only", page_count);
            DocumentContent::new()
        } else {
            pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| ((i + 1).to_string(), text))
                .collect()
        };
        Self {
            content,
            page_count,
            parser,
        }
    }
}

/// Extract page text from a local PDF path or an HTTP/HTTPS URL.
pub async fn extract_document(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<ExtractedDocument, DocuChatError> {
    let input_str = input_str.as_ref();
    info!("Extracting text: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let path = resolved.path().to_path_buf();

    // `resolved` must outlive the blocking task so a downloaded file is not
    // deleted while it is being parsed.
    let extracted = tokio::task::spawn_blocking(move || extract_blocking(&path))
        .await
        .map_err(|e| DocuChatError::Internal(format!("Extraction task panicked: {}", e)))?;
    drop(resolved);
    extracted
}

/// Extract page text from PDF bytes held in memory.
///
/// The bytes are written to a managed temp file that is removed on return.
pub async fn extract_from_bytes(bytes: &[u8]) -> Result<ExtractedDocument, DocuChatError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(DocuChatError::NotAPdf {
            path: PathBuf::from("<memory>"),
            magic,
        });
    }

    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| DocuChatError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| DocuChatError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_path_buf();

    let extracted = tokio::task::spawn_blocking(move || extract_blocking(&path))
        .await
        .map_err(|e| DocuChatError::Internal(format!("Extraction task panicked: {}", e)))?;
    drop(tmp);
    extracted
}

/// Try pdfium first, then pdf-extract.
fn extract_blocking(path: &Path) -> Result<ExtractedDocument, DocuChatError> {
    let pdfium_err = match extract_with_pdfium(path) {
        Ok(pages) => {
            info!("pdfium extracted {} pages", pages.len());
            return Ok(ExtractedDocument::from_pages(pages, Parser::Pdfium));
        }
        Err(e) => {
            warn!("pdfium extraction failed, falling back to pdf-extract: {}", e);
            e
        }
    };

    match pdf_extract::extract_text_by_pages(path) {
        Ok(pages) => {
            info!("pdf-extract extracted {} pages", pages.len());
            Ok(ExtractedDocument::from_pages(pages, Parser::PdfExtract))
        }
        Err(e) => Err(DocuChatError::ExtractionFailed {
            path: path.to_path_buf(),
            detail: format!("pdfium: {pdfium_err}; pdf-extract: {e}"),
        }),
    }
}

fn extract_with_pdfium(path: &Path) -> Result<Vec<String>, String> {
    let pdfium = bind_pdfium().map_err(|e| format!("could not bind pdfium: {e:?}"))?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| format!("{e:?}"))?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = match page.text() {
            Ok(text) => text.all(),
            Err(e) => {
                debug!("Page {}: no text layer ({:?})", idx + 1, e);
                String::new()
            }
        };
        pages.push(text);
    }
    Ok(pages)
}

/// Bind to `PDFIUM_LIB_PATH` when set, else to a system-wide pdfium.
fn bind_pdfium() -> Result<Pdfium, PdfiumError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(lib) if !lib.trim().is_empty() => Pdfium::bind_to_library(lib.trim())?,
        _ => Pdfium::bind_to_system_library()?,
    };
    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PageContent;

    #[test]
    fn pages_are_keyed_from_one() {
        let doc = ExtractedDocument::from_pages(
            vec!["first".into(), String::new(), "third".into()],
            Parser::PdfExtract,
        );
        assert_eq!(doc.page_count, 3);
        assert_eq!(doc.content.get("1"), Some(&PageContent::Text("first".into())));
        assert_eq!(doc.content.get("2"), Some(&PageContent::Text(String::new())));
        assert_eq!(doc.content.get("3"), Some(&PageContent::Text("third".into())));
    }

    #[test]
    fn image_only_pdf_yields_no_pages() {
        let doc = ExtractedDocument::from_pages(
            vec![String::new(), " \n".into(), String::new()],
            Parser::Pdfium,
        );
        assert_eq!(doc.page_count, 3);
        assert!(doc.content.is_empty());
    }

    #[tokio::test]
    async fn image_only_pdf_is_answered_without_model_call() {
        let doc = ExtractedDocument::from_pages(vec![String::new(); 3], Parser::Pdfium);
        let out = crate::Pipeline::new(PipelineConfig::default())
            .run(doc.content, "What is this about?", vec![])
            .await
            .unwrap();

        assert_eq!(out.answer, crate::StageError::EmptyContext.to_string());
        assert!(out.state.selected_context.is_empty());
        assert!(!out.state.is_answerable);
    }

    #[tokio::test]
    async fn bytes_without_pdf_magic_are_rejected() {
        let err = extract_from_bytes(b"hello").await.unwrap_err();
        assert!(matches!(err, DocuChatError::NotAPdf { magic, .. } if &magic == b"hell"));

        let err = extract_from_bytes(b"%P").await.unwrap_err();
        assert!(matches!(err, DocuChatError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn garbage_pdf_fails_both_parsers() {
        let err = extract_from_bytes(b"%PDF-1.4\nthis is not really a pdf")
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                DocuChatError::ExtractionFailed { .. } | DocuChatError::Internal(_)
            ),
            "got: {err}"
        );
    }
}
