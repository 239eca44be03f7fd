//! Error types for the docuchat library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocuChatError`]: **fatal**, the request cannot be served at all
//!   (input file missing, download failed, PDF unreadable, pipeline task
//!   died). Returned as `Err(DocuChatError)` and caught by the boundary layer,
//!   which turns it into a generic failure answer.
//!
//! * [`StageError`]: **in-band**, a pipeline stage could not produce a model
//!   answer (credential missing, no readable text, provider call failed).
//!   Never propagated as `Err` out of the pipeline; its `Display` output *is*
//!   the degraded answer the user receives, and the variant itself is kept in
//!   [`crate::output::PipelineOutput`] so callers can branch without matching
//!   on strings.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docuchat library.
///
/// Per-stage failures use [`StageError`] and are carried in-band rather than
/// propagated here.
#[derive(Debug, Error)]
pub enum DocuChatError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download PDF: '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Every available parser rejected the PDF.
    #[error("PDF parsing failed for '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    /// Document content JSON could not be parsed.
    #[error("Invalid document content: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// The pipeline engine itself failed (e.g. its task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A recoverable failure inside the answer pipeline.
///
/// The `Display` text of each variant is the exact answer returned to the
/// user in place of a model-generated one.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageError {
    /// No usable model credential, or the client could not be constructed.
    #[error("AI is not configured correctly. Please check your {env_var}.")]
    NotConfigured { env_var: String },

    /// The selected context holds no readable text; the model was not called.
    #[error(
        "I couldn’t extract readable text from this PDF. \
         If it is scanned or image-based, OCR may be required."
    )]
    EmptyContext,

    /// The model call itself failed (network, rate limit, bad response).
    #[error("AI error: {message}")]
    Invocation { message: String },
}

impl StageError {
    /// `true` when the model was never contacted for this request.
    pub fn is_pre_invocation(&self) -> bool {
        matches!(
            self,
            StageError::NotConfigured { .. } | StageError::EmptyContext
        )
    }
}
