//! # docuchat
//!
//! Answer natural-language questions about an extracted PDF with one LLM call.
//!
//! The input is a document whose pages have already been turned into text,
//! either raw strings or structured records with titled sections, plus the
//! user's question. The crate selects a bounded slice of that text, decides
//! whether the question asks for a summary/analysis or a specific fact, wraps
//! the context in the matching prompt, and asks the model. Every recoverable
//! failure (no credential, nothing readable in the document, a failed model
//! call) comes back as a readable answer rather than an error.
//!
//! ## Pipeline Overview
//!
//! ```text
//! DocumentContent + query
//!  │
//!  ├─ 1. ContextSelection  pages → "Page N - Title\n…" chunks, ≤ 8000 chars
//!  ├─ 2. AnswerGeneration  keyword intent → prompt → single model call
//!  └─ 3. Validation        pass-through
//!  │
//!  ▼
//! {"answer": "..."}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docuchat::{Pipeline, DocumentContent, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential read from OPENROUTER_API_KEY
//!     let pipeline = Pipeline::new(PipelineConfig::from_env());
//!     let doc = DocumentContent::from_json_str(
//!         r#"{"1": {"sections": [{"title": "Intro", "content": "Founded in 1999."}]}}"#,
//!     )?;
//!     let output = pipeline.run(doc, "When was it founded?", vec![]).await?;
//!     println!("{}", output.answer);
//!     eprintln!("context: {} chars, tokens: {} in / {} out",
//!         output.stats.context_chars,
//!         output.stats.prompt_tokens,
//!         output.stats.completion_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docuchat` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `pdf`   | on      | PDF text extraction ([`extract`]) via pdfium with a pdf-extract fallback |
//!
//! Hosts that already have page text can drop both:
//! ```toml
//! docuchat = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chat;
pub mod config;
pub mod document;
pub mod error;
#[cfg(feature = "pdf")]
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chat::{run_pipeline, run_pipeline_sync, Pipeline};
pub use config::{ModelSettings, OverflowPolicy, PageOrder, PipelineConfig, PipelineConfigBuilder};
pub use document::{ChatTurn, DocumentContent, PageContent, Role, Section, StructuredPage};
pub use error::{DocuChatError, StageError};
#[cfg(feature = "pdf")]
pub use extract::{extract_document, extract_from_bytes, ExtractedDocument, Parser};
pub use output::{ChatAnswer, PipelineOutput, PipelineStats};
pub use pipeline::intent::QueryIntent;
pub use pipeline::invoke::{BackendError, ChatBackend, ClientFactory, Completion};
pub use pipeline::state::{PipelineState, Stage};
