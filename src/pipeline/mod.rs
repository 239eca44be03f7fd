//! Pipeline stages for document question answering.
//!
//! Each submodule owns one step. The stages read and write a shared
//! [`state::PipelineState`]; the orchestration lives in [`crate::chat`].
//!
//! ## Data Flow
//!
//! ```text
//! document ──▶ context ──▶ intent ──▶ prompt ──▶ invoke ──▶ validate
//! (per page)   (bounded)   (keywords) (template) (1 call)   (pass)
//! ```
//!
//! 1. [`context`]: flatten pages into a character-bounded context
//! 2. [`intent`]: keyword classification into analytical or factual
//! 3. [`answer`]: build the prompt and call the model, or short-circuit on
//!    an empty context
//! 4. [`invoke`]: credential check and the single model call; the only
//!    stage with network I/O
//! 5. [`validate`]: terminal pass-through
//!
//! [`input`] sits outside the stage line: it resolves a path or URL to a
//! local file before extraction.

pub mod answer;
pub mod context;
pub mod input;
pub mod intent;
pub mod invoke;
pub mod state;
pub mod validate;
