//! Result types returned by the pipeline.

use crate::error::StageError;
use crate::pipeline::intent::QueryIntent;
use crate::pipeline::state::PipelineState;
use serde::{Deserialize, Serialize};

/// The response body handed back to a chat client: `{"answer": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
}

impl ChatAnswer {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// The answer to return, model-generated or degraded.
    pub answer: String,
    /// `None` when the answer stage short-circuited on an empty context.
    pub intent: Option<QueryIntent>,
    /// Why `answer` is a degraded answer, if it is one.
    pub degraded: Option<StageError>,
    /// Final state after the last stage.
    pub state: PipelineState,
    pub stats: PipelineStats,
}

impl PipelineOutput {
    /// `true` when the answer came from the model.
    pub fn is_model_answer(&self) -> bool {
        self.degraded.is_none()
    }

    pub fn into_answer(self) -> ChatAnswer {
        ChatAnswer {
            answer: self.answer,
        }
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Characters in the selected context.
    pub context_chars: usize,
    /// Chunks appended to the context.
    pub context_chunks: usize,
    /// The budget cut off part of the document.
    pub context_truncated: bool,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}
