//! Per-request pipeline state and the fixed stage order.

use crate::document::{ChatTurn, DocumentContent};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The record threaded through every stage for one query.
///
/// Created fresh per request, mutated in place by each stage, and dropped
/// once the answer has been taken out. Never shared between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Input: the extracted document.
    pub document_content: DocumentContent,
    /// Input: prior transcript. Carried through unchanged; no stage reads it yet.
    pub conversation_history: Vec<ChatTurn>,
    /// Input: the user's question.
    pub current_query: String,
    /// Set by [`Stage::ContextSelection`].
    pub selected_context: String,
    /// Set by [`Stage::AnswerGeneration`].
    pub answer: String,
    /// Set by [`Stage::ContextSelection`]; true iff the trimmed context is non-empty.
    pub is_answerable: bool,
    /// Set by [`Stage::Validation`].
    pub validation_passed: bool,
}

impl PipelineState {
    pub fn new(
        document_content: DocumentContent,
        current_query: impl Into<String>,
        conversation_history: Vec<ChatTurn>,
    ) -> Self {
        Self {
            document_content,
            conversation_history,
            current_query: current_query.into(),
            ..Self::default()
        }
    }
}

/// A pipeline stage. The pipeline always runs [`Stage::ORDER`] front to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ContextSelection,
    AnswerGeneration,
    Validation,
}

impl Stage {
    /// `START → ContextSelection → AnswerGeneration → Validation → END`.
    pub const ORDER: [Stage; 3] = [
        Stage::ContextSelection,
        Stage::AnswerGeneration,
        Stage::Validation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::ContextSelection => "context_selection",
            Stage::AnswerGeneration => "answer_generation",
            Stage::Validation => "validation",
        }
    }

    /// The stage that follows this one, or `None` at the end of the line.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::ContextSelection => Some(Stage::AnswerGeneration),
            Stage::AnswerGeneration => Some(Stage::Validation),
            Stage::Validation => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
