//! The `AnswerGeneration` stage: classify, build a prompt, call the model.
//!
//! Runs as one atomic stage. When the selected context is empty the prompt is
//! never built and the model is never called; the state receives the
//! "couldn't extract readable text" answer instead.

use crate::error::StageError;
use crate::pipeline::intent::{self, QueryIntent};
use crate::pipeline::invoke::{ClientFactory, Completion, ModelInvoker};
use crate::pipeline::state::PipelineState;
use crate::prompts;
use std::time::Instant;
use tracing::{debug, warn};

/// What happened inside the answer stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// `None` when the stage short-circuited before classification.
    pub intent: Option<QueryIntent>,
    pub completion: Option<Completion>,
    /// Set whenever `state.answer` holds a degraded answer.
    pub degraded: Option<StageError>,
    pub llm_duration_ms: u64,
}

/// Run the answer stage against `state`, writing `state.answer`.
pub async fn run<F: ClientFactory>(
    state: &mut PipelineState,
    invoker: &ModelInvoker<F>,
) -> AnswerOutcome {
    let mut outcome = AnswerOutcome::default();

    let intent = intent::classify(&state.current_query);
    let Some(prompt) = prompts::build_prompt(intent, &state.selected_context, &state.current_query)
    else {
        debug!("Context is empty; skipping model call");
        let degraded = StageError::EmptyContext;
        state.answer = degraded.to_string();
        outcome.degraded = Some(degraded);
        return outcome;
    };
    outcome.intent = Some(intent);
    debug!("Query intent: {:?}, prompt: {} chars", intent, prompt.chars().count());

    let start = Instant::now();
    let result = invoker.invoke(&prompt).await;
    outcome.llm_duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(completion) => {
            state.answer = completion.content.clone();
            outcome.completion = Some(completion);
        }
        Err(degraded) => {
            warn!("Returning degraded answer: {}", degraded);
            state.answer = degraded.to_string();
            outcome.degraded = Some(degraded);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelSettings;
    use crate::document::DocumentContent;
    use crate::pipeline::invoke::{BackendError, ChatBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Echo {
        calls: Arc<AtomicUsize>,
    }

    impl ChatBackend for Echo {
        async fn complete(&self, prompt: &str) -> Result<Completion, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Completion::text(format!("{} chars", prompt.len())))
        }
    }

    impl ClientFactory for Echo {
        type Client = Echo;

        fn create(&self, _settings: &ModelSettings) -> Result<Echo, BackendError> {
            Ok(self.clone())
        }
    }

    fn state_with_context(context: &str, query: &str) -> PipelineState {
        let mut state = PipelineState::new(DocumentContent::new(), query, vec![]);
        state.selected_context = context.to_string();
        state
    }

    fn invoker(echo: &Echo) -> ModelInvoker<Echo> {
        let settings = ModelSettings {
            api_key: Some("sk-test".into()),
            ..ModelSettings::default()
        };
        ModelInvoker::with_factory(settings, echo.clone())
    }

    #[tokio::test]
    async fn whitespace_context_short_circuits() {
        let echo = Echo::default();
        let mut state = state_with_context(" \n\t ", "summarize");

        let outcome = run(&mut state, &invoker(&echo)).await;

        assert_eq!(outcome.intent, None);
        assert_eq!(outcome.degraded, Some(StageError::EmptyContext));
        assert_eq!(state.answer, StageError::EmptyContext.to_string());
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_answer_lands_in_state() {
        let echo = Echo::default();
        let mut state = state_with_context("Page 1\nSome fact\n\n", "What year?");

        let outcome = run(&mut state, &invoker(&echo)).await;

        let expected = prompts::factual_prompt("Page 1\nSome fact\n\n", "What year?");
        assert_eq!(outcome.intent, Some(QueryIntent::Factual));
        assert_eq!(outcome.degraded, None);
        assert_eq!(state.answer, format!("{} chars", expected.len()));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    }
}
