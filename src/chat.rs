//! Pipeline orchestration and the public entry points.
//!
//! The pipeline is a straight line over one [`PipelineState`]:
//!
//! ```text
//! START ─▶ ContextSelection ─▶ AnswerGeneration ─▶ Validation ─▶ END
//! ```
//!
//! There is no routing between stages; [`Stage::ORDER`] is walked front to
//! back every time. Recoverable problems (no credential, empty context, a
//! failed model call) end up as in-band answers, so [`Pipeline::run`] only
//! returns `Err` when the pipeline machinery itself fails, which the caller
//! turns into a generic "AI error" response.

use crate::config::PipelineConfig;
use crate::document::{ChatTurn, DocumentContent};
use crate::error::DocuChatError;
use crate::output::{ChatAnswer, PipelineOutput, PipelineStats};
use crate::pipeline::answer::{self, AnswerOutcome};
use crate::pipeline::context::{self, SelectedContext};
use crate::pipeline::invoke::{ClientFactory, EdgequakeFactory, ModelInvoker};
use crate::pipeline::state::{PipelineState, Stage};
use crate::pipeline::validate;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A reusable answer pipeline.
///
/// Cheap to clone; clones share the configuration and model invoker. Each
/// call to [`Pipeline::run`] works on its own fresh state, so one pipeline can
/// serve any number of concurrent requests without locking.
pub struct Pipeline<F = EdgequakeFactory> {
    inner: Arc<Inner<F>>,
}

struct Inner<F> {
    config: PipelineConfig,
    invoker: ModelInvoker<F>,
}

impl<F> Clone for Pipeline<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Pipeline<EdgequakeFactory> {
    /// Pipeline backed by `edgequake_llm`.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_factory(config, EdgequakeFactory)
    }
}

impl<F> Pipeline<F>
where
    F: ClientFactory + 'static,
{
    /// Pipeline with a custom model client factory.
    pub fn with_factory(config: PipelineConfig, factory: F) -> Self {
        let invoker = ModelInvoker::with_factory(config.model.clone(), factory);
        Self {
            inner: Arc::new(Inner { config, invoker }),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Answer `query` about `document`.
    ///
    /// The stages run on their own task; a panic inside any stage is
    /// reported as [`DocuChatError::Internal`] instead of unwinding into the
    /// caller.
    ///
    /// # Errors
    /// Only infrastructure faults. Missing credentials, unreadable documents
    /// and failed model calls are returned as `Ok` with a degraded answer.
    pub async fn run(
        &self,
        document: DocumentContent,
        query: impl Into<String>,
        history: Vec<ChatTurn>,
    ) -> Result<PipelineOutput, DocuChatError> {
        let state = PipelineState::new(document, query, history);
        let pipeline = self.clone();

        tokio::spawn(async move {
            let mut state = state;
            let run = pipeline.execute(&mut state).await;
            run.into_output(state)
        })
        .await
        .map_err(|e| DocuChatError::Internal(format!("Pipeline task failed: {}", e)))
    }

    /// Run every stage in order against `state`, in place.
    pub async fn execute(&self, state: &mut PipelineState) -> StageRun {
        let start = Instant::now();
        info!(
            "Answering query over {} pages ({} history turns)",
            state.document_content.len(),
            state.conversation_history.len()
        );

        let mut run = StageRun::default();
        for stage in Stage::ORDER {
            debug!("Entering stage {}", stage);
            match stage {
                Stage::ContextSelection => {
                    run.context = context::run(state, &self.inner.config);
                }
                Stage::AnswerGeneration => {
                    run.answer = answer::run(state, &self.inner.invoker).await;
                }
                Stage::Validation => validate::run(state),
            }
            run.completed.push(stage);
        }
        run.total_duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Pipeline complete in {}ms (model answer: {})",
            run.total_duration_ms,
            run.answer.degraded.is_none()
        );
        run
    }
}

/// Per-stage results of one [`Pipeline::execute`] call.
#[derive(Debug, Clone, Default)]
pub struct StageRun {
    /// Stages that ran, in order.
    pub completed: Vec<Stage>,
    pub context: SelectedContext,
    pub answer: AnswerOutcome,
    pub total_duration_ms: u64,
}

impl StageRun {
    fn into_output(self, state: PipelineState) -> PipelineOutput {
        let (prompt_tokens, completion_tokens) = self
            .answer
            .completion
            .as_ref()
            .map(|c| (c.prompt_tokens, c.completion_tokens))
            .unwrap_or_default();

        PipelineOutput {
            answer: state.answer.clone(),
            intent: self.answer.intent,
            degraded: self.answer.degraded,
            stats: PipelineStats {
                context_chars: self.context.chars,
                context_chunks: self.context.chunks,
                context_truncated: self.context.truncated,
                prompt_tokens,
                completion_tokens,
                llm_duration_ms: self.answer.llm_duration_ms,
                total_duration_ms: self.total_duration_ms,
            },
            state,
        }
    }
}

/// Answer `query` about `document` with a one-off `edgequake_llm` pipeline.
///
/// # Example
/// ```rust,no_run
/// use docuchat::{run_pipeline, DocumentContent, PipelineConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let doc = DocumentContent::from_json_str(r#"{"1": "The plant opened in 1999."}"#)?;
/// let reply = run_pipeline(doc, "What year?", vec![], &PipelineConfig::from_env()).await?;
/// println!("{}", reply.answer);
/// # Ok(())
/// # }
/// ```
pub async fn run_pipeline(
    document: DocumentContent,
    query: impl Into<String>,
    history: Vec<ChatTurn>,
    config: &PipelineConfig,
) -> Result<ChatAnswer, DocuChatError> {
    Pipeline::new(config.clone())
        .run(document, query, history)
        .await
        .map(PipelineOutput::into_answer)
}

/// Synchronous wrapper around [`run_pipeline`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_pipeline_sync(
    document: DocumentContent,
    query: impl Into<String>,
    history: Vec<ChatTurn>,
    config: &PipelineConfig,
) -> Result<ChatAnswer, DocuChatError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocuChatError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_pipeline(document, query, history, config))
}
