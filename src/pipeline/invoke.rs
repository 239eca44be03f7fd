//! Model invocation: the pipeline's only network egress point.
//!
//! One attempt per prompt, no retry and no backoff. Every failure mode is
//! mapped onto a [`StageError`] rather than escaping as an `Err` from the
//! pipeline:
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | keyed provider, no credential | [`StageError::NotConfigured`], client never built |
//! | client construction fails | [`StageError::NotConfigured`] |
//! | provider call fails | [`StageError::Invocation`] carrying the provider's message |
//! | provider call succeeds | trimmed response text |
//!
//! The two traits, [`ClientFactory`] and [`ChatBackend`], are the seams that
//! let tests count calls and simulate transport failures without a network.

use crate::config::ModelSettings;
use crate::error::StageError;
use edgequake_llm::{
    AnthropicProvider, ChatMessage, CompletionOptions, GeminiProvider, LLMProvider,
    OpenAIProvider, OpenRouterProvider, ProviderFactory, ProviderType, XAIProvider,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Error type returned by backends and factories.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// A model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Something that can turn a prompt into generated text.
pub trait ChatBackend: Send + Sync {
    /// Send `prompt` as a single user message.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<Completion, BackendError>> + Send;
}

/// Builds a [`ChatBackend`] from the configured settings.
pub trait ClientFactory: Send + Sync {
    type Client: ChatBackend;

    /// Called only once a credential has been found, or for a provider
    /// that needs none.
    fn create(&self, settings: &ModelSettings) -> Result<Self::Client, BackendError>;
}

// ── edgequake-llm implementation ─────────────────────────────────────────

/// Factory for `edgequake_llm` providers.
///
/// Providers with a key-taking constructor (openrouter, openai, anthropic,
/// gemini, xai) are built from [`ModelSettings::credential`]. The rest go
/// through [`edgequake_llm::ProviderFactory`], which reads the provider's own
/// environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgequakeFactory;

impl ClientFactory for EdgequakeFactory {
    type Client = ProviderClient;

    fn create(&self, settings: &ModelSettings) -> Result<ProviderClient, BackendError> {
        let provider = match settings.credential() {
            Some(key) => provider_with_key(settings, key)?,
            None => from_provider_env(settings)?,
        };
        Ok(ProviderClient::new(provider, settings))
    }
}

fn provider_with_key(
    settings: &ModelSettings,
    key: &str,
) -> Result<Arc<dyn LLMProvider>, BackendError> {
    let model = settings.model.as_str();
    let provider: Arc<dyn LLMProvider> = match ProviderType::from_str(settings.provider_name.trim()) {
        Some(ProviderType::OpenRouter) => Arc::new(OpenRouterProvider::new(key).with_model(model)),
        Some(ProviderType::OpenAI) => Arc::new(OpenAIProvider::new(key).with_model(model)),
        Some(ProviderType::Anthropic) => Arc::new(AnthropicProvider::new(key).with_model(model)),
        Some(ProviderType::Gemini) if !model.starts_with("vertexai:") => {
            Arc::new(GeminiProvider::new(key).with_model(model))
        }
        Some(ProviderType::XAI) => Arc::new(
            XAIProvider::new(key.to_string(), model.to_string(), None)
                .map_err(|e| BackendError::from(format!("{e}")))?,
        ),
        _ => return from_provider_env(settings),
    };
    Ok(provider)
}

fn from_provider_env(settings: &ModelSettings) -> Result<Arc<dyn LLMProvider>, BackendError> {
    ProviderFactory::create_llm_provider(settings.provider_name.trim(), &settings.model)
        .map_err(|e| BackendError::from(format!("{e}")))
}

/// A [`ChatBackend`] over any `edgequake_llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Option<Duration>,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, settings: &ModelSettings) -> Self {
        Self {
            provider,
            options: build_options(settings),
            timeout: settings.api_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl ChatBackend for ProviderClient {
    async fn complete(&self, prompt: &str) -> Result<Completion, BackendError> {
        let messages = vec![ChatMessage::user(prompt)];
        let call = self.provider.chat(&messages, Some(&self.options));

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| format!("request timed out after {}s", limit.as_secs()))?,
            None => call.await,
        };
        let response = result.map_err(|e| BackendError::from(format!("{e}")))?;

        Ok(Completion {
            content: response.content,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        })
    }
}

/// Build `CompletionOptions` from the model settings.
fn build_options(settings: &ModelSettings) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(settings.temperature),
        max_tokens: settings.max_tokens,
        ..Default::default()
    }
}

// ── Invoker ──────────────────────────────────────────────────────────────

/// Credential check, client construction and a single model call.
pub struct ModelInvoker<F = EdgequakeFactory> {
    factory: F,
    settings: ModelSettings,
}

impl ModelInvoker<EdgequakeFactory> {
    pub fn new(settings: ModelSettings) -> Self {
        Self::with_factory(settings, EdgequakeFactory)
    }
}

impl<F: ClientFactory> ModelInvoker<F> {
    pub fn with_factory(settings: ModelSettings, factory: F) -> Self {
        Self { factory, settings }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Send `prompt` to the model.
    ///
    /// Never panics and never returns a transport error directly: every
    /// failure becomes a [`StageError`] whose `Display` is the user-facing
    /// degraded answer.
    pub async fn invoke(&self, prompt: &str) -> Result<Completion, StageError> {
        let not_configured = || StageError::NotConfigured {
            env_var: self.settings.api_key_env.clone(),
        };

        if self.settings.requires_credential() && self.settings.credential().is_none() {
            warn!(
                "No model credential in {}; skipping model call",
                self.settings.api_key_env
            );
            return Err(not_configured());
        }

        let client = self.factory.create(&self.settings).map_err(|e| {
            warn!(
                "Could not build '{}' client for model '{}': {}",
                self.settings.provider_name, self.settings.model, e
            );
            not_configured()
        })?;

        let start = Instant::now();
        match client.complete(prompt).await {
            Ok(mut completion) => {
                completion.content = completion.content.trim().to_string();
                debug!(
                    "Model answered: {} input tokens, {} output tokens, {:?}",
                    completion.prompt_tokens,
                    completion.completion_tokens,
                    start.elapsed()
                );
                Ok(completion)
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Model call failed after {:?}: {}", start.elapsed(), message);
                Err(StageError::Invocation { message })
            }
        }
    }
}
