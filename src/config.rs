//! Configuration types for the answer pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Model access is grouped in
//! [`ModelSettings`], whose credential is resolved once at process start and
//! never written again, so a single config can be shared by every concurrent
//! request.

use crate::error::DocuChatError;
use edgequake_llm::ProviderType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum characters of document text handed to the model per query.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 8000;

/// Environment variable holding the credential for the default provider.
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Configuration for one answer pipeline.
///
/// # Example
/// ```rust
/// use docuchat::{OverflowPolicy, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .max_context_chars(4000)
///     .overflow_policy(OverflowPolicy::SkipPage)
///     .model("openai/gpt-4o-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_context_chars, 4000);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Character budget for the selected context. Default: 8000.
    ///
    /// Counted in Unicode scalar values. A chunk that would cross the budget
    /// is rejected whole, never cut mid-chunk.
    pub max_context_chars: usize,

    /// What the context selector does with the rest of the document once a
    /// chunk does not fit. Default: [`OverflowPolicy::StopAll`].
    pub overflow_policy: OverflowPolicy,

    /// Order in which pages are visited. Default: [`PageOrder::Numeric`].
    pub page_order: PageOrder,

    /// Language-model access.
    pub model: ModelSettings,

    /// Download timeout for URL inputs in seconds. Default: 30.
    pub download_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            overflow_policy: OverflowPolicy::default(),
            page_order: PageOrder::default(),
            model: ModelSettings::default(),
            download_timeout_secs: 30,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("max_context_chars", &self.max_context_chars)
            .field("overflow_policy", &self.overflow_policy)
            .field("page_order", &self.page_order)
            .field("model", &self.model)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
            explicit_key_env: false,
            key_from_env: false,
        }
    }

    /// Default configuration with the credential read from the environment.
    pub fn from_env() -> Self {
        Self {
            model: ModelSettings::from_env(),
            ..Self::default()
        }
    }
}

/// Builder for [`PipelineConfig`].
///
/// Choosing a provider also points `api_key_env` at that provider's usual
/// variable unless [`api_key_env`](Self::api_key_env) was called. An
/// environment credential requested with
/// [`api_key_from_env`](Self::api_key_from_env) is read in
/// [`build`](Self::build), after the provider and variable are settled.
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
    explicit_key_env: bool,
    key_from_env: bool,
}

impl PipelineConfigBuilder {
    pub fn max_context_chars(mut self, n: usize) -> Self {
        self.config.max_context_chars = n;
        self
    }

    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    pub fn page_order(mut self, order: PageOrder) -> Self {
        self.config.page_order = order;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.model.provider_name = name.into();
        if !self.explicit_key_env {
            if let Some(var) = provider_credential_env(&self.config.model.provider_name) {
                self.config.model.api_key_env = var.to_string();
            }
        }
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.model.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.model.max_tokens = Some(n);
        self
    }

    /// Name of the environment variable holding the credential.
    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.config.model.api_key_env = var.into();
        self.explicit_key_env = true;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.model.api_key = Some(key.into());
        self
    }

    /// Read the credential from the variable named by `api_key_env` at build
    /// time. A key set with [`api_key`](Self::api_key) takes precedence.
    pub fn api_key_from_env(mut self) -> Self {
        self.key_from_env = true;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.model.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<PipelineConfig, DocuChatError> {
        let c = &self.config;
        if c.max_context_chars == 0 {
            return Err(DocuChatError::InvalidConfig(
                "Context budget must be ≥ 1 character".into(),
            ));
        }
        if c.model.provider_name.trim().is_empty() {
            return Err(DocuChatError::InvalidConfig(
                "Provider name must not be empty".into(),
            ));
        }
        if ProviderType::from_str(c.model.provider_name.trim()).is_none() {
            return Err(DocuChatError::InvalidConfig(format!(
                "Unknown provider '{}'",
                c.model.provider_name
            )));
        }
        if c.model.model.trim().is_empty() {
            return Err(DocuChatError::InvalidConfig(
                "Model name must not be empty".into(),
            ));
        }
        if c.model.api_key_env.trim().is_empty() {
            return Err(DocuChatError::InvalidConfig(
                "Credential variable name must not be empty".into(),
            ));
        }
        if self.key_from_env && self.config.model.api_key.is_none() {
            self.config.model.api_key = read_env_credential(&self.config.model.api_key_env);
        }
        Ok(self.config)
    }
}

/// Settings for the language-model client.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Provider name as understood by `edgequake_llm::ProviderType`. Default: "openrouter".
    pub provider_name: String,

    /// Model identifier passed to the provider. Default: "openai/gpt-4o-mini".
    pub model: String,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Completion length cap; `None` leaves it to the provider.
    pub max_tokens: Option<usize>,

    /// Environment variable the credential is read from. Default: `OPENROUTER_API_KEY`.
    pub api_key_env: String,

    /// The resolved credential. Never serialised.
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Transport timeout for one model call; `None` waits for the provider.
    pub api_timeout_secs: Option<u64>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider_name: "openrouter".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_key: None,
            api_timeout_secs: None,
        }
    }
}

impl fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSettings")
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ModelSettings {
    /// Default settings with the credential read from `OPENROUTER_API_KEY`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.api_key = read_env_credential(&settings.api_key_env);
        settings
    }

    /// The credential, if one is present and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Whether the provider refuses to run without a credential.
    ///
    /// Local and test providers (ollama, lmstudio, vscode, mock) do not.
    /// Unrecognised names are treated as keyed.
    pub fn requires_credential(&self) -> bool {
        !matches!(
            ProviderType::from_str(self.provider_name.trim()),
            Some(
                ProviderType::Ollama
                    | ProviderType::LMStudio
                    | ProviderType::VsCodeCopilot
                    | ProviderType::Mock
            )
        )
    }
}

/// The environment variable a provider's credential conventionally lives in.
///
/// `None` for keyless providers and unrecognised names.
pub fn provider_credential_env(provider: &str) -> Option<&'static str> {
    match ProviderType::from_str(provider.trim())? {
        ProviderType::OpenAI => Some("OPENAI_API_KEY"),
        ProviderType::Anthropic => Some("ANTHROPIC_API_KEY"),
        ProviderType::Gemini => Some("GEMINI_API_KEY"),
        ProviderType::OpenRouter => Some("OPENROUTER_API_KEY"),
        ProviderType::XAI => Some("XAI_API_KEY"),
        ProviderType::HuggingFace => Some("HF_TOKEN"),
        ProviderType::Mistral => Some("MISTRAL_API_KEY"),
        ProviderType::AzureOpenAI => Some("AZURE_OPENAI_API_KEY"),
        _ => None,
    }
}

fn read_env_credential(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Behaviour of the context selector when a chunk would exceed the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Stop selecting entirely at the first chunk that does not fit. (default)
    #[default]
    StopAll,
    /// Drop the rest of the current page, then continue with the next page.
    /// A later short page may still contribute after an earlier one was cut.
    SkipPage,
}

/// Order in which the context selector visits pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOrder {
    /// Ascending page number; non-numeric keys last. (default)
    #[default]
    Numeric,
    /// The order the document mapping yields.
    AsGiven,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_pipeline() {
        let c = PipelineConfig::default();
        assert_eq!(c.max_context_chars, 8000);
        assert_eq!(c.overflow_policy, OverflowPolicy::StopAll);
        assert_eq!(c.page_order, PageOrder::Numeric);
        assert_eq!(c.model.provider_name, "openrouter");
        assert_eq!(c.model.api_key_env, "OPENROUTER_API_KEY");
        assert!((c.model.temperature - 0.2).abs() < f32::EPSILON);
        assert!(c.model.api_key.is_none());
    }

    #[test]
    fn zero_budget_is_rejected() {
        let err = PipelineConfig::builder().max_context_chars(0).build();
        assert!(matches!(err, Err(DocuChatError::InvalidConfig(_))));
    }

    #[test]
    fn temperature_is_clamped() {
        let c = PipelineConfig::builder().temperature(9.0).build().unwrap();
        assert!((c.model.temperature - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let c = PipelineConfig::builder().api_key("   ").build().unwrap();
        assert_eq!(c.model.credential(), None);

        let c = PipelineConfig::builder().api_key(" sk-1 ").build().unwrap();
        assert_eq!(c.model.credential(), Some("sk-1"));
    }

    #[test]
    fn debug_redacts_credential() {
        let c = PipelineConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"), "got: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn credential_is_never_serialised() {
        let c = PipelineConfig::builder().api_key("sk-secret").build().unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn provider_selects_its_credential_variable() {
        let c = PipelineConfig::builder().provider_name("anthropic").build().unwrap();
        assert_eq!(c.model.api_key_env, "ANTHROPIC_API_KEY");
        assert!(c.model.requires_credential());

        let c = PipelineConfig::builder().provider_name("Ollama").build().unwrap();
        assert_eq!(c.model.api_key_env, "OPENROUTER_API_KEY");
        assert!(!c.model.requires_credential());
    }

    #[test]
    fn explicit_key_variable_survives_provider_choice() {
        let c = PipelineConfig::builder()
            .api_key_env("MY_TEAM_KEY")
            .provider_name("openai")
            .build()
            .unwrap();
        assert_eq!(c.model.api_key_env, "MY_TEAM_KEY");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = PipelineConfig::builder().provider_name("nonesuch").build();
        assert!(matches!(err, Err(DocuChatError::InvalidConfig(_))));
    }

    #[test]
    fn explicit_key_wins_over_env_lookup() {
        let c = PipelineConfig::builder()
            .api_key("sk-explicit")
            .api_key_env("DOCUCHAT_TEST_SURELY_UNSET_VAR")
            .api_key_from_env()
            .build()
            .unwrap();
        assert_eq!(c.model.credential(), Some("sk-explicit"));
    }

    #[test]
    fn keyless_providers_have_no_credential_variable() {
        assert_eq!(provider_credential_env("mock"), None);
        assert_eq!(provider_credential_env("lm-studio"), None);
        assert_eq!(provider_credential_env("nonesuch"), None);
        assert_eq!(provider_credential_env("open-router"), Some("OPENROUTER_API_KEY"));
    }

    #[test]
    fn api_key_from_unset_env_is_none() {
        let c = PipelineConfig::builder()
            .api_key_env("DOCUCHAT_TEST_SURELY_UNSET_VAR")
            .api_key_from_env()
            .build()
            .unwrap();
        assert!(c.model.api_key.is_none());
    }
}
