use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Engine used when a message does not pick one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Engines a message may select with `text | engine`.
    #[serde(default = "default_allowed_models")]
    pub allowed_models: Vec<String>,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            allowed_models: default_allowed_models(),
            openai: OpenAiConfig::default(),
            sampling: SamplingConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Which OpenAI endpoint shape to call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStyle {
    /// `/chat/completions`, prompt sent as a single user message.
    #[default]
    Chat,
    /// Legacy `/completions`, prompt sent verbatim.
    Completions,
}

/// OpenAI-compatible endpoint config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_style: ApiStyle,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            api_style: ApiStyle::default(),
        }
    }
}

/// Sampling parameters, fixed per deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f32,
    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f32,
    /// Stop sequences. Usually the human role label followed by a colon.
    #[serde(default = "default_stop")]
    pub stop: Vec<String>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: default_frequency_penalty(),
            presence_penalty: default_presence_penalty(),
            stop: default_stop(),
        }
    }
}

/// Retry behavior for degenerate (empty or punctuation-only) completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum completion calls per reply. `0` = retry forever.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between degenerate attempts, doubled each time.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Deadline for a single completion call. `0` = no deadline.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            attempt_timeout_secs: default_attempt_timeout(),
        }
    }
}
