//! OpenAI-compatible completion provider.
//!
//! Speaks either `/chat/completions` (the transcript goes in one user
//! message) or the legacy `/completions` endpoint (transcript sent verbatim).

use async_trait::async_trait;
use kibitz_core::{
    config::{ApiStyle, OpenAiConfig, SamplingConfig},
    error::KibitzError,
    message::{Completion, CompletionRequest},
    traits::Provider,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    style: ApiStyle,
}

impl OpenAiProvider {
    /// Create from config values.
    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            style: config.api_style,
        }
    }

    fn endpoint(&self) -> String {
        match self.style {
            ApiStyle::Chat => format!("{}/chat/completions", self.base_url),
            ApiStyle::Completions => format!("{}/completions", self.base_url),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: Option<String>,
}

/// Sampling fields shared by both endpoint shapes.
#[derive(Serialize)]
pub(crate) struct Sampling<'a> {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    #[serde(skip_serializing_if = "no_stop")]
    pub stop: &'a [String],
}

fn no_stop(stop: &&[String]) -> bool {
    stop.is_empty()
}

impl<'a> From<&'a SamplingConfig> for Sampling<'a> {
    fn from(s: &'a SamplingConfig) -> Self {
        Self {
            temperature: s.temperature,
            max_tokens: s.max_tokens,
            top_p: s.top_p,
            frequency_penalty: s.frequency_penalty,
            presence_penalty: s.presence_penalty,
            stop: &s.stop,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    #[serde(flatten)]
    pub sampling: Sampling<'a>,
}

#[derive(Serialize)]
pub(crate) struct TextCompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    #[serde(flatten)]
    pub sampling: Sampling<'a>,
}

#[derive(Deserialize)]
pub(crate) struct CompletionResponse {
    pub choices: Option<Vec<Choice>>,
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

/// A choice from either endpoint: chat fills `message`, legacy fills `text`.
#[derive(Deserialize)]
pub(crate) struct Choice {
    pub message: Option<ChatMessage>,
    pub text: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct Usage {
    pub total_tokens: Option<u64>,
}

impl CompletionResponse {
    /// First choice's text. An absent or null body reads as empty so the
    /// caller's degenerate-output handling decides what to do.
    pub(crate) fn first_text(&self) -> String {
        self.choices
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| {
                c.message
                    .as_ref()
                    .and_then(|m| m.content.clone())
                    .or_else(|| c.text.clone())
            })
            .unwrap_or_default()
    }
}

/// Serialize the request body for `style`.
pub(crate) fn build_body(
    style: ApiStyle,
    request: &CompletionRequest,
) -> Result<serde_json::Value, KibitzError> {
    let sampling = Sampling::from(&request.sampling);
    let value = match style {
        ApiStyle::Chat => serde_json::to_value(ChatCompletionRequest {
            model: &request.engine,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(request.prompt.clone()),
            }],
            sampling,
        })?,
        ApiStyle::Completions => serde_json::to_value(TextCompletionRequest {
            model: &request.engine,
            prompt: &request.prompt,
            sampling,
        })?,
    };
    Ok(value)
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, KibitzError> {
        let start = Instant::now();
        let body = build_body(self.style, request)?;

        let url = self.endpoint();
        debug!("openai: POST {url} model={}", request.engine);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| KibitzError::Provider(format!("openai request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(KibitzError::Provider(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| KibitzError::Provider(format!("openai: failed to parse response: {e}")))?;

        Ok(Completion {
            text: parsed.first_text(),
            model: parsed.model,
            tokens_used: parsed.usage.and_then(|u| u.total_tokens),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = format!("{}/models", self.base_url);
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {e}");
                false
            }
        }
    }
}
