//! Completion with retry on degenerate output.
//!
//! A completion is degenerate when nothing but whitespace and ASCII
//! punctuation survives label stripping. Those are retried with the same
//! prompt and engine; upstream errors are not.

use kibitz_core::{
    config::{RetryConfig, SamplingConfig},
    error::KibitzError,
    message::{Completion, CompletionRequest, MessageMetadata},
    traits::Provider,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest pause between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How often and how patiently to ask for a usable completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `0` = unbounded.
    pub max_attempts: u32,
    /// Pause after the first degenerate attempt; doubles afterwards.
    pub backoff: Duration,
    pub attempt_timeout: Option<Duration>,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            backoff: Duration::from_millis(cfg.backoff_ms),
            attempt_timeout: (cfg.attempt_timeout_secs > 0)
                .then(|| Duration::from_secs(cfg.attempt_timeout_secs)),
        }
    }
}

impl RetryPolicy {
    /// Whether attempt number `attempt` (1-based) may run.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt <= self.max_attempts
    }

    /// Pause after degenerate attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// A usable reply and how it was produced.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub metadata: MessageMetadata,
}

/// True when `text` carries no words: only whitespace and ASCII punctuation.
pub fn is_degenerate(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_whitespace() || c.is_ascii_punctuation())
}

/// Remove every `label:` the model echoed back, then trim.
pub fn strip_label(text: &str, label: &str) -> String {
    let marker = format!("{label}:");
    if label.is_empty() || !text.contains(&marker) {
        return text.trim().to_string();
    }
    text.split(marker.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Calls a provider until it says something.
pub struct ResponseFetcher {
    provider: Arc<dyn Provider>,
    policy: RetryPolicy,
    bot_label: String,
    sampling: SamplingConfig,
}

impl ResponseFetcher {
    pub fn new(
        provider: Arc<dyn Provider>,
        policy: RetryPolicy,
        bot_label: impl Into<String>,
        sampling: SamplingConfig,
    ) -> Self {
        Self {
            provider,
            policy,
            bot_label: bot_label.into(),
            sampling,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch a non-degenerate reply for `prompt` from `engine`.
    pub async fn fetch(&self, prompt: &str, engine: &str) -> Result<Reply, KibitzError> {
        let request = CompletionRequest {
            engine: engine.to_string(),
            prompt: prompt.to_string(),
            sampling: self.sampling.clone(),
        };
        let started = Instant::now();
        let mut attempt = 1;

        loop {
            let completion = self.attempt(&request).await?;
            let text = strip_label(&completion.text, &self.bot_label);

            if !is_degenerate(&text) {
                debug!(
                    "{}: usable reply from {engine} after {attempt} attempt(s)",
                    self.provider.name()
                );
                return Ok(Reply {
                    text,
                    metadata: MessageMetadata {
                        provider_used: self.provider.name().to_string(),
                        tokens_used: completion.tokens_used,
                        processing_time_ms: started.elapsed().as_millis() as u64,
                        model: completion.model.or_else(|| Some(engine.to_string())),
                        attempts: attempt,
                    },
                });
            }

            if !self.policy.allows(attempt + 1) {
                warn!(
                    "{}: {attempt} degenerate completion(s) from {engine}, giving up",
                    self.provider.name()
                );
                return Err(KibitzError::DegenerateCompletion { attempts: attempt });
            }

            let delay = self.policy.delay_after(attempt);
            debug!("degenerate completion (attempt {attempt}), retrying in {delay:?}");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<Completion, KibitzError> {
        match self.policy.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.complete(request))
                .await
                .map_err(|_| {
                    KibitzError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
                })?,
            None => self.provider.complete(request).await,
        }
    }
}
