use crate::{
    error::KibitzError,
    message::{Completion, CompletionRequest, InboundEvent, OutgoingMessage, ThreadEntry},
};
use async_trait::async_trait;

/// Completion provider: turns a prompt into text.
///
/// Every text-completion backend implements this trait so the reply cycle
/// never depends on a particular vendor API.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Run one completion. Errors are upstream failures and are not retried
    /// by callers.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, KibitzError>;

    /// Check if the provider is reachable and authenticated.
    async fn is_available(&self) -> bool;
}

/// Chat platform: where events come from and replies go.
///
/// Implementations deliver inbound events and expose the few lookups the
/// orchestrator needs (thread transcripts and display names).
#[async_trait]
pub trait Platform: Send + Sync {
    /// Human-readable platform name.
    fn name(&self) -> &str;

    /// Start listening. Returns a receiver yielding classified events.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<InboundEvent>, KibitzError>;

    /// Post a message, optionally inside a thread.
    async fn post_message(&self, message: &OutgoingMessage) -> Result<(), KibitzError>;

    /// Fetch a thread transcript, oldest first. The last entry is the message
    /// that triggered the fetch.
    async fn thread_replies(
        &self,
        channel: &str,
        thread: &str,
    ) -> Result<Vec<ThreadEntry>, KibitzError>;

    /// Resolve a user id to a display name.
    async fn display_name(&self, user_id: &str) -> Result<String, KibitzError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), KibitzError>;
}
