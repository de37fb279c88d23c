use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SamplingConfig;
use crate::turn::Speaker;

/// How an inbound message relates to the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// One-on-one message sent straight to the bot.
    DirectMessage,
    /// Group message that explicitly addresses the bot.
    Mention,
    /// Group message not addressed to the bot.
    Ambient,
}

/// An inbound message event from a platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: Uuid,
    /// Platform name (e.g. "slack").
    pub platform: String,
    pub kind: EventKind,
    /// Channel, room or DM conversation id.
    pub channel: String,
    /// Thread root id when the message was posted inside a thread.
    #[serde(default)]
    pub thread: Option<String>,
    /// Platform-specific user ID.
    pub sender_id: String,
    /// Human-readable sender name.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Raw message text, mention tokens included.
    pub text: String,
    /// When the platform says the message was sent.
    pub sent_at: DateTime<Utc>,
    /// Posted by the bot itself.
    #[serde(default)]
    pub from_self: bool,
}

/// An outgoing message to post back through a platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub channel: String,
    pub text: String,
    /// Post as a reply inside this thread.
    #[serde(default)]
    pub thread: Option<String>,
    pub metadata: MessageMetadata,
}

/// Metadata about how a reply was generated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    /// Which provider produced this response.
    pub provider_used: String,
    /// Token count (if available from the provider).
    pub tokens_used: Option<u64>,
    /// Wall-clock processing time in milliseconds, retries included.
    pub processing_time_ms: u64,
    /// Model identifier (if applicable).
    pub model: Option<String>,
    /// Completion calls made, degenerate ones included.
    #[serde(default)]
    pub attempts: u32,
}

/// One message of a fetched thread transcript, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// A single completion call.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Backing model name.
    pub engine: String,
    /// Fully rendered prompt.
    pub prompt: String,
    pub sampling: SamplingConfig,
}

/// What a provider returned for one call.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u64>,
    pub processing_time_ms: u64,
}
