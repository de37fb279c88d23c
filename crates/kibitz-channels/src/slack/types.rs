//! Slack Web API and Socket Mode deserialization types.

use serde::Deserialize;
use serde_json::Value;

/// Fields every Web API response carries.
#[derive(Debug, Deserialize)]
pub(crate) struct SlackResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthTest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenConnection {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostedMessage {
    #[serde(default)]
    pub ts: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Replies {
    #[serde(default)]
    pub messages: Vec<SlackMessage>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A message as returned by `conversations.replies`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SlackMessage {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileResponse {
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Profile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
}

impl Profile {
    /// Display name, then real name. Blank values are skipped.
    pub fn best_name(&self) -> Option<String> {
        [&self.display_name, &self.real_name]
            .into_iter()
            .flatten()
            .map(|n| n.trim())
            .find(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// Socket Mode frame. `hello` and `disconnect` frames carry no envelope id.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SocketEnvelope {
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(rename = "type")]
    pub envelope_type: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventCallback {
    #[serde(rename = "type")]
    pub callback_type: String,
    #[serde(default)]
    pub event_time: Option<i64>,
    pub event: EventPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventPayload {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}
