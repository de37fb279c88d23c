//! Slack Web API calls.

use super::types::{
    AuthTest, OpenConnection, PostedMessage, ProfileResponse, Replies, SlackMessage, SlackResponse,
};
use kibitz_core::error::KibitzError;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempts per call when Slack rate-limits or fails transiently.
const MAX_ATTEMPTS: u32 = 3;
/// Page size for `conversations.replies`.
const REPLIES_PAGE: &str = "200";
/// Hard cap on thread pages fetched for one prompt.
const MAX_REPLY_PAGES: usize = 5;

#[derive(Clone)]
pub(crate) struct SlackApi {
    http: reqwest::Client,
    api_base: String,
    app_token: String,
    bot_token: String,
}

impl SlackApi {
    pub fn new(api_base: &str, app_token: &str, bot_token: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            app_token: app_token.trim().to_string(),
            bot_token: bot_token.trim().to_string(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    /// `auth.test`: the bot's own user id.
    pub async fn bot_user_id(&self) -> Result<String, KibitzError> {
        let resp: AuthTest = self
            .call("auth.test", || {
                self.http.post(self.url("auth.test")).bearer_auth(&self.bot_token)
            })
            .await?;
        resp.user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| KibitzError::Platform("slack auth.test did not return user_id".into()))
    }

    /// `apps.connections.open`: a fresh Socket Mode URL.
    pub async fn open_connection(&self) -> Result<String, KibitzError> {
        let resp: OpenConnection = self
            .call("apps.connections.open", || {
                self.http
                    .post(self.url("apps.connections.open"))
                    .bearer_auth(&self.app_token)
            })
            .await?;
        resp.url.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
            KibitzError::Platform("slack apps.connections.open did not return url".into())
        })
    }

    /// `chat.postMessage`, optionally as a thread reply.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<(), KibitzError> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(ts) = thread_ts {
            payload["thread_ts"] = json!(ts);
        }

        let posted: PostedMessage = self
            .call("chat.postMessage", || {
                self.http
                    .post(self.url("chat.postMessage"))
                    .bearer_auth(&self.bot_token)
                    .json(&payload)
            })
            .await?;
        debug!("slack: posted to {channel} ts={:?}", posted.ts);
        Ok(())
    }

    /// `conversations.replies`: every message of a thread, oldest first.
    pub async fn replies(&self, channel: &str, ts: &str) -> Result<Vec<SlackMessage>, KibitzError> {
        let mut messages = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_REPLY_PAGES {
            let page: Replies = self
                .call("conversations.replies", || {
                    let mut query = vec![("channel", channel), ("ts", ts), ("limit", REPLIES_PAGE)];
                    if let Some(c) = cursor.as_deref() {
                        query.push(("cursor", c));
                    }
                    self.http
                        .get(self.url("conversations.replies"))
                        .bearer_auth(&self.bot_token)
                        .query(&query)
                })
                .await?;
            messages.extend(page.messages);

            cursor = page
                .response_metadata
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.is_empty());
            if cursor.is_none() {
                return Ok(messages);
            }
        }

        warn!("slack: thread {channel}/{ts} truncated after {MAX_REPLY_PAGES} pages");
        Ok(messages)
    }

    /// `users.profile.get`: the best human-readable name, if any.
    pub async fn profile_name(&self, user: &str) -> Result<Option<String>, KibitzError> {
        let resp: ProfileResponse = self
            .call("users.profile.get", || {
                self.http
                    .get(self.url("users.profile.get"))
                    .bearer_auth(&self.bot_token)
                    .query(&[("user", user)])
            })
            .await?;
        Ok(resp.profile.and_then(|p| p.best_name()))
    }

    /// Send, retry on 429/5xx, and unwrap Slack's `{ok, error}` envelope.
    async fn call<T, F>(&self, method: &str, build: F) -> Result<T, KibitzError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 1;
        loop {
            let resp = build().send().await.map_err(|e| {
                KibitzError::Platform(format!("slack {method} request failed: {e}"))
            })?;

            let status = resp.status();
            if (status.as_u16() == 429 || status.is_server_error()) && attempt < MAX_ATTEMPTS {
                let wait = retry_after(resp.headers()).unwrap_or(attempt as u64);
                warn!("slack {method} returned {status}, retrying in {wait}s");
                tokio::time::sleep(Duration::from_secs(wait)).await;
                attempt += 1;
                continue;
            }
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(KibitzError::Platform(format!(
                    "slack {method} returned {status}: {text}"
                )));
            }

            let parsed: SlackResponse<T> = resp.json().await.map_err(|e| {
                KibitzError::Platform(format!("slack {method}: failed to parse response: {e}"))
            })?;
            if !parsed.ok {
                return Err(KibitzError::Platform(format!(
                    "slack {method} failed: {}",
                    parsed.error.unwrap_or_else(|| "unknown error".into())
                )));
            }
            return Ok(parsed.body);
        }
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
