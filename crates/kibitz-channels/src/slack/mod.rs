//! Slack platform over Socket Mode.
//!
//! Events arrive on a websocket opened via `apps.connections.open`; replies
//! and lookups go through the Web API.
//! Docs: <https://api.slack.com/apis/socket-mode>

mod api;
mod events;
mod socket;
pub(crate) mod types;

#[cfg(test)]
mod tests;

use api::SlackApi;
use kibitz_core::config::SlackConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Slack platform using Socket Mode for events and the Web API for replies.
pub struct SlackPlatform {
    config: SlackConfig,
    api: SlackApi,
    /// Resolved on start when not configured.
    bot_user_id: Arc<Mutex<Option<String>>>,
    /// user id → display name, filled lazily.
    names: Arc<Mutex<HashMap<String, String>>>,
    shutdown: watch::Sender<bool>,
}

impl SlackPlatform {
    /// Create a new Slack platform from config.
    pub fn new(config: SlackConfig) -> Self {
        let api = SlackApi::new(&config.api_base, &config.app_token, &config.bot_token);
        let bot_user_id = config.bot_user_id.clone().filter(|id| !id.trim().is_empty());
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            api,
            bot_user_id: Arc::new(Mutex::new(bot_user_id)),
            names: Arc::new(Mutex::new(HashMap::new())),
            shutdown,
        }
    }

    /// The bot's own user id, once known.
    pub async fn bot_user_id(&self) -> Option<String> {
        self.bot_user_id.lock().await.clone()
    }
}
