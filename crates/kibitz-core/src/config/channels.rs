use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Platform configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub slack: Option<SlackConfig>,
}

/// Slack app config (Socket Mode).
///
/// The app token (`xapp-…`) opens the socket; the bot token (`xoxb-…`)
/// authorizes Web API calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub app_token: String,
    #[serde(default)]
    pub bot_token: String,
    /// The bot's own user id. Resolved with `auth.test` when absent.
    #[serde(default)]
    pub bot_user_id: Option<String>,
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_token: String::new(),
            bot_token: String::new(),
            bot_user_id: None,
            api_base: default_slack_api_base(),
        }
    }
}
