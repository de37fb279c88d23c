mod channels;
mod defaults;
mod persona;
mod providers;

#[cfg(test)]
mod tests;

pub use channels::*;
pub use persona::*;
pub use providers::*;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::KibitzError;
use defaults::*;

/// Top-level Kibitz configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub interjection: InterjectionConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for log files. Empty = log to stdout only.
    #[serde(default)]
    pub data_dir: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            data_dir: String::new(),
        }
    }
}

/// Conversation memory bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Idle window for channel, thread and DM conversations.
    #[serde(default = "default_channel_ttl")]
    pub channel_ttl_secs: u64,
    /// Idle window for one-on-one sub-conversations inside a shared room.
    #[serde(default = "default_peer_ttl")]
    pub peer_ttl_secs: u64,
    /// Maximum turns kept as ambient room history.
    #[serde(default = "default_ambient_capacity")]
    pub ambient_capacity: usize,
    /// Maximum history turns rendered into a prompt.
    #[serde(default = "default_max_prompt_turns")]
    pub max_prompt_turns: usize,
    /// Channels where mentions get a per-user record instead of a shared one.
    #[serde(default)]
    pub peer_scoped_channels: Vec<String>,
}

/// Longest accepted idle or recency window: ten years.
pub const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Seconds to a duration, clamped to [`MAX_WINDOW_SECS`].
fn window(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_WINDOW_SECS) as i64)
}

impl MemoryConfig {
    pub fn channel_ttl(&self) -> Duration {
        window(self.channel_ttl_secs)
    }

    pub fn peer_ttl(&self) -> Duration {
        window(self.peer_ttl_secs)
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            channel_ttl_secs: default_channel_ttl(),
            peer_ttl_secs: default_peer_ttl(),
            ambient_capacity: default_ambient_capacity(),
            max_prompt_turns: default_max_prompt_turns(),
            peer_scoped_channels: Vec::new(),
        }
    }
}

/// When the bot may speak without being addressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterjectionConfig {
    /// Chance in `[0, 1]` that an eligible message gets a reply.
    #[serde(default = "default_interjection_probability")]
    pub probability: f64,
    /// Channels where unprompted replies are allowed. Empty = nowhere.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Messages older than this are never answered unprompted.
    #[serde(default = "default_recency_window")]
    pub recency_window_secs: u64,
}

impl InterjectionConfig {
    pub fn recency_window(&self) -> Duration {
        window(self.recency_window_secs)
    }
}

impl Default for InterjectionConfig {
    fn default() -> Self {
        Self {
            probability: default_interjection_probability(),
            channels: Vec::new(),
            recency_window_secs: default_recency_window(),
        }
    }
}

impl Config {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), KibitzError> {
        if !(0.0..=1.0).contains(&self.interjection.probability) {
            return Err(KibitzError::Config(format!(
                "interjection.probability must be within [0, 1], got {}",
                self.interjection.probability
            )));
        }
        for (field, secs) in [
            ("memory.channel_ttl_secs", self.memory.channel_ttl_secs),
            ("memory.peer_ttl_secs", self.memory.peer_ttl_secs),
            ("interjection.recency_window_secs", self.interjection.recency_window_secs),
        ] {
            if secs > MAX_WINDOW_SECS {
                return Err(KibitzError::Config(format!(
                    "{field} must be at most {MAX_WINDOW_SECS}, got {secs}"
                )));
            }
        }
        if self.memory.ambient_capacity == 0 {
            return Err(KibitzError::Config(
                "memory.ambient_capacity must be at least 1".into(),
            ));
        }
        if self.provider.default_model.trim().is_empty() {
            return Err(KibitzError::Config("provider.default_model is empty".into()));
        }
        if self.persona.bot_label.trim().is_empty() {
            return Err(KibitzError::Config("persona.bot_label is empty".into()));
        }
        Ok(())
    }

    /// Overlay secrets from the environment (or any other lookup).
    ///
    /// Only non-empty values override what the file said.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.provider.openai.api_key = key;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.provider.openai.base_url = url;
        }

        let slack_app = get("SLACK_APP_TOKEN");
        let slack_bot = get("SLACK_BOT_TOKEN");
        let slack_user = get("SLACK_BOT_USER_ID");
        if slack_app.is_some() || slack_bot.is_some() || slack_user.is_some() {
            let slack = self.channel.slack.get_or_insert_with(SlackConfig::default);
            if let Some(token) = slack_app {
                slack.app_token = token;
            }
            if let Some(token) = slack_bot {
                slack.bot_token = token;
            }
            if let Some(user) = slack_user {
                slack.bot_user_id = Some(user);
            }
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// Falls back to defaults if the file does not exist. Nothing is logged:
/// this runs before the subscriber is installed, so callers report
/// [`missing_notice`] and resolve `persona.prompt_file` afterwards.
pub fn load(path: &str) -> Result<Config, KibitzError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KibitzError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        parse(&content)?
    } else {
        Config::default()
    };

    config.apply_env(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

/// The line to log when `load(path)` fell back to defaults.
pub fn missing_notice(path: &str) -> Option<String> {
    (!Path::new(path).exists())
        .then(|| format!("Config file not found at {path}, using defaults"))
}

/// Parse configuration from TOML text.
pub fn parse(content: &str) -> Result<Config, KibitzError> {
    toml::from_str(content)
        .map_err(|e| KibitzError::Config(format!("failed to parse config: {}", e)))
}
