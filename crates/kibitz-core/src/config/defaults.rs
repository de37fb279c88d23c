//! Serde default value functions.

pub(super) fn default_name() -> String {
    "kibitz".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_channel_ttl() -> u64 {
    600
}

pub(super) fn default_peer_ttl() -> u64 {
    300
}

pub(super) fn default_ambient_capacity() -> usize {
    20
}

pub(super) fn default_max_prompt_turns() -> usize {
    20
}

pub(super) fn default_interjection_probability() -> f64 {
    0.2
}

pub(super) fn default_recency_window() -> u64 {
    10
}

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub(super) fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

pub(super) fn default_allowed_models() -> Vec<String> {
    [
        "gpt-4o-mini",
        "gpt-4o",
        "gpt-4.1",
        "gpt-4.1-mini",
        "gpt-3.5-turbo",
        "gpt-3.5-turbo-instruct",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

pub(super) fn default_temperature() -> f32 {
    0.9
}

pub(super) fn default_max_tokens() -> u32 {
    500
}

pub(super) fn default_top_p() -> f32 {
    1.0
}

pub(super) fn default_frequency_penalty() -> f32 {
    1.0
}

pub(super) fn default_presence_penalty() -> f32 {
    0.6
}

pub(super) fn default_stop() -> Vec<String> {
    vec!["Human:".to_string()]
}

pub(super) fn default_max_attempts() -> u32 {
    5
}

pub(super) fn default_backoff_ms() -> u64 {
    250
}

pub(super) fn default_attempt_timeout() -> u64 {
    60
}

pub(super) fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}
