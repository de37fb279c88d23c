use super::persona::parse_markdown_sections;
use super::*;
use std::collections::HashMap;

#[test]
fn test_defaults_match_documented_values() {
    let cfg = Config::default();
    assert_eq!(cfg.memory.channel_ttl_secs, 600);
    assert_eq!(cfg.memory.peer_ttl_secs, 300);
    assert_eq!(cfg.memory.ambient_capacity, 20);
    assert!((cfg.interjection.probability - 0.2).abs() < f64::EPSILON);
    assert_eq!(cfg.interjection.recency_window_secs, 10);
    assert!(cfg.interjection.channels.is_empty());
    assert!(cfg
        .provider
        .allowed_models
        .contains(&cfg.provider.default_model));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_empty_toml_uses_defaults() {
    let cfg = parse("").unwrap();
    assert_eq!(cfg.bot.name, "kibitz");
    assert_eq!(cfg.persona.bot_label, "Kibitz");
    assert_eq!(cfg.provider.sampling.stop, vec!["Human:".to_string()]);
    assert!(cfg.channel.slack.is_none());
}

#[test]
fn test_full_toml() {
    let toml_str = r#"
        [bot]
        name = "doug"
        log_level = "debug"

        [persona]
        preamble = "You are Doug."
        bot_label = "Doug"

        [memory]
        channel_ttl_secs = 120
        peer_scoped_channels = ["C9"]

        [interjection]
        probability = 0.333
        channels = ["C03C43ZME77"]

        [provider]
        default_model = "gpt-4o"
        allowed_models = ["gpt-4o", "gpt-4o-mini"]

        [provider.openai]
        api_style = "completions"

        [provider.retry]
        max_attempts = 0

        [channel.slack]
        app_token = "xapp-1"
        bot_token = "xoxb-1"
    "#;
    let cfg = parse(toml_str).unwrap();
    assert_eq!(cfg.bot.name, "doug");
    assert_eq!(cfg.persona.preamble, "You are Doug.");
    assert_eq!(cfg.persona.human_label, "Human");
    assert_eq!(cfg.memory.channel_ttl(), Duration::seconds(120));
    assert_eq!(cfg.memory.peer_ttl_secs, 300);
    assert_eq!(cfg.memory.peer_scoped_channels, vec!["C9".to_string()]);
    assert_eq!(cfg.interjection.channels, vec!["C03C43ZME77".to_string()]);
    assert_eq!(cfg.provider.openai.api_style, ApiStyle::Completions);
    assert_eq!(cfg.provider.retry.max_attempts, 0);
    assert_eq!(cfg.provider.retry.attempt_timeout_secs, 60);
    let slack = cfg.channel.slack.unwrap();
    assert!(slack.enabled);
    assert_eq!(slack.api_base, "https://slack.com/api");
    assert!(slack.bot_user_id.is_none());
}

#[test]
fn test_invalid_probability_rejected() {
    let mut cfg = Config::default();
    cfg.interjection.probability = 1.5;
    assert!(matches!(cfg.validate(), Err(KibitzError::Config(_))));
}

#[test]
fn test_oversized_windows_rejected() {
    let mut cfg = Config::default();
    cfg.memory.channel_ttl_secs = u64::MAX;
    assert!(matches!(cfg.validate(), Err(KibitzError::Config(m)) if m.contains("channel_ttl_secs")));

    let mut cfg = Config::default();
    cfg.memory.peer_ttl_secs = 10_000_000_000_000_000;
    assert!(matches!(cfg.validate(), Err(KibitzError::Config(m)) if m.contains("peer_ttl_secs")));

    let cfg = parse("[interjection]\nrecency_window_secs = 9223372036854775807\n").unwrap();
    assert!(matches!(cfg.validate(), Err(KibitzError::Config(m)) if m.contains("recency_window_secs")));

    let mut cfg = Config::default();
    cfg.memory.channel_ttl_secs = MAX_WINDOW_SECS;
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_window_accessors_clamp_instead_of_overflowing() {
    let mut cfg = Config::default();
    cfg.memory.channel_ttl_secs = u64::MAX;
    cfg.memory.peer_ttl_secs = 10_000_000_000_000_000;
    cfg.interjection.recency_window_secs = i64::MAX as u64;

    let max = chrono::Duration::seconds(MAX_WINDOW_SECS as i64);
    assert_eq!(cfg.memory.channel_ttl(), max);
    assert_eq!(cfg.memory.peer_ttl(), max);
    assert_eq!(cfg.interjection.recency_window(), max);
    assert_eq!(Config::default().memory.channel_ttl(), chrono::Duration::seconds(600));
}

#[test]
fn test_zero_capacity_rejected() {
    let mut cfg = Config::default();
    cfg.memory.ambient_capacity = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_env_overrides_secrets() {
    let env: HashMap<&str, &str> = [
        ("OPENAI_API_KEY", "sk-env"),
        ("SLACK_APP_TOKEN", "xapp-env"),
        ("SLACK_BOT_TOKEN", "xoxb-env"),
        ("SLACK_BOT_USER_ID", "  "),
    ]
    .into_iter()
    .collect();

    let mut cfg = Config::default();
    cfg.apply_env(|name| env.get(name).map(|v| v.to_string()));

    assert_eq!(cfg.provider.openai.api_key, "sk-env");
    let slack = cfg.channel.slack.unwrap();
    assert_eq!(slack.app_token, "xapp-env");
    assert_eq!(slack.bot_token, "xoxb-env");
    // Blank values never override.
    assert!(slack.bot_user_id.is_none());
}

#[test]
fn test_env_without_slack_vars_leaves_slack_unset() {
    let mut cfg = Config::default();
    cfg.apply_env(|_| None);
    assert!(cfg.channel.slack.is_none());
    assert!(cfg.provider.openai.api_key.is_empty());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let cfg = load("/nonexistent/__kibitz_test__/config.toml").unwrap();
    assert_eq!(cfg.memory.ambient_capacity, 20);
}

#[test]
fn test_missing_notice_only_for_absent_files() {
    let notice = missing_notice("/nonexistent/__kibitz_test__/config.toml").unwrap();
    assert!(notice.contains("/nonexistent/__kibitz_test__/config.toml"));
    assert!(notice.contains("using defaults"));

    let present = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
    assert!(missing_notice(present).is_none());
}

#[test]
fn test_persona_prompt_file_overrides_sections() {
    let tmp = std::env::temp_dir().join("__kibitz_test_persona__.md");
    std::fs::write(
        &tmp,
        "# Persona\n\n## Preamble\nYou are Doug, the creator of Moodle.\n\n## Help\nAsk me anything.\n",
    )
    .unwrap();

    let persona = PersonaConfig {
        prompt_file: Some(tmp.to_string_lossy().into_owned()),
        ..Default::default()
    }
    .resolved();

    assert_eq!(persona.preamble, "You are Doug, the creator of Moodle.");
    assert_eq!(persona.help_text, "Ask me anything.");
    assert_eq!(persona.bot_label, "Kibitz");

    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_persona_missing_prompt_file_keeps_inline() {
    let persona = PersonaConfig {
        preamble: "inline".into(),
        prompt_file: Some("/nonexistent/__kibitz__/persona.md".into()),
        ..Default::default()
    }
    .resolved();
    assert_eq!(persona.preamble, "inline");
}

#[test]
fn test_parse_markdown_sections_skips_empty() {
    let sections = parse_markdown_sections("## A\n\n## B\nbody\n");
    assert!(!sections.contains_key("A"));
    assert_eq!(sections.get("B").map(String::as_str), Some("body"));
}
