use super::events::{normalize, parse_ts, thread_entry};
use super::types::{AuthTest, Profile, Replies, SlackMessage, SlackResponse, SocketEnvelope};
use kibitz_core::config::SlackConfig;
use kibitz_core::message::EventKind;
use kibitz_core::turn::Speaker;
use serde_json::json;

const BOT: &str = "UBOT";

fn envelope(event: serde_json::Value) -> SocketEnvelope {
    serde_json::from_value(json!({
        "envelope_id": "env-1",
        "type": "events_api",
        "payload": {
            "type": "event_callback",
            "event_id": "Ev1",
            "event_time": 1_700_000_000,
            "event": event,
        }
    }))
    .unwrap()
}

#[test]
fn test_parse_ts() {
    let at = parse_ts("1700000000.250000").unwrap();
    assert_eq!(at.timestamp(), 1_700_000_000);
    assert_eq!(at.timestamp_subsec_millis(), 250);
    assert_eq!(parse_ts("1700000000").unwrap().timestamp(), 1_700_000_000);
    assert!(parse_ts("not-a-ts").is_none());
}

#[test]
fn test_app_mention_in_thread() {
    let env = envelope(json!({
        "type": "app_mention",
        "user": "U1",
        "text": "<@UBOT> what do you think?",
        "channel": "C1",
        "ts": "1700000005.000100",
        "thread_ts": "1700000000.000001",
    }));
    let event = normalize(&env, BOT).unwrap();
    assert_eq!(event.kind, EventKind::Mention);
    assert_eq!(event.channel, "C1");
    assert_eq!(event.thread.as_deref(), Some("1700000000.000001"));
    assert_eq!(event.sender_id, "U1");
    assert_eq!(event.text, "what do you think?");
    assert_eq!(event.sent_at.timestamp(), 1_700_000_005);
    assert!(!event.from_self);
}

#[test]
fn test_direct_message() {
    let env = envelope(json!({
        "type": "message",
        "channel_type": "im",
        "user": "U1",
        "text": "Hi",
        "channel": "D1",
        "ts": "1700000001.000000",
    }));
    let event = normalize(&env, BOT).unwrap();
    assert_eq!(event.kind, EventKind::DirectMessage);
    assert!(event.thread.is_none());
}

#[test]
fn test_channel_message_is_ambient() {
    let env = envelope(json!({
        "type": "message",
        "channel_type": "channel",
        "user": "U2",
        "text": "lunch anyone?",
        "channel": "C1",
        "ts": "1700000001.000000",
    }));
    assert_eq!(normalize(&env, BOT).unwrap().kind, EventKind::Ambient);
}

#[test]
fn test_message_mentioning_bot_dropped_in_favor_of_app_mention() {
    let env = envelope(json!({
        "type": "message",
        "channel_type": "channel",
        "user": "U2",
        "text": "hey <@UBOT>",
        "channel": "C1",
        "ts": "1700000001.000000",
    }));
    assert!(normalize(&env, BOT).is_none());
}

#[test]
fn test_own_message_flagged() {
    let env = envelope(json!({
        "type": "message",
        "channel_type": "channel",
        "user": "UBOT",
        "bot_id": "B1",
        "text": "my reply",
        "channel": "C1",
        "ts": "1700000001.000000",
    }));
    let event = normalize(&env, BOT).unwrap();
    assert!(event.from_self);
}

#[test]
fn test_other_bots_and_edits_skipped() {
    let other_bot = envelope(json!({
        "type": "message",
        "user": "UOTHER",
        "bot_id": "B9",
        "text": "beep",
        "channel": "C1",
        "ts": "1700000001.000000",
    }));
    assert!(normalize(&other_bot, BOT).is_none());

    let edit = envelope(json!({
        "type": "message",
        "subtype": "message_changed",
        "channel": "C1",
        "ts": "1700000001.000000",
    }));
    assert!(normalize(&edit, BOT).is_none());
}

#[test]
fn test_thread_broadcast_kept() {
    let env = envelope(json!({
        "type": "message",
        "subtype": "thread_broadcast",
        "user": "U1",
        "text": "also posting here",
        "channel": "C1",
        "ts": "1700000009.000000",
        "thread_ts": "1700000000.000001",
    }));
    assert_eq!(normalize(&env, BOT).unwrap().kind, EventKind::Ambient);
}

#[test]
fn test_non_events_api_envelopes_ignored() {
    let hello: SocketEnvelope =
        serde_json::from_value(json!({"type": "hello", "num_connections": 1})).unwrap();
    assert!(hello.envelope_id.is_none());
    assert!(normalize(&hello, BOT).is_none());
}

#[test]
fn test_thread_entry_speakers() {
    let bot = thread_entry(
        SlackMessage {
            user: Some("UBOT".into()),
            bot_id: Some("B1".into()),
            text: "answer".into(),
        },
        BOT,
    );
    assert_eq!(bot.speaker, Speaker::Bot);

    let human = thread_entry(
        SlackMessage {
            user: Some("U1".into()),
            bot_id: None,
            text: "question".into(),
        },
        BOT,
    );
    assert_eq!(human.speaker, Speaker::human("U1", None));
    assert_eq!(human.text, "question");
}

#[test]
fn test_replies_response_parsing() {
    let json = r#"{"ok":true,"messages":[{"user":"U1","text":"root","ts":"1.0"},{"user":"UBOT","bot_id":"B1","text":"reply","ts":"2.0"}],"has_more":false,"response_metadata":{"next_cursor":""}}"#;
    let resp: SlackResponse<Replies> = serde_json::from_str(json).unwrap();
    assert!(resp.ok);
    assert_eq!(resp.body.messages.len(), 2);
    assert_eq!(resp.body.messages[1].bot_id.as_deref(), Some("B1"));
}

#[test]
fn test_error_response_parsing() {
    let resp: SlackResponse<AuthTest> =
        serde_json::from_str(r#"{"ok":false,"error":"invalid_auth"}"#).unwrap();
    assert!(!resp.ok);
    assert_eq!(resp.error.as_deref(), Some("invalid_auth"));
    assert!(resp.body.user_id.is_none());
}

#[test]
fn test_profile_best_name() {
    let p = Profile {
        display_name: Some("  ".into()),
        real_name: Some("Ann Smith".into()),
    };
    assert_eq!(p.best_name().as_deref(), Some("Ann Smith"));
    let p = Profile {
        display_name: None,
        real_name: None,
    };
    assert!(p.best_name().is_none());
}

#[tokio::test]
async fn test_configured_bot_user_id_used_without_lookup() {
    let platform = super::SlackPlatform::new(SlackConfig {
        bot_user_id: Some("UBOT".into()),
        ..Default::default()
    });
    assert_eq!(platform.bot_user_id().await.as_deref(), Some("UBOT"));
}
