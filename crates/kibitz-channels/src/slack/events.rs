//! Socket Mode envelopes → platform-neutral events.

use super::types::{EventCallback, SlackMessage, SocketEnvelope};
use chrono::{DateTime, Utc};
use kibitz_core::{
    mentions::{referenced_users, strip_user},
    message::{EventKind, InboundEvent, ThreadEntry},
    turn::Speaker,
};
use tracing::debug;
use uuid::Uuid;

/// Message subtypes that still represent a person talking.
const CONVERSATIONAL_SUBTYPES: &[&str] = &["thread_broadcast", "file_share"];

/// Parse `"1700000000.123456"` into a UTC instant.
pub(crate) fn parse_ts(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.split_once('.').unwrap_or((ts, "0"));
    let secs: i64 = secs.parse().ok()?;
    let micros: u32 = format!("{frac:0<6}").get(..6)?.parse().ok()?;
    DateTime::from_timestamp(secs, micros * 1_000)
}

/// Turn one envelope into an event, or `None` when it is not a message the
/// bot should see.
///
/// A `message` event that mentions the bot is dropped: Slack also delivers
/// it as `app_mention`, which is the copy that counts. The bot's own mention
/// token is removed from mention text.
pub(crate) fn normalize(envelope: &SocketEnvelope, bot_user_id: &str) -> Option<InboundEvent> {
    if envelope.envelope_type != "events_api" {
        return None;
    }
    let callback: EventCallback = match serde_json::from_value(envelope.payload.clone()) {
        Ok(c) => c,
        Err(e) => {
            debug!("slack: unreadable event callback: {e}");
            return None;
        }
    };
    if callback.callback_type != "event_callback" {
        return None;
    }

    let event = callback.event;
    if let Some(subtype) = event.subtype.as_deref() {
        if !CONVERSATIONAL_SUBTYPES.contains(&subtype) {
            return None;
        }
    }

    let sender = event.user.filter(|u| !u.trim().is_empty())?;
    let from_self = sender == bot_user_id;
    if event.bot_id.is_some() && !from_self {
        return None;
    }
    let channel = event.channel.filter(|c| !c.trim().is_empty())?;
    let ts = event.ts.filter(|t| !t.trim().is_empty())?;
    let text = event.text.unwrap_or_default();

    let mentions_bot = referenced_users(&text).contains(&bot_user_id);
    let kind = match event.event_type.as_str() {
        "app_mention" => EventKind::Mention,
        "message" if event.channel_type.as_deref() == Some("im") => EventKind::DirectMessage,
        "message" if mentions_bot && !from_self => {
            return None;
        }
        "message" => EventKind::Ambient,
        _ => return None,
    };

    let text = match kind {
        EventKind::Mention => strip_user(&text, bot_user_id),
        _ => text,
    };

    let sent_at = parse_ts(&ts)
        .or_else(|| callback.event_time.and_then(|t| DateTime::from_timestamp(t, 0)))
        .unwrap_or_else(Utc::now);

    Some(InboundEvent {
        id: Uuid::new_v4(),
        platform: "slack".to_string(),
        kind,
        channel,
        thread: event.thread_ts.filter(|t| *t != ts),
        sender_id: sender,
        sender_name: None,
        text,
        sent_at,
        from_self,
    })
}

/// Map a thread message to a transcript entry.
pub(crate) fn thread_entry(msg: SlackMessage, bot_user_id: &str) -> ThreadEntry {
    let speaker = match msg.user {
        Some(user) if user == bot_user_id => Speaker::Bot,
        Some(user) => Speaker::human(user, None),
        None => Speaker::human(msg.bot_id.unwrap_or_else(|| "unknown".into()), None),
    };
    ThreadEntry {
        speaker,
        text: strip_user(&msg.text, bot_user_id),
    }
}
