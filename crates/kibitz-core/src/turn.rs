//! Conversation keys and recorded turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Speaker {
    /// The bot itself.
    Bot,
    /// Anyone else. `name` is the resolved display name when known.
    Human { user: String, name: Option<String> },
}

impl Speaker {
    pub fn human(user: impl Into<String>, name: Option<String>) -> Self {
        Self::Human {
            user: user.into(),
            name,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self, Self::Bot)
    }
}

/// One recorded utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp,
        }
    }

    pub fn bot(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Speaker::Bot, text, timestamp)
    }
}

/// Identifies an independent conversation.
///
/// Variants never alias each other: the channel-level, thread-level and
/// ambient records of the same channel are three separate conversations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum ConversationKey {
    /// Channel-level dialogue with the bot.
    Channel { channel: String },
    /// A single thread inside a channel.
    Thread { channel: String, thread: String },
    /// Direct messages with one user.
    Direct { user: String },
    /// One user's private sub-conversation inside a shared room.
    Peer { room: String, user: String },
    /// Everything said in a channel, kept only for situational awareness.
    Ambient { channel: String },
}

/// How a record is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Cleared wholesale once idle for longer than the window.
    Windowed,
    /// Oldest turns evicted beyond a fixed length.
    Capacity,
}

impl ConversationKey {
    pub fn channel(channel: impl Into<String>) -> Self {
        Self::Channel {
            channel: channel.into(),
        }
    }

    pub fn thread(channel: impl Into<String>, thread: impl Into<String>) -> Self {
        Self::Thread {
            channel: channel.into(),
            thread: thread.into(),
        }
    }

    pub fn direct(user: impl Into<String>) -> Self {
        Self::Direct { user: user.into() }
    }

    pub fn peer(room: impl Into<String>, user: impl Into<String>) -> Self {
        Self::Peer {
            room: room.into(),
            user: user.into(),
        }
    }

    pub fn ambient(channel: impl Into<String>) -> Self {
        Self::Ambient {
            channel: channel.into(),
        }
    }

    pub fn retention(&self) -> Retention {
        match self {
            Self::Ambient { .. } => Retention::Capacity,
            _ => Retention::Windowed,
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel { channel } => write!(f, "channel:{channel}"),
            Self::Thread { channel, thread } => write!(f, "thread:{channel}:{thread}"),
            Self::Direct { user } => write!(f, "dm:{user}"),
            Self::Peer { room, user } => write!(f, "peer:{room}:{user}"),
            Self::Ambient { channel } => write!(f, "ambient:{channel}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_for_same_channel_are_distinct() {
        let channel = ConversationKey::channel("C1");
        let thread = ConversationKey::thread("C1", "1700000000.0001");
        let ambient = ConversationKey::ambient("C1");
        assert_ne!(channel, thread);
        assert_ne!(channel, ambient);
        assert_ne!(thread, ambient);
    }

    #[test]
    fn test_only_ambient_is_capacity_bounded() {
        assert_eq!(ConversationKey::ambient("C1").retention(), Retention::Capacity);
        assert_eq!(ConversationKey::channel("C1").retention(), Retention::Windowed);
        assert_eq!(ConversationKey::direct("U1").retention(), Retention::Windowed);
        assert_eq!(ConversationKey::peer("R1", "U1").retention(), Retention::Windowed);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(ConversationKey::peer("R1", "U1").to_string(), "peer:R1:U1");
        assert_eq!(ConversationKey::thread("C1", "42").to_string(), "thread:C1:42");
    }
}
