//! Per-event decision: ignore, record silently, or record and reply.

use chrono::{DateTime, Utc};
use kibitz_core::{
    context::Audience,
    interject::{InterjectionPolicy, Verdict},
    message::{EventKind, InboundEvent},
    turn::ConversationKey,
};
use rand::Rng;
use std::collections::HashSet;

/// Where the reply goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Posted in the same channel or DM, outside any thread.
    Direct,
    /// Posted as a reply inside `thread`.
    Threaded { thread: String },
}

/// Where the prompt's history comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    /// Turns recorded under the conversation key.
    Stored,
    /// A fresh transcript of the thread, fetched from the platform.
    Thread,
}

/// What to do with one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Ignore { reason: &'static str },
    RecordOnly {
        key: ConversationKey,
        verdict: Verdict,
    },
    Reply {
        key: ConversationKey,
        delivery: Delivery,
        context: ContextSource,
        audience: Audience,
    },
}

/// Classifies events against the interjection policy and channel scoping.
#[derive(Debug, Clone)]
pub struct Router {
    policy: InterjectionPolicy,
    peer_scoped: HashSet<String>,
}

impl Router {
    pub fn new(policy: InterjectionPolicy, peer_scoped: &[String]) -> Self {
        Self {
            policy,
            peer_scoped: peer_scoped.iter().cloned().collect(),
        }
    }

    pub fn classify<R: Rng + ?Sized>(
        &self,
        event: &InboundEvent,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Decision {
        if event.from_self {
            return Decision::Ignore { reason: "own message" };
        }
        if event.text.trim().is_empty() {
            return Decision::Ignore { reason: "empty text" };
        }

        let channel = event.channel.as_str();
        let user = event.sender_id.as_str();

        match (event.kind, event.thread.as_deref()) {
            (EventKind::DirectMessage, _) => Decision::Reply {
                key: ConversationKey::direct(user),
                delivery: Delivery::Direct,
                context: ContextSource::Stored,
                audience: Audience::OneOnOne,
            },
            (EventKind::Mention, Some(thread)) => threaded_reply(channel, thread),
            (EventKind::Mention, None) if self.peer_scoped.contains(channel) => Decision::Reply {
                key: ConversationKey::peer(channel, user),
                delivery: Delivery::Direct,
                context: ContextSource::Stored,
                audience: Audience::OneOnOne,
            },
            (EventKind::Mention, None) => Decision::Reply {
                key: ConversationKey::channel(channel),
                delivery: Delivery::Direct,
                context: ContextSource::Stored,
                audience: Audience::ChannelWide,
            },
            (EventKind::Ambient, thread) => match (self.policy.evaluate(event, now, rng), thread) {
                (Verdict::Interject, Some(thread)) => threaded_reply(channel, thread),
                (Verdict::Interject, None) => Decision::Reply {
                    key: ConversationKey::ambient(channel),
                    delivery: Delivery::Direct,
                    context: ContextSource::Stored,
                    audience: Audience::ChannelWide,
                },
                (verdict, Some(thread)) => Decision::RecordOnly {
                    key: ConversationKey::thread(channel, thread),
                    verdict,
                },
                (verdict, None) => Decision::RecordOnly {
                    key: ConversationKey::ambient(channel),
                    verdict,
                },
            },
        }
    }
}

fn threaded_reply(channel: &str, thread: &str) -> Decision {
    Decision::Reply {
        key: ConversationKey::thread(channel, thread),
        delivery: Delivery::Threaded {
            thread: thread.to_string(),
        },
        context: ContextSource::Thread,
        audience: Audience::ChannelWide,
    }
}
