//! Whether the bot joins a conversation it was not addressed in.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashSet;

use crate::config::InterjectionConfig;
use crate::message::InboundEvent;

/// Why an ambient message did or did not get a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Interject,
    ChannelNotEligible,
    Stale,
    LostDraw,
}

impl Verdict {
    pub fn is_interject(self) -> bool {
        self == Self::Interject
    }
}

/// Eavesdrop everywhere, speak up rarely: channel allow-list AND fresh
/// message AND a random draw under `probability`.
#[derive(Debug, Clone)]
pub struct InterjectionPolicy {
    probability: f64,
    channels: HashSet<String>,
    recency_window: Duration,
}

impl InterjectionPolicy {
    pub fn new(config: &InterjectionConfig) -> Self {
        Self {
            probability: config.probability.clamp(0.0, 1.0),
            channels: config.channels.iter().cloned().collect(),
            recency_window: config.recency_window(),
        }
    }

    pub fn allows_channel(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }

    /// A message is fresh while it is younger than the recency window.
    /// Timestamps slightly in the future count as fresh.
    pub fn is_fresh(&self, sent_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - sent_at < self.recency_window
    }

    /// Evaluate all three gates. The draw is taken last so ineligible
    /// messages never consume randomness.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        event: &InboundEvent,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Verdict {
        if !self.allows_channel(&event.channel) {
            return Verdict::ChannelNotEligible;
        }
        if !self.is_fresh(event.sent_at, now) {
            return Verdict::Stale;
        }
        if rng.gen::<f64>() < self.probability {
            Verdict::Interject
        } else {
            Verdict::LostDraw
        }
    }

    pub fn should_interject<R: Rng + ?Sized>(
        &self,
        event: &InboundEvent,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> bool {
        self.evaluate(event, now, rng).is_interject()
    }
}
