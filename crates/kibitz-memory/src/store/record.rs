//! A single conversation buffer and its two bounding rules.

use chrono::{DateTime, Duration, Utc};
use kibitz_core::turn::Turn;
use std::collections::VecDeque;

/// How a record is kept small.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Bound {
    /// Cleared entirely once idle for longer than the window.
    Idle(Duration),
    /// Oldest turns dropped once the buffer exceeds the capacity.
    Capacity(usize),
}

#[derive(Debug, Default)]
pub(super) struct Record {
    turns: VecDeque<Turn>,
    last_activity: Option<DateTime<Utc>>,
}

impl Record {
    /// Clear the buffer if it has been idle for longer than `bound` allows.
    /// Returns true when something was dropped.
    pub(super) fn expire(&mut self, bound: Bound, now: DateTime<Utc>) -> bool {
        let Bound::Idle(ttl) = bound else {
            return false;
        };
        match self.last_activity {
            Some(last) if now - last > ttl && !self.turns.is_empty() => {
                self.turns.clear();
                true
            }
            _ => false,
        }
    }

    /// Append under `bound`. Returns how many turns were evicted or expired.
    pub(super) fn push(&mut self, turn: Turn, bound: Bound, now: DateTime<Utc>) -> usize {
        let mut dropped = 0;
        if let Bound::Idle(_) = bound {
            let before = self.turns.len();
            if self.expire(bound, now) {
                dropped = before;
            }
        }

        self.turns.push_back(turn);
        self.last_activity = Some(now);

        if let Bound::Capacity(cap) = bound {
            while self.turns.len() > cap {
                self.turns.pop_front();
                dropped += 1;
            }
        }
        dropped
    }

    pub(super) fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub(super) fn clear(&mut self) {
        self.turns.clear();
    }

    pub(super) fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
