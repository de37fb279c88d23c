//! Prompt assembly: persona preamble plus a transcript of recent turns,
//! ending in an open line for the bot to complete.

use crate::config::PersonaConfig;
use crate::message::ThreadEntry;
use crate::turn::{Speaker, Turn};

/// Who the transcript is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Several people; every human shares the generic label.
    ChannelWide,
    /// A single person; their display name is kept when known.
    OneOnOne,
}

/// Renders prompts for one persona.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    preamble: String,
    bot_label: String,
    human_label: String,
    max_turns: usize,
}

impl PromptAssembler {
    /// `max_turns` caps how many of the most recent turns are rendered.
    pub fn new(persona: &PersonaConfig, max_turns: usize) -> Self {
        Self {
            preamble: persona.preamble.trim().to_string(),
            bot_label: persona.bot_label.trim().to_string(),
            human_label: persona.human_label.trim().to_string(),
            max_turns,
        }
    }

    pub fn bot_label(&self) -> &str {
        &self.bot_label
    }

    /// Render stored turns (oldest first).
    pub fn assemble(&self, turns: &[Turn], audience: Audience) -> String {
        self.render(turns.iter().map(|t| (&t.speaker, t.text.as_str())), audience)
    }

    /// Render a fetched thread transcript (oldest first).
    pub fn assemble_thread(&self, entries: &[ThreadEntry]) -> String {
        self.render(
            entries.iter().map(|e| (&e.speaker, e.text.as_str())),
            Audience::ChannelWide,
        )
    }

    fn render<'a, I>(&self, lines: I, audience: Audience) -> String
    where
        I: ExactSizeIterator<Item = (&'a Speaker, &'a str)>,
    {
        let skip = lines.len().saturating_sub(self.max_turns);
        let mut prompt = self.preamble.clone();

        for (speaker, text) in lines.skip(skip) {
            if !prompt.is_empty() {
                prompt.push('\n');
            }
            prompt.push_str(self.label_for(speaker, audience));
            prompt.push_str(": ");
            prompt.push_str(text.trim());
        }

        if !prompt.is_empty() {
            prompt.push('\n');
        }
        prompt.push_str(&self.bot_label);
        prompt.push(':');
        prompt
    }

    fn label_for<'a>(&'a self, speaker: &'a Speaker, audience: Audience) -> &'a str {
        match (speaker, audience) {
            (Speaker::Bot, _) => &self.bot_label,
            (
                Speaker::Human {
                    name: Some(name), ..
                },
                Audience::OneOnOne,
            ) if !name.trim().is_empty() => name.trim(),
            (Speaker::Human { .. }, _) => &self.human_label,
        }
    }
}
