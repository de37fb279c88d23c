use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use super::shellexpand;

/// Who the bot is and how its transcript lines are labelled.
///
/// `prompt_file`, when set, points to a markdown file whose `## Preamble`
/// and `## Help` sections override the inline values. Missing files or
/// sections fall back to the inline text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_preamble")]
    pub preamble: String,
    /// Role label for the bot's own lines (also stripped from replies).
    #[serde(default = "default_bot_label")]
    pub bot_label: String,
    /// Role label shared by everyone else in channel-wide transcripts.
    #[serde(default = "default_human_label")]
    pub human_label: String,
    /// Reply to the `help` command.
    #[serde(default = "default_help_text")]
    pub help_text: String,
    #[serde(default)]
    pub prompt_file: Option<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            preamble: default_preamble(),
            bot_label: default_bot_label(),
            human_label: default_human_label(),
            help_text: default_help_text(),
            prompt_file: None,
        }
    }
}

fn default_preamble() -> String {
    "You are Kibitz, a long-time member of this team's chat.\n\
     You aren't an assistant; you're a coworker having conversations, sometimes with several people at once.\n\
     You are friendly, occasionally snarky, and you keep your answers short."
        .to_string()
}

fn default_bot_label() -> String {
    "Kibitz".to_string()
}

fn default_human_label() -> String {
    "Human".to_string()
}

fn default_help_text() -> String {
    "Hi, I'm Kibitz. Mention me or send me a direct message and I'll answer.\n\
     You can pick the model for one message by ending it with a pipe and a model name, \
     e.g. \"how are you today? | gpt-4o\". Unknown models fall back to the default.\n\
     I remember a conversation for ten minutes after the last message. \
     Every now and then I chime in on my own in channels where that's allowed."
        .to_string()
}

impl PersonaConfig {
    /// Apply `prompt_file` overrides, if any.
    pub fn resolved(mut self) -> Self {
        let Some(path) = self.prompt_file.as_deref() else {
            return self;
        };
        let path = shellexpand(path);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let sections = parse_markdown_sections(&content);
                if let Some(v) = sections.get("Preamble") {
                    self.preamble = v.clone();
                }
                if let Some(v) = sections.get("Help") {
                    self.help_text = v.clone();
                }
                info!("loaded persona from {path}");
            }
            Err(e) => warn!("persona: failed to read {path}: {e}"),
        }
        self
    }
}

/// Parse a markdown file with `## Section` headers into a map of section name -> body.
pub(crate) fn parse_markdown_sections(content: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current_key: Option<String> = None;
    let mut current_body = String::new();

    for line in content.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            if let Some(key) = current_key.take() {
                let trimmed = current_body.trim().to_string();
                if !trimmed.is_empty() {
                    sections.insert(key, trimmed);
                }
            }
            current_key = Some(header.trim().to_string());
            current_body.clear();
        } else if current_key.is_some() {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }

    if let Some(key) = current_key {
        let trimmed = current_body.trim().to_string();
        if !trimmed.is_empty() {
            sections.insert(key, trimmed);
        }
    }

    sections
}
