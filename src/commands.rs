//! Built-in bot commands: instant responses, no provider call.

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
}

impl Command {
    /// Parse a command from already-cleaned message text.
    ///
    /// Commands are whole messages: `help` alone is a command, `help me with
    /// this` is a question for the persona.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().trim_start_matches(['/', '!']);
        if word.eq_ignore_ascii_case("help") {
            Some(Self::Help)
        } else {
            None
        }
    }
}

/// Response text for `cmd`.
pub fn handle(cmd: Command, help_text: &str) -> String {
    match cmd {
        Command::Help => help_text.trim().to_string(),
    }
}
