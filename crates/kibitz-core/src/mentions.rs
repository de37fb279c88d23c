//! Mention tokens (`<@U123>`) → readable names (`@Ann Smith`).
//!
//! Parsing and name resolution are separate passes: [`tokenize`] yields a
//! lazy stream of tokens, [`render`] resolves references through the
//! platform.

use crate::traits::Platform;
use std::collections::HashMap;
use tracing::warn;

/// A piece of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Literal(&'a str),
    /// A user id taken from `<@id>` or `<@id|label>`.
    Reference(&'a str),
}

/// Lazily split `text` into literals and user references.
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens { rest: text }
}

/// Iterator returned by [`tokenize`].
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        if let Some((id, consumed)) = parse_reference(self.rest) {
            self.rest = &self.rest[consumed..];
            return Some(Token::Reference(id));
        }

        // Literal runs up to the next `<@` that parses as a reference.
        let mut end = self.rest.len();
        let mut search_from = if self.rest.starts_with('<') { 1 } else { 0 };
        while let Some(offset) = self.rest[search_from..].find("<@") {
            let at = search_from + offset;
            if parse_reference(&self.rest[at..]).is_some() {
                end = at;
                break;
            }
            search_from = at + 2;
        }

        let literal = &self.rest[..end];
        self.rest = &self.rest[end..];
        Some(Token::Literal(literal))
    }
}

/// Parse `<@id>` or `<@id|label>` at the start of `s`.
/// Returns the id and the number of bytes consumed.
fn parse_reference(s: &str) -> Option<(&str, usize)> {
    let body = s.strip_prefix("<@")?;
    let close = body.find('>')?;
    let inner = &body[..close];
    let id = inner.split('|').next().unwrap_or_default();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((id, 2 + close + 1))
}

/// Collect every distinct user id referenced in `text`, in order of first appearance.
pub fn referenced_users(text: &str) -> Vec<&str> {
    let mut ids: Vec<&str> = Vec::new();
    for token in tokenize(text) {
        if let Token::Reference(id) = token {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Resolve every reference in `text` to `@Display Name`.
///
/// Each distinct id is looked up once. A failed lookup keeps `@id` so the
/// message is never dropped over a directory error.
pub async fn render(text: &str, platform: &dyn Platform) -> String {
    let mut names: HashMap<&str, String> = HashMap::new();
    for id in referenced_users(text) {
        let name = match platform.display_name(id).await {
            Ok(name) if !name.trim().is_empty() => name,
            Ok(_) => id.to_string(),
            Err(e) => {
                warn!("mention lookup failed for {id}: {e}");
                id.to_string()
            }
        };
        names.insert(id, name);
    }
    render_with(text, |id| names.get(id).cloned())
}

/// Render with a synchronous lookup. Unknown ids render as `@id`.
pub fn render_with<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    for token in tokenize(text) {
        match token {
            Token::Literal(s) => out.push_str(s),
            Token::Reference(id) => {
                out.push('@');
                match lookup(id) {
                    Some(name) => out.push_str(&name),
                    None => out.push_str(id),
                }
            }
        }
    }
    out
}

/// Remove references to `user_id` (the bot addressing itself) and tidy the
/// spacing left behind. Line breaks are kept.
pub fn strip_user(text: &str, user_id: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for token in tokenize(text) {
        match token {
            Token::Reference(id) if id == user_id => {}
            Token::Reference(id) => {
                out.push_str("<@");
                out.push_str(id);
                out.push('>');
            }
            Token::Literal(s) => out.push_str(s),
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    for c in out.chars() {
        if c == ' ' && collapsed.ends_with(' ') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
