//! Per-message engine override: `"question | model-name"`.

/// Separates the query from an optional engine name.
pub const OVERRIDE_DELIMITER: char = '|';

/// Picks the backing model for one message.
#[derive(Debug, Clone)]
pub struct EngineSelector {
    allowed: Vec<String>,
    default: String,
}

/// Outcome of [`EngineSelector::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Query text with the override syntax removed.
    pub query: String,
    pub engine: String,
    /// True when the message named an engine that was accepted.
    pub overridden: bool,
}

impl EngineSelector {
    pub fn new(allowed: Vec<String>, default: impl Into<String>) -> Self {
        Self {
            allowed,
            default: default.into(),
        }
    }

    pub fn default_engine(&self) -> &str {
        &self.default
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Split `raw` on the first `|`. A second segment naming an allowed engine
    /// selects it; anything else silently falls back to the default.
    pub fn select(&self, raw: &str) -> Selection {
        let mut parts = raw.split(OVERRIDE_DELIMITER);
        let query = parts.next().unwrap_or_default().trim().to_string();

        let requested = parts.next().map(str::trim);
        match requested {
            Some(name) if self.allowed.iter().any(|a| a == name) => Selection {
                query,
                engine: name.to_string(),
                overridden: true,
            },
            _ => Selection {
                query,
                engine: self.default.clone(),
                overridden: false,
            },
        }
    }
}
