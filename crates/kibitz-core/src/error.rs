use thiserror::Error;

/// Top-level error type for Kibitz.
#[derive(Debug, Error)]
pub enum KibitzError {
    /// Error from the completion provider (network, auth, quota).
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from the chat platform.
    #[error("platform error: {0}")]
    Platform(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// The provider kept returning empty or punctuation-only text.
    #[error("degenerate completion after {attempts} attempts")]
    DegenerateCompletion { attempts: u32 },

    /// A single upstream attempt exceeded its deadline, in milliseconds.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
