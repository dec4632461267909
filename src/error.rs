//! Error types for the carevoice assistant core

use thiserror::Error;

/// Result type alias for carevoice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Command catalog data error (duplicate phrase, dangling rule target, bad regex)
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Microphone access refused; terminal for the session
    #[error("microphone permission denied")]
    PermissionDenied,

    /// Transient recognition failures exceeded the restart cap
    #[error("speech recognition failed after {attempts} attempts")]
    RecognitionExhausted {
        /// Number of consecutive failed attempts
        attempts: u32,
    },

    /// No speech APIs available in this environment
    #[error("speech recognition unsupported: {0}")]
    UnsupportedEnvironment(String),

    /// Transient recognition engine error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Text-to-speech error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether the error should be shown to the user rather than only logged
    #[must_use]
    pub const fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::RecognitionExhausted { .. }
                | Self::UnsupportedEnvironment(_)
                | Self::Synthesis(_)
        )
    }
}
