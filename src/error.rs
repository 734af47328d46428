//! Kaku-Yaku Error Types
//!
//! One error type shared by the privileged process and the page contexts.

use thiserror::Error;

use crate::dom::DomError;

/// Central error type for Kaku-Yaku
#[derive(Error, Debug)]
pub enum KakuError {
    /// Analysis service unreachable, non-2xx, or malformed body
    #[error("Analysis request failed: {0}")]
    Network(String),

    /// A message could not reach the embedded agent
    #[error("Message delivery failed: {0}")]
    Delivery(String),

    /// Stylesheet or script injection into a page failed
    #[error("Injection failed: {0}")]
    Injection(String),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Kaku-Yaku operations
pub type KakuResult<T> = Result<T, KakuError>;

impl From<reqwest::Error> for KakuError {
    fn from(err: reqwest::Error) -> Self {
        KakuError::Network(err.to_string())
    }
}
