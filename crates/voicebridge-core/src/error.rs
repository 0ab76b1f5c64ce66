//! Error taxonomy for the voice bridge
//!
//! Mirrors the bridge's recovery policy: `Auth`/`Config` are fatal to a session,
//! `Transport` allows exactly one reconnect, `Tool`/`Bus` are reported back to the
//! caller or retried in the background, and `Codec` is never raised (callers
//! truncate instead of propagating it) but is kept as a variant for logging.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bootstrap HTTP call rejected the API key, or the duplex socket never opened.
    #[error("Upstream authentication failed: {0}")]
    Auth(String),

    /// Missing rate card entry, malformed agent configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream WebSocket closed mid-call.
    #[error("Upstream transport error: {0}")]
    Transport(String),

    /// Tool invocation failed after retries, or arguments were malformed.
    #[error("Tool error: {0}")]
    Tool(String),

    /// Control bus publish/subscribe failed.
    #[error("Control bus error: {0}")]
    Bus(String),

    /// Audio codec received malformed input. Callers truncate rather than propagate.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Any bounded wait (connect, tool HTTP, bus ack) exceeded its deadline.
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error represents a class the caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classes() {
        assert!(Error::Transport("closed".into()).is_retryable());
        assert!(Error::Timeout(std::time::Duration::from_secs(1)).is_retryable());
        assert!(!Error::Auth("bad key".into()).is_retryable());
        assert!(!Error::Codec("odd length".into()).is_retryable());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::Config("missing rate card".into()).to_string(),
            "Configuration error: missing rate card"
        );
    }
}
