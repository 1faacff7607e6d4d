//! Dispatch error types and their status mapping.

use super::config::ConfigError;
use super::kinds::Topic;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while handling one call.
///
/// `Auth`, `MalformedInput` and `Routing` are structural rejections; the
/// dispatcher turns them into outcomes and they never reach `error`
/// listeners. `Handler` and `PhaseTimeout` are the recoverable kinds.
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    /// Bad key material or settings
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Signature or app id mismatch
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Missing fields, unparseable body or undecodable envelope
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// No listener for the kind and no default
    #[error("no listener for kind '{0}'")]
    Routing(String),

    /// A listener returned an error or panicked
    #[error("{topic} listener failed: {cause}")]
    Handler {
        /// Phase the listener ran in
        topic: Topic,
        /// What the listener reported
        cause: Arc<anyhow::Error>,
    },

    /// A phase did not settle before its deadline
    #[error("{topic} phase exceeded its {}ms deadline", .timeout.as_millis())]
    PhaseTimeout {
        /// Phase that timed out
        topic: Topic,
        /// Deadline that elapsed
        timeout: Duration,
    },

    /// Sealing the reply failed
    #[error("failed to seal reply: {0}")]
    Envelope(String),
}

impl WebhookError {
    /// Wrap a listener failure.
    pub fn handler(topic: Topic, cause: anyhow::Error) -> Self {
        WebhookError::Handler {
            topic,
            cause: Arc::new(cause),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> u16 {
        match self {
            WebhookError::Auth(_) => 401,
            WebhookError::MalformedInput(_) => 400,
            WebhookError::Routing(_) => 404,
            _ => 500,
        }
    }

    /// Whether `error` listeners may handle this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WebhookError::Handler { .. } | WebhookError::PhaseTimeout { .. }
        )
    }

    /// Whether this is a structural rejection resolved inside the dispatcher.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            WebhookError::Auth(_) | WebhookError::MalformedInput(_) | WebhookError::Routing(_)
        )
    }
}

/// Wire codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Not well-formed
    #[error("invalid xml: {0}")]
    Syntax(String),

    /// Well-formed but carries no elements
    #[error("document has no elements")]
    Empty,
}

impl From<CodecError> for WebhookError {
    fn from(err: CodecError) -> Self {
        WebhookError::MalformedInput(err.to_string())
    }
}
