//! Domain types for the callback endpoint.
//!
//! Configuration, calls and outcomes, messages, replies and errors. Nothing
//! in here performs I/O.

pub mod call;
pub mod config;
pub mod correlation;
pub mod error;
pub mod kinds;
pub mod message;
pub mod reply;

// Re-exports for convenience
pub use call::{CallBody, DispatchOutcome, HttpMethod, InboundCall, QueryParams};
pub use config::{CallbackConfig, ConfigError, DEFAULT_PHASE_TIMEOUT};
pub use correlation::CallId;
pub use error::{CodecError, WebhookError};
pub use kinds::{KindClass, Topic};
pub use message::InboundMessage;
pub use reply::{AddressedReply, Article, Music, Reply, ReplySender, SealedReply};
