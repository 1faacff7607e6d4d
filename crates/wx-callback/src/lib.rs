//! WX Callback - webhook endpoint for a messaging platform's push callbacks.
//!
//! Verifies the platform's token signature, opens AES-256-CBC envelopes when
//! configured, routes each message to listeners by kind, and answers with a
//! plaintext or sealed reply.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        WX CALLBACK                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │   axum router (GET handshake / POST message)                  │
//! │        │   TraceLayer → RequestBodyLimit                      │
//! │        ▼                                                      │
//! │   CallbackApi ──► Dispatcher                                  │
//! │                    │  verify → decode → route                 │
//! │                    ▼                                          │
//! │         before → kind | default → after                       │
//! │         (4700ms deadline on each)                             │
//! │              └── failure ──► error                            │
//! │                    │                                          │
//! │                    ▼                                          │
//! │         ReplySender → WireCodec → (seal)                      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wx_callback::{router, CallbackConfig, Dispatcher, ListenerResult, Topic, DEFAULT_MAX_BODY_BYTES};
//!
//! let dispatcher = Arc::new(Dispatcher::new(CallbackConfig::new("token"))?);
//! dispatcher.on(Topic::kind("text"), |ctx| async move {
//!     ctx.reply().text("hello");
//!     ListenerResult::Ok(())
//! });
//! let app = router(dispatcher, "/", DEFAULT_MAX_BODY_BYTES);
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod dispatch;
pub mod domain;
pub mod ports;
pub mod registry;

// Re-exports
pub use adapters::http::DEFAULT_MAX_BODY_BYTES;
pub use adapters::{router, XmlCodec};
pub use dispatch::{classify, Dispatcher, Stage};
pub use domain::{
    AddressedReply, Article, CallBody, CallId, CallbackConfig, CodecError, ConfigError,
    DispatchOutcome, HttpMethod, InboundCall, InboundMessage, KindClass, Music, QueryParams,
    Reply, ReplySender, SealedReply, Topic, WebhookError, DEFAULT_PHASE_TIMEOUT,
};
pub use ports::{CallbackApi, WireCodec};
pub use registry::{Listener, ListenerContext, ListenerId, ListenerRegistry, ListenerResult};
