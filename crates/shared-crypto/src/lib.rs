//! # Shared Crypto - Callback Envelope Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signature` | SHA-1 over sorted tokens | Handshake and envelope signatures |
//! | `envelope` | AES-256-CBC, 32-byte block padding | Message payload encryption |
//! | `context` | signature + envelope | Per-application crypto binding |
//!
//! ## Wire Properties
//!
//! - **Signature**: tokens are sorted as opaque strings, never numerically
//! - **IV**: the first 16 bytes of the key, fixed for the lifetime of the key
//! - **Padding**: pad length 1..=32 against a 32-byte block; not PKCS#7 over
//!   the AES block size

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod envelope;
pub mod errors;
pub mod signature;

// Re-exports
pub use context::{CryptoContext, OpenedMessage};
pub use envelope::{DecryptedMessage, EncodingKey, EnvelopeCodec, PAD_BLOCK_SIZE};
pub use errors::CryptoError;
pub use signature::{constant_time_compare, signature, verify_signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
