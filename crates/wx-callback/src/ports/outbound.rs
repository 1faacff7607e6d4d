//! Outbound ports for the dispatcher.

use crate::domain::{AddressedReply, CodecError, SealedReply};

/// Wire format for message bodies.
///
/// The dispatcher only reads a handful of fields from the parsed map, so any
/// format that produces `{"xml": {..}}` or a flat map works.
pub trait WireCodec: Send + Sync {
    /// Parse a body into a structural map.
    fn parse(&self, body: &str) -> Result<serde_json::Value, CodecError>;

    /// Render a plaintext reply.
    fn render_reply(&self, reply: &AddressedReply) -> String;

    /// Render a sealed reply envelope.
    fn render_sealed(&self, sealed: &SealedReply) -> String;
}
