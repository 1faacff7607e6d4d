//! Ports: the dispatcher's driving API and the wire codec it drives.

pub mod inbound;
pub mod outbound;

pub use inbound::CallbackApi;
pub use outbound::WireCodec;
