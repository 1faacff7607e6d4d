//! # Inbound Ports (Driving Ports / API)
//!
//! What the HTTP adapter calls into.

use crate::domain::{DispatchOutcome, InboundCall, WebhookError};
use async_trait::async_trait;

/// Primary callback API.
///
/// Implementations must be thread-safe (`Send + Sync`); one instance serves
/// every in-flight call.
#[async_trait]
pub trait CallbackApi: Send + Sync {
    /// Handle one inbound call.
    ///
    /// Structural rejections (bad signature, malformed input, no listener)
    /// come back as `Ok` outcomes with 4xx statuses. `Err` means a listener
    /// failure nobody handled, a failing `after`/`error` phase, or a reply
    /// that could not be sealed; the adapter answers those with a 500.
    async fn handle(&self, call: InboundCall) -> Result<DispatchOutcome, WebhookError>;
}
