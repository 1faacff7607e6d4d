//! Phase fan-out: spawn every listener of a topic, join them, race a deadline.

use crate::domain::{Topic, WebhookError};
use crate::registry::{Listener, ListenerContext};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Run `listeners` concurrently and wait for all of them.
///
/// With a deadline, losing the race yields `PhaseTimeout`; listeners still
/// running are detached rather than aborted. Otherwise the first failure in
/// registration order is reported, after every listener has settled.
pub(crate) async fn run_phase(
    topic: &Topic,
    listeners: Vec<Arc<dyn Listener>>,
    ctx: &ListenerContext,
    deadline: Option<Duration>,
) -> Result<(), WebhookError> {
    if listeners.is_empty() {
        return Ok(());
    }
    debug!(topic = %topic, listeners = listeners.len(), "Running phase");

    let handles: Vec<_> = listeners
        .into_iter()
        .map(|listener| {
            let ctx = ctx.clone();
            tokio::spawn(async move { listener.on_event(ctx).await })
        })
        .collect();

    let settled = match deadline {
        Some(limit) => match timeout(limit, join_all(handles)).await {
            Ok(settled) => settled,
            Err(_) => {
                warn!(topic = %topic, timeout_ms = limit.as_millis() as u64, "Phase timed out");
                return Err(WebhookError::PhaseTimeout {
                    topic: topic.clone(),
                    timeout: limit,
                });
            }
        },
        None => join_all(handles).await,
    };

    for outcome in settled {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(cause)) => return Err(WebhookError::handler(topic.clone(), cause)),
            Err(join_error) => {
                let what = if join_error.is_panic() {
                    "panicked"
                } else {
                    "was cancelled"
                };
                return Err(WebhookError::handler(
                    topic.clone(),
                    anyhow::anyhow!("listener task {}", what),
                ));
            }
        }
    }
    Ok(())
}
