//! # Listener Registry
//!
//! Topic → ordered listener list. Registration and removal are explicit;
//! dispatch only reads a snapshot.

use crate::domain::{CallId, InboundMessage, ReplySender, Topic, WebhookError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// What a listener returns.
pub type ListenerResult = anyhow::Result<()>;

/// Everything a listener sees for one call.
///
/// Cheap to clone; every listener of a call shares the same message and
/// reply slot.
#[derive(Debug, Clone)]
pub struct ListenerContext {
    call_id: CallId,
    kind: Arc<str>,
    message: Arc<InboundMessage>,
    reply: ReplySender,
    failure: Option<WebhookError>,
}

impl ListenerContext {
    /// Context for a call.
    pub fn new(
        call_id: CallId,
        kind: impl Into<Arc<str>>,
        message: Arc<InboundMessage>,
        reply: ReplySender,
    ) -> Self {
        Self {
            call_id,
            kind: kind.into(),
            message,
            reply,
            failure: None,
        }
    }

    /// Same call, carrying a failure for `error` listeners.
    pub(crate) fn with_failure(&self, failure: WebhookError) -> Self {
        Self {
            failure: Some(failure),
            ..self.clone()
        }
    }

    /// ID of the call being dispatched.
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    /// Normalized routing kind of the message.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The decoded message.
    pub fn message(&self) -> &InboundMessage {
        &self.message
    }

    /// The call's reply slot.
    pub fn reply(&self) -> &ReplySender {
        &self.reply
    }

    /// The failure being handled; only set for `error` listeners.
    pub fn failure(&self) -> Option<&WebhookError> {
        self.failure.as_ref()
    }
}

/// A listener for one or more topics.
///
/// Closures `Fn(ListenerContext) -> impl Future<Output = ListenerResult>`
/// implement this automatically.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Handle one call.
    async fn on_event(&self, ctx: ListenerContext) -> ListenerResult;
}

#[async_trait]
impl<F, Fut> Listener for F
where
    F: Fn(ListenerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ListenerResult> + Send + 'static,
{
    async fn on_event(&self, ctx: ListenerContext) -> ListenerResult {
        (self)(ctx).await
    }
}

/// Handle returned by registration, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Entry = (ListenerId, Arc<dyn Listener>);

/// Registered listeners, by topic, in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    topics: RwLock<HashMap<Topic, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener to `topic`.
    pub fn register(&self, topic: Topic, listener: Arc<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(topic = %topic, id = id.0, "Registering listener");
        self.topics
            .write()
            .entry(topic)
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove one listener. Returns whether it was registered on `topic`.
    pub fn remove(&self, topic: &Topic, id: ListenerId) -> bool {
        let mut topics = self.topics.write();
        let Some(entries) = topics.get_mut(topic) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            topics.remove(topic);
        }
        removed
    }

    /// Remove every listener on `topic`. Returns how many were removed.
    pub fn clear(&self, topic: &Topic) -> usize {
        self.topics
            .write()
            .remove(topic)
            .map_or(0, |entries| entries.len())
    }

    /// Number of listeners on `topic`.
    pub fn listener_count(&self, topic: &Topic) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    /// Listeners on `topic`, in registration order.
    pub fn snapshot(&self, topic: &Topic) -> Vec<Arc<dyn Listener>> {
        self.topics
            .read()
            .get(topic)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }
}
