//! # Dispatcher
//!
//! Per-call state machine:
//!
//! ```text
//!  GET + signature/timestamp/nonce/echostr ──► ReceivingHandshake ──► Authenticating ──► (Decoding) ──► Done
//!  POST + body ─────────────────────────────► ReceivingMessage ──► Authenticating ──► (Decoding) ──► Routing
//!  anything else ───────────────────────────► Rejected (400)                                            │
//!                                                                                                       ▼
//!               AwaitingBeforeHook ──► AwaitingTypeHandler ──► AwaitingAfterHook ──► Replying ──► Done
//!                        └──────── failure ──► error listeners ──┘
//! ```
//!
//! Signature mismatches, malformed input and unroutable kinds are resolved
//! here as 401/400/404 outcomes. Listener failures and deadline misses in
//! `before` or the kind/default phase go to `error` listeners once; without
//! any they propagate to the caller. `after` always runs under the same
//! deadline, and its own failure or timeout propagates.

mod phase;

use crate::adapters::XmlCodec;
use crate::domain::kinds::{class_of, routing_kind};
use crate::domain::{
    AddressedReply, CallBody, CallId, CallbackConfig, DispatchOutcome, HttpMethod, InboundCall,
    InboundMessage, QueryParams, Reply, ReplySender, SealedReply, Topic, WebhookError,
};
use crate::ports::{CallbackApi, WireCodec};
use crate::registry::{Listener, ListenerContext, ListenerId, ListenerRegistry, ListenerResult};
use async_trait::async_trait;
use shared_crypto::{verify_signature, CryptoContext};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

/// Query parameters that mark a handshake.
const HANDSHAKE_PARAMS: [&str; 4] = ["signature", "timestamp", "nonce", "echostr"];

/// Dispatch stages, traced per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Classified as a handshake.
    ReceivingHandshake,
    /// Classified as a message delivery.
    ReceivingMessage,
    /// Checking a signature.
    Authenticating,
    /// Opening an envelope.
    Decoding,
    /// Validating shape and resolving the kind.
    Routing,
    /// Running `before` listeners.
    AwaitingBeforeHook,
    /// Running kind or `default` listeners.
    AwaitingTypeHandler,
    /// Running `after` listeners.
    AwaitingAfterHook,
    /// Rendering the reply.
    Replying,
    /// Finished with an outcome.
    Done,
    /// Rejected before any listener ran.
    Rejected,
}

fn enter(stage: Stage) {
    trace!(stage = ?stage, "Dispatch stage");
}

/// Classify a call as handshake, message, or neither.
///
/// Returns [`Stage::ReceivingHandshake`], [`Stage::ReceivingMessage`] or
/// [`Stage::Rejected`].
pub fn classify(call: &InboundCall) -> Stage {
    match call.method {
        HttpMethod::Get
            if !call.body.is_present()
                && HANDSHAKE_PARAMS
                    .iter()
                    .all(|name| call.query.get_non_empty(name).is_some()) =>
        {
            Stage::ReceivingHandshake
        }
        HttpMethod::Post if call.body.is_present() => Stage::ReceivingMessage,
        _ => Stage::Rejected,
    }
}

/// Routes inbound calls to registered listeners.
///
/// Holds only the registry, the crypto context, the codec and the phase
/// deadline; everything per call lives in the dispatch future, so one
/// instance serves concurrent calls.
pub struct Dispatcher {
    registry: ListenerRegistry,
    crypto: Option<Arc<CryptoContext>>,
    token: String,
    codec: Arc<dyn WireCodec>,
    phase_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with the XML codec.
    ///
    /// # Errors
    ///
    /// `WebhookError::Config` if the configuration is invalid or the key does
    /// not decode to 32 bytes.
    pub fn new(config: CallbackConfig) -> Result<Self, WebhookError> {
        Self::with_codec(config, Arc::new(XmlCodec::new()))
    }

    /// Create a dispatcher with a custom wire codec.
    pub fn with_codec(
        config: CallbackConfig,
        codec: Arc<dyn WireCodec>,
    ) -> Result<Self, WebhookError> {
        let crypto = config.crypto_context()?.map(Arc::new);

        info!(
            encrypted = crypto.is_some(),
            phase_timeout_ms = config.phase_timeout.as_millis() as u64,
            "Callback dispatcher configured"
        );

        Ok(Self {
            registry: ListenerRegistry::new(),
            crypto,
            token: config.token,
            codec,
            phase_timeout: config.phase_timeout,
        })
    }

    /// Register a closure listener.
    pub fn on<F, Fut>(&self, topic: Topic, listener: F) -> ListenerId
    where
        F: Fn(ListenerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        self.registry.register(topic, Arc::new(listener))
    }

    /// Register a [`Listener`] implementation.
    pub fn on_listener(&self, topic: Topic, listener: Arc<dyn Listener>) -> ListenerId {
        self.registry.register(topic, listener)
    }

    /// Remove a listener.
    pub fn off(&self, topic: &Topic, id: ListenerId) -> bool {
        self.registry.remove(topic, id)
    }

    /// Remove every listener on a topic.
    pub fn clear(&self, topic: &Topic) -> usize {
        self.registry.clear(topic)
    }

    /// Number of listeners on a topic.
    pub fn listener_count(&self, topic: &Topic) -> usize {
        self.registry.listener_count(topic)
    }

    /// Whether envelope mode is active.
    pub fn is_encrypted(&self) -> bool {
        self.crypto.is_some()
    }

    /// The crypto context, in envelope mode.
    pub fn crypto(&self) -> Option<&CryptoContext> {
        self.crypto.as_deref()
    }

    /// Deadline applied to the `before` and kind/default phases.
    pub fn phase_timeout(&self) -> Duration {
        self.phase_timeout
    }

    /// Handle one call.
    pub async fn dispatch(&self, call: InboundCall) -> Result<DispatchOutcome, WebhookError> {
        let call_id = CallId::new();
        let span = info_span!("wx_call", call_id = %call_id, method = ?call.method);

        async move {
            let result = match classify(&call) {
                Stage::ReceivingHandshake => {
                    enter(Stage::ReceivingHandshake);
                    self.handshake(&call.query)
                }
                Stage::ReceivingMessage => {
                    enter(Stage::ReceivingMessage);
                    self.message(call, call_id).await
                }
                _ => Err(WebhookError::MalformedInput(
                    "neither a handshake nor a message".into(),
                )),
            };

            match result {
                Ok(outcome) => {
                    enter(Stage::Done);
                    debug!(status = outcome.status, "Call handled");
                    Ok(outcome)
                }
                Err(e) if e.is_rejection() => {
                    enter(Stage::Rejected);
                    info!(status = e.status(), reason = %e, "Call rejected");
                    Ok(DispatchOutcome::for_status(e.status()))
                }
                Err(e) => {
                    error!(error = %e, "Call failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    fn handshake(&self, query: &QueryParams) -> Result<DispatchOutcome, WebhookError> {
        let signature = required(query, "signature")?;
        let timestamp = required(query, "timestamp")?;
        let nonce = required(query, "nonce")?;
        let echostr = required(query, "echostr")?;

        enter(Stage::Authenticating);
        match &self.crypto {
            Some(crypto) => {
                if !crypto.verify(signature, timestamp, nonce, echostr) {
                    return Err(WebhookError::Auth("handshake signature mismatch".into()));
                }
                enter(Stage::Decoding);
                let opened = crypto
                    .decrypt(echostr)
                    .map_err(|e| WebhookError::MalformedInput(format!("echostr: {}", e)))?;
                check_sender(crypto, &opened.sender_id)?;
                Ok(DispatchOutcome::ok(opened.message))
            }
            None => {
                if !verify_signature(signature, &[self.token.as_str(), timestamp, nonce]) {
                    return Err(WebhookError::Auth("handshake signature mismatch".into()));
                }
                Ok(DispatchOutcome::ok(echostr))
            }
        }
    }

    async fn message(
        &self,
        call: InboundCall,
        call_id: CallId,
    ) -> Result<DispatchOutcome, WebhookError> {
        let InboundCall { query, body, .. } = call;

        enter(Stage::Authenticating);
        let message = self.open_message(&query, body)?;

        enter(Stage::Routing);
        if let Some(field) = message.missing_required() {
            return Err(WebhookError::MalformedInput(format!("missing {}", field)));
        }
        let msg_type = message.msg_type().unwrap_or_default();
        let kind = routing_kind(&msg_type, message.event().as_deref());
        debug!(kind = %kind, known = class_of(&kind).is_some(), "Routing message");

        let message = Arc::new(message);
        let ctx = ListenerContext::new(
            call_id,
            kind.as_str(),
            Arc::clone(&message),
            ReplySender::new(),
        );

        if let Some(outcome) = self.run_lifecycle(&ctx).await? {
            return Ok(outcome);
        }

        enter(Stage::Replying);
        self.emit_reply(&query, &message, ctx.reply().take())
    }

    /// Parse the body and, in envelope mode, verify and open it.
    fn open_message(
        &self,
        query: &QueryParams,
        body: CallBody,
    ) -> Result<InboundMessage, WebhookError> {
        let parsed = match body {
            CallBody::Raw(text) => self.codec.parse(&text)?,
            CallBody::Parsed(value) => value,
            CallBody::Empty => return Err(WebhookError::MalformedInput("empty body".into())),
        };
        let envelope = InboundMessage::from_value(parsed).ok_or_else(not_a_map)?;

        let Some(crypto) = &self.crypto else {
            return Ok(envelope);
        };
        let (Some(encrypt), Some(timestamp), Some(nonce), Some(signature)) = (
            envelope.non_empty("Encrypt"),
            query.get_non_empty("timestamp"),
            query.get_non_empty("nonce"),
            query.get_non_empty("msg_signature"),
        ) else {
            return Ok(envelope);
        };

        if !crypto.verify(signature, timestamp, nonce, &encrypt) {
            return Err(WebhookError::Auth("message signature mismatch".into()));
        }

        enter(Stage::Decoding);
        let opened = crypto
            .decrypt(&encrypt)
            .map_err(|e| WebhookError::MalformedInput(format!("envelope: {}", e)))?;
        check_sender(crypto, &opened.sender_id)?;

        let inner = self.codec.parse(&opened.message)?;
        InboundMessage::from_value(inner).ok_or_else(not_a_map)
    }

    /// Run the phases. `Some` short-circuits reply emission.
    async fn run_lifecycle(
        &self,
        ctx: &ListenerContext,
    ) -> Result<Option<DispatchOutcome>, WebhookError> {
        let settled = match self.run_handlers(ctx).await {
            Ok(()) => Ok(None),
            Err(WebhookError::Routing(kind)) => {
                info!(kind = %kind, "No listener for kind");
                Ok(Some(DispatchOutcome::not_found()))
            }
            Err(failure) => self.recover(ctx, failure).await,
        };

        if self.registry.listener_count(&Topic::After) > 0 {
            enter(Stage::AwaitingAfterHook);
            self.run_topic(&Topic::After, ctx, Some(self.phase_timeout))
                .await?;
        }

        settled
    }

    async fn run_handlers(&self, ctx: &ListenerContext) -> Result<(), WebhookError> {
        if self.registry.listener_count(&Topic::Before) > 0 {
            enter(Stage::AwaitingBeforeHook);
            self.run_topic(&Topic::Before, ctx, Some(self.phase_timeout))
                .await?;
        }

        enter(Stage::AwaitingTypeHandler);
        // Kind listeners and default are mutually exclusive
        let kind_topic = Topic::Kind(ctx.kind().to_string());
        let topic = if self.registry.listener_count(&kind_topic) > 0 {
            kind_topic
        } else if self.registry.listener_count(&Topic::Default) > 0 {
            Topic::Default
        } else {
            return Err(WebhookError::Routing(ctx.kind().to_string()));
        };

        self.run_topic(&topic, ctx, Some(self.phase_timeout)).await
    }

    async fn recover(
        &self,
        ctx: &ListenerContext,
        failure: WebhookError,
    ) -> Result<Option<DispatchOutcome>, WebhookError> {
        if !failure.is_recoverable() || self.registry.listener_count(&Topic::Error) == 0 {
            return Err(failure);
        }

        warn!(error = %failure, "Listener failed, running error listeners");
        self.run_topic(&Topic::Error, &ctx.with_failure(failure), None)
            .await?;

        if ctx.reply().has_reply() {
            Ok(None)
        } else {
            Ok(Some(DispatchOutcome::internal_error()))
        }
    }

    async fn run_topic(
        &self,
        topic: &Topic,
        ctx: &ListenerContext,
        deadline: Option<Duration>,
    ) -> Result<(), WebhookError> {
        phase::run_phase(topic, self.registry.snapshot(topic), ctx, deadline).await
    }

    fn emit_reply(
        &self,
        query: &QueryParams,
        message: &InboundMessage,
        reply: Option<Reply>,
    ) -> Result<DispatchOutcome, WebhookError> {
        let Some(reply) = reply else {
            return Ok(DispatchOutcome::acknowledged());
        };

        let addressed = AddressedReply {
            to: message.from_user().unwrap_or_default(),
            from: message.to_user().unwrap_or_default(),
            create_time: message.create_time().unwrap_or_default(),
            reply,
        };
        let body = self.codec.render_reply(&addressed);

        if let (Some(crypto), Some(timestamp), Some(nonce), Some(_)) = (
            &self.crypto,
            query.get_non_empty("timestamp"),
            query.get_non_empty("nonce"),
            query.get_non_empty("msg_signature"),
        ) {
            let encrypt = crypto
                .encrypt(&body)
                .map_err(|e| WebhookError::Envelope(e.to_string()))?;
            let signature = crypto.signature(timestamp, nonce, &encrypt);
            let sealed = SealedReply {
                encrypt,
                signature,
                timestamp: timestamp.to_string(),
                nonce: nonce.to_string(),
            };
            return Ok(DispatchOutcome::ok(self.codec.render_sealed(&sealed)));
        }

        Ok(DispatchOutcome::ok(body))
    }
}

#[async_trait]
impl CallbackApi for Dispatcher {
    async fn handle(&self, call: InboundCall) -> Result<DispatchOutcome, WebhookError> {
        self.dispatch(call).await
    }
}

fn required<'q>(query: &'q QueryParams, name: &str) -> Result<&'q str, WebhookError> {
    query
        .get_non_empty(name)
        .ok_or_else(|| WebhookError::MalformedInput(format!("missing {}", name)))
}

fn check_sender(crypto: &CryptoContext, sender_id: &str) -> Result<(), WebhookError> {
    if sender_id == crypto.app_id() {
        return Ok(());
    }
    warn!(sender_id = %sender_id, "Envelope app id mismatch");
    Err(WebhookError::Auth(format!(
        "envelope addressed to app id '{}'",
        sender_id
    )))
}

fn not_a_map() -> WebhookError {
    WebhookError::MalformedInput("body is not a structural map".into())
}
