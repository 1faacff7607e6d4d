//! Shared fixtures: credentials, message bodies and call builders.

use shared_crypto::{signature, CryptoContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wx_callback::{
    CallbackConfig, Dispatcher, InboundCall, ListenerResult, QueryParams, Topic, WireCodec,
    XmlCodec,
};

pub const TOKEN: &str = "T";
pub const ENCODING_AES_KEY: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG";
pub const APP_ID: &str = "wx5823bf96d3bd56c7";
pub const OFFICIAL_ACCOUNT: &str = "gh_7f083739789a";
pub const USER: &str = "oia2TjjewbmiOUlr6X-1crbLOvLw";

/// Plaintext-mode dispatcher with the default deadline.
pub fn plain_dispatcher() -> Dispatcher {
    Dispatcher::new(CallbackConfig::new(TOKEN)).expect("valid config")
}

/// Envelope-mode dispatcher with the default deadline.
pub fn encrypted_dispatcher() -> Dispatcher {
    Dispatcher::new(CallbackConfig::new(TOKEN).with_encryption(ENCODING_AES_KEY, APP_ID))
        .expect("valid config")
}

/// Dispatcher with a short deadline, for tests on real time.
pub fn fast_dispatcher() -> Dispatcher {
    Dispatcher::new(CallbackConfig::new(TOKEN).with_phase_timeout(Duration::from_millis(50)))
        .expect("valid config")
}

/// Crypto context matching [`encrypted_dispatcher`], acting as the platform.
pub fn platform() -> CryptoContext {
    CryptoContext::new(TOKEN, ENCODING_AES_KEY, APP_ID).expect("valid key")
}

/// A user-to-account message of `msg_type`.
pub fn message_xml(msg_type: &str, content: &str) -> String {
    format!(
        "<xml>\
         <ToUserName><![CDATA[{OFFICIAL_ACCOUNT}]]></ToUserName>\
         <FromUserName><![CDATA[{USER}]]></FromUserName>\
         <CreateTime>1348831860</CreateTime>\
         <MsgType><![CDATA[{msg_type}]]></MsgType>\
         <Content><![CDATA[{content}]]></Content>\
         <MsgId>1234567890123456</MsgId>\
         </xml>"
    )
}

/// An event push.
pub fn event_xml(event: &str) -> String {
    format!(
        "<xml>\
         <ToUserName><![CDATA[{OFFICIAL_ACCOUNT}]]></ToUserName>\
         <FromUserName><![CDATA[{USER}]]></FromUserName>\
         <CreateTime>1348831860</CreateTime>\
         <MsgType><![CDATA[event]]></MsgType>\
         <Event><![CDATA[{event}]]></Event>\
         </xml>"
    )
}

/// Handshake query signed over `(token, timestamp, nonce)`.
pub fn plain_handshake(timestamp: &str, nonce: &str, echostr: &str) -> InboundCall {
    InboundCall::get(
        QueryParams::new()
            .with("signature", signature(&[TOKEN, timestamp, nonce]))
            .with("timestamp", timestamp)
            .with("nonce", nonce)
            .with("echostr", echostr),
    )
}

/// Envelope-mode handshake carrying `echo` sealed by `sender`.
pub fn sealed_handshake(sender: &CryptoContext, echo: &str) -> InboundCall {
    let echostr = sender.encrypt(echo).expect("encrypt");
    InboundCall::get(
        QueryParams::new()
            .with("signature", sender.signature("1409304348", "xxxxxx", &echostr))
            .with("timestamp", "1409304348")
            .with("nonce", "xxxxxx")
            .with("echostr", echostr),
    )
}

/// Seal `inner` the way the platform does and wrap it in a POST.
pub fn sealed_post(sender: &CryptoContext, inner: &str) -> InboundCall {
    let encrypt = sender.encrypt(inner).expect("encrypt");
    let msg_signature = sender.signature("1409304348", "1372623149", &encrypt);
    let body = format!(
        "<xml><ToUserName><![CDATA[{OFFICIAL_ACCOUNT}]]></ToUserName>\
         <Encrypt><![CDATA[{encrypt}]]></Encrypt></xml>"
    );
    InboundCall::post(
        QueryParams::new()
            .with("signature", signature(&[TOKEN, "1409304348", "1372623149"]))
            .with("timestamp", "1409304348")
            .with("nonce", "1372623149")
            .with("encrypt_type", "aes")
            .with("msg_signature", msg_signature),
        body,
    )
}

/// Read one top-level field from a rendered reply.
pub fn field(xml: &str, name: &str) -> Option<String> {
    let parsed = XmlCodec::new().parse(xml).ok()?;
    parsed
        .get("xml")?
        .get(name)?
        .as_str()
        .map(str::to_string)
}

/// Count invocations of `topic`.
pub fn count_calls(dispatcher: &Dispatcher, topic: Topic) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    dispatcher.on(topic, move |_ctx| {
        let seen = Arc::clone(&seen);
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            ListenerResult::Ok(())
        }
    });
    count
}
