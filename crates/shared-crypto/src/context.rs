//! Per-application crypto binding: token, key and app id.

use crate::envelope::{EncodingKey, EnvelopeCodec};
use crate::signature::{signature, verify_signature};
use crate::CryptoError;
use std::fmt;
use zeroize::Zeroizing;

/// Envelope contents decoded as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedMessage {
    /// Message text.
    pub message: String,
    /// App id the sender appended.
    pub sender_id: String,
}

/// Signs, seals and opens envelopes for one configured application.
///
/// Holds no per-call state; share it behind an `Arc`.
#[derive(Clone)]
pub struct CryptoContext {
    token: Zeroizing<String>,
    app_id: String,
    codec: EnvelopeCodec,
}

impl CryptoContext {
    /// Build from the configured token, base64 key and app id.
    ///
    /// # Errors
    ///
    /// Fails if the key is not base64 or does not decode to 32 bytes.
    pub fn new(
        token: impl Into<String>,
        encoding_aes_key: &str,
        app_id: impl Into<String>,
    ) -> Result<Self, CryptoError> {
        let key = EncodingKey::from_base64(encoding_aes_key)?;
        Ok(Self {
            token: Zeroizing::new(token.into()),
            app_id: app_id.into(),
            codec: EnvelopeCodec::new(key),
        })
    }

    /// The verification token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The configured app id.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Signature over `{token, timestamp, nonce, payload}`.
    pub fn signature(&self, timestamp: &str, nonce: &str, payload: &str) -> String {
        signature(&[self.token.as_str(), timestamp, nonce, payload])
    }

    /// Check `candidate` against [`signature`](Self::signature).
    pub fn verify(&self, candidate: &str, timestamp: &str, nonce: &str, payload: &str) -> bool {
        verify_signature(candidate, &[self.token.as_str(), timestamp, nonce, payload])
    }

    /// Open an envelope. Invalid UTF-8 is replaced, not rejected.
    pub fn decrypt(&self, cipher_text: &str) -> Result<OpenedMessage, CryptoError> {
        let opened = self.codec.decode(cipher_text)?;
        Ok(OpenedMessage {
            message: String::from_utf8_lossy(&opened.message).into_owned(),
            sender_id: String::from_utf8_lossy(&opened.app_id).into_owned(),
        })
    }

    /// Seal `message` for the configured app id.
    pub fn encrypt(&self, message: &str) -> Result<String, CryptoError> {
        self.codec.encode(message.as_bytes(), self.app_id.as_bytes())
    }
}

impl fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoContext")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}
