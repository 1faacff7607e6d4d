//! # Envelope Codec
//!
//! AES-256-CBC encryption of callback payloads.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────┬───────────────┬─────────────┬────────┬─────────────┐
//! │ random (16B) │ length (u32BE)│ message     │ app id │ pad (1..32) │
//! └──────────────┴───────────────┴─────────────┴────────┴─────────────┘
//! ```
//!
//! The pad is applied by hand against a 32-byte block: every pad byte equals
//! the pad length and an already aligned plaintext still gains a full block.
//! The cipher itself runs with padding disabled. The IV is the first 16 bytes
//! of the key, which the remote platform relies on.

use crate::CryptoError;
use base64::alphabet;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Key length in bytes.
pub const KEY_LEN: usize = 32;
/// IV length in bytes (taken from the front of the key).
pub const IV_LEN: usize = 16;
/// Random prefix length in bytes.
pub const RANDOM_PREFIX_LEN: usize = 16;
/// Block size of the manual padding scheme.
pub const PAD_BLOCK_SIZE: usize = 32;

const LENGTH_PREFIX_LEN: usize = 4;
const AES_BLOCK_SIZE: usize = 16;

/// Accepts keys and cipher text with or without `=` padding and with
/// non-zero trailing bits, as the platform emits them.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// 256-bit encoding key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncodingKey([u8; KEY_LEN]);

impl EncodingKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode the platform's 43-character base64 form.
    ///
    /// # Errors
    ///
    /// `InvalidKeyEncoding` for non-base64 input, `InvalidKeyLength` unless
    /// the input decodes to exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut decoded = LENIENT
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;

        if decoded.len() != KEY_LEN {
            let actual = decoded.len();
            decoded.zeroize();
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                actual,
            });
        }

        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Encode in the platform's unpadded base64 form.
    pub fn to_base64(&self) -> String {
        STANDARD_NO_PAD.encode(self.0)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// The IV derived from this key.
    pub fn iv(&self) -> [u8; IV_LEN] {
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&self.0[..IV_LEN]);
        iv
    }
}

impl fmt::Debug for EncodingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncodingKey(..)")
    }
}

/// Result of opening an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    /// The 16 random bytes the sender prepended.
    pub random_prefix: [u8; RANDOM_PREFIX_LEN],
    /// The message bytes, exactly as long as the length prefix said.
    pub message: Vec<u8>,
    /// Everything after the message: the sender's app id.
    pub app_id: Vec<u8>,
}

/// Append the 32-byte block pad. Pad length is always 1..=32.
pub fn pad(mut data: Vec<u8>) -> Vec<u8> {
    let pad_len = PAD_BLOCK_SIZE - (data.len() % PAD_BLOCK_SIZE);
    data.resize(data.len() + pad_len, pad_len as u8);
    data
}

/// Strip the 32-byte block pad.
///
/// A trailing byte outside 1..=32 means no pad; nothing is stripped.
pub fn unpad(data: &[u8]) -> &[u8] {
    let pad_len = match data.last() {
        Some(&last) if (1..=PAD_BLOCK_SIZE as u8).contains(&last) => last as usize,
        _ => 0,
    };
    &data[..data.len().saturating_sub(pad_len)]
}

/// Symmetric codec bound to one key.
#[derive(Clone)]
pub struct EnvelopeCodec {
    key: EncodingKey,
    iv: [u8; IV_LEN],
}

impl EnvelopeCodec {
    /// Create a codec; the IV is derived from the key.
    pub fn new(key: EncodingKey) -> Self {
        let iv = key.iv();
        Self { key, iv }
    }

    /// Seal `message` for `app_id` with a fresh random prefix.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EncryptionFailed` if the message does not fit the
    /// 32-bit length prefix.
    pub fn encode(&self, message: &[u8], app_id: &[u8]) -> Result<String, CryptoError> {
        let mut prefix = [0u8; RANDOM_PREFIX_LEN];
        rand::thread_rng().fill_bytes(&mut prefix);
        self.encode_with_prefix(&prefix, message, app_id)
    }

    /// Seal with a caller-chosen prefix. Output is deterministic.
    pub fn encode_with_prefix(
        &self,
        prefix: &[u8; RANDOM_PREFIX_LEN],
        message: &[u8],
        app_id: &[u8],
    ) -> Result<String, CryptoError> {
        let length = u32::try_from(message.len()).map_err(|_| {
            CryptoError::EncryptionFailed(format!(
                "message of {} bytes exceeds the 32-bit length prefix",
                message.len()
            ))
        })?;

        let mut plain = Vec::with_capacity(
            RANDOM_PREFIX_LEN + LENGTH_PREFIX_LEN + message.len() + app_id.len() + PAD_BLOCK_SIZE,
        );
        plain.extend_from_slice(prefix);
        plain.extend_from_slice(&length.to_be_bytes());
        plain.extend_from_slice(message);
        plain.extend_from_slice(app_id);

        let cipher = self.encrypt_blocks(&pad(plain))?;
        Ok(STANDARD.encode(cipher))
    }

    /// Open a base64 envelope.
    ///
    /// # Errors
    ///
    /// - `InvalidCipherText`: not base64, or not a positive multiple of 16 bytes
    /// - `MalformedEnvelope`: too short, or the length prefix runs past the end
    pub fn decode(&self, cipher_text: &str) -> Result<DecryptedMessage, CryptoError> {
        let cipher = LENIENT
            .decode(cipher_text.trim())
            .map_err(|e| CryptoError::InvalidCipherText(e.to_string()))?;

        let plain = self.decrypt_blocks(&cipher)?;
        parse_envelope(unpad(&plain))
    }

    /// Raw AES-256-CBC over whole blocks.
    pub(crate) fn encrypt_blocks(&self, plain: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if plain.len() % AES_BLOCK_SIZE != 0 {
            return Err(CryptoError::EncryptionFailed(format!(
                "{} bytes is not a multiple of the AES block size",
                plain.len()
            )));
        }
        let encryptor = Aes256CbcEnc::new_from_slices(self.key.as_bytes(), &self.iv)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(encryptor.encrypt_padded_vec_mut::<NoPadding>(plain))
    }

    fn decrypt_blocks(&self, cipher: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if cipher.is_empty() || cipher.len() % AES_BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidCipherText(format!(
                "{} bytes is not a positive multiple of {}",
                cipher.len(),
                AES_BLOCK_SIZE
            )));
        }
        let decryptor = Aes256CbcDec::new_from_slices(self.key.as_bytes(), &self.iv)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        decryptor
            .decrypt_padded_vec_mut::<NoPadding>(cipher)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}

impl fmt::Debug for EnvelopeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeCodec").finish_non_exhaustive()
    }
}

fn parse_envelope(data: &[u8]) -> Result<DecryptedMessage, CryptoError> {
    if data.len() < RANDOM_PREFIX_LEN + LENGTH_PREFIX_LEN {
        return Err(CryptoError::MalformedEnvelope(format!(
            "{} bytes is shorter than prefix and length",
            data.len()
        )));
    }

    let (prefix, content) = data.split_at(RANDOM_PREFIX_LEN);
    let (length_bytes, body) = content.split_at(LENGTH_PREFIX_LEN);

    let mut length = [0u8; LENGTH_PREFIX_LEN];
    length.copy_from_slice(length_bytes);
    let length = u32::from_be_bytes(length) as usize;

    if length > body.len() {
        return Err(CryptoError::MalformedEnvelope(format!(
            "length prefix {} exceeds remaining {} bytes",
            length,
            body.len()
        )));
    }

    let (message, app_id) = body.split_at(length);
    let mut random_prefix = [0u8; RANDOM_PREFIX_LEN];
    random_prefix.copy_from_slice(prefix);

    Ok(DecryptedMessage {
        random_prefix,
        message: message.to_vec(),
        app_id: app_id.to_vec(),
    })
}
