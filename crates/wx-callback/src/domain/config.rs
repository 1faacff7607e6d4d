//! Callback configuration with validation.

use serde::{Deserialize, Serialize};
use shared_crypto::CryptoContext;
use std::fmt;
use std::time::Duration;

/// Per-phase listener deadline used when none is configured.
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_millis(4700);

/// Endpoint configuration.
///
/// `encoding_aes_key` and `app_id` enable envelope mode together; with both
/// absent the endpoint runs in plaintext-signature mode.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    /// Verification token shared with the platform.
    pub token: String,
    /// 43-character base64 key; decodes to 32 bytes.
    pub encoding_aes_key: Option<String>,
    /// Application id appended to every envelope.
    pub app_id: Option<String>,
    /// Deadline for each bounded listener phase.
    #[serde(with = "duration_serde")]
    pub phase_timeout: Duration,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            encoding_aes_key: None,
            app_id: None,
            phase_timeout: DEFAULT_PHASE_TIMEOUT,
        }
    }
}

impl CallbackConfig {
    /// Plaintext-mode configuration.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// Enable envelope mode.
    pub fn with_encryption(mut self, encoding_aes_key: impl Into<String>, app_id: impl Into<String>) -> Self {
        self.encoding_aes_key = Some(encoding_aes_key.into());
        self.app_id = Some(app_id.into());
        self
    }

    /// Override the per-phase deadline.
    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }

    /// Whether envelope mode is configured.
    pub fn is_encrypted(&self) -> bool {
        self.encoding_aes_key.is_some() && self.app_id.is_some()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_empty() {
            return Err(ConfigError::MissingToken);
        }

        match (&self.encoding_aes_key, &self.app_id) {
            (Some(_), None) => return Err(ConfigError::PartialEncryption("app_id")),
            (None, Some(_)) => return Err(ConfigError::PartialEncryption("encoding_aes_key")),
            (Some(_), Some(app_id)) if app_id.is_empty() => {
                return Err(ConfigError::PartialEncryption("app_id"))
            }
            _ => {}
        }

        if self.phase_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "phase_timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Validate and build the crypto context, if envelope mode is enabled.
    pub fn crypto_context(&self) -> Result<Option<CryptoContext>, ConfigError> {
        self.validate()?;

        match (&self.encoding_aes_key, &self.app_id) {
            (Some(key), Some(app_id)) => CryptoContext::new(self.token.clone(), key, app_id.clone())
                .map(Some)
                .map_err(|e| ConfigError::InvalidKey(e.to_string())),
            _ => Ok(None),
        }
    }
}

impl fmt::Debug for CallbackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackConfig")
            .field("token", &"<redacted>")
            .field("encoding_aes_key", &self.encoding_aes_key.as_ref().map(|_| "<redacted>"))
            .field("app_id", &self.app_id)
            .field("phase_timeout", &self.phase_timeout)
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No verification token
    #[error("token is required")]
    MissingToken,
    /// Only half of the envelope settings present
    #[error("envelope mode requires {0} as well")]
    PartialEncryption(&'static str),
    /// Key does not decode to 32 bytes
    #[error("invalid encoding key: {0}")]
    InvalidKey(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Durations as `"4700ms"`, `"5s"` or `"1m"`.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before "s"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid duration")
        }
    }
}
