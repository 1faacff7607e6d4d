//! # Node Configuration
//!
//! Everything `wx-node` reads from its environment.
//!
//! | Variable              | Default        |
//! |-----------------------|----------------|
//! | `WX_TOKEN`            | required       |
//! | `WX_ENCODING_AES_KEY` | unset          |
//! | `WX_APP_ID`           | unset          |
//! | `WX_BIND`             | `0.0.0.0:8123` |
//! | `WX_PATH`             | `/`            |
//! | `WX_PHASE_TIMEOUT_MS` | `4700`         |
//! | `WX_MAX_BODY_BYTES`   | `65536`        |
//! | `WX_WELCOME_TEXT`     | unset          |
//! | `WX_LOG_LEVEL`        | `info`         |

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use wx_callback::{CallbackConfig, ConfigError, DEFAULT_MAX_BODY_BYTES, DEFAULT_PHASE_TIMEOUT};

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:8123";

/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Dispatcher configuration.
    pub callback: CallbackConfig,
    /// Listen address.
    pub bind: SocketAddr,
    /// Route path for the callback endpoint.
    pub path: String,
    /// Request body limit in bytes.
    pub max_body_bytes: usize,
    /// Text replied by the `default` listener, if any.
    pub welcome_text: Option<String>,
    /// Log filter directive.
    pub log_level: String,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum NodeConfigError {
    /// A variable could not be parsed.
    #[error("{name} is invalid: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// The callback configuration was rejected.
    #[error(transparent)]
    Callback(#[from] ConfigError),
}

impl NodeConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, NodeConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, NodeConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut callback = CallbackConfig::new(var("WX_TOKEN").unwrap_or_default());
        callback.encoding_aes_key = var("WX_ENCODING_AES_KEY");
        callback.app_id = var("WX_APP_ID");
        callback.phase_timeout = match var("WX_PHASE_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse("WX_PHASE_TIMEOUT_MS", &raw)?),
            None => DEFAULT_PHASE_TIMEOUT,
        };

        let bind_raw = var("WX_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = parse("WX_BIND", &bind_raw)?;

        let path = var("WX_PATH").unwrap_or_else(|| "/".to_string());
        if !path.starts_with('/') {
            return Err(NodeConfigError::Invalid {
                name: "WX_PATH",
                reason: format!("'{}' must start with '/'", path),
            });
        }

        let max_body_bytes = match var("WX_MAX_BODY_BYTES") {
            Some(raw) => parse("WX_MAX_BODY_BYTES", &raw)?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let config = Self {
            callback,
            bind,
            path,
            max_body_bytes,
            welcome_text: var("WX_WELCOME_TEXT"),
            log_level: var("WX_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the assembled configuration.
    pub fn validate(&self) -> Result<(), NodeConfigError> {
        self.callback.validate()?;
        if self.max_body_bytes == 0 {
            return Err(NodeConfigError::Invalid {
                name: "WX_MAX_BODY_BYTES",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, NodeConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| NodeConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
