//! # WX Node Runtime
//!
//! Wires a [`Dispatcher`] from [`NodeConfig`] and serves it over HTTP.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Build the dispatcher (validates token and key)
//! 3. Register the welcome `default` listener, if configured
//! 4. Bind and serve until the shutdown signal fires

pub mod config;

pub use config::{NodeConfig, NodeConfigError};

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use wx_callback::{router, Dispatcher, ListenerResult, Topic, WebhookError};

/// The endpoint runtime.
pub struct NodeRuntime {
    config: NodeConfig,
    dispatcher: Arc<Dispatcher>,
}

impl NodeRuntime {
    /// Build the dispatcher and default listeners.
    pub fn new(config: NodeConfig) -> Result<Self, WebhookError> {
        let dispatcher = Arc::new(Dispatcher::new(config.callback.clone())?);

        if let Some(text) = config.welcome_text.clone() {
            let text: Arc<str> = text.into();
            dispatcher.on(Topic::Default, move |ctx| {
                let text = Arc::clone(&text);
                async move {
                    ctx.reply().text(&*text);
                    ListenerResult::Ok(())
                }
            });
            info!("Welcome reply registered on default");
        }

        Ok(Self { config, dispatcher })
    }

    /// The dispatcher, for registering further listeners.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// The configuration this runtime was built from.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// HTTP router for the callback endpoint.
    pub fn router(&self) -> Router {
        router(
            self.dispatcher(),
            &self.config.path,
            self.config.max_body_bytes,
        )
    }

    /// Bind the configured address and serve until `shutdown` completes.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind)
            .await
            .with_context(|| format!("failed to bind {}", self.config.bind))?;

        info!(
            addr = %self.config.bind,
            path = %self.config.path,
            encrypted = self.dispatcher.is_encrypted(),
            "Callback endpoint listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("server error")?;

        info!("Callback endpoint stopped");
        Ok(())
    }
}
