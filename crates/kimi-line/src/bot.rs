//! LINE Bot implementation
//!
//! Wires configuration, catalogue and clients together and runs the webhook server

use std::sync::Arc;

use tracing::info;

use kimi_core::{BotConfig, EpisodeStore, MessageRouter, PremiumClient, RouterSettings};

use crate::api::LineApiClient;
use crate::error::{LineError, Result};
use crate::handler::EventHandler;
use crate::webhook::{WebhookState, create_webhook_router};

/// LINE bot serving story episodes
pub struct LineBot {
    config: BotConfig,
    store: Arc<EpisodeStore>,
    handler: Arc<EventHandler>,
}

impl LineBot {
    /// Validate the configuration, load the catalogue and build the clients.
    ///
    /// A missing or malformed episode file is an error: the bot never serves
    /// with an empty catalogue.
    pub fn new(config: BotConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(EpisodeStore::load(&config.content.episodes_path)?);
        let premium = Arc::new(PremiumClient::new(&config.premium)?);
        let api_client = Arc::new(LineApiClient::new(&config.line.channel_access_token)?);

        let router = MessageRouter::new(
            store.clone(),
            premium,
            RouterSettings::from(&config.content),
        );
        let handler = Arc::new(EventHandler::new(router, api_client));

        Ok(Self {
            config,
            store,
            handler,
        })
    }

    /// The loaded catalogue
    pub fn store(&self) -> &EpisodeStore {
        &self.store
    }

    fn webhook_state(&self) -> WebhookState {
        WebhookState {
            channel_secret: self.config.line.channel_secret.clone(),
            handler: self.handler.clone(),
        }
    }

    /// Run the bot with shutdown signal
    pub async fn run(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.config.line.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| LineError::Webhook(e.to_string()))?;

        info!("LINE webhook server listening on {}", addr);

        let app = create_webhook_router(self.webhook_state());

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("LINE bot shutting down");
            })
            .await
            .map_err(|e| LineError::Webhook(e.to_string()))?;

        Ok(())
    }
}
