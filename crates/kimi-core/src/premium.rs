//! Premium gatekeeper
//!
//! Premium membership lives entirely in an external record-keeping service.
//! Every check is a fresh remote query: nothing is cached locally.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PremiumConfig;
use crate::{Error, Result};

/// Read/write access to a user's premium flag
#[async_trait]
pub trait PremiumGate: Send + Sync {
    /// Whether the user may read gated episodes. Must be `false` on any failure.
    async fn is_premium(&self, user_id: &str) -> bool;

    /// Best-effort registration. Failures are not reported to the caller.
    async fn register_premium(&self, user_id: &str);
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    exists: bool,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    user_id: &'a str,
}

/// HTTP client for the premium-status service
#[derive(Clone)]
pub struct PremiumClient {
    client: Client,
    endpoint: String,
}

impl PremiumClient {
    /// Create a client from configuration
    pub fn new(config: &PremiumConfig) -> Result<Self> {
        Self::with_timeout(&config.endpoint, config.timeout())
    }

    /// Create a client for `endpoint` with an explicit request timeout
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(Error::Config("Premium endpoint not configured".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Query the service. Non-2xx or a body without a boolean `exists` is an error.
    pub async fn check(&self, user_id: &str) -> Result<bool> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("user_id", user_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Premium(format!("status check returned {}", status)));
        }

        let body = response.text().await?;
        let parsed: StatusResponse = serde_json::from_str(&body)?;
        Ok(parsed.exists)
    }

    /// Record the user as premium
    pub async fn register(&self, user_id: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RegisterRequest { user_id })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Premium(format!("registration returned {}", status)));
        }
        Ok(())
    }
}

#[async_trait]
impl PremiumGate for PremiumClient {
    async fn is_premium(&self, user_id: &str) -> bool {
        match self.check(user_id).await {
            Ok(exists) => {
                debug!("Premium status for {}: {}", user_id, exists);
                exists
            }
            Err(e) => {
                warn!("Premium check failed for {}, treating as free: {}", user_id, e);
                false
            }
        }
    }

    async fn register_premium(&self, user_id: &str) {
        match self.register(user_id).await {
            Ok(()) => info!("Registered premium user {}", user_id),
            Err(e) => warn!("Premium registration failed for {}: {}", user_id, e),
        }
    }
}
