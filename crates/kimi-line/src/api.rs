//! LINE Messaging API client
//!
//! Communicates with LINE Messaging API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{LineError, Result};
use crate::types::*;

/// LINE accepts at most this many messages per reply or push call
pub const MAX_MESSAGES_PER_REQUEST: usize = 5;

const DEFAULT_BASE_URL: &str = "https://api.line.me/v2";

/// Delivers reply bubbles for one inbound message
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// `to` is the conversation (group, room or user) the message came from
    async fn send_reply(&self, reply_token: &str, to: &str, texts: &[String]) -> Result<()>;
}

/// LINE Messaging API client
#[derive(Clone)]
pub struct LineApiClient {
    client: Client,
    channel_access_token: String,
    base_url: String,
}

impl LineApiClient {
    /// Create a new LINE API client
    pub fn new(channel_access_token: &str) -> Result<Self> {
        if channel_access_token.is_empty() {
            return Err(LineError::Config("Channel access token not configured".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(LineError::HttpError)?;

        Ok(Self {
            client,
            channel_access_token: channel_access_token.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at another API host (used against mock servers)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.channel_access_token)
            .json(body)
            .send()
            .await
            .map_err(LineError::HttpError)?;

        check_status(response).await
    }

    /// Reply to a message with up to five text bubbles
    pub async fn reply_messages(&self, reply_token: &str, texts: &[String]) -> Result<()> {
        if texts.len() > MAX_MESSAGES_PER_REQUEST {
            return Err(LineError::ApiError(format!(
                "reply carries {} messages, at most {} allowed",
                texts.len(),
                MAX_MESSAGES_PER_REQUEST
            )));
        }

        let body = ReplyMessage {
            reply_token: reply_token.to_string(),
            messages: texts.iter().map(MessageContent::text).collect(),
        };

        debug!("Replying with {} messages", texts.len());
        self.post("/bot/message/reply", &body).await
    }

    /// Push messages to a user, group or room, five per API call
    pub async fn push_messages(&self, to: &str, texts: &[String]) -> Result<()> {
        for (i, chunk) in texts.chunks(MAX_MESSAGES_PER_REQUEST).enumerate() {
            // Small delay between chunks
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }

            let body = PushMessage {
                to: to.to_string(),
                messages: chunk.iter().map(MessageContent::text).collect(),
            };

            debug!("Pushing {} messages to: {}", chunk.len(), to);
            self.post("/bot/message/push", &body).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl ReplySink for LineApiClient {
    /// First five bubbles go through the reply token, the rest are pushed.
    async fn send_reply(&self, reply_token: &str, to: &str, texts: &[String]) -> Result<()> {
        if texts.is_empty() {
            return Ok(());
        }

        let split = texts.len().min(MAX_MESSAGES_PER_REQUEST);
        let (first, rest) = texts.split_at(split);

        self.reply_messages(reply_token, first).await?;
        if !rest.is_empty() {
            self.push_messages(to, rest).await?;
        }

        Ok(())
    }
}

async fn check_status(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let error_text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<LineApiErrorBody>(&error_text)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(error_text);

    error!("LINE API request failed: {} - {}", status, message);
    Err(LineError::ApiError(format!("{}: {}", status, message)))
}
