//! Test doubles shared by the handler and webhook tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kimi_core::{EpisodeStore, MessageRouter, PremiumGate, RouterSettings};

use crate::api::ReplySink;
use crate::error::{LineError, Result};
use crate::types::{LineEvent, LineMessage, LineSource};

/// (reply token, push target, bubbles)
pub type SentReply = (String, String, Vec<String>);

#[derive(Default)]
pub struct FakeGate {
    pub premium: bool,
    pub registrations: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PremiumGate for FakeGate {
    async fn is_premium(&self, _user_id: &str) -> bool {
        self.premium
    }

    async fn register_premium(&self, user_id: &str) {
        self.registrations.lock().unwrap().push(user_id.to_string());
    }
}

#[derive(Default)]
pub struct FakeSink {
    fail: bool,
    sent: Mutex<Vec<SentReply>>,
}

impl FakeSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentReply> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for FakeSink {
    async fn send_reply(&self, reply_token: &str, to: &str, texts: &[String]) -> Result<()> {
        if self.fail {
            return Err(LineError::ApiError("500: unavailable".to_string()));
        }
        self.sent.lock().unwrap().push((
            reply_token.to_string(),
            to.to_string(),
            texts.to_vec(),
        ));
        Ok(())
    }
}

/// Episodes 1..=15 titled `T{n}`, each with lines `ep{n}-a` and `ep{n}-b`
pub fn store() -> EpisodeStore {
    let episodes: Vec<serde_json::Value> = (1..=15)
        .map(|n| {
            serde_json::json!({
                "episode": n,
                "title": format!("T{}", n),
                "lines": [{"text": format!("ep{}-a", n)}, {"text": format!("ep{}-b", n)}]
            })
        })
        .collect();
    EpisodeStore::from_json(&serde_json::json!({ "episodes": episodes }).to_string()).unwrap()
}

pub fn router(gate: FakeGate) -> MessageRouter {
    MessageRouter::new(Arc::new(store()), Arc::new(gate), RouterSettings::default())
}

/// Text message event from `user_id` with reply token `reply-{user_id}`
pub fn text_event(user_id: &str, text: &str) -> LineEvent {
    LineEvent {
        event_type: "message".to_string(),
        reply_token: Some(format!("reply-{}", user_id)),
        timestamp: 1_700_000_000_000,
        source: Some(LineSource {
            source_type: "user".to_string(),
            user_id: Some(user_id.to_string()),
            group_id: None,
            room_id: None,
        }),
        message: Some(LineMessage {
            message_type: "text".to_string(),
            id: Some("1".to_string()),
            text: Some(text.to_string()),
        }),
    }
}
