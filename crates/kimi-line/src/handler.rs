//! LINE event handler implementation

use std::sync::Arc;

use tracing::{debug, warn};

use kimi_core::MessageRouter;

use crate::api::ReplySink;
use crate::error::Result;
use crate::types::LineEvent;

/// Routes LINE text messages and delivers the replies
pub struct EventHandler {
    router: MessageRouter,
    sink: Arc<dyn ReplySink>,
}

impl EventHandler {
    /// Create a new event handler
    pub fn new(router: MessageRouter, sink: Arc<dyn ReplySink>) -> Self {
        Self { router, sink }
    }

    /// Process an incoming event
    pub async fn process_event(&self, event: &LineEvent) -> Result<()> {
        // Only text messages are answered
        let Some(text) = event.text() else {
            debug!("Ignoring {} event", event.event_type);
            return Ok(());
        };

        let Some(user_id) = event.user_id() else {
            debug!("Ignoring message without a user id");
            return Ok(());
        };

        let Some(reply_token) = event.reply_token.as_deref() else {
            warn!("Message from {} has no reply token", user_id);
            return Ok(());
        };

        // Overflow bubbles follow the reply into the same group or room
        let to = event.push_target().unwrap_or(user_id);

        debug!("Message from {} in {}: {}", user_id, to, text);

        let replies = self.router.route(user_id, text).await;
        self.sink.send_reply(reply_token, to, &replies).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LineApiClient;
    use crate::testing::{FakeGate, FakeSink, router, text_event};
    use crate::types::{LineEvent, LineSource};
    use kimi_core::{EpisodeStore, MessageRouter, RouterSettings};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn group_event(text: &str) -> LineEvent {
        let mut event = text_event("U1", text);
        event.reply_token = Some("rt".to_string());
        event.source = Some(LineSource {
            source_type: "group".to_string(),
            user_id: Some("U1".to_string()),
            group_id: Some("G1".to_string()),
            room_id: None,
        });
        event
    }

    fn handler(gate: FakeGate) -> (EventHandler, Arc<FakeSink>) {
        let sink = Arc::new(FakeSink::default());
        (EventHandler::new(router(gate), sink.clone()), sink)
    }

    #[tokio::test]
    async fn test_text_message_is_routed_and_replied() {
        let (handler, sink) = handler(FakeGate::default());

        handler.process_event(&text_event("U1", "2")).await.unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "reply-U1");
        assert_eq!(sent[0].1, "U1");
        assert_eq!(sent[0].2, vec!["第2話「T2」", "ep2-a", "ep2-b"]);
    }

    #[tokio::test]
    async fn test_gated_episode_not_leaked() {
        let (handler, sink) = handler(FakeGate::default());

        handler.process_event(&text_event("U1", "4")).await.unwrap();

        let sent = sink.sent();
        assert_eq!(sent[0].2, vec!["🔒 第4話以降はプレミアム限定です。"]);
    }

    #[tokio::test]
    async fn test_unlock_through_handler() {
        let gate = FakeGate::default();
        let registrations = gate.registrations.clone();
        let (handler, sink) = handler(gate);

        handler
            .process_event(&text_event("U7", "kimishiranai_unlock"))
            .await
            .unwrap();

        assert_eq!(*registrations.lock().unwrap(), vec!["U7"]);
        assert_eq!(
            sink.sent()[0].2,
            vec!["✅ プレミアム解放完了！第4話以降が読めるようになりました。"]
        );
    }

    #[tokio::test]
    async fn test_ignores_non_text_and_anonymous_events() {
        let (handler, sink) = handler(FakeGate::default());

        let follow: LineEvent = serde_json::from_value(serde_json::json!({
            "type": "follow",
            "replyToken": "r",
            "timestamp": 1,
            "source": {"type": "user", "userId": "U1"}
        }))
        .unwrap();
        handler.process_event(&follow).await.unwrap();

        let mut anonymous = text_event("U1", "1");
        anonymous.source = None;
        handler.process_event(&anonymous).await.unwrap();

        let mut no_token = text_event("U1", "1");
        no_token.reply_token = None;
        handler.process_event(&no_token).await.unwrap();

        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_group_message_replies_to_group() {
        let (handler, sink) = handler(FakeGate::default());

        handler.process_event(&group_event("1")).await.unwrap();

        let sent = sink.sent();
        assert_eq!(sent[0].0, "rt");
        assert_eq!(sent[0].1, "G1");
    }

    #[tokio::test]
    async fn test_long_episode_in_group_stays_in_group() {
        let lines: Vec<_> = (0..8).map(|i| json!({"text": format!("l{}", i)})).collect();
        let catalogue = json!({"episodes": [{"episode": 1, "title": "Long", "lines": lines}]});
        let store = EpisodeStore::from_json(&catalogue.to_string()).unwrap();
        let router = MessageRouter::new(
            Arc::new(store),
            Arc::new(FakeGate::default()),
            RouterSettings::default(),
        );

        let bubble = |text: &str| json!({"type": "text", "text": text});
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot/message/reply"))
            .and(body_json(json!({
                "replyToken": "rt",
                "messages": [
                    bubble("第1話「Long」"),
                    bubble("l0"),
                    bubble("l1"),
                    bubble("l2"),
                    bubble("l3")
                ]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot/message/push"))
            .and(body_json(json!({
                "to": "G1",
                "messages": [bubble("l4"), bubble("l5"), bubble("l6"), bubble("l7")]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let api = LineApiClient::new("test-token").unwrap().with_base_url(&server.uri());
        let handler = EventHandler::new(router, Arc::new(api));

        handler.process_event(&group_event("1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_sink_error_is_returned() {
        let sink = Arc::new(FakeSink::failing());
        let handler = EventHandler::new(router(FakeGate::default()), sink);

        assert!(handler.process_event(&text_event("U1", "1")).await.is_err());
    }
}
