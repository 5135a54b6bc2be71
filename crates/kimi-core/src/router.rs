//! Message routing
//!
//! Inbound text is classified into an [`Intent`] first, then answered.
//! Classification is pure; only answering touches the premium service.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info};

use crate::config::ContentConfig;
use crate::episode::EpisodeStore;
use crate::premium::PremiumGate;

static EPISODE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}$").expect("episode number pattern"));

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// The unlock code, verbatim
    Unlock,
    /// A one or two digit episode number, kept as typed
    Episode(String),
    /// Anything else
    Invalid,
}

impl Intent {
    /// Classify a message. Surrounding whitespace is ignored; the unlock code wins
    /// over the number pattern, which must match the whole text.
    pub fn parse(text: &str, unlock_code: &str) -> Self {
        let text = text.trim();

        if text == unlock_code {
            return Self::Unlock;
        }

        if EPISODE_NUMBER.is_match(text) {
            return Self::Episode(text.to_string());
        }

        Self::Invalid
    }
}

/// Gating and reply settings
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub free_limit: u32,
    pub unlock_code: String,
    pub purchase_url: Option<String>,
}

impl From<&ContentConfig> for RouterSettings {
    fn from(config: &ContentConfig) -> Self {
        Self {
            free_limit: config.free_limit,
            unlock_code: config.unlock_code.clone(),
            purchase_url: config.purchase_url.clone(),
        }
    }
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self::from(&ContentConfig::default())
    }
}

/// Turns inbound text into the ordered list of reply bubbles
pub struct MessageRouter {
    store: Arc<EpisodeStore>,
    gate: Arc<dyn PremiumGate>,
    settings: RouterSettings,
}

impl MessageRouter {
    pub fn new(
        store: Arc<EpisodeStore>,
        gate: Arc<dyn PremiumGate>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            store,
            gate,
            settings,
        }
    }

    /// Answer one message from `user_id`
    pub async fn route(&self, user_id: &str, text: &str) -> Vec<String> {
        match Intent::parse(text, &self.settings.unlock_code) {
            Intent::Unlock => {
                info!("Unlock requested by {}", user_id);
                self.gate.register_premium(user_id).await;
                vec![self.unlock_message()]
            }
            Intent::Episode(id) => self.episode_reply(user_id, &id).await,
            Intent::Invalid => {
                debug!("Unrecognised message from {}", user_id);
                vec![usage_message()]
            }
        }
    }

    async fn episode_reply(&self, user_id: &str, id: &str) -> Vec<String> {
        let Some(episode) = self.store.lookup(id) else {
            debug!("Episode {} not found (requested by {})", id, user_id);
            return vec![self.not_found_message()];
        };

        if episode.id > self.settings.free_limit && !self.gate.is_premium(user_id).await {
            info!("Episode {} locked for {}", episode.id, user_id);
            return vec![self.locked_message()];
        }

        debug!("Serving episode {} to {}", episode.id, user_id);
        episode.to_messages()
    }

    fn first_gated(&self) -> u32 {
        self.settings.free_limit.saturating_add(1)
    }

    fn unlock_message(&self) -> String {
        format!(
            "✅ プレミアム解放完了！第{}話以降が読めるようになりました。",
            self.first_gated()
        )
    }

    fn not_found_message(&self) -> String {
        format!(
            "指定の話は存在しません。1〜{}の数字を送ってください。",
            self.store.max_id()
        )
    }

    fn locked_message(&self) -> String {
        let mut message = format!("🔒 第{}話以降はプレミアム限定です。", self.first_gated());
        if let Some(url) = &self.settings.purchase_url {
            message.push('\n');
            message.push_str(url);
        }
        message
    }
}

fn usage_message() -> String {
    "『3』のように話数を数字で送ってください。".to_string()
}
