//! kimi-core: episode catalogue, premium gating and message routing
//!
//! LINE に依存しないドメイン層です。エピソードの読み込み、プレミアム判定、
//! 受信テキストから返信内容を決めるルーティングを提供します。

pub mod config;
pub mod episode;
pub mod error;
pub mod premium;
pub mod router;

pub use config::{BotConfig, ContentConfig, LineConfig, PremiumConfig};
pub use episode::{Episode, EpisodeStore, Line};
pub use error::{Error, Result};
pub use premium::{PremiumClient, PremiumGate};
pub use router::{Intent, MessageRouter, RouterSettings};
