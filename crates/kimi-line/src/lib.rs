//! kimi-line: LINE Gateway for the kimishiranai story bot
//!
//! LINE Messaging API の Webhook を受け取り、エピソード配信の返信を送ります。
//! Webhook サーバーと API クライアントを実装します。

pub mod api;
pub mod bot;
pub mod error;
pub mod handler;
pub mod types;
pub mod webhook;

#[cfg(test)]
mod testing;

pub use api::{LineApiClient, ReplySink};
pub use bot::LineBot;
pub use error::{LineError, Result};
pub use handler::EventHandler;
