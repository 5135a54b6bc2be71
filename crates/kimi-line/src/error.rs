//! エラー型定義 (kimi-line)

use thiserror::Error;

/// kimi-line のエラー型
#[derive(Error, Debug)]
pub enum LineError {
    #[error("LINE API error: {0}")]
    ApiError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error(transparent)]
    Core(#[from] kimi_core::Error),
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, LineError>;
