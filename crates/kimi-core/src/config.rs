//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. kimishiranai.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{Error, Result};

/// Default config file looked up in the working directory
pub const CONFIG_FILE: &str = "kimishiranai.toml";

/// LINE channel configuration
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Channel access token used for the reply/push APIs
    pub channel_access_token: String,
    /// Channel secret used to verify webhook signatures
    pub channel_secret: String,
    /// Webhook server port
    pub port: u16,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: String::new(),
            channel_secret: String::new(),
            port: default_port(),
        }
    }
}

/// Premium-status service configuration
#[derive(Debug, Clone)]
pub struct PremiumConfig {
    /// Endpoint queried with `GET ?user_id=` and registered with `POST`
    pub endpoint: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl PremiumConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PremiumConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Story content and gating configuration
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Path to the episode JSON file
    pub episodes_path: String,
    /// Highest episode number readable without premium
    pub free_limit: u32,
    /// Literal message that registers the sender as premium
    pub unlock_code: String,
    /// Link appended to the lock message, if any
    pub purchase_url: Option<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            episodes_path: default_episodes_path(),
            free_limit: default_free_limit(),
            unlock_code: default_unlock_code(),
            purchase_url: None,
        }
    }
}

/// Main configuration for the bot
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    pub line: LineConfig,
    pub premium: PremiumConfig,
    pub content: ContentConfig,
}

fn default_port() -> u16 {
    8000
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_episodes_path() -> String {
    "kimishiranai_episodes_1to15.json".to_string()
}

fn default_free_limit() -> u32 {
    3
}

fn default_unlock_code() -> String {
    "kimishiranai_unlock".to_string()
}

impl BotConfig {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// 文字列値の中だけを展開する (キーやコメントはそのまま)
    fn expand_toml_value(value: &mut toml::Value) {
        match value {
            toml::Value::String(s) => *s = Self::expand_env_vars(s),
            toml::Value::Array(items) => items.iter_mut().for_each(Self::expand_toml_value),
            toml::Value::Table(table) => {
                for (_, v) in table.iter_mut() {
                    Self::expand_toml_value(v);
                }
            }
            _ => {}
        }
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換され、
    /// その後、環境変数による上書きが適用されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml_content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./kimishiranai.toml` があればそれを使い、なければ環境変数のみ。
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }
        Ok(Self::from_env())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg
    }

    /// Parse a TOML document, expanding `${VAR}` in its string values
    fn from_toml_str(content: &str) -> Result<Self> {
        let mut document: toml::Value = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Self::expand_toml_value(&mut document);

        let toml: TomlConfig = document
            .try_into()
            .map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;

        let line = toml.line.unwrap_or_default();
        let premium = toml.premium.unwrap_or_default();
        let content = toml.content.unwrap_or_default();

        Ok(Self {
            line: LineConfig {
                channel_access_token: line.channel_access_token.unwrap_or_default(),
                channel_secret: line.channel_secret.unwrap_or_default(),
                port: line.port.unwrap_or_else(default_port),
            },
            premium: PremiumConfig {
                endpoint: premium.endpoint.unwrap_or_default(),
                timeout_secs: premium.timeout_secs.unwrap_or_else(default_timeout_secs),
            },
            content: ContentConfig {
                episodes_path: content.episodes_path.unwrap_or_else(default_episodes_path),
                free_limit: content.free_limit.unwrap_or_else(default_free_limit),
                unlock_code: content.unlock_code.unwrap_or_else(default_unlock_code),
                purchase_url: content.purchase_url.filter(|s| !s.is_empty()),
            },
        })
    }

    /// 環境変数で設定を上書きする
    ///
    /// 空文字列の値は未設定として扱います。
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("CHANNEL_ACCESS_TOKEN") {
            self.line.channel_access_token = token;
        }
        if let Some(secret) = get("CHANNEL_SECRET") {
            self.line.channel_secret = secret;
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
            self.line.port = port;
        }

        if let Some(endpoint) = get("GAS_URL").or_else(|| get("PREMIUM_ENDPOINT")) {
            self.premium.endpoint = endpoint;
        }
        if let Some(secs) = get("PREMIUM_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.premium.timeout_secs = secs;
        }

        if let Some(path) = get("EPISODES_PATH") {
            self.content.episodes_path = path;
        }
        if let Some(limit) = get("FREE_LIMIT").and_then(|l| l.parse().ok()) {
            self.content.free_limit = limit;
        }
        if let Some(code) = get("UNLOCK_CODE") {
            self.content.unlock_code = code;
        }
        if let Some(url) = get("PURCHASE_URL") {
            self.content.purchase_url = Some(url);
        }
    }

    /// Reject configurations the bot cannot serve with
    pub fn validate(&self) -> Result<()> {
        if self.line.channel_access_token.is_empty() {
            return Err(Error::Config("CHANNEL_ACCESS_TOKEN not set".to_string()));
        }
        if self.line.channel_secret.is_empty() {
            return Err(Error::Config("CHANNEL_SECRET not set".to_string()));
        }
        if self.premium.endpoint.is_empty() {
            return Err(Error::Config("GAS_URL not set".to_string()));
        }
        if self.premium.timeout_secs == 0 {
            return Err(Error::Config("PREMIUM_TIMEOUT_SECS must be positive".to_string()));
        }
        if self.content.unlock_code.trim().is_empty() {
            return Err(Error::Config("UNLOCK_CODE must not be blank".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// TOML 構造体定義（ファイル解析用）
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    line: Option<TomlLineConfig>,
    premium: Option<TomlPremiumConfig>,
    content: Option<TomlContentConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLineConfig {
    #[serde(default)]
    channel_access_token: Option<String>,
    #[serde(default)]
    channel_secret: Option<String>,
    #[serde(default)]
    port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlPremiumConfig {
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlContentConfig {
    #[serde(default)]
    episodes_path: Option<String>,
    #[serde(default)]
    free_limit: Option<u32>,
    #[serde(default)]
    unlock_code: Option<String>,
    #[serde(default)]
    purchase_url: Option<String>,
}
