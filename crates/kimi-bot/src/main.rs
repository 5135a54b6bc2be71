//! kimi-bot: LINE story bot main binary
//!
//! Usage:
//!   kimi-bot             - Start the webhook server
//!   kimi-bot --check     - Validate configuration and the episode file, then exit
//!   kimi-bot --help      - Show help

use kimi_core::BotConfig;
use kimi_line::LineBot;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Serve LINE webhooks
    Serve,
    /// Load everything, report, exit
    Check,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1));

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("kimi-bot {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = BotConfig::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    // Startup fails here if the catalogue is missing or broken
    let bot = LineBot::new(config.clone())
        .map_err(|e| anyhow::anyhow!("Failed to start bot: {}", e))?;

    tracing::info!(
        "Catalogue ready: {} episodes (1-{}), free up to {}",
        bot.store().len(),
        bot.store().max_id(),
        config.content.free_limit
    );

    if mode == RunMode::Check {
        println!("Configuration OK");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down...");
            let _ = shutdown_tx.send(());
        }
    });

    bot.run(shutdown_rx).await?;

    tracing::info!("kimi-bot stopped");
    Ok(())
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> RunMode
where
    I: IntoIterator<Item = String>,
{
    for arg in args {
        match arg.as_str() {
            "--check" => return RunMode::Check,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Serve
}

/// Print help message
fn print_help() {
    println!("kimi-bot - LINE story delivery bot");
    println!();
    println!("Usage:");
    println!("  kimi-bot             Start the webhook server (POST /callback)");
    println!("  kimi-bot --check     Validate configuration and episode file");
    println!("  kimi-bot --help      Show this help message");
    println!("  kimi-bot --version   Show version");
    println!();
    println!("Environment Variables:");
    println!("  CHANNEL_ACCESS_TOKEN LINE channel access token (required)");
    println!("  CHANNEL_SECRET       LINE channel secret (required)");
    println!("  GAS_URL              Premium status endpoint (required)");
    println!("  PORT                 Webhook port (default: 8000)");
    println!("  EPISODES_PATH        Episode JSON file (default: kimishiranai_episodes_1to15.json)");
    println!("  FREE_LIMIT           Last free episode (default: 3)");
    println!("  UNLOCK_CODE          Premium unlock message (default: kimishiranai_unlock)");
    println!("  PURCHASE_URL         Link appended to the lock message");
    println!("  PREMIUM_TIMEOUT_SECS Premium service timeout (default: 5)");
    println!();
    println!("A kimishiranai.toml in the working directory is read first if present.");
}
