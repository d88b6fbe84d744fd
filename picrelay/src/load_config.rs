//! `load_config` module: assembles the application configuration from the
//! environment (with `.env` honored for local development).
//!
//! This is the only place untrusted environment input is read and mapped
//! to the typed [`AppConfig`]; any failure here must produce a clear
//! diagnostic, since it aborts startup.

use anyhow::{Context, Result};
use tracing::info;

/// Everything the service needs at startup. The user token carries the
/// elevated scope required for upload/share; the bot token covers
/// downloads and replies.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub signing_secret: String,
    pub bot_token: String,
    pub user_token: String,
    pub port: u16,
}

const DEFAULT_PORT: u16 = 3000;

pub fn load_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let signing_secret = std::env::var("SLACK_SIGNING_SECRET")
        .context("SLACK_SIGNING_SECRET missing in environment")?;
    let bot_token =
        std::env::var("SLACK_BOT_TOKEN").context("SLACK_BOT_TOKEN missing in environment")?;
    let user_token =
        std::env::var("SLACK_USER_TOKEN").context("SLACK_USER_TOKEN missing in environment")?;
    let port = match std::env::var("PORT") {
        Ok(raw) => raw
            .parse::<u16>()
            .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
        Err(_) => DEFAULT_PORT,
    };

    info!(
        port,
        bot_token_set = !bot_token.is_empty(),
        user_token_set = !user_token.is_empty(),
        "configuration loaded from environment"
    );

    Ok(AppConfig {
        signing_secret,
        bot_token,
        user_token,
        port,
    })
}
