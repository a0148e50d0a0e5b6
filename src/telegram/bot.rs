//! Bot initialization and Bot API housekeeping
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command menu publication
//! - Webhook registration

use reqwest::ClientBuilder;
use secrecy::{ExposeSecret, SecretString};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use url::Url;

use crate::core::config::{self, BotConfig};

/// Bot commands enum with descriptions, in menu order
///
/// Commands with arguments keep everything after the first space verbatim.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "List what the bot can do")]
    Help,
    #[command(description = "Show a counter")]
    Counter,
    #[command(description = "Play rock, paper, scissors")]
    RockPaperScissors,
    #[command(description = "Store a value (as text)")]
    DataSet(String),
    #[command(description = "Read a stored value")]
    DataGet(String),
    #[command(description = "Store a value in JSON format")]
    DataSetJson(String),
    #[command(description = "Read a stored value in JSON format")]
    DataGetJson(String),
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot (invalid URL, HTTP client setup)
pub fn create_bot(config: &BotConfig) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config.bot_token.expose_secret(), client);

    // Check if local Bot API server is configured
    let bot = if let Some(bot_api_url) = &config.bot_api_url {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        bot.set_api_url(url)
    } else {
        bot
    };

    Ok(bot)
}

/// Sets up the bot commands menu
///
/// # Returns
/// * `Ok(())` - Commands set successfully
/// * `Err(RequestError)` - Failed to set commands
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands = Command::bot_commands();
    log::info!("Publishing {} bot commands", commands.len());

    bot.set_my_commands(commands).await?;
    Ok(())
}

/// Username of the bot, asked from the Bot API once at startup
///
/// Commands suffixed with another bot's name are not ours to answer.
pub async fn fetch_bot_username(bot: &Bot) -> Result<String, teloxide::RequestError> {
    let me = bot.get_me().await?;
    let username = me.user.username.clone().unwrap_or_default();
    log::info!("Bot username: @{}, Bot ID: {}", username, me.user.id);
    Ok(username)
}

/// `url` with the server token appended as `?token=`
pub fn webhook_url(url: &str, server_token: Option<&SecretString>) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(url)?;
    if let Some(token) = server_token {
        url.query_pairs_mut().append_pair("token", token.expose_secret());
    }
    Ok(url)
}

/// Points Telegram at the webhook
pub async fn set_webhook(bot: &Bot, url: &str, server_token: Option<&SecretString>) -> anyhow::Result<()> {
    let url = webhook_url(url, server_token).map_err(|e| anyhow::anyhow!("Invalid webhook URL {}: {}", url, e))?;
    // The token is part of the URL, so only the bare address is logged
    log::info!("Setting webhook to {}{}", url.origin().ascii_serialization(), url.path());
    bot.set_webhook(url).await?;
    Ok(())
}

pub async fn delete_webhook(bot: &Bot) -> Result<(), teloxide::RequestError> {
    log::info!("Deleting webhook");
    bot.delete_webhook().await?;
    Ok(())
}
