//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command menu setup

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use retouchcore::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "приветствие и текущий режим")]
    Start,
    #[command(description = "список команд")]
    Help,
    #[command(description = "выбрать режим: upscale, face_restore, illustration, poster")]
    Mode(String),
    #[command(description = "сколько задач в очереди")]
    Status,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot (invalid URL, HTTP client error)
pub fn create_bot() -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::api::request_timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    // Check if local Bot API server is configured
    let bot = match config::BOT_API_URL.as_deref() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![
        BotCommand::new("start", "приветствие и текущий режим"),
        BotCommand::new("help", "список команд"),
        BotCommand::new("mode", "выбрать режим обработки"),
        BotCommand::new("status", "сколько задач в очереди"),
    ])
    .await?;

    Ok(())
}
