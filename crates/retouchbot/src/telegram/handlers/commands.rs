//! Command and photo handlers

use teloxide::prelude::*;
use teloxide::requests::Requester as _;
use teloxide::types::Message;
use teloxide::utils::command::BotCommands;

use retouchcore::enhance::{Requester, SourceRef};
use retouchcore::Mode;

use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::messages;

pub async fn handle_start_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let current = deps.modes.get(msg.chat.id.0);
    bot.send_message(msg.chat.id, messages::start_text(current)).await?;
    Ok(())
}

pub async fn handle_help_command(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
    Ok(())
}

/// `/mode` shows the current mode, `/mode <name>` switches to it.
pub async fn handle_mode_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, arg: &str) -> Result<(), HandlerError> {
    let chat_id = msg.chat.id;
    if arg.trim().is_empty() {
        bot.send_message(chat_id, messages::current_mode_text(deps.modes.get(chat_id.0)))
            .await?;
        return Ok(());
    }

    let text = match Mode::parse(arg) {
        Some(mode) => {
            deps.modes.set(chat_id.0, mode);
            log::info!("Chat {} switched to mode {}", chat_id, mode);
            messages::mode_set_text(mode)
        }
        None => {
            log::info!("Chat {} asked for unknown mode '{}'", chat_id, arg.trim());
            messages::unknown_mode_text()
        }
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

pub async fn handle_status_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let status = deps.monitor.status().await;
    bot.send_message(msg.chat.id, messages::status_text(&status)).await?;
    Ok(())
}

/// Returns the file id of the image in a message: the largest photo size, or a
/// document with an image MIME type.
pub fn image_file_id(msg: &Message) -> Option<String> {
    if let Some(sizes) = msg.photo() {
        return sizes.last().map(|photo| photo.file.id.0.clone());
    }
    msg.document()
        .filter(|doc| {
            doc.mime_type
                .as_ref()
                .map(|mime| mime.essence_str().starts_with("image/"))
                .unwrap_or(false)
        })
        .map(|doc| doc.file.id.0.clone())
}

/// Queues the image of a message in the chat's current mode and acknowledges it.
pub async fn handle_image_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(file_id) = image_file_id(msg) else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    let mode = deps.modes.get(chat_id.0);

    let reply = match deps
        .intake
        .submit(
            SourceRef::Telegram { file_id },
            mode.as_ref(),
            Requester::Chat { chat_id: chat_id.0 },
        )
        .await
    {
        Ok(accepted) => messages::accepted_text(accepted.mode, accepted.position),
        Err(e) => {
            log::warn!("Could not queue image from chat {}: {}", chat_id, e);
            messages::rejected_text(&e)
        }
    };

    bot.send_message(chat_id, reply).await?;
    Ok(())
}
