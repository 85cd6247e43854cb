//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::commands::{
    handle_help_command, handle_image_message, handle_mode_command, handle_start_command, handle_status_command,
    image_file_id,
};
use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::Command;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// # Arguments
/// * `deps` - Handler dependencies (intake, pool monitor, mode preferences)
///
/// # Returns
/// The complete handler tree for the bot
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_images = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(image_handler(deps_images))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start => handle_start_command(&bot, &msg, &deps).await?,
                    Command::Help => handle_help_command(&bot, &msg).await?,
                    Command::Mode(arg) => handle_mode_command(&bot, &msg, &deps, &arg).await?,
                    Command::Status => handle_status_command(&bot, &msg, &deps).await?,
                }
                Ok(())
            }
        },
    ))
}

/// Photos and image documents
fn image_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| image_file_id(&msg).is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                log::info!("📥 Image received from chat {}", msg.chat.id);
                if let Err(e) = handle_image_message(&bot, &msg, &deps).await {
                    log::error!("Failed to handle image from chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}
