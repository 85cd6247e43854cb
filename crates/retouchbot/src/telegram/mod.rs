//! Telegram bot integration

pub mod bot;
pub mod handlers;
pub mod messages;
pub mod notifier;
pub mod source;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError, ModePreferences};
pub use notifier::TelegramNotifier;
pub use source::TelegramSource;
pub use teloxide::Bot;
