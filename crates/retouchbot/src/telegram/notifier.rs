use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::requests::Requester as _;
use teloxide::types::InputFile;
use teloxide::RequestError;

use retouchcore::enhance::{Notifier, NotifyError, ProcessingResult, Requester, WorkItem};

use super::messages;

/// Sends results back to the chat that submitted the photo
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, item: &WorkItem, result: &ProcessingResult) -> Result<(), NotifyError> {
        let Requester::Chat { chat_id } = item.requester else {
            return Err(NotifyError::Unroutable(item.requester));
        };
        let chat_id = ChatId(chat_id);

        match result {
            ProcessingResult::Success(image) => {
                let caption = messages::success_caption(item.mode);
                let photo = InputFile::memory(image.bytes.to_vec()).file_name("result.jpg");
                match self.bot.send_photo(chat_id, photo).caption(caption.clone()).await {
                    Ok(_) => {}
                    // Telegram refuses photos that are too large in bytes or pixels;
                    // documents have no such limit. Other errors may come after the
                    // photo was delivered, so they are not retried.
                    Err(RequestError::Api(e)) => {
                        log::warn!("send_photo rejected for item {}: {}, retrying as document", item.id, e);
                        let document = InputFile::memory(image.bytes.to_vec()).file_name("result.jpg");
                        self.bot
                            .send_document(chat_id, document)
                            .caption(caption)
                            .await
                            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
                    }
                    Err(e) => return Err(NotifyError::Delivery(e.to_string())),
                }
            }
            ProcessingResult::Failure(failure) => {
                self.bot
                    .send_message(chat_id, messages::failure_text(failure))
                    .await
                    .map_err(|e| NotifyError::Delivery(e.to_string()))?;
            }
        }

        Ok(())
    }
}
