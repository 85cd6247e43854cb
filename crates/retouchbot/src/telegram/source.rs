use async_trait::async_trait;
use std::path::Path;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::FileId;

use retouchcore::enhance::{LocalSource, SourceError, SourceRef, SourceResolver};

/// Downloads Telegram files through the Bot API; other sources are resolved locally.
pub struct TelegramSource {
    bot: Bot,
    local: LocalSource,
}

impl TelegramSource {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            local: LocalSource,
        }
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<(), SourceError> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| SourceError::Download(format!("getFile failed: {}", e)))?;
        log::info!("📥 Downloading {} ({} bytes)", file.path, file.size);

        let mut dst = tokio::fs::File::create(dest).await?;
        self.bot
            .download_file(&file.path, &mut dst)
            .await
            .map_err(|e| SourceError::Download(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SourceResolver for TelegramSource {
    async fn fetch(&self, source: &SourceRef, dest: &Path) -> Result<(), SourceError> {
        match source {
            SourceRef::Telegram { file_id } => self.download(file_id, dest).await,
            other => self.local.fetch(other, dest).await,
        }
    }
}
