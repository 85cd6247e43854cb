use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use super::SourceRef;

/// Errors raised while fetching the input image of a work item
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("No resolver for source {0}")]
    Unsupported(String),
}

/// Resolves a [`SourceRef`] into a local file.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Writes the source image to `dest`, creating or truncating it.
    async fn fetch(&self, source: &SourceRef, dest: &Path) -> Result<(), SourceError>;
}

/// Resolves in-memory and filesystem sources. Telegram files need the bot.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSource;

#[async_trait]
impl SourceResolver for LocalSource {
    async fn fetch(&self, source: &SourceRef, dest: &Path) -> Result<(), SourceError> {
        match source {
            SourceRef::Inline(bytes) => tokio::fs::write(dest, bytes).await?,
            SourceRef::Path(path) => {
                tokio::fs::copy(path, dest).await?;
            }
            SourceRef::Telegram { .. } => return Err(SourceError::Unsupported(source.describe())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_inline_source_is_written() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("in");

        LocalSource
            .fetch(&SourceRef::Inline(Bytes::from_static(b"pixels")), &dest)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn test_path_source_is_copied() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("photo.png");
        std::fs::write(&src, b"png-data").unwrap();
        let dest = dir.path().join("in");

        LocalSource.fetch(&SourceRef::Path(src), &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"png-data");
    }

    #[tokio::test]
    async fn test_missing_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = LocalSource
            .fetch(&SourceRef::Path(dir.path().join("absent")), &dir.path().join("in"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[tokio::test]
    async fn test_telegram_source_is_unsupported_locally() {
        let dir = TempDir::new().unwrap();
        let source = SourceRef::Telegram {
            file_id: "AgAC".to_string(),
        };
        let err = LocalSource.fetch(&source, &dir.path().join("in")).await.unwrap_err();
        assert!(matches!(err, SourceError::Unsupported(s) if s == "telegram:AgAC"));
    }
}
