//! Image processing: the `Processor` capability and the mode dispatch table.
//!
//! Every mode is served by a `Processor`. Which family of processors is used (local
//! image filters, a remote HTTP API, passthrough) is decided once at startup by
//! [`Backend`], not by branching on mode names across the codebase.

pub mod analysis;
pub mod backend;
pub mod filters;
pub mod mode;
pub mod remote;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

pub use backend::{Backend, LocalProcessor, PassthroughProcessor};
pub use mode::Mode;
pub use remote::RemoteProcessor;

/// Errors raised by processors
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Output {width}x{height} exceeds the {limit}px side limit")]
    TooLarge { width: u32, height: u32, limit: u32 },

    #[error("API error: status {0}")]
    Api(reqwest::StatusCode),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Processing task failed: {0}")]
    Join(String),
}

pub type ProcessResult<T> = Result<T, ProcessError>;

/// Turns one image into another. Implementations may be slow (seconds).
#[async_trait]
pub trait Processor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn process(&self, input: Bytes) -> ProcessResult<Bytes>;
}

/// Static mapping from every `Mode` to the processor serving it.
///
/// The table is built once at startup and only read afterwards, so it is shared
/// behind an `Arc` without locking. Lookups are an exhaustive match and cannot fail.
#[derive(Clone)]
pub struct DispatchTable {
    upscale: Arc<dyn Processor>,
    face_restore: Arc<dyn Processor>,
    illustration: Arc<dyn Processor>,
    poster: Arc<dyn Processor>,
}

impl DispatchTable {
    pub fn new(
        upscale: Arc<dyn Processor>,
        face_restore: Arc<dyn Processor>,
        illustration: Arc<dyn Processor>,
        poster: Arc<dyn Processor>,
    ) -> Self {
        Self {
            upscale,
            face_restore,
            illustration,
            poster,
        }
    }

    /// Builds a table by asking `make` for the processor of each mode.
    pub fn build<F>(mut make: F) -> Self
    where
        F: FnMut(Mode) -> Arc<dyn Processor>,
    {
        Self::new(
            make(Mode::Upscale),
            make(Mode::FaceRestore),
            make(Mode::Illustration),
            make(Mode::Poster),
        )
    }

    /// Serves every mode with the same processor (passthrough backend, tests).
    pub fn uniform(processor: Arc<dyn Processor>) -> Self {
        Self::build(|_| Arc::clone(&processor))
    }

    pub fn get(&self, mode: Mode) -> &Arc<dyn Processor> {
        match mode {
            Mode::Upscale => &self.upscale,
            Mode::FaceRestore => &self.face_restore,
            Mode::Illustration => &self.illustration,
            Mode::Poster => &self.poster,
        }
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("upscale", &self.upscale.name())
            .field("face_restore", &self.face_restore.name())
            .field("illustration", &self.illustration.name())
            .field("poster", &self.poster.name())
            .finish()
    }
}
