use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::{filters, DispatchTable, Mode, ProcessError, ProcessResult, Processor, RemoteProcessor};
use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// Family of processors serving the modes, chosen once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// In-process image filters
    Local { upscale_factor: u32 },
    /// HTTP processing API, one path segment per mode
    Remote { endpoint: String },
    /// Returns the input unchanged (smoke tests, dry runs)
    Passthrough,
}

impl Backend {
    /// Reads PROCESSOR_BACKEND and the settings of the selected backend.
    pub fn from_config() -> AppResult<Self> {
        Self::from_name(
            config::processing::BACKEND.as_str(),
            *config::processing::UPSCALE_FACTOR,
            config::processing::API_ENDPOINT.as_str(),
        )
    }

    pub fn from_name(name: &str, upscale_factor: u32, endpoint: &str) -> AppResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "local" => Ok(Backend::Local { upscale_factor }),
            "remote" => Ok(Backend::Remote {
                endpoint: endpoint.to_string(),
            }),
            "passthrough" => Ok(Backend::Passthrough),
            other => Err(AppError::Config(format!(
                "Unknown PROCESSOR_BACKEND '{}', expected local, remote or passthrough",
                other
            ))),
        }
    }

    /// Builds the dispatch table serving every mode with this backend.
    pub fn dispatch_table(&self) -> AppResult<DispatchTable> {
        let table = match self {
            Backend::Local { upscale_factor } => {
                let slots = Arc::new(Semaphore::new((*config::queue::WORKER_COUNT).max(1)));
                DispatchTable::build(|mode| -> Arc<dyn Processor> {
                    Arc::new(LocalProcessor::new(mode, *upscale_factor, Arc::clone(&slots)))
                })
            }
            Backend::Remote { endpoint } => {
                let client = reqwest::Client::builder()
                    .timeout(config::api::request_timeout())
                    .build()?;
                DispatchTable::build(|mode| -> Arc<dyn Processor> {
                    Arc::new(RemoteProcessor::new(client.clone(), endpoint, mode))
                })
            }
            Backend::Passthrough => DispatchTable::uniform(Arc::new(PassthroughProcessor)),
        };
        log::info!("Dispatch table: {:?}", table);
        Ok(table)
    }
}

/// Runs the in-process filter for one mode on the blocking thread pool.
///
/// All local processors of a table share `slots`. A filter holds its slot until it
/// returns, even after the caller stopped waiting for it, so a timed-out filter still
/// counts against the limit while it finishes on the blocking pool.
pub struct LocalProcessor {
    mode: Mode,
    upscale_factor: u32,
    slots: Arc<Semaphore>,
    name: String,
}

impl LocalProcessor {
    pub fn new(mode: Mode, upscale_factor: u32, slots: Arc<Semaphore>) -> Self {
        Self {
            mode,
            upscale_factor,
            slots,
            name: format!("local:{}", mode),
        }
    }
}

#[async_trait]
impl Processor for LocalProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, input: Bytes) -> ProcessResult<Bytes> {
        let mode = self.mode;
        let factor = self.upscale_factor;
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|e| ProcessError::Join(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            filters::apply(mode, factor, &input)
        })
        .await
        .map_err(|e| ProcessError::Join(e.to_string()))?
    }
}

pub struct PassthroughProcessor;

#[async_trait]
impl Processor for PassthroughProcessor {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn process(&self, input: Bytes) -> ProcessResult<Bytes> {
        Ok(input)
    }
}
