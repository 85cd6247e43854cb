use bytes::Bytes;
use chrono::Utc;
use futures_util::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::{
    Failure, FailureKind, Notifier, ProcessedImage, ProcessingResult, SourceResolver, TempFiles, WorkItem, WorkQueue,
};
use crate::core::config;
use crate::core::error::AppResult;
use crate::core::metrics;
use crate::processing::DispatchTable;

/// Worker pool settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Per-item processing timeout
    pub timeout: Duration,
    /// Directory for per-item temp files
    pub temp_dir: PathBuf,
}

impl PoolConfig {
    pub fn from_env() -> Self {
        Self {
            workers: (*config::queue::WORKER_COUNT).max(1),
            timeout: config::queue::processing_timeout(),
            temp_dir: config::TEMP_FILES_DIR.clone(),
        }
    }
}

/// Where a worker is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for the queue
    Idle = 0,
    /// Holds an item, fetching its source
    Dequeued = 1,
    /// Inside the processor call
    Processing = 2,
    /// Delivering the result and cleaning up
    Reporting = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => WorkerState::Dequeued,
            2 => WorkerState::Processing,
            3 => WorkerState::Reporting,
            _ => WorkerState::Idle,
        }
    }
}

/// Snapshot of the queue and the pool, as shown by `/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub queued: usize,
    pub capacity: usize,
    pub workers: usize,
    pub busy: usize,
}

/// Read-only view of the pool for status reporting. Cheap to clone.
#[derive(Clone)]
pub struct PoolMonitor {
    slots: Arc<Vec<AtomicU8>>,
    queue: Arc<WorkQueue>,
}

impl PoolMonitor {
    /// Monitor for `workers` idle slots over `queue`
    pub fn new(queue: Arc<WorkQueue>, workers: usize) -> Self {
        Self {
            slots: Arc::new((0..workers).map(|_| AtomicU8::new(WorkerState::Idle as u8)).collect()),
            queue,
        }
    }

    pub fn states(&self) -> Vec<WorkerState> {
        self.slots
            .iter()
            .map(|slot| WorkerState::from_u8(slot.load(Ordering::Acquire)))
            .collect()
    }

    /// Workers that are not idle
    pub fn busy(&self) -> usize {
        self.states().into_iter().filter(|s| *s != WorkerState::Idle).count()
    }

    /// Workers currently inside a processor call
    pub fn processing(&self) -> usize {
        self.states()
            .into_iter()
            .filter(|s| *s == WorkerState::Processing)
            .count()
    }

    pub fn workers(&self) -> usize {
        self.slots.len()
    }

    pub async fn status(&self) -> PoolStatus {
        PoolStatus {
            queued: self.queue.len().await,
            capacity: self.queue.capacity(),
            workers: self.workers(),
            busy: self.busy(),
        }
    }

    fn set(&self, worker: usize, state: WorkerState) {
        if let Some(slot) = self.slots.get(worker) {
            slot.store(state as u8, Ordering::Release);
        }
        metrics::update_workers_busy(self.busy());
    }
}

struct WorkerContext {
    queue: Arc<WorkQueue>,
    table: Arc<DispatchTable>,
    source: Arc<dyn SourceResolver>,
    notifier: Arc<dyn Notifier>,
    config: PoolConfig,
    monitor: PoolMonitor,
}

/// N workers consuming one shared [`WorkQueue`].
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    monitor: PoolMonitor,
    queue: Arc<WorkQueue>,
}

impl WorkerPool {
    /// Creates the temp directory and starts `config.workers` worker tasks.
    pub async fn spawn(
        queue: Arc<WorkQueue>,
        table: Arc<DispatchTable>,
        source: Arc<dyn SourceResolver>,
        notifier: Arc<dyn Notifier>,
        config: PoolConfig,
    ) -> AppResult<Self> {
        tokio::fs::create_dir_all(&config.temp_dir).await?;

        let workers = config.workers.max(1);
        let monitor = PoolMonitor::new(Arc::clone(&queue), workers);
        log::info!(
            "Starting {} workers (timeout {}s, temp dir {})",
            workers,
            config.timeout.as_secs(),
            config.temp_dir.display()
        );

        let ctx = Arc::new(WorkerContext {
            queue: Arc::clone(&queue),
            table,
            source,
            notifier,
            config,
            monitor: monitor.clone(),
        });

        let handles = (0..workers)
            .map(|index| tokio::spawn(run_worker(index, Arc::clone(&ctx))))
            .collect();

        Ok(Self {
            handles,
            monitor,
            queue,
        })
    }

    pub fn monitor(&self) -> PoolMonitor {
        self.monitor.clone()
    }

    /// Closes the queue and waits for the workers to drain it.
    pub async fn shutdown(self) {
        self.queue.close().await;
        for handle in self.handles {
            if let Err(e) = handle.await {
                log::error!("Worker task ended abnormally: {}", e);
            }
        }
        log::info!("Worker pool stopped");
    }
}

async fn run_worker(index: usize, ctx: Arc<WorkerContext>) {
    log::debug!("Worker {} started", index);

    loop {
        ctx.monitor.set(index, WorkerState::Idle);
        let Some(item) = ctx.queue.dequeue().await else {
            break;
        };
        ctx.monitor.set(index, WorkerState::Dequeued);

        let waited = (Utc::now() - item.submitted_at).num_milliseconds().max(0) as f64 / 1000.0;
        metrics::observe_queue_wait(item.mode, waited);
        log::info!(
            "Worker {} picked item {} (mode {}, waited {:.1}s)",
            index,
            item.id,
            item.mode,
            waited
        );

        let temp = TempFiles::for_item(&ctx.config.temp_dir, item.id);
        let result = AssertUnwindSafe(process_item(&ctx, index, &item, &temp))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                log::error!("Worker {} panicked while processing item {}", index, item.id);
                ProcessingResult::Failure(Failure::new(FailureKind::Processor, "Internal processing error"))
            });

        ctx.monitor.set(index, WorkerState::Reporting);
        metrics::record_outcome(item.mode, result.outcome());
        match &result {
            ProcessingResult::Success(_) => log::info!("Item {} processed successfully", item.id),
            ProcessingResult::Failure(failure) => log::warn!("Item {} failed: {}", item.id, failure),
        }

        match AssertUnwindSafe(ctx.notifier.deliver(&item, &result)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Failed to report item {} to {}: {}", item.id, item.requester, e),
            Err(_) => log::error!("Notifier panicked while reporting item {}", item.id),
        }

        temp.release().await;
    }

    ctx.monitor.set(index, WorkerState::Idle);
    log::debug!("Worker {} stopped", index);
}

async fn process_item(ctx: &WorkerContext, index: usize, item: &WorkItem, temp: &TempFiles) -> ProcessingResult {
    if let Err(e) = ctx.source.fetch(&item.source, temp.input_path()).await {
        return ProcessingResult::Failure(Failure::new(FailureKind::Source, e.to_string()));
    }
    let input = match tokio::fs::read(temp.input_path()).await {
        Ok(data) => Bytes::from(data),
        Err(e) => {
            return ProcessingResult::Failure(Failure::new(
                FailureKind::Source,
                format!("Failed to read downloaded image: {}", e),
            ))
        }
    };

    ctx.monitor.set(index, WorkerState::Processing);
    let processor = ctx.table.get(item.mode);
    log::debug!("Worker {} running {} on {} bytes", index, processor.name(), input.len());

    let started = Instant::now();
    let outcome = tokio::time::timeout(ctx.config.timeout, processor.process(input)).await;
    metrics::observe_processing(item.mode, started.elapsed().as_secs_f64());

    let output = match outcome {
        Err(_) => {
            return ProcessingResult::Failure(Failure::new(
                FailureKind::Timeout,
                format!("Processing took longer than {}s", ctx.config.timeout.as_secs()),
            ))
        }
        Ok(Err(e)) => return ProcessingResult::Failure(Failure::new(FailureKind::Processor, e.to_string())),
        Ok(Ok(output)) => output,
    };

    if let Err(e) = tokio::fs::write(temp.output_path(), &output).await {
        return ProcessingResult::Failure(Failure::new(
            FailureKind::Processor,
            format!("Failed to store result: {}", e),
        ));
    }

    ProcessingResult::Success(ProcessedImage {
        bytes: output,
        path: temp.output_path().to_path_buf(),
    })
}
