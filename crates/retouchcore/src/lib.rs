//! Retouch core - photo enhancement queue and processors
//!
//! Everything that does not talk to Telegram lives here: configuration, logging,
//! metrics, the bounded work queue with its worker pool, and the image processors
//! behind each mode.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging and metrics
//! - `enhance`: Intake, work queue, worker pool and result notification
//! - `processing`: Modes, the dispatch table and processor backends

pub mod core;
pub mod enhance;
pub mod processing;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use enhance::{
    Intake, PoolConfig, PoolMonitor, ProcessingResult, Requester, SourceRef, SubmitError, WorkItem, WorkQueue,
    WorkerPool,
};
pub use processing::{Backend, DispatchTable, Mode, Processor};
