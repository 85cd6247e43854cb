//! Work queue and worker pool that decouple intake from slow image processing.
//!
//! Control flow: [`Intake::submit`] validates the mode and appends a [`WorkItem`] to
//! the [`WorkQueue`]; a [`WorkerPool`] of N tasks dequeues items in FIFO order,
//! resolves the source, runs the processor for the item's mode under a timeout and
//! hands exactly one [`ProcessingResult`] to the [`Notifier`].

pub mod intake;
pub mod notify;
pub mod queue;
pub mod source;
pub mod temp;
pub mod worker;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::processing::Mode;

pub use intake::{Accepted, Intake};
pub use notify::{Notifier, NotifyError, RoutingNotifier, TicketBoard};
pub use queue::WorkQueue;
pub use source::{LocalSource, SourceError, SourceResolver};
pub use temp::TempFiles;
pub use worker::{PoolConfig, PoolMonitor, PoolStatus, WorkerPool, WorkerState};

/// Where the input image of a work item comes from
#[derive(Debug, Clone)]
pub enum SourceRef {
    /// A file stored on Telegram servers, fetched through the Bot API
    Telegram { file_id: String },
    /// Bytes already in memory (HTTP uploads)
    Inline(Bytes),
    /// A file on the local filesystem (CLI)
    Path(PathBuf),
}

impl SourceRef {
    /// Short description for logs; never includes payload bytes.
    pub fn describe(&self) -> String {
        match self {
            SourceRef::Telegram { file_id } => format!("telegram:{}", file_id),
            SourceRef::Inline(bytes) => format!("inline:{}B", bytes.len()),
            SourceRef::Path(path) => format!("path:{}", path.display()),
        }
    }
}

/// Who receives the result of a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requester {
    /// A Telegram chat
    Chat { chat_id: i64 },
    /// A caller waiting on a ticket (HTTP API, CLI)
    Ticket(Uuid),
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requester::Chat { chat_id } => write!(f, "chat {}", chat_id),
            Requester::Ticket(id) => write!(f, "ticket {}", id),
        }
    }
}

/// One unit of requested image processing. Immutable once created.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: Uuid,
    pub source: SourceRef,
    pub mode: Mode,
    pub requester: Requester,
    pub submitted_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(source: SourceRef, mode: Mode, requester: Requester) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            mode,
            requester,
            submitted_at: Utc::now(),
        }
    }
}

/// Reasons intake refuses a submission. The item is never enqueued.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Unknown mode '{0}'")]
    UnknownMode(String),

    #[error("Queue is full ({capacity} items)")]
    QueueFull { capacity: usize },

    #[error("Queue is closed")]
    Closed,
}

impl SubmitError {
    /// Metric label for the rejection reason
    pub fn reason(&self) -> &'static str {
        match self {
            SubmitError::UnknownMode(_) => "unknown_mode",
            SubmitError::QueueFull { .. } => "queue_full",
            SubmitError::Closed => "closed",
        }
    }
}

/// Output of a successfully processed item.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Bytes,
    /// Output temp file; only exists until the notifier returns
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The processor exceeded the per-item timeout
    Timeout,
    /// The processor returned an error (or panicked)
    Processor,
    /// The input could not be fetched
    Source,
}

impl FailureKind {
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Processor => "processor",
            FailureKind::Source => "source",
        }
    }
}

/// A failed item: what went wrong, in words a user can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

/// Terminal outcome of one work item, delivered exactly once.
#[derive(Debug, Clone)]
pub enum ProcessingResult {
    Success(ProcessedImage),
    Failure(Failure),
}

impl ProcessingResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingResult::Success(_))
    }

    /// Metric label for the outcome
    pub fn outcome(&self) -> &'static str {
        match self {
            ProcessingResult::Success(_) => "success",
            ProcessingResult::Failure(failure) => failure.kind.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_items_get_distinct_ids() {
        let a = WorkItem::new(SourceRef::Inline(Bytes::new()), Mode::Upscale, Requester::Chat { chat_id: 1 });
        let b = WorkItem::new(SourceRef::Inline(Bytes::new()), Mode::Upscale, Requester::Chat { chat_id: 1 });
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_source_describe_hides_payload() {
        let inline = SourceRef::Inline(Bytes::from_static(b"secret"));
        assert_eq!(inline.describe(), "inline:6B");
        let tg = SourceRef::Telegram {
            file_id: "AgAC".to_string(),
        };
        assert_eq!(tg.describe(), "telegram:AgAC");
    }

    #[test]
    fn test_outcome_labels() {
        let ok = ProcessingResult::Success(ProcessedImage {
            bytes: Bytes::new(),
            path: PathBuf::from("/tmp/x"),
        });
        assert!(ok.is_success());
        assert_eq!(ok.outcome(), "success");

        let timeout = ProcessingResult::Failure(Failure::new(FailureKind::Timeout, "took too long"));
        assert_eq!(timeout.outcome(), "timeout");
        assert!(!timeout.is_success());
    }

    #[test]
    fn test_submit_error_reasons() {
        assert_eq!(SubmitError::UnknownMode("x".into()).reason(), "unknown_mode");
        assert_eq!(SubmitError::QueueFull { capacity: 1 }.reason(), "queue_full");
        assert_eq!(SubmitError::Closed.reason(), "closed");
        assert_eq!(SubmitError::QueueFull { capacity: 5 }.to_string(), "Queue is full (5 items)");
    }
}
