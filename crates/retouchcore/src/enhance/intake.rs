use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{Requester, SourceRef, SubmitError, WorkItem, WorkQueue};
use crate::core::metrics;
use crate::processing::Mode;

/// Acknowledgement for an accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub id: Uuid,
    /// 1-based position in the queue at submission time
    pub position: usize,
    pub mode: Mode,
}

/// Front door of the work queue. Validates the mode and enqueues without waiting
/// for processing; results reach the requester through the notifier.
#[derive(Clone)]
pub struct Intake {
    queue: Arc<WorkQueue>,
}

impl Intake {
    pub fn new(queue: Arc<WorkQueue>) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Submits an image for processing in the mode named `mode`.
    pub async fn submit(
        &self,
        source: SourceRef,
        mode: &str,
        requester: Requester,
    ) -> Result<Accepted, SubmitError> {
        let result = match Mode::parse(mode) {
            Some(mode) => self.submit_mode(source, mode, requester).await,
            None => {
                log::warn!("Rejected submission from {}: unknown mode '{}'", requester, mode);
                Err(SubmitError::UnknownMode(mode.to_string()))
            }
        };

        if let Err(e) = &result {
            metrics::record_rejection(e.reason());
        }
        result
    }

    async fn submit_mode(&self, source: SourceRef, mode: Mode, requester: Requester) -> Result<Accepted, SubmitError> {
        let item = WorkItem::new(source, mode, requester);
        let id = item.id;
        let position = self.queue.enqueue(item).await?;
        Ok(Accepted { id, position, mode })
    }
}
