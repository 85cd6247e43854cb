use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{ProcessingResult, Requester, WorkItem};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("No notifier handles {0}")]
    Unroutable(Requester),

    #[error("Requester {0} is no longer waiting")]
    Gone(Requester),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Delivers the terminal result of a work item to whoever submitted it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, item: &WorkItem, result: &ProcessingResult) -> Result<(), NotifyError>;
}

/// Hands results to callers that wait synchronously (HTTP API, CLI).
///
/// A caller takes a ticket, submits with [`Requester::Ticket`] and awaits the
/// receiver. Tickets are single use.
#[derive(Default)]
pub struct TicketBoard {
    waiting: DashMap<Uuid, oneshot::Sender<ProcessingResult>>,
}

impl TicketBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> (Uuid, oneshot::Receiver<ProcessingResult>) {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.waiting.insert(id, tx);
        (id, rx)
    }

    /// Drops a ticket whose item was never accepted.
    pub fn cancel(&self, id: Uuid) {
        self.waiting.remove(&id);
    }

    pub fn pending(&self) -> usize {
        self.waiting.len()
    }
}

#[async_trait]
impl Notifier for TicketBoard {
    async fn deliver(&self, item: &WorkItem, result: &ProcessingResult) -> Result<(), NotifyError> {
        let Requester::Ticket(ticket) = item.requester else {
            return Err(NotifyError::Unroutable(item.requester));
        };
        let (_, tx) = self
            .waiting
            .remove(&ticket)
            .ok_or(NotifyError::Gone(item.requester))?;
        tx.send(result.clone()).map_err(|_| NotifyError::Gone(item.requester))
    }
}

/// Sends chat results to the chat notifier and ticket results to the ticket board.
pub struct RoutingNotifier {
    chats: Option<Arc<dyn Notifier>>,
    tickets: Arc<TicketBoard>,
}

impl RoutingNotifier {
    pub fn new(chats: Option<Arc<dyn Notifier>>, tickets: Arc<TicketBoard>) -> Self {
        Self { chats, tickets }
    }
}

#[async_trait]
impl Notifier for RoutingNotifier {
    async fn deliver(&self, item: &WorkItem, result: &ProcessingResult) -> Result<(), NotifyError> {
        match item.requester {
            Requester::Ticket(_) => self.tickets.deliver(item, result).await,
            Requester::Chat { .. } => match &self.chats {
                Some(chats) => chats.deliver(item, result).await,
                None => Err(NotifyError::Unroutable(item.requester)),
            },
        }
    }
}
