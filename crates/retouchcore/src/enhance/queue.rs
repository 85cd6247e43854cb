use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Notify};

use super::{Requester, SubmitError, WorkItem};
use crate::core::metrics;

/// Bounded FIFO of pending work items, shared by intake and the workers.
///
/// `enqueue` never waits for space: when the queue holds `capacity` items the new
/// item is refused. `dequeue` suspends the caller until an item arrives and returns
/// `None` once the queue is closed and drained.
pub struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
    capacity: usize,
    available: Notify,
    closed: AtomicBool,
}

impl WorkQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            available: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Appends an item to the tail.
    ///
    /// # Returns
    ///
    /// The 1-based position of the item in the queue.
    pub async fn enqueue(&self, item: WorkItem) -> Result<usize, SubmitError> {
        // `closed` only changes under the items lock, so a closed queue never gains items
        let mut items = self.items.lock().await;
        if self.is_closed() {
            return Err(SubmitError::Closed);
        }
        if items.len() >= self.capacity {
            log::warn!(
                "Queue is full ({} items), rejecting item {} from {}",
                items.len(),
                item.id,
                item.requester
            );
            return Err(SubmitError::QueueFull {
                capacity: self.capacity,
            });
        }

        log::info!(
            "Queueing item {} (mode {}, {}) from {}",
            item.id,
            item.mode,
            item.source.describe(),
            item.requester
        );
        items.push_back(item);
        let position = items.len();
        metrics::update_queue_depth(position);
        drop(items);

        self.available.notify_one();
        Ok(position)
    }

    /// Waits for the next item in FIFO order.
    pub async fn dequeue(&self) -> Option<WorkItem> {
        loop {
            // Register interest before checking, so an enqueue or close that lands
            // between the check and the await is not lost.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut items = self.items.lock().await;
                if let Some(item) = items.pop_front() {
                    metrics::update_queue_depth(items.len());
                    // Pass the wake-up along if more work is waiting
                    if !items.is_empty() {
                        self.available.notify_one();
                    }
                    return Some(item);
                }
                if self.is_closed() {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Number of items waiting (not counting items already claimed by workers).
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the 1-based position of the requester's first waiting item.
    pub async fn position_of(&self, requester: Requester) -> Option<usize> {
        let items = self.items.lock().await;
        items.iter().position(|item| item.requester == requester).map(|pos| pos + 1)
    }

    /// Stops accepting items. Waiting workers drain what is left, then `dequeue`
    /// returns `None`.
    pub async fn close(&self) {
        let items = self.items.lock().await;
        if !self.closed.swap(true, Ordering::AcqRel) {
            log::info!("Work queue closed with {} items left", items.len());
        }
        drop(items);
        self.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::SourceRef;
    use crate::processing::Mode;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn item(chat_id: i64) -> WorkItem {
        WorkItem::new(SourceRef::Inline(Bytes::new()), Mode::Poster, Requester::Chat { chat_id })
    }

    #[tokio::test]
    async fn test_dequeue_order_matches_enqueue_order() {
        let queue = WorkQueue::new(10);
        let items: Vec<WorkItem> = (0..5).map(item).collect();
        let ids: Vec<_> = items.iter().map(|i| i.id).collect();

        for (n, it) in items.into_iter().enumerate() {
            assert_eq!(queue.enqueue(it).await.unwrap(), n + 1);
        }

        let mut out = Vec::new();
        for _ in 0..5 {
            out.push(queue.dequeue().await.unwrap().id);
        }
        assert_eq!(out, ids);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_growing() {
        let queue = WorkQueue::new(2);
        queue.enqueue(item(1)).await.unwrap();
        queue.enqueue(item(2)).await.unwrap();

        let err = queue.enqueue(item(3)).await.unwrap_err();
        assert_eq!(err, SubmitError::QueueFull { capacity: 2 });
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn test_position_of_is_one_based() {
        let queue = WorkQueue::new(10);
        queue.enqueue(item(1)).await.unwrap();
        queue.enqueue(item(2)).await.unwrap();

        assert_eq!(queue.position_of(Requester::Chat { chat_id: 2 }).await, Some(2));
        assert_eq!(queue.position_of(Requester::Chat { chat_id: 9 }).await, None);
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_enqueue() {
        let queue = Arc::new(WorkQueue::new(10));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        let it = item(7);
        let id = it.id;
        queue.enqueue(it).await.unwrap();

        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.map(|i| i.id), Some(id));
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let queue = WorkQueue::new(10);
        queue.enqueue(item(1)).await.unwrap();
        queue.close().await;

        assert_eq!(queue.enqueue(item(2)).await.unwrap_err(), SubmitError::Closed);
        assert!(queue.dequeue().await.is_some());
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_close_wakes_idle_consumers() {
        let queue = Arc::new(WorkQueue::new(10));
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { queue.dequeue().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close().await;

        for consumer in consumers {
            let got = tokio::time::timeout(Duration::from_secs(1), consumer)
                .await
                .unwrap()
                .unwrap();
            assert!(got.is_none());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_close_racing_enqueue_never_strands_accepted_items() {
        for _ in 0..200 {
            let queue = Arc::new(WorkQueue::new(100));
            let producers: Vec<_> = (0..4)
                .map(|n| {
                    let queue = Arc::clone(&queue);
                    tokio::spawn(async move { queue.enqueue(item(n)).await.is_ok() })
                })
                .collect();
            let closer = {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { queue.close().await })
            };
            let consumer = {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let mut drained = 0;
                    while queue.dequeue().await.is_some() {
                        drained += 1;
                    }
                    drained
                })
            };

            let mut accepted = 0;
            for producer in producers {
                if producer.await.unwrap() {
                    accepted += 1;
                }
            }
            closer.await.unwrap();
            let drained = tokio::time::timeout(Duration::from_secs(1), consumer)
                .await
                .unwrap()
                .unwrap();

            assert_eq!(drained, accepted);
            assert_eq!(queue.len().await, 0);
        }
    }
}
