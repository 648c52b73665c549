//! Fan-out of order updates to live SSE subscribers.
//!
//! Subscribers live in a registry keyed by a generated handle id. Each one
//! owns a bounded channel; a publish that finds the channel full or closed
//! drops that subscriber and keeps delivering to the rest.

use dashmap::DashMap;
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};

use super::OrderEvent;
use crate::errors::ServiceError;
use crate::models::Order;

/// Outcome of a single publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

struct HubInner {
    subscribers: DashMap<u64, mpsc::Sender<OrderEvent>>,
    next_id: AtomicU64,
    buffer: usize,
    closed: AtomicBool,
}

#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl std::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("subscribers", &self.inner.subscribers.len())
            .field("buffer", &self.inner.buffer)
            .finish()
    }
}

impl BroadcastHub {
    /// `buffer` is the per-subscriber queue depth; zero is raised to one.
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                buffer: buffer.max(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Registers a subscriber whose first queued event is `CONNECTED`.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        // Fresh channel with capacity >= 1, so this cannot fail.
        let _ = tx.try_send(OrderEvent::connected());

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.insert(id, tx);
        if self.inner.closed.load(Ordering::SeqCst) {
            // Raced with close(); the stream ends after CONNECTED.
            self.inner.subscribers.remove(&id);
        } else {
            debug!(subscriber = id, "subscriber registered");
        }

        Subscription {
            id,
            receiver: rx,
            hub: self.clone(),
        }
    }

    /// Removes a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: u64) {
        if self.inner.subscribers.remove(&id).is_some() {
            debug!(subscriber = id, "subscriber removed");
        }
    }

    /// Ends every open subscription once its queued events are drained.
    /// Later subscribers only receive `CONNECTED`.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        let open = self.inner.subscribers.len();
        self.inner.subscribers.clear();
        info!(subscribers = open, "broadcast hub closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Queues an `ORDER_UPDATE` for every subscriber registered right now.
    pub fn publish(&self, order: &Order) -> PublishReport {
        let event = OrderEvent::order_update(order.clone());
        let mut report = PublishReport::default();
        let mut failed = Vec::new();

        for entry in self.inner.subscribers.iter() {
            let reason = match entry.value().try_send(event.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    continue;
                }
                Err(TrySendError::Full(_)) => "buffer full",
                Err(TrySendError::Closed(_)) => "stream closed",
            };
            let err =
                ServiceError::BroadcastError(format!("subscriber {}: {}", entry.key(), reason));
            debug!(error = %err, "dropping subscriber");
            failed.push(*entry.key());
        }

        // Removal happens after iteration; DashMap shards are still read-locked inside the loop.
        for id in failed {
            self.inner.subscribers.remove(&id);
            report.dropped += 1;
        }

        info!(
            purchase_id = %order.purchase_id,
            delivered = report.delivered,
            dropped = report.dropped,
            "order update broadcast"
        );
        report
    }
}

/// A live subscription. Dropping it deregisters the subscriber.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<OrderEvent>,
    hub: BroadcastHub,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn recv(&mut self) -> Option<OrderEvent> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = OrderEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
