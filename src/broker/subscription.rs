//! Subscription handle
//!
//! A `Subscription` owns the receiving half of one subscriber's bounded
//! channel. It is the only reader of that channel, and dropping it removes the
//! subscription from the topic registry. Because removal is tied to `Drop`,
//! it runs exactly once whether the serving loop ends by client cancellation,
//! a transport error, expiry or broker shutdown.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

use crate::broker::engine::Shared;
use crate::broker::message::Message;
use crate::broker::topic::SubscriptionId;

#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    created_at: DateTime<Utc>,
    receiver: mpsc::Receiver<Message>,
    shared: Arc<Shared>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        topic: String,
        receiver: mpsc::Receiver<Message>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            id,
            topic,
            created_at: Utc::now(),
            receiver,
            shared,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Wait for the next message. Returns `None` once the broker has dropped
    /// this subscription's sender (shutdown) and the queue is drained.
    ///
    /// Cancel safe, so it can sit in a `tokio::select!` next to a
    /// termination signal.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Message, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Messages currently waiting in the channel.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let removed = self.shared.unregister(&self.topic, &self.id);
        debug!(subscription = %self.id, topic = %self.topic, removed, "subscription closed");
    }
}
