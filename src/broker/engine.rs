//! Broker engine
//!
//! This module contains the in-memory broker implementation responsible for:
//! - validating publish and subscribe requests
//! - fanning each published message out to every live subscriber of its topic
//! - retaining recent messages per topic and backfilling new subscribers
//! - evicting expired retained messages with one tracked timer task per topic
//!
//! Concurrency and usage notes:
//! - `Broker` is a cheap `Clone` handle. The topic registry and the retention
//!   buffer sit behind one `std::sync::Mutex`; that lock is the broker's only
//!   coordination point and is never held across an `.await`.
//! - Fan-out is best effort and at most once. Each subscriber gets a
//!   non-blocking `try_send`; a full channel means that subscriber misses the
//!   message and the publish still succeeds. Offers are made while the state
//!   lock is held, which is what gives every subscriber of a topic the same
//!   relative order. `try_send` never waits, so the lock is only held for the
//!   time it takes to push onto each queue.
//! - Registration and backfill happen in one critical section, and so do the
//!   fan-out and retention append of a publish. A concurrent publish is
//!   therefore either delivered live or found in the backfill, never both and
//!   never neither.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Semaphore, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::broker::error::{BrokerError, Result};
use crate::broker::message::Message;
use crate::broker::retention::RetentionBuffer;
use crate::broker::subscription::Subscription;
use crate::broker::topic::{SubscriptionId, TopicRegistry};
use crate::config::BrokerSettings;

/// Retention parameters. Absent from `BrokerConfig` when retention is off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionConfig {
    pub window: Duration,
    pub max_messages: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Capacity of each subscriber's channel.
    pub subscriber_capacity: usize,
    pub retention: Option<RetentionConfig>,
}

impl BrokerConfig {
    pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 10;
    pub const DEFAULT_RETENTION_WINDOW: Duration = Duration::from_secs(10);
    pub const DEFAULT_RETENTION_MAX_MESSAGES: usize = 1000;
    /// Largest channel tokio can allocate permits for.
    pub const MAX_SUBSCRIBER_CAPACITY: usize = Semaphore::MAX_PERMITS;
    pub const MAX_RETENTION_WINDOW: Duration = RetentionBuffer::MAX_WINDOW;

    pub fn without_retention(mut self) -> Self {
        self.retention = None;
        self
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: Self::DEFAULT_SUBSCRIBER_CAPACITY,
            retention: Some(RetentionConfig {
                window: Self::DEFAULT_RETENTION_WINDOW,
                max_messages: Some(Self::DEFAULT_RETENTION_MAX_MESSAGES),
            }),
        }
    }
}

impl From<&BrokerSettings> for BrokerConfig {
    fn from(settings: &BrokerSettings) -> Self {
        let retention = settings.retention_window().map(|window| RetentionConfig {
            window: window.min(Self::MAX_RETENTION_WINDOW),
            max_messages: (settings.retention_max_messages > 0)
                .then_some(settings.retention_max_messages),
        });
        Self {
            subscriber_capacity: clamp_capacity(settings.subscriber_capacity),
            retention,
        }
    }
}

/// Outcome of a publish. Drops are reported here for logging and tests; they
/// never turn into an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    pub delivered: usize,
    pub dropped: usize,
    pub retained: bool,
}

#[derive(Debug)]
struct BrokerState {
    registry: TopicRegistry,
    retention: Option<RetentionBuffer>,
    /// Topics with a live eviction timer.
    expiry_timers: HashSet<String>,
    closed: bool,
}

#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<BrokerState>,
    subscriber_capacity: usize,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        // Nothing in the critical sections can leave the maps half-updated,
        // so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn unregister(&self, topic: &str, id: &SubscriptionId) -> bool {
        self.lock().registry.unregister(topic, id)
    }

    /// Evict the topic's expired entries and return when the next one
    /// expires. `None` disarms the topic's timer.
    fn evict_expired(&self, topic: &str) -> Option<Instant> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let next = state.retention.as_mut().and_then(|retention| {
            let evicted = retention.evict_expired(topic, Instant::now());
            trace!(topic, evicted, "retention expiry ran");
            retention.next_expiry(topic)
        });
        if next.is_none() {
            state.expiry_timers.remove(topic);
        }
        next
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        // Pending expiry timers only hold a `Weak`; stop them early.
        self.shutdown.cancel();
    }
}

#[derive(Debug, Clone)]
pub struct Broker {
    shared: Arc<Shared>,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    pub fn with_config(config: BrokerConfig) -> Self {
        let retention = config
            .retention
            .as_ref()
            .filter(|r| !r.window.is_zero())
            .map(|r| RetentionBuffer::new(r.window, r.max_messages));

        let subscriber_capacity = clamp_capacity(config.subscriber_capacity);
        if subscriber_capacity != config.subscriber_capacity {
            warn!(
                requested = config.subscriber_capacity,
                used = subscriber_capacity,
                "subscriber capacity out of range, clamped"
            );
        }

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BrokerState {
                    registry: TopicRegistry::new(),
                    retention,
                    expiry_timers: HashSet::new(),
                    closed: false,
                }),
                subscriber_capacity,
                shutdown: CancellationToken::new(),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Publish `payload` to every current subscriber of `topic`.
    ///
    /// Fails with `InvalidArgument` on an empty topic or payload, before any
    /// fan-out or retention happens. Slow subscribers never cause a failure.
    pub fn publish(&self, topic: &str, payload: impl Into<Bytes>) -> Result<PublishReceipt> {
        self.publish_message(Message::new(topic, payload))
    }

    pub fn publish_message(&self, message: Message) -> Result<PublishReceipt> {
        validate_topic(message.topic())?;
        if message.payload().is_empty() {
            return Err(BrokerError::InvalidArgument("message must not be empty"));
        }

        let can_schedule = tokio::runtime::Handle::try_current().is_ok();
        let mut receipt = PublishReceipt::default();
        let arm_timer = {
            let mut guard = self.shared.lock();
            let state = &mut *guard;
            if state.closed {
                return Err(BrokerError::Unavailable);
            }

            for subscriber in state.registry.snapshot(message.topic()) {
                match subscriber.sender.try_send(message.clone()) {
                    Ok(()) => receipt.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        receipt.dropped += 1;
                        debug!(subscription = %subscriber.id, topic = message.topic(), "subscriber queue full, message dropped");
                    }
                    Err(TrySendError::Closed(_)) => {
                        // Receiver is being torn down; its Drop unregisters it.
                        receipt.dropped += 1;
                    }
                }
            }

            let expires_at = match state.retention.as_mut() {
                Some(retention) => {
                    let expires_at = retention.append(message.clone(), Instant::now());
                    if expires_at.is_none() {
                        warn!(topic = message.topic(), "retention expiry out of range, message not retained");
                    }
                    expires_at
                }
                None => None,
            };
            receipt.retained = expires_at.is_some();

            // A topic's timer re-arms itself from the queue front, so only the
            // first retained message of an idle topic starts one.
            expires_at.filter(|_| {
                can_schedule && state.expiry_timers.insert(message.topic().to_string())
            })
        };

        if receipt.retained && !can_schedule {
            // Reads still filter expired entries; only eager eviction is lost.
            warn!(topic = message.topic(), "no tokio runtime, retention expiry not scheduled");
        }
        if let Some(expires_at) = arm_timer {
            self.spawn_expiry_timer(message.topic().to_string(), expires_at);
        }

        debug!(
            topic = message.topic(),
            delivered = receipt.delivered,
            dropped = receipt.dropped,
            "message published"
        );
        Ok(receipt)
    }

    /// Register a new subscription to `topic`, backfilled with whatever the
    /// retention buffer still holds for it.
    pub fn subscribe(&self, topic: &str) -> Result<Subscription> {
        validate_topic(topic)?;

        let (sender, receiver) = mpsc::channel(self.shared.subscriber_capacity);
        let id = Uuid::new_v4();

        let backfilled = {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(BrokerError::Unavailable);
            }

            let mut backfilled = 0;
            if let Some(retention) = state.retention.as_ref() {
                for message in retention.drain_current(topic, Instant::now()) {
                    if sender.try_send(message).is_err() {
                        debug!(subscription = %id, topic, "backfill exceeds subscriber capacity, truncated");
                        break;
                    }
                    backfilled += 1;
                }
            }

            state.registry.register(topic, id, sender);
            backfilled
        };

        debug!(subscription = %id, topic, backfilled, "subscription registered");
        Ok(Subscription::new(
            id,
            topic.to_string(),
            receiver,
            Arc::clone(&self.shared),
        ))
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.shared.lock().registry.subscriber_count(topic)
    }

    pub fn topic_count(&self) -> usize {
        self.shared.lock().registry.topic_count()
    }

    /// Retained entries for `topic`, including expired ones not yet evicted.
    pub fn retained_count(&self, topic: &str) -> usize {
        self.shared
            .lock()
            .retention
            .as_ref()
            .map_or(0, |r| r.len(topic))
    }

    pub fn retention_enabled(&self) -> bool {
        self.shared.lock().retention.is_some()
    }

    /// Token cancelled when the broker shuts down. Serving loops select on it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shared.shutdown.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Stop accepting calls, drop every subscription and retained message, and
    /// wait for the outstanding expiry tasks to finish.
    pub async fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            state.closed = true;
            state.registry.clear();
            state.expiry_timers.clear();
            if let Some(retention) = state.retention.as_mut() {
                retention.clear();
            }
        }
        self.shared.shutdown.cancel();
        self.shared.tasks.close();
        self.shared.tasks.wait().await;
        info!("broker shut down");
    }

    /// Outstanding eviction timer tasks, at most one per retained topic.
    pub(crate) fn expiry_timer_count(&self) -> usize {
        self.shared.tasks.len()
    }

    /// Sleep until the topic's oldest entry expires, evict, and repeat until
    /// the topic holds nothing more.
    fn spawn_expiry_timer(&self, topic: String, first_deadline: Instant) {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let shutdown = self.shared.shutdown.clone();
        self.shared.tasks.spawn(async move {
            let mut deadline = first_deadline;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep_until(deadline) => {}
                }
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                match shared.evict_expired(&topic) {
                    Some(next) => deadline = next,
                    None => break,
                }
            }
        });
    }
}

fn clamp_capacity(capacity: usize) -> usize {
    capacity.clamp(1, BrokerConfig::MAX_SUBSCRIBER_CAPACITY)
}

fn validate_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(BrokerError::InvalidArgument("topic must not be empty"));
    }
    Ok(())
}
