//! Retention buffer
//!
//! Keeps each topic's recently published messages for a fixed window so a
//! subscriber that connects just after a publish still receives it.
//!
//! Expiry is enforced two ways: the broker keeps one eviction timer per topic
//! that follows the queue front, and every read filters on `expires_at`. A message past its window is
//! therefore never handed to a new subscriber even if its eviction has not
//! run yet. An optional per-topic cap bounds memory under bursty publishers;
//! when it is hit the oldest entries go first.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

use crate::broker::message::Message;

#[derive(Debug)]
struct Retained {
    message: Message,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct RetentionBuffer {
    window: Duration,
    max_per_topic: Option<usize>,
    topics: HashMap<String, VecDeque<Retained>>,
}

impl RetentionBuffer {
    /// Longest window a buffer will use; longer ones are clamped to it.
    pub const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    pub fn new(window: Duration, max_per_topic: Option<usize>) -> Self {
        Self {
            window: window.min(Self::MAX_WINDOW),
            max_per_topic,
            topics: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Queue `message` under its topic and return the instant it expires.
    /// Returns `None`, retaining nothing, if that instant is not
    /// representable.
    pub fn append(&mut self, message: Message, now: Instant) -> Option<Instant> {
        let expires_at = now.checked_add(self.window)?;
        let queue = self.topics.entry(message.topic().to_string()).or_default();

        while queue.front().is_some_and(|r| r.expires_at <= now) {
            queue.pop_front();
        }

        queue.push_back(Retained {
            message,
            expires_at,
        });

        if let Some(max) = self.max_per_topic {
            while queue.len() > max {
                queue.pop_front();
            }
        }

        Some(expires_at)
    }

    /// Messages for `topic` that have not expired at `now`, in publish order.
    /// Entries stay queued for later subscribers.
    pub fn drain_current(&self, topic: &str, now: Instant) -> Vec<Message> {
        self.topics
            .get(topic)
            .map(|queue| {
                queue
                    .iter()
                    .filter(|r| r.expires_at > now)
                    .map(|r| r.message.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pop expired entries off the front of the topic's queue. Returns how
    /// many were evicted.
    pub fn evict_expired(&mut self, topic: &str, now: Instant) -> usize {
        let Some(queue) = self.topics.get_mut(topic) else {
            return 0;
        };

        let before = queue.len();
        while queue.front().is_some_and(|r| r.expires_at <= now) {
            queue.pop_front();
        }
        let evicted = before - queue.len();

        if queue.is_empty() {
            self.topics.remove(topic);
        }
        evicted
    }

    /// Expiry of the oldest entry still queued for `topic`.
    pub fn next_expiry(&self, topic: &str) -> Option<Instant> {
        self.topics
            .get(topic)
            .and_then(VecDeque::front)
            .map(|r| r.expires_at)
    }

    /// Number of entries queued for `topic`, expired or not.
    pub fn len(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, VecDeque::len)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn clear(&mut self) {
        self.topics.clear();
    }
}
