//! Topic management
//!
//! A `Topic` holds the live subscriber channels for one topic name and the
//! `TopicRegistry` maps names to topics. Membership is by `SubscriptionId`,
//! so registering twice under the same id replaces the channel and removing
//! an absent id is a no-op.
//!
//! Concurrency note: the registry has no locking of its own. The broker keeps
//! it behind its single state lock and only holds that lock for map updates
//! and non-blocking channel offers.

use std::collections::HashMap;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::broker::message::Message;

pub type SubscriptionId = Uuid;

/// A registered subscriber as seen by fan-out: its id and the sending half of
/// its bounded channel.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: SubscriptionId,
    pub sender: mpsc::Sender<Message>,
}

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    subscribers: HashMap<SubscriptionId, mpsc::Sender<Message>>,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashMap::new(),
        }
    }

    pub fn subscribe(&mut self, id: SubscriptionId, sender: mpsc::Sender<Message>) {
        self.subscribers.insert(id, sender);
    }

    /// Remove a subscriber from the topic. Returns whether it was present.
    pub fn unsubscribe(&mut self, id: &SubscriptionId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    pub fn contains(&self, id: &SubscriptionId) -> bool {
        self.subscribers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn subscribers(&self) -> impl Iterator<Item = (&SubscriptionId, &mpsc::Sender<Message>)> {
        self.subscribers.iter()
    }
}

#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Topic>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription to a topic, creating the topic if it is new.
    pub fn register(&mut self, topic: &str, id: SubscriptionId, sender: mpsc::Sender<Message>) {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(id, sender);
    }

    /// Remove a subscription. Idempotent; a topic left without subscribers is
    /// dropped so connect/disconnect churn does not accumulate entries.
    pub fn unregister(&mut self, topic: &str, id: &SubscriptionId) -> bool {
        let Some(t) = self.topics.get_mut(topic) else {
            return false;
        };
        let removed = t.unsubscribe(id);
        if t.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }

    /// Copy of the topic's current subscribers, used for fan-out. The copy
    /// may be stale as soon as the caller releases the registry.
    pub fn snapshot(&self, topic: &str) -> Vec<Subscriber> {
        self.topics
            .get(topic)
            .map(|t| {
                t.subscribers()
                    .map(|(id, sender)| Subscriber {
                        id: *id,
                        sender: sender.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Topic::len)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    /// Drop every subscription. Receivers observe a closed channel once
    /// they have drained what was already queued.
    pub fn clear(&mut self) {
        self.topics.clear();
    }
}
