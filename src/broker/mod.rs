//! topicbus broker
//!
//! The broker module contains the subscription registry and the delivery
//! engine: topics map to live subscriber channels, publish fans a message out
//! without blocking on slow subscribers, and a short retention buffer lets
//! late subscribers catch messages published just before they joined.
//!
//! Public types:
//! - `Broker`: publish/subscribe façade over the shared state.
//! - `Subscription`: one subscriber's receiving end; unregisters on drop.
//! - `Message`: topic plus opaque payload.

pub mod engine;
pub mod error;
pub mod message;
pub mod retention;
pub mod subscription;
pub mod topic;

pub use engine::{Broker, BrokerConfig, PublishReceipt, RetentionConfig};
pub use error::BrokerError;
pub use message::Message;
pub use subscription::Subscription;
