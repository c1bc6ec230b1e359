//! # topicbus
//!
//! `topicbus` is an in-memory, topic-based publish/subscribe broker served
//! over WebSockets. Publishers send a payload tagged with a topic; subscribers
//! open a long-lived stream for a topic and receive every message published
//! to it while they are connected. Delivery is best effort and at most once:
//! a subscriber that falls behind loses messages instead of slowing the
//! publisher down.
//!
//! ## Core Modules
//!
//! - `broker`: topic registry, subscriptions, fan-out and the short-lived retention buffer.
//! - `client`: the client adapter used by the `publisher` and `subscriber` binaries.
//! - `config`: loading server, broker, client and logging settings.
//! - `transport`: the JSON-over-WebSocket RPC surface and its server.
//! - `utils`: shared status codes and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
