//! The `client` module is the client-facing side of the broker's RPC surface.
//!
//! `BrokerClient` turns `publish` and `subscribe` into WebSocket calls:
//! publish is a short request/response bounded by a timeout, subscribe
//! returns a lazy, non-restartable stream of messages with no timeout. The
//! `publisher` and `subscriber` binaries are thin wrappers around it.

pub mod error;
pub mod pubsub_client;

pub use error::ClientError;
pub use pubsub_client::{BrokerClient, MessageStream};

#[cfg(test)]
mod tests;
