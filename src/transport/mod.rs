//! The `transport` module is the broker's RPC surface.
//!
//! It defines the JSON frame protocol spoken over WebSockets and implements
//! the server: accepting connections, turning publish frames into broker
//! calls, and running one serving loop per subscribe stream.

pub mod error;
pub mod message;
pub mod websocket;

pub use error::TransportError;

#[cfg(test)]
mod tests;
