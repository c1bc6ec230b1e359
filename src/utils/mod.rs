//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `topicbus` application.
//!
//! It holds the status codes shared by the broker, the wire protocol and the
//! client adapter, and the tracing setup used by every binary.

pub mod error;
pub mod logging;

pub use error::ErrorCode;
