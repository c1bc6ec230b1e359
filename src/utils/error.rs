//! Status codes shared by every layer of `topicbus`.
//!
//! Each layer keeps its own error enum; `ErrorCode` is the coarse
//! classification that crosses the wire so a client can tell an invalid
//! request from an unavailable broker without parsing messages.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Empty topic, empty payload or an unparseable request frame.
    InvalidArgument,
    /// The broker cannot be reached or is shutting down.
    Unavailable,
    /// The stream was ended on purpose.
    Cancelled,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
