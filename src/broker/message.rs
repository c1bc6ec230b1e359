//! Message definitions for the broker
//!
//! `Message` is the unit the broker fans out. It is immutable once built:
//! the payload is a reference-counted `Bytes`, so handing a message to every
//! subscriber channel clones a pointer rather than the data.
//!
//! Notes on fields:
//! - `topic`: topic name used for routing
//! - `payload`: opaque bytes, never inspected by the broker
//! - `timestamp`: milliseconds since UNIX epoch, stamped when the message is built

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    topic: String,
    payload: Bytes,
    timestamp: i64,
}

impl Message {
    /// Build a message stamped with the current wall-clock time.
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::with_timestamp(topic, payload, chrono::Utc::now().timestamp_millis())
    }

    pub fn with_timestamp(topic: impl Into<String>, payload: impl Into<Bytes>, timestamp: i64) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            timestamp,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}
