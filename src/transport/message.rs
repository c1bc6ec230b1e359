//! Wire protocol
//!
//! Every frame is a JSON object tagged by `"type"`. Payloads travel as
//! standard base64 so they stay opaque bytes end to end.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{BrokerError, Message};
use crate::utils::ErrorCode;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "publish")]
    Publish {
        topic: String,
        #[serde(with = "base64_payload")]
        payload: Bytes,
    },
    #[serde(rename = "subscribe")]
    Subscribe { topic: String },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "publish_response")]
    PublishResponse { success: bool },
    #[serde(rename = "message")]
    Message {
        topic: String,
        #[serde(with = "base64_payload")]
        payload: Bytes,
        timestamp: i64,
    },
    #[serde(rename = "error")]
    Error { code: ErrorCode, message: String },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_frame(&self) -> Result<WsMessage, serde_json::Error> {
        Ok(WsMessage::text(serde_json::to_string(self)?))
    }
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_frame(&self) -> Result<WsMessage, serde_json::Error> {
        Ok(WsMessage::text(serde_json::to_string(self)?))
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }
}

impl From<&BrokerError> for ServerMessage {
    fn from(err: &BrokerError) -> Self {
        ServerMessage::error(err.code(), err.to_string())
    }
}

impl From<Message> for ServerMessage {
    fn from(message: Message) -> Self {
        ServerMessage::Message {
            topic: message.topic().to_string(),
            timestamp: message.timestamp(),
            payload: message.into_payload(),
        }
    }
}

mod base64_payload {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
