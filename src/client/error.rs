use std::time::Duration;

use crate::utils::ErrorCode;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("invalid broker address: {0:?}")]
    InvalidAddress(String),
    /// The broker could not be reached or the connection was lost.
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{code}: {message}")]
    Rejected { code: ErrorCode, message: String },
    #[error("stream cancelled: {0}")]
    Cancelled(String),
    #[error("publish failed")]
    PublishFailed,
    #[error("connection closed before a response was received")]
    ConnectionClosed,
    #[error("unexpected frame: {0}")]
    Protocol(String),
    #[error("malformed frame: {0}")]
    Frame(#[from] serde_json::Error),
}

impl ClientError {
    /// Map a server `error` frame onto the client taxonomy.
    pub fn from_status(code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::Cancelled => ClientError::Cancelled(message),
            code => ClientError::Rejected { code, message },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::InvalidAddress(_) => ErrorCode::InvalidArgument,
            ClientError::Transport(_) | ClientError::ConnectionClosed => ErrorCode::Unavailable,
            ClientError::Timeout(_) => ErrorCode::Unavailable,
            ClientError::Rejected { code, .. } => *code,
            ClientError::Cancelled(_) => ErrorCode::Cancelled,
            ClientError::PublishFailed | ClientError::Protocol(_) | ClientError::Frame(_) => {
                ErrorCode::Internal
            }
        }
    }
}
