use crate::utils::ErrorCode;

pub type Result<T> = std::result::Result<T, BrokerError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("broker is shutting down")]
    Unavailable,
}

impl BrokerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BrokerError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            BrokerError::Unavailable => ErrorCode::Unavailable,
        }
    }
}
