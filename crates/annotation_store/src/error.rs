//! Error types for storage operations

use annotation_engine::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => GatewayError::Io(e.to_string()),
            StoreError::Serialization(e) => GatewayError::Serialization(e.to_string()),
            StoreError::InvalidFormat(msg) => GatewayError::Serialization(msg),
        }
    }
}
