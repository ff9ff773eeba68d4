//! Error types for annotation engine operations
//!
//! Rejected selections and stale descriptors are ordinary outcomes and are
//! modelled as values ([`crate::Rejection`], [`crate::SkipReason`]), not as
//! errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Content tree error: {0}")]
    Tree(#[from] content_tree::TreeError),

    #[error("Invalid container key: {0}")]
    InvalidContainerKey(String),

    #[error("Persistence error: {0}")]
    Gateway(#[from] crate::GatewayError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
