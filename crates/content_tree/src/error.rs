//! Error types for content tree operations

use crate::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Node {0} cannot have children")]
    NotAnElement(NodeId),

    #[error("Node {0} is not a text run")]
    NotATextRun(NodeId),

    #[error("Node {0} is not an annotation marker")]
    NotAMarker(NodeId),

    #[error("Markup error: {0}")]
    Markup(String),
}

impl From<quick_xml::Error> for TreeError {
    fn from(err: quick_xml::Error) -> Self {
        TreeError::Markup(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TreeError>;
