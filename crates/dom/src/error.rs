//! Error types for host tree operations
//!
//! Simple, flat error hierarchy. No over-engineering.

use thiserror::Error;

use crate::types::NodeIndex;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeIndex),

    #[error("Invalid node type: expected {expected}, got {actual}")]
    InvalidNodeType { expected: String, actual: String },

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Invalid namespace: {0:?}")]
    InvalidNamespace(String),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeIndex, child: NodeIndex },
}
