//! Error types for edit application
//!
//! Flat on purpose: the producer only needs to know which protocol rule
//! was broken, and every one of them means "desynchronized".

use thiserror::Error;

use crate::types::{NodeId, TemplateId};

pub type Result<T> = std::result::Result<T, ApplyError>;

/// Boxed host failure, whatever the host's own error type is
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Unknown node id: {0}")]
    UnknownId(NodeId),

    #[error("Node id already bound: {0}")]
    DuplicateId(NodeId),

    #[error("Unknown template: {0}")]
    UnknownTemplate(TemplateId),

    #[error("Invalid template {id}: {reason}")]
    InvalidTemplate { id: TemplateId, reason: String },

    #[error("No active template slot {0}")]
    UnknownSlot(u32),

    #[error("Root stack underflow in {op}: needed {needed}, had {available}")]
    StackUnderflow {
        op: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Root stack not empty after stream: {remaining} roots left")]
    StackImbalance { remaining: usize },

    #[error("Malformed edit stream: {0}")]
    MalformedStream(#[from] DecodeError),

    #[error("Host rejected {op}: {source}")]
    HostOperationFailed {
        op: &'static str,
        #[source]
        source: BoxError,
    },
}

impl ApplyError {
    /// Wrap a host failure for the given operation
    pub fn host<E>(op: &'static str) -> impl FnOnce(E) -> ApplyError
    where
        E: Into<BoxError>,
    {
        move |e| ApplyError::HostOperationFailed {
            op,
            source: e.into(),
        }
    }
}

/// Decode and validation failures. Nothing has been applied when one of
/// these comes back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated at byte {offset}: needed {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    #[error("invalid opcode 0x{tag:02x} at byte {offset}")]
    InvalidOpcode { tag: u8, offset: usize },

    #[error("invalid bool byte {value} at byte {offset}")]
    InvalidBool { value: u8, offset: usize },

    #[error("invalid UTF-8 at byte {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("dynamic value {index} out of range ({len} values)")]
    ValueOutOfRange { index: u32, len: usize },

    #[error("dynamic value {index} referenced more than once")]
    ValueReused { index: u32 },

    #[error("dynamic value {index} is {actual}, expected {expected}")]
    ValueKind {
        index: u32,
        expected: &'static str,
        actual: &'static str,
    },
}
