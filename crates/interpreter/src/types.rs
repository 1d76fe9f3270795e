//! Identifier types shared by every interpreter module

/// Abstract node identifier, assigned by the producer.
///
/// Distinct from the host handle it is bound to. One integer, no pairs.
pub type NodeId = u64;

/// Template identifier
pub type TemplateId = u32;

/// Opaque producer-side handler reference carried by listener records
pub type HandlerId = u64;

/// The mount element is bound to this id when the interpreter is built
pub const ROOT_ID: NodeId = 0;
