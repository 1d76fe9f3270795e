//! DOM patching interpreter
//!
//! Applies a compact binary edit stream to a host-owned tree while keeping
//! a stable mapping from producer-assigned node ids to host handles.
//!
//! ## Core Design
//!
//! ```text
//! producer ──(bytes, values)──▶ Interpreter ──HostTree──▶ host tree
//!     ▲                            │
//!     └──── EventRecord ◀── Event Bridge ◀── native events
//! ```
//!
//! - **Registry**: NodeId ⇄ handle, both directions
//! - **Root stack**: scratch for assembling subtrees
//! - **Templates**: built once, deep-cloned per use
//!
//! Single-threaded. A stream runs to completion before control returns.

pub mod attributes;
pub mod edits;
pub mod error;
pub mod events;
pub mod interpreter;
pub mod registry;
pub mod stack;
pub mod template;
pub mod types;
pub mod values;

pub use edits::{Edit, EditReader, EditWriter};
pub use error::{ApplyError, DecodeError, Result};
pub use events::{EventData, EventRecord, EventResponse, EventSink, ListenerTable};
pub use interpreter::{ApplyState, ApplyStats, Interpreter, InterpreterConfig};
pub use registry::{IdAllocator, NodeRegistry};
pub use stack::RootStack;
pub use template::{
    SlotKind, TemplateAttribute, TemplateCache, TemplateDescriptor, TemplateInstance, TemplateNode,
};
pub use types::{HandlerId, NodeId, TemplateId, ROOT_ID};
pub use values::{DynamicValue, DynamicValues, ValueKind};
