//! Edit stream - opcodes and their wire format
//!
//! ## Wire format
//!
//! ```text
//! stream := op*
//! op     := tag:u8 args
//! str    := len:u32 utf8[len]      opt_str := 0 | 1 str
//! id     := u64                    value   := u32 (index into values)
//! bool   := 0 | 1                  everything little-endian
//! ```
//!
//! Strings are borrowed straight out of the buffer, nothing is copied
//! until the host needs an owned value.

mod decode;
mod encode;

pub use decode::{decode_stream, validate_values, EditReader};
pub use encode::EditWriter;

use crate::types::{HandlerId, NodeId, TemplateId};

/// Opcode tags
pub mod op {
    pub const CREATE_ELEMENT: u8 = 0x01;
    pub const CREATE_ELEMENT_NS: u8 = 0x02;
    pub const CREATE_TEXT_NODE: u8 = 0x03;
    pub const CREATE_PLACEHOLDER: u8 = 0x04;
    pub const LOAD_TEMPLATE: u8 = 0x05;
    pub const APPEND_CHILDREN: u8 = 0x06;
    pub const REPLACE_WITH: u8 = 0x07;
    pub const INSERT_AFTER: u8 = 0x08;
    pub const INSERT_BEFORE: u8 = 0x09;
    pub const REMOVE: u8 = 0x0A;
    pub const SET_TEXT: u8 = 0x0B;
    pub const SET_ATTRIBUTE: u8 = 0x0C;
    pub const REMOVE_ATTRIBUTE: u8 = 0x0D;
    pub const NEW_EVENT_LISTENER: u8 = 0x0E;
    pub const REMOVE_EVENT_LISTENER: u8 = 0x0F;
    pub const SET_NODE: u8 = 0x10;
    pub const ASSIGN_SLOT_ID: u8 = 0x11;
    pub const PUSH_ROOT: u8 = 0x12;
    pub const POP_ROOT: u8 = 0x13;
    pub const FREE_ID: u8 = 0x14;
}

/// One decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit<'a> {
    CreateElement {
        tag: &'a str,
        id: NodeId,
    },
    CreateElementNs {
        tag: &'a str,
        ns: &'a str,
        id: NodeId,
    },
    CreateTextNode {
        value: u32,
        id: NodeId,
    },
    CreatePlaceholder {
        id: NodeId,
    },
    LoadTemplate {
        template: TemplateId,
        id: NodeId,
    },
    /// `target: None` appends to whatever is left on top of the stack
    AppendChildren {
        target: Option<NodeId>,
        count: u32,
    },
    ReplaceWith {
        id: NodeId,
        count: u32,
    },
    InsertAfter {
        id: NodeId,
        count: u32,
    },
    InsertBefore {
        id: NodeId,
        count: u32,
    },
    Remove {
        id: NodeId,
    },
    SetText {
        id: NodeId,
        value: u32,
    },
    SetAttribute {
        id: NodeId,
        name: &'a str,
        value: u32,
        ns: Option<&'a str>,
    },
    RemoveAttribute {
        id: NodeId,
        name: &'a str,
        ns: Option<&'a str>,
    },
    NewEventListener {
        event: &'a str,
        id: NodeId,
        handler: HandlerId,
        bubbles: bool,
    },
    RemoveEventListener {
        id: NodeId,
        event: &'a str,
        bubbles: bool,
    },
    SetNode {
        slot: u32,
        value: u32,
    },
    AssignSlotId {
        slot: u32,
        id: NodeId,
    },
    PushRoot {
        id: NodeId,
    },
    PopRoot,
    FreeId {
        id: NodeId,
    },
}

impl Edit<'_> {
    /// Opcode name, for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Edit::CreateElement { .. } => "CreateElement",
            Edit::CreateElementNs { .. } => "CreateElementNs",
            Edit::CreateTextNode { .. } => "CreateTextNode",
            Edit::CreatePlaceholder { .. } => "CreatePlaceholder",
            Edit::LoadTemplate { .. } => "LoadTemplate",
            Edit::AppendChildren { .. } => "AppendChildren",
            Edit::ReplaceWith { .. } => "ReplaceWith",
            Edit::InsertAfter { .. } => "InsertAfter",
            Edit::InsertBefore { .. } => "InsertBefore",
            Edit::Remove { .. } => "Remove",
            Edit::SetText { .. } => "SetText",
            Edit::SetAttribute { .. } => "SetAttribute",
            Edit::RemoveAttribute { .. } => "RemoveAttribute",
            Edit::NewEventListener { .. } => "NewEventListener",
            Edit::RemoveEventListener { .. } => "RemoveEventListener",
            Edit::SetNode { .. } => "SetNode",
            Edit::AssignSlotId { .. } => "AssignSlotId",
            Edit::PushRoot { .. } => "PushRoot",
            Edit::PopRoot => "PopRoot",
            Edit::FreeId { .. } => "FreeId",
        }
    }

    /// Dynamic value referenced by this edit and what it may hold
    pub(crate) fn value_ref(&self) -> Option<(u32, ValueUse)> {
        match *self {
            Edit::CreateTextNode { value, .. } | Edit::SetText { value, .. } => {
                Some((value, ValueUse::Text))
            }
            Edit::SetAttribute { value, .. } => Some((value, ValueUse::Attribute)),
            Edit::SetNode { value, .. } => Some((value, ValueUse::Slot)),
            _ => None,
        }
    }
}

/// How an opcode consumes its dynamic value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueUse {
    /// Text or UTF-8 bytes
    Text,
    /// Text, bytes, bool or absent
    Attribute,
    /// Anything; the slot kind decides at apply time
    Slot,
}
