use super::{op, Edit};
use crate::types::{HandlerId, NodeId, TemplateId};
use crate::values::{DynamicValue, DynamicValues};

/// Builds an edit stream and its value list side by side.
///
/// Helpers that carry live content push the value and reference it by
/// index; [`EditWriter::edit`] writes any opcode verbatim, including ones
/// that point at values pushed earlier with [`EditWriter::push_value`].
#[derive(Debug)]
pub struct EditWriter<N> {
    buf: Vec<u8>,
    values: Vec<DynamicValue<N>>,
}

impl<N> EditWriter<N> {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            values: Vec::new(),
        }
    }

    /// Append a value, returning its index
    pub fn push_value(&mut self, value: impl Into<DynamicValue<N>>) -> u32 {
        self.values.push(value.into());
        (self.values.len() - 1) as u32
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> (Vec<u8>, DynamicValues<N>) {
        (self.buf, DynamicValues::new(self.values))
    }

    fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    fn put_str(&mut self, s: &str) {
        self.put_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn put_opt_str(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.put_bool(true);
                self.put_str(s);
            }
            None => self.put_bool(false),
        }
    }

    /// Encode one opcode as is
    pub fn edit(&mut self, edit: Edit<'_>) -> &mut Self {
        match edit {
            Edit::CreateElement { tag, id } => {
                self.put_u8(op::CREATE_ELEMENT);
                self.put_str(tag);
                self.put_u64(id);
            }
            Edit::CreateElementNs { tag, ns, id } => {
                self.put_u8(op::CREATE_ELEMENT_NS);
                self.put_str(tag);
                self.put_str(ns);
                self.put_u64(id);
            }
            Edit::CreateTextNode { value, id } => {
                self.put_u8(op::CREATE_TEXT_NODE);
                self.put_u32(value);
                self.put_u64(id);
            }
            Edit::CreatePlaceholder { id } => {
                self.put_u8(op::CREATE_PLACEHOLDER);
                self.put_u64(id);
            }
            Edit::LoadTemplate { template, id } => {
                self.put_u8(op::LOAD_TEMPLATE);
                self.put_u32(template);
                self.put_u64(id);
            }
            Edit::AppendChildren { target, count } => {
                self.put_u8(op::APPEND_CHILDREN);
                match target {
                    Some(id) => {
                        self.put_bool(true);
                        self.put_u64(id);
                    }
                    None => self.put_bool(false),
                }
                self.put_u32(count);
            }
            Edit::ReplaceWith { id, count } => {
                self.put_u8(op::REPLACE_WITH);
                self.put_u64(id);
                self.put_u32(count);
            }
            Edit::InsertAfter { id, count } => {
                self.put_u8(op::INSERT_AFTER);
                self.put_u64(id);
                self.put_u32(count);
            }
            Edit::InsertBefore { id, count } => {
                self.put_u8(op::INSERT_BEFORE);
                self.put_u64(id);
                self.put_u32(count);
            }
            Edit::Remove { id } => {
                self.put_u8(op::REMOVE);
                self.put_u64(id);
            }
            Edit::SetText { id, value } => {
                self.put_u8(op::SET_TEXT);
                self.put_u64(id);
                self.put_u32(value);
            }
            Edit::SetAttribute {
                id,
                name,
                value,
                ns,
            } => {
                self.put_u8(op::SET_ATTRIBUTE);
                self.put_u64(id);
                self.put_str(name);
                self.put_u32(value);
                self.put_opt_str(ns);
            }
            Edit::RemoveAttribute { id, name, ns } => {
                self.put_u8(op::REMOVE_ATTRIBUTE);
                self.put_u64(id);
                self.put_str(name);
                self.put_opt_str(ns);
            }
            Edit::NewEventListener {
                event,
                id,
                handler,
                bubbles,
            } => {
                self.put_u8(op::NEW_EVENT_LISTENER);
                self.put_str(event);
                self.put_u64(id);
                self.put_u64(handler);
                self.put_bool(bubbles);
            }
            Edit::RemoveEventListener { id, event, bubbles } => {
                self.put_u8(op::REMOVE_EVENT_LISTENER);
                self.put_u64(id);
                self.put_str(event);
                self.put_bool(bubbles);
            }
            Edit::SetNode { slot, value } => {
                self.put_u8(op::SET_NODE);
                self.put_u32(slot);
                self.put_u32(value);
            }
            Edit::AssignSlotId { slot, id } => {
                self.put_u8(op::ASSIGN_SLOT_ID);
                self.put_u32(slot);
                self.put_u64(id);
            }
            Edit::PushRoot { id } => {
                self.put_u8(op::PUSH_ROOT);
                self.put_u64(id);
            }
            Edit::PopRoot => self.put_u8(op::POP_ROOT),
            Edit::FreeId { id } => {
                self.put_u8(op::FREE_ID);
                self.put_u64(id);
            }
        }
        self
    }

    pub fn create_element(&mut self, tag: &str, id: NodeId) -> &mut Self {
        self.edit(Edit::CreateElement { tag, id })
    }

    pub fn create_element_ns(&mut self, tag: &str, ns: &str, id: NodeId) -> &mut Self {
        self.edit(Edit::CreateElementNs { tag, ns, id })
    }

    pub fn create_text_node(&mut self, text: impl Into<DynamicValue<N>>, id: NodeId) -> &mut Self {
        let value = self.push_value(text);
        self.edit(Edit::CreateTextNode { value, id })
    }

    pub fn create_placeholder(&mut self, id: NodeId) -> &mut Self {
        self.edit(Edit::CreatePlaceholder { id })
    }

    pub fn load_template(&mut self, template: TemplateId, id: NodeId) -> &mut Self {
        self.edit(Edit::LoadTemplate { template, id })
    }

    pub fn append_children(&mut self, target: Option<NodeId>, count: u32) -> &mut Self {
        self.edit(Edit::AppendChildren { target, count })
    }

    pub fn replace_with(&mut self, id: NodeId, count: u32) -> &mut Self {
        self.edit(Edit::ReplaceWith { id, count })
    }

    pub fn insert_after(&mut self, id: NodeId, count: u32) -> &mut Self {
        self.edit(Edit::InsertAfter { id, count })
    }

    pub fn insert_before(&mut self, id: NodeId, count: u32) -> &mut Self {
        self.edit(Edit::InsertBefore { id, count })
    }

    pub fn remove(&mut self, id: NodeId) -> &mut Self {
        self.edit(Edit::Remove { id })
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<DynamicValue<N>>) -> &mut Self {
        let value = self.push_value(text);
        self.edit(Edit::SetText { id, value })
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<DynamicValue<N>>,
        ns: Option<&str>,
    ) -> &mut Self {
        let value = self.push_value(value);
        self.edit(Edit::SetAttribute {
            id,
            name,
            value,
            ns,
        })
    }

    /// Plain string attribute without a namespace
    pub fn set_attribute_str(&mut self, id: NodeId, name: &str, value: &str) -> &mut Self {
        self.set_attribute(id, name, value, None)
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str, ns: Option<&str>) -> &mut Self {
        self.edit(Edit::RemoveAttribute { id, name, ns })
    }

    pub fn new_event_listener(
        &mut self,
        event: &str,
        id: NodeId,
        handler: HandlerId,
        bubbles: bool,
    ) -> &mut Self {
        self.edit(Edit::NewEventListener {
            event,
            id,
            handler,
            bubbles,
        })
    }

    pub fn remove_event_listener(&mut self, id: NodeId, event: &str, bubbles: bool) -> &mut Self {
        self.edit(Edit::RemoveEventListener { id, event, bubbles })
    }

    pub fn set_node(&mut self, slot: u32, value: impl Into<DynamicValue<N>>) -> &mut Self {
        let value = self.push_value(value);
        self.edit(Edit::SetNode { slot, value })
    }

    pub fn assign_slot_id(&mut self, slot: u32, id: NodeId) -> &mut Self {
        self.edit(Edit::AssignSlotId { slot, id })
    }

    pub fn push_root(&mut self, id: NodeId) -> &mut Self {
        self.edit(Edit::PushRoot { id })
    }

    pub fn pop_root(&mut self) -> &mut Self {
        self.edit(Edit::PopRoot)
    }

    pub fn free_id(&mut self, id: NodeId) -> &mut Self {
        self.edit(Edit::FreeId { id })
    }
}

impl<N> Default for EditWriter<N> {
    fn default() -> Self {
        Self::new()
    }
}
