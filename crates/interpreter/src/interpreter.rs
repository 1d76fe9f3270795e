//! Edit Applier - runs an edit stream against the host tree
//!
//! ```text
//! bytes ──decode+validate──▶ [Edit] (bump) ──step──▶ registry / stack / host
//! ```
//!
//! Two phases. Decoding and value checks finish before the first host
//! call, so a malformed stream never mutates anything. Execution is
//! sequential and stops at the first error; whatever ran before it stays.

use bumpalo::Bump;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use dom::{ClientRect, HostTree, ScrollBehavior};

use crate::attributes::{is_boolean_attribute, InlineStyle, STYLE_NAMESPACE};
use crate::edits::{decode_stream, validate_values, Edit};
use crate::error::{ApplyError, Result};
use crate::events::{make_listener, EventSink, ListenerTable, NullSink, SharedSink};
use crate::registry::NodeRegistry;
use crate::stack::RootStack;
use crate::template::{SlotKind, TemplateCache, TemplateDescriptor, TemplateInstance};
use crate::types::{NodeId, TemplateId, ROOT_ID};
use crate::values::{DynamicValue, DynamicValues};

/// Text of the comment node standing in for absent content
pub const PLACEHOLDER_TEXT: &str = "placeholder";

/// Interpreter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Registry capacity reserved up front
    pub initial_capacity: usize,
    /// Treat roots left on the stack after a stream as an error
    pub strict_stack_balance: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 256,
            strict_stack_balance: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyState {
    Idle,
    Applying,
}

/// Counters for one applied stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyStats {
    /// Opcodes executed
    pub ops: usize,
    /// Ids bound by creation opcodes
    pub created: usize,
    /// Ids unbound by subtree removal
    pub removed: usize,
}

pub struct Interpreter<H: HostTree> {
    host: H,
    config: InterpreterConfig,
    registry: NodeRegistry<H::Node>,
    stack: RootStack<H::Node>,
    templates: TemplateCache<H::Node>,
    listeners: ListenerTable,
    sink: SharedSink,
    state: ApplyState,
    /// Slots of the most recent LoadTemplate in the current stream
    active: Option<TemplateInstance<H::Node>>,
    scratch: Bump,
}

impl<H> Interpreter<H>
where
    H: HostTree,
    H::Event: 'static,
{
    /// Interpreter over `host`, with `mount` bound to `ROOT_ID`
    pub fn new(host: H, mount: H::Node) -> Self {
        Self::with_config(host, mount, InterpreterConfig::default())
    }

    pub fn with_config(host: H, mount: H::Node, config: InterpreterConfig) -> Self {
        Self {
            host,
            registry: NodeRegistry::with_root(mount, config.initial_capacity),
            stack: RootStack::with_capacity(16),
            templates: TemplateCache::new(),
            listeners: ListenerTable::new(),
            sink: SharedSink::new(Rc::new(NullSink)),
            state: ApplyState::Idle,
            active: None,
            scratch: Bump::new(),
            config,
        }
    }

    /// Where event records go. Listeners attached earlier follow along.
    pub fn set_event_sink(&self, sink: Rc<dyn EventSink>) {
        self.sink.replace(sink);
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct host access. Nodes created here are invisible to the
    /// registry until an edit binds them.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn state(&self) -> ApplyState {
        self.state
    }

    pub fn registry(&self) -> &NodeRegistry<H::Node> {
        &self.registry
    }

    pub fn listeners(&self) -> &ListenerTable {
        &self.listeners
    }

    /// Host handle bound to `id`
    pub fn node(&self, id: NodeId) -> Result<&H::Node> {
        self.registry.resolve(id)
    }

    pub fn has_template(&self, id: TemplateId) -> bool {
        self.templates.contains(id)
    }

    /// Cache a template. Returns false when `id` was already registered.
    pub fn register_template(&mut self, id: TemplateId, descriptor: &TemplateDescriptor) -> Result<bool> {
        self.templates.register(&mut self.host, id, descriptor)
    }

    /// Fresh detached clone of a template. Nothing is bound.
    pub fn instantiate_template(&mut self, id: TemplateId) -> Result<TemplateInstance<H::Node>> {
        self.templates.instantiate(&mut self.host, id)
    }

    pub fn focus(&mut self, id: NodeId) -> Result<()> {
        let node = self.registry.resolve(id)?;
        self.host.focus(node).map_err(ApplyError::host("focus"))
    }

    pub fn blur(&mut self, id: NodeId) -> Result<()> {
        let node = self.registry.resolve(id)?;
        self.host.blur(node).map_err(ApplyError::host("blur"))
    }

    pub fn scroll_into_view(&mut self, id: NodeId, behavior: ScrollBehavior) -> Result<()> {
        let node = self.registry.resolve(id)?;
        self.host
            .scroll_into_view(node, behavior)
            .map_err(ApplyError::host("scroll_into_view"))
    }

    /// Layout box of a bound node
    pub fn client_rect(&self, id: NodeId) -> Result<ClientRect> {
        let node = self.registry.resolve(id)?;
        self.host
            .client_rect(node)
            .map_err(ApplyError::host("client_rect"))
    }

    /// Apply one edit stream.
    ///
    /// Decode errors come back as `MalformedStream` with the tree
    /// untouched. Any other error leaves the mutations before it in place.
    /// The root stack is empty again either way.
    pub fn apply_edits(
        &mut self,
        bytes: &[u8],
        values: DynamicValues<H::Node>,
    ) -> Result<ApplyStats> {
        self.state = ApplyState::Applying;

        let mut scratch = std::mem::take(&mut self.scratch);
        let result = self.run(bytes, values, &scratch);
        scratch.reset();
        self.scratch = scratch;

        let remaining = self.stack.clear();
        self.active = None;
        self.state = ApplyState::Idle;

        match result {
            Ok(_) if remaining > 0 && self.config.strict_stack_balance => {
                tracing::warn!("edit stream left {} roots on the stack", remaining);
                Err(ApplyError::StackImbalance { remaining })
            }
            Ok(stats) => {
                tracing::debug!(
                    "applied {} ops ({} created, {} removed)",
                    stats.ops,
                    stats.created,
                    stats.removed
                );
                Ok(stats)
            }
            Err(e) => {
                tracing::warn!("edit stream failed: {}", e);
                Err(e)
            }
        }
    }

    fn run(
        &mut self,
        bytes: &[u8],
        mut values: DynamicValues<H::Node>,
        scratch: &Bump,
    ) -> Result<ApplyStats> {
        let edits = decode_stream(bytes, scratch)?;
        validate_values(&edits, &values)?;

        let mut stats = ApplyStats::default();
        for edit in edits.iter().copied() {
            tracing::trace!("{:?}", edit);
            // Values were validated up front, so a decode error here is a
            // slot that cannot take the value it was given.
            self.step(edit, &mut values, &mut stats).map_err(|e| match e {
                ApplyError::MalformedStream(source) => ApplyError::HostOperationFailed {
                    op: edit.name(),
                    source: source.into(),
                },
                other => other,
            })?;
            stats.ops += 1;
        }
        Ok(stats)
    }

    fn step(
        &mut self,
        edit: Edit<'_>,
        values: &mut DynamicValues<H::Node>,
        stats: &mut ApplyStats,
    ) -> Result<()> {
        let op = edit.name();
        match edit {
            Edit::CreateElement { tag, id } => {
                self.ensure_unbound(id)?;
                let node = self.host.create_element(tag).map_err(ApplyError::host(op))?;
                self.bind_and_push(id, node, stats)?;
            }
            Edit::CreateElementNs { tag, ns, id } => {
                self.ensure_unbound(id)?;
                let node = self
                    .host
                    .create_element_ns(tag, ns)
                    .map_err(ApplyError::host(op))?;
                self.bind_and_push(id, node, stats)?;
            }
            Edit::CreateTextNode { value, id } => {
                self.ensure_unbound(id)?;
                let text = values.take_text(value)?;
                let node = self
                    .host
                    .create_text_node(&text)
                    .map_err(ApplyError::host(op))?;
                self.bind_and_push(id, node, stats)?;
            }
            Edit::CreatePlaceholder { id } => {
                self.ensure_unbound(id)?;
                let node = self
                    .host
                    .create_comment(PLACEHOLDER_TEXT)
                    .map_err(ApplyError::host(op))?;
                self.bind_and_push(id, node, stats)?;
            }
            Edit::LoadTemplate { template, id } => {
                self.ensure_unbound(id)?;
                let instance = self.templates.instantiate(&mut self.host, template)?;
                self.bind_and_push(id, instance.root.clone(), stats)?;
                self.active = Some(instance);
            }
            Edit::AppendChildren { target, count } => {
                let parent = match target {
                    Some(id) => Some(self.registry.resolve(id)?.clone()),
                    None => None,
                };
                let children = self.stack.pop_many(count as usize, op)?;
                let parent = match parent {
                    Some(parent) => parent,
                    None => self.stack.peek_root(0, op)?.clone(),
                };
                for child in &children {
                    self.host
                        .append_child(&parent, child)
                        .map_err(ApplyError::host(op))?;
                }
            }
            Edit::ReplaceWith { id, count } => {
                let target = self.removable(id, op)?;
                let parent = self.parent_of(&target, id, op)?;
                let nodes = self.stack.pop_many(count as usize, op)?;
                for node in &nodes {
                    self.host
                        .insert_before(&parent, node, Some(&target))
                        .map_err(ApplyError::host(op))?;
                }
                self.host
                    .remove_child(&parent, &target)
                    .map_err(ApplyError::host(op))?;
                stats.removed += self.teardown(&target);
            }
            Edit::InsertAfter { id, count } => {
                let target = self.registry.resolve(id)?.clone();
                let parent = self.parent_of(&target, id, op)?;
                let nodes = self.stack.pop_many(count as usize, op)?;
                let reference = self.host.next_sibling(&target);
                for node in &nodes {
                    self.host
                        .insert_before(&parent, node, reference.as_ref())
                        .map_err(ApplyError::host(op))?;
                }
            }
            Edit::InsertBefore { id, count } => {
                let target = self.registry.resolve(id)?.clone();
                let parent = self.parent_of(&target, id, op)?;
                let nodes = self.stack.pop_many(count as usize, op)?;
                for node in &nodes {
                    self.host
                        .insert_before(&parent, node, Some(&target))
                        .map_err(ApplyError::host(op))?;
                }
            }
            Edit::Remove { id } => {
                let target = self.removable(id, op)?;
                if let Some(parent) = self.host.parent(&target) {
                    self.host
                        .remove_child(&parent, &target)
                        .map_err(ApplyError::host(op))?;
                }
                stats.removed += self.teardown(&target);
            }
            Edit::SetText { id, value } => {
                let text = values.take_text(value)?;
                let node = self.registry.resolve(id)?.clone();
                // Element content is replaced wholesale, ids bound below go with it
                for child in self.host.children(&node) {
                    self.host
                        .remove_child(&node, &child)
                        .map_err(ApplyError::host(op))?;
                    stats.removed += self.teardown(&child);
                }
                self.host
                    .set_text_content(&node, &text)
                    .map_err(ApplyError::host(op))?;
            }
            Edit::SetAttribute {
                id,
                name,
                value,
                ns,
            } => {
                let node = self.registry.resolve(id)?.clone();
                let payload = values.take(value)?;
                self.write_attribute(&node, name, ns, payload, value, op)?;
            }
            Edit::RemoveAttribute { id, name, ns } => {
                let node = self.registry.resolve(id)?.clone();
                if ns == Some(STYLE_NAMESPACE) {
                    self.edit_style(&node, name, None, op)?;
                } else {
                    self.host
                        .remove_attribute(&node, name, ns)
                        .map_err(ApplyError::host(op))?;
                }
            }
            Edit::NewEventListener {
                event,
                id,
                handler,
                bubbles,
            } => {
                let node = self.registry.resolve(id)?.clone();
                let capture = !bubbles;
                let listener = make_listener::<H::Event>(self.sink.clone(), id, handler, bubbles);
                self.host
                    .add_listener(&node, event, capture, listener)
                    .map_err(ApplyError::host(op))?;
                if let Some(previous) = self.listeners.insert(id, event, capture, handler) {
                    tracing::debug!(
                        "{} listener on node {} replaced handler {}",
                        event,
                        id,
                        previous
                    );
                }
            }
            Edit::RemoveEventListener { id, event, bubbles } => {
                let node = self.registry.resolve(id)?.clone();
                let capture = !bubbles;
                self.host
                    .remove_listener(&node, event, capture)
                    .map_err(ApplyError::host(op))?;
                self.listeners.remove(id, event, capture);
            }
            Edit::SetNode { slot, value } => {
                let (handle, kind) = self.active_slot(slot)?;
                let payload = values.take(value)?;
                match kind {
                    SlotKind::Text => {
                        let text = payload.into_text(value)?;
                        self.host
                            .set_text_content(&handle, &text)
                            .map_err(ApplyError::host(op))?;
                    }
                    SlotKind::Node => {
                        let replacement = match payload {
                            DynamicValue::Node(node) => node,
                            other => {
                                let text = other.into_text(value)?;
                                self.host
                                    .create_text_node(&text)
                                    .map_err(ApplyError::host(op))?
                            }
                        };
                        let parent = self.host.parent(&handle).ok_or_else(|| {
                            ApplyError::HostOperationFailed {
                                op,
                                source: format!("slot {} is not attached", slot).into(),
                            }
                        })?;
                        self.host
                            .insert_before(&parent, &replacement, Some(&handle))
                            .map_err(ApplyError::host(op))?;
                        self.host
                            .remove_child(&parent, &handle)
                            .map_err(ApplyError::host(op))?;
                        stats.removed += self.teardown(&handle);
                        if let Some(current) = self
                            .active
                            .as_mut()
                            .and_then(|active| active.handles.get_mut(slot as usize))
                        {
                            *current = replacement;
                        }
                    }
                    SlotKind::Attribute { name, namespace } => {
                        self.write_attribute(&handle, &name, namespace.as_deref(), payload, value, op)?;
                    }
                }
            }
            Edit::AssignSlotId { slot, id } => {
                let (handle, _) = self.active_slot(slot)?;
                self.ensure_unbound(id)?;
                self.registry.register(id, handle)?;
            }
            Edit::PushRoot { id } => {
                let node = self.registry.resolve(id)?.clone();
                self.stack.push_root(node);
            }
            Edit::PopRoot => {
                self.stack.pop_root(op)?;
            }
            Edit::FreeId { id } => {
                if id == ROOT_ID {
                    return Err(ApplyError::HostOperationFailed {
                        op,
                        source: "the mount root cannot be freed".into(),
                    });
                }
                let node = self.registry.unregister(id)?;
                self.release_listeners(id, &node);
            }
        }
        Ok(())
    }

    fn ensure_unbound(&self, id: NodeId) -> Result<()> {
        if self.registry.contains(id) {
            return Err(ApplyError::DuplicateId(id));
        }
        Ok(())
    }

    fn bind_and_push(&mut self, id: NodeId, node: H::Node, stats: &mut ApplyStats) -> Result<()> {
        self.registry.register(id, node.clone())?;
        self.stack.push_root(node);
        stats.created += 1;
        Ok(())
    }

    /// Resolve a node that is about to leave the tree
    fn removable(&self, id: NodeId, op: &'static str) -> Result<H::Node> {
        if id == ROOT_ID {
            return Err(ApplyError::HostOperationFailed {
                op,
                source: "the mount root cannot be removed".into(),
            });
        }
        Ok(self.registry.resolve(id)?.clone())
    }

    fn parent_of(&self, node: &H::Node, id: NodeId, op: &'static str) -> Result<H::Node> {
        self.host
            .parent(node)
            .ok_or_else(|| ApplyError::HostOperationFailed {
                op,
                source: format!("node {} is not attached", id).into(),
            })
    }

    fn active_slot(&self, slot: u32) -> Result<(H::Node, SlotKind)> {
        let active = self.active.as_ref().ok_or(ApplyError::UnknownSlot(slot))?;
        let handle = active
            .handles
            .get(slot as usize)
            .ok_or(ApplyError::UnknownSlot(slot))?;
        let kind = active.kind(slot).ok_or(ApplyError::UnknownSlot(slot))?;
        Ok((handle.clone(), kind.clone()))
    }

    fn write_attribute(
        &mut self,
        node: &H::Node,
        name: &str,
        ns: Option<&str>,
        value: DynamicValue<H::Node>,
        index: u32,
        op: &'static str,
    ) -> Result<()> {
        let presence_only = ns.is_none() && is_boolean_attribute(name);
        let text = match value {
            DynamicValue::Absent => None,
            DynamicValue::Bool(flag) if presence_only => flag.then(String::new),
            DynamicValue::Bool(flag) => Some(flag.to_string()),
            other => {
                let text = other.into_text(index)?;
                if presence_only {
                    (text != "false").then(String::new)
                } else {
                    Some(text)
                }
            }
        };

        if ns == Some(STYLE_NAMESPACE) {
            return self.edit_style(node, name, text.as_deref(), op);
        }
        match text {
            Some(text) => self.host.set_attribute(node, name, &text, ns),
            None => self.host.remove_attribute(node, name, ns),
        }
        .map_err(ApplyError::host(op))
    }

    /// Set or drop one declaration of the inline style
    fn edit_style(
        &mut self,
        node: &H::Node,
        property: &str,
        value: Option<&str>,
        op: &'static str,
    ) -> Result<()> {
        let current = self
            .host
            .get_attribute(node, "style", None)
            .unwrap_or_default();
        let mut style = InlineStyle::parse(&current);
        match value {
            Some(value) => style.set(property, value),
            None => {
                style.remove(property);
            }
        }

        if style.is_empty() {
            self.host.remove_attribute(node, "style", None)
        } else {
            self.host.set_attribute(node, "style", &style.to_string(), None)
        }
        .map_err(ApplyError::host(op))
    }

    /// Unbind every id in a detached subtree, drop its listeners, then hand
    /// the subtree back to the host. Returns how many ids were unbound.
    fn teardown(&mut self, root: &H::Node) -> usize {
        let mut unbound = 0;
        let mut pending = vec![root.clone()];
        while let Some(node) = pending.pop() {
            if let Some(id) = self.registry.id_of(&node) {
                if id != ROOT_ID {
                    self.release_listeners(id, &node);
                    if self.registry.unregister(id).is_ok() {
                        unbound += 1;
                    }
                }
            }
            pending.extend(self.host.children(&node));
        }
        self.host.release(root);
        unbound
    }

    fn release_listeners(&mut self, id: NodeId, node: &H::Node) {
        for entry in self.listeners.remove_node(id) {
            if let Err(e) = self
                .host
                .remove_listener(node, &entry.event_type, entry.capture)
            {
                tracing::debug!("{} listener on node {} already gone: {}", entry.event_type, id, e);
            }
        }
    }

    /// Drop everything the producer built and start over from an empty
    /// mount root. Templates stay cached.
    pub fn reset(&mut self) -> Result<()> {
        let with_listeners: Vec<NodeId> = self.listeners.nodes().collect();
        for id in with_listeners {
            if let Ok(node) = self.registry.resolve(id) {
                let node = node.clone();
                self.release_listeners(id, &node);
            }
        }
        self.listeners.clear();

        // Bound nodes that never made it into the tree
        let detached: Vec<H::Node> = self
            .registry
            .ids()
            .filter(|id| *id != ROOT_ID)
            .filter_map(|id| self.registry.resolve(id).ok())
            .filter(|node| self.host.parent(node).is_none())
            .cloned()
            .collect();
        for node in &detached {
            self.host.release(node);
        }

        let root = self.registry.resolve(ROOT_ID)?.clone();
        for child in self.host.children(&root) {
            self.host
                .remove_child(&root, &child)
                .map_err(ApplyError::host("reset"))?;
            self.host.release(&child);
        }

        let unbound = self.registry.clear_except_root();
        self.stack.clear();
        self.active = None;
        self.state = ApplyState::Idle;
        tracing::info!("interpreter reset, {} ids unbound", unbound);
        Ok(())
    }
}

impl<H: HostTree> std::fmt::Debug for Interpreter<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("state", &self.state)
            .field("bound_ids", &self.registry.len())
            .field("templates", &self.templates.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::EditWriter;
    use crate::events::{EventData, EventRecord, EventResponse};
    use crate::template::TemplateNode;
    use dom::{DomArena, DomSerializer, NodeIndex, SyntheticEvent};
    use std::cell::RefCell;

    type Writer = EditWriter<NodeIndex>;

    fn setup() -> Interpreter<DomArena> {
        let (arena, mount) = DomArena::with_mount("main").unwrap();
        Interpreter::new(arena, mount)
    }

    fn html(interp: &Interpreter<DomArena>) -> String {
        let mount = *interp.node(ROOT_ID).unwrap();
        DomSerializer::new()
            .inner_html(interp.host(), mount)
            .unwrap()
    }

    fn apply(interp: &mut Interpreter<DomArena>, writer: Writer) -> Result<ApplyStats> {
        let (bytes, values) = writer.finish();
        interp.apply_edits(&bytes, values)
    }

    fn recorder(
        interp: &Interpreter<DomArena>,
        response: EventResponse,
    ) -> Rc<RefCell<Vec<EventRecord>>> {
        let records = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&records);
        interp.set_event_sink(Rc::new(move |record: EventRecord| {
            log.borrow_mut().push(record);
            response
        }));
        records
    }

    #[test]
    fn test_create_div_with_text() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("div", 1)
            .create_text_node("hi", 2)
            .append_children(None, 1)
            .append_children(Some(ROOT_ID), 1);

        let stats = apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), "<div>hi</div>");
        assert_eq!(stats.ops, 4);
        assert_eq!(stats.created, 2);
        assert_eq!(interp.state(), ApplyState::Idle);

        let text = *interp.node(2).unwrap();
        assert_eq!(
            HostTree::parent(interp.host(), &text),
            Some(*interp.node(1).unwrap())
        );
    }

    #[test]
    fn test_append_preserves_emission_order() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("ul", 1);
        for (id, name) in [(2, "a"), (3, "b"), (4, "c")] {
            w.create_element("li", id).set_attribute_str(id, "id", name);
        }
        w.append_children(None, 3).append_children(Some(ROOT_ID), 1);

        apply(&mut interp, w).unwrap();
        assert_eq!(
            html(&interp),
            r#"<ul><li id="a"></li><li id="b"></li><li id="c"></li></ul>"#
        );
    }

    #[test]
    fn test_template_instances_are_independent() {
        let mut interp = setup();
        let descriptor = TemplateDescriptor::new(TemplateNode::Element {
            tag: "div".to_string(),
            namespace: None,
            attrs: vec![crate::template::TemplateAttribute::Static {
                name: "class".to_string(),
                value: "x".to_string(),
                namespace: None,
            }],
            children: vec![],
        });
        assert!(interp.register_template(7, &descriptor).unwrap());

        let mut w = Writer::new();
        w.load_template(7, 1)
            .load_template(7, 2)
            .set_attribute_str(1, "class", "changed")
            .append_children(Some(ROOT_ID), 2);

        apply(&mut interp, w).unwrap();
        assert_eq!(
            html(&interp),
            r#"<div class="changed"></div><div class="x"></div>"#
        );
    }

    #[test]
    fn test_attribute_slot_fills_only_its_instance() {
        let mut interp = setup();
        let descriptor = TemplateDescriptor::from_json(
            r#"{"root": {"type": "element", "tag": "div",
                "attrs": [
                    {"type": "static", "name": "class", "value": "x"},
                    {"type": "dynamic", "name": "class", "slot": 0}
                ]}}"#,
        )
        .unwrap();
        interp.register_template(7, &descriptor).unwrap();

        let mut w = Writer::new();
        w.load_template(7, 1)
            .set_node(0, "y")
            .load_template(7, 2)
            .append_children(Some(ROOT_ID), 2);

        apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), r#"<div class="y"></div><div class="x"></div>"#);
    }

    fn card() -> TemplateDescriptor {
        TemplateDescriptor::from_json(
            r#"{"root": {"type": "element", "tag": "div",
                "attrs": [{"type": "dynamic", "name": "title", "slot": 0}],
                "children": [
                    {"type": "element", "tag": "h1", "children": [{"type": "dynamic_text", "slot": 1}]},
                    {"type": "dynamic", "slot": 2}
                ]}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_set_node_fills_every_slot_kind() {
        let mut interp = setup();
        interp.register_template(1, &card()).unwrap();

        let mut w = Writer::new();
        w.load_template(1, 10)
            .set_node(0, "hello")
            .set_node(1, "Title")
            .set_node(2, "body")
            .append_children(Some(ROOT_ID), 1);

        apply(&mut interp, w).unwrap();
        assert_eq!(
            html(&interp),
            r#"<div title="hello"><h1>Title</h1>body</div>"#
        );
    }

    #[test]
    fn test_set_node_with_host_node() {
        let mut interp = setup();
        interp.register_template(1, &card()).unwrap();
        let span = interp.host_mut().create_element("span").unwrap();

        let mut w = Writer::new();
        w.load_template(1, 10)
            .set_node(2, DynamicValue::Node(span))
            .append_children(Some(ROOT_ID), 1);

        apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), "<div><h1></h1><span></span></div>");
    }

    #[test]
    fn test_assign_slot_id_binds_placeholder() {
        let mut interp = setup();
        interp.register_template(1, &card()).unwrap();

        let mut w = Writer::new();
        w.load_template(1, 10)
            .assign_slot_id(2, 11)
            .append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), "<div><h1></h1><!--placeholder--></div>");

        let mut w = Writer::new();
        w.create_element("b", 12).replace_with(11, 1);
        let stats = apply(&mut interp, w).unwrap();

        assert_eq!(stats.removed, 1);
        assert_eq!(html(&interp), "<div><h1></h1><b></b></div>");
        assert!(matches!(interp.node(11), Err(ApplyError::UnknownId(11))));
    }

    #[test]
    fn test_slot_ops_need_a_loaded_template() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.set_node(0, "x");
        assert!(matches!(
            apply(&mut interp, w),
            Err(ApplyError::UnknownSlot(0))
        ));

        let mut w = Writer::new();
        w.load_template(3, 1);
        assert!(matches!(
            apply(&mut interp, w),
            Err(ApplyError::UnknownTemplate(3))
        ));
    }

    #[test]
    fn test_removed_node_delivers_no_events() {
        let (arena, mount) = DomArena::with_mount("main").unwrap();
        let mut interp = Interpreter::new(arena.retain_released(true), mount);
        let records = recorder(&interp, EventResponse::Continue);

        let mut w = Writer::new();
        w.create_element("button", 5)
            .new_event_listener("click", 5, 42, true)
            .append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();

        let button = *interp.node(5).unwrap();
        let click = SyntheticEvent::new("click").with_field("clientX", 4);
        assert!(interp.host().dispatch_event(button, &click).unwrap());
        assert_eq!(records.borrow().len(), 1);
        assert_eq!(records.borrow()[0].target, 5);
        assert_eq!(records.borrow()[0].handler, 42);

        let mut w = Writer::new();
        w.remove(5);
        apply(&mut interp, w).unwrap();
        assert!(interp.listeners().is_empty());

        // The detached button is still alive in the host
        assert_eq!(interp.host().listener_count(button), 0);
        let delivered = interp
            .host()
            .dispatch_event(button, &SyntheticEvent::new("click"));
        assert!(matches!(delivered, Ok(true)));
        assert_eq!(records.borrow().len(), 1);
        assert_eq!(html(&interp), "");
    }

    #[test]
    fn test_set_text_on_element_unbinds_children() {
        let mut interp = setup();
        let records = recorder(&interp, EventResponse::Continue);

        let mut w = Writer::new();
        w.create_element("div", 1)
            .create_element("span", 2)
            .new_event_listener("click", 2, 9, true)
            .append_children(None, 1)
            .append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();
        assert_eq!(interp.listeners().len(), 1);

        let mut w = Writer::new();
        w.set_text(1, "x");
        let stats = apply(&mut interp, w).unwrap();
        assert_eq!(stats.removed, 1);
        assert_eq!(html(&interp), "<div>x</div>");
        assert!(matches!(interp.node(2), Err(ApplyError::UnknownId(2))));
        assert!(interp.listeners().is_empty());

        let mut w = Writer::new();
        w.remove(2);
        assert!(matches!(
            apply(&mut interp, w),
            Err(ApplyError::UnknownId(2))
        ));
        assert_eq!(html(&interp), "<div>x</div>");

        let div = *interp.node(1).unwrap();
        interp
            .host()
            .dispatch_event(div, &SyntheticEvent::new("click"))
            .unwrap();
        assert!(records.borrow().is_empty());
    }

    #[test]
    fn test_capture_listener_and_prevent_default() {
        let mut interp = setup();
        let records = recorder(&interp, EventResponse::PreventDefault);

        let mut w = Writer::new();
        w.create_element("form", 1)
            .create_element("input", 2)
            .append_children(None, 1)
            .new_event_listener("input", 1, 9, false)
            .append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();

        let input = *interp.node(2).unwrap();
        let event = SyntheticEvent::new("input")
            .with_field("value", "abc")
            .with_form_value("q", "abc");
        let proceed = interp.host().dispatch_event(input, &event).unwrap();

        assert!(!proceed);
        let records = records.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, 1);
        assert!(!records[0].bubbles);
        match &records[0].data {
            EventData::Form(form) => {
                assert_eq!(form.value.as_deref(), Some("abc"));
                assert_eq!(form.values["q"], vec!["abc"]);
            }
            other => panic!("Expected form data, got {:?}", other),
        }
    }

    #[test]
    fn test_remove_event_listener() {
        let mut interp = setup();
        let records = recorder(&interp, EventResponse::Continue);

        let mut w = Writer::new();
        w.create_element("a", 1)
            .new_event_listener("click", 1, 1, true)
            .new_event_listener("click", 1, 2, true)
            .append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();
        assert_eq!(interp.listeners().len(), 1);

        let a = *interp.node(1).unwrap();
        interp
            .host()
            .dispatch_event(a, &SyntheticEvent::new("click"))
            .unwrap();
        assert_eq!(records.borrow()[0].handler, 2);

        let mut w = Writer::new();
        w.remove_event_listener(1, "click", true)
            .remove_event_listener(1, "click", true);
        apply(&mut interp, w).unwrap();

        interp
            .host()
            .dispatch_event(a, &SyntheticEvent::new("click"))
            .unwrap();
        assert_eq!(records.borrow().len(), 1);
        assert_eq!(interp.host().listener_count(a), 0);
    }

    #[test]
    fn test_unknown_id() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.set_attribute_str(99, "class", "x");
        assert!(matches!(
            apply(&mut interp, w),
            Err(ApplyError::UnknownId(99))
        ));
    }

    #[test]
    fn test_duplicate_id() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("div", 1).create_element("p", 1);
        assert!(matches!(
            apply(&mut interp, w),
            Err(ApplyError::DuplicateId(1))
        ));
    }

    #[test]
    fn test_stack_imbalance_keeps_registry() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("div", 1);

        assert!(matches!(
            apply(&mut interp, w),
            Err(ApplyError::StackImbalance { remaining: 1 })
        ));
        assert!(interp.node(1).is_ok());

        let mut w = Writer::new();
        w.push_root(1).append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), "<div></div>");
    }

    #[test]
    fn test_lenient_stack_balance() {
        let (arena, mount) = DomArena::with_mount("main").unwrap();
        let config = InterpreterConfig {
            strict_stack_balance: false,
            ..Default::default()
        };
        let mut interp = Interpreter::with_config(arena, mount, config);

        let mut w = Writer::new();
        w.create_element("div", 1);
        assert!(apply(&mut interp, w).is_ok());
    }

    #[test]
    fn test_stack_underflow() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("div", 1).append_children(Some(ROOT_ID), 2);
        assert!(matches!(
            apply(&mut interp, w),
            Err(ApplyError::StackUnderflow {
                op: "AppendChildren",
                needed: 2,
                available: 1
            })
        ));
    }

    #[test]
    fn test_set_node_value_kind_mismatch() {
        let mut interp = setup();
        let descriptor = TemplateDescriptor::from_json(
            r#"{"root": {"type": "element", "tag": "p",
                "children": [{"type": "dynamic_text", "slot": 0}]}}"#,
        )
        .unwrap();
        interp.register_template(1, &descriptor).unwrap();
        let bold = interp.host_mut().create_element("b").unwrap();

        let mut w = Writer::new();
        w.load_template(1, 1)
            .append_children(Some(ROOT_ID), 1)
            .set_node(0, DynamicValue::Node(bold));
        let err = apply(&mut interp, w).unwrap_err();
        assert!(matches!(
            err,
            ApplyError::HostOperationFailed { op: "SetNode", .. }
        ));
        assert_eq!(html(&interp), "<p></p>");
    }

    #[test]
    fn test_malformed_stream_applies_nothing() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("div", 1).append_children(Some(ROOT_ID), 1);
        let (mut bytes, values) = w.finish();
        bytes.push(0xEE);

        let err = interp.apply_edits(&bytes, values).unwrap_err();
        assert!(matches!(err, ApplyError::MalformedStream(_)));
        assert_eq!(html(&interp), "");
        assert_eq!(interp.registry().len(), 1);

        // Same value consumed twice
        let mut w = Writer::new();
        w.create_text_node("hi", 1)
            .edit(Edit::CreateTextNode { value: 0, id: 2 })
            .append_children(Some(ROOT_ID), 2);
        assert!(matches!(
            apply(&mut interp, w),
            Err(ApplyError::MalformedStream(_))
        ));
        assert_eq!(interp.registry().len(), 1);
    }

    #[test]
    fn test_runtime_error_keeps_earlier_mutations() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("div", 1)
            .append_children(Some(ROOT_ID), 1)
            .set_text(77, "lost");

        assert!(matches!(
            apply(&mut interp, w),
            Err(ApplyError::UnknownId(77))
        ));
        assert_eq!(html(&interp), "<div></div>");
        assert_eq!(interp.state(), ApplyState::Idle);
    }

    #[test]
    fn test_boolean_and_style_attributes() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("input", 1)
            .set_attribute(1, "disabled", true, None)
            .set_attribute(1, "aria-hidden", false, None)
            .set_attribute(1, "color", "red", Some("style"))
            .set_attribute(1, "margin", "0", Some("style"))
            .append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();
        assert_eq!(
            html(&interp),
            r#"<input disabled aria-hidden="false" style="color: red; margin: 0;">"#
        );

        let mut w = Writer::new();
        w.set_attribute(1, "disabled", "false", None)
            .remove_attribute(1, "color", Some("style"))
            .set_attribute(1, "title", "t", None)
            .set_attribute(1, "title", Option::<String>::None, None);
        apply(&mut interp, w).unwrap();
        assert_eq!(
            html(&interp),
            r#"<input aria-hidden="false" style="margin: 0;">"#
        );
    }

    #[test]
    fn test_insert_and_replace() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("a", 1).append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();

        let mut w = Writer::new();
        w.create_element("b", 2)
            .insert_before(1, 1)
            .create_element("i", 3)
            .create_element("s", 4)
            .insert_after(1, 2);
        apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), "<b></b><a></a><i></i><s></s>");

        let mut w = Writer::new();
        w.create_element("u", 5).replace_with(1, 1);
        apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), "<b></b><u></u><i></i><s></s>");
        assert!(interp.node(1).is_err());
    }

    #[test]
    fn test_remove_unbinds_whole_subtree() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("div", 1)
            .create_element("span", 2)
            .create_text_node("x", 3)
            .append_children(None, 1)
            .append_children(None, 1)
            .new_event_listener("click", 2, 1, true)
            .append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), "<div><span>x</span></div>");

        let mut w = Writer::new();
        w.remove(1);
        let stats = apply(&mut interp, w).unwrap();

        assert_eq!(stats.removed, 3);
        assert_eq!(interp.registry().len(), 1);
        assert!(interp.listeners().is_empty());
        assert_eq!(html(&interp), "");
    }

    #[test]
    fn test_mount_root_is_protected() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.remove(ROOT_ID);
        assert!(matches!(
            apply(&mut interp, w),
            Err(ApplyError::HostOperationFailed { op: "Remove", .. })
        ));

        let mut w = Writer::new();
        w.free_id(ROOT_ID);
        assert!(apply(&mut interp, w).is_err());
        assert!(interp.node(ROOT_ID).is_ok());
    }

    #[test]
    fn test_free_id_leaves_tree() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("div", 1)
            .append_children(Some(ROOT_ID), 1)
            .free_id(1);
        apply(&mut interp, w).unwrap();

        assert!(interp.node(1).is_err());
        assert_eq!(html(&interp), "<div></div>");

        // The id can be bound again
        let mut w = Writer::new();
        w.create_element("p", 1).append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), "<div></div><p></p>");
    }

    #[test]
    fn test_push_and_pop_root() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.push_root(ROOT_ID)
            .create_element("span", 1)
            .append_children(None, 1)
            .pop_root();
        apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), "<span></span>");
    }

    #[test]
    fn test_set_text_and_namespaced_element() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element_ns("svg", dom::SVG_NAMESPACE, 1)
            .create_placeholder(2)
            .create_text_node("old", 3)
            .append_children(Some(ROOT_ID), 3)
            .set_text(3, DynamicValue::Bytes(b"new".to_vec()));
        apply(&mut interp, w).unwrap();

        assert_eq!(html(&interp), "<svg></svg><!--placeholder-->new");
        let svg = *interp.node(1).unwrap();
        assert_eq!(
            interp.host().get(svg).unwrap().namespace.as_deref(),
            Some(dom::SVG_NAMESPACE)
        );
    }

    #[test]
    fn test_focus_and_blur() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("input", 1).append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();

        let input = *interp.node(1).unwrap();
        interp.focus(1).unwrap();
        assert!(interp.host().get(input).unwrap().focused);
        interp.blur(1).unwrap();
        assert!(!interp.host().get(input).unwrap().focused);
        assert!(matches!(interp.focus(8), Err(ApplyError::UnknownId(8))));
    }

    #[test]
    fn test_scroll_into_view_and_client_rect() {
        let mut interp = setup();
        let mut w = Writer::new();
        w.create_element("section", 1)
            .create_text_node("t", 2)
            .append_children(None, 1)
            .append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();

        let section = *interp.node(1).unwrap();
        let rect = ClientRect {
            x: 0.0,
            y: 480.0,
            width: 320.0,
            height: 90.0,
        };
        interp.host_mut().set_client_rect(section, rect).unwrap();
        assert_eq!(interp.client_rect(1).unwrap(), rect);
        assert_eq!(interp.client_rect(2).unwrap(), ClientRect::default());

        interp.scroll_into_view(1, ScrollBehavior::Smooth).unwrap();
        assert_eq!(
            interp.host().scroll_target(),
            Some((section, ScrollBehavior::Smooth))
        );
        assert!(matches!(
            interp.scroll_into_view(2, ScrollBehavior::Auto),
            Err(ApplyError::HostOperationFailed {
                op: "scroll_into_view",
                ..
            })
        ));
        assert!(matches!(interp.client_rect(9), Err(ApplyError::UnknownId(9))));
    }

    #[test]
    fn test_reset_starts_over() {
        let mut interp = setup();
        interp.register_template(1, &card()).unwrap();

        let mut w = Writer::new();
        w.load_template(1, 1)
            .new_event_listener("click", 1, 1, true)
            .append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();

        interp.reset().unwrap();
        assert_eq!(html(&interp), "");
        assert_eq!(interp.registry().len(), 1);
        assert!(interp.listeners().is_empty());
        assert!(interp.has_template(1));

        let mut w = Writer::new();
        w.load_template(1, 1).append_children(Some(ROOT_ID), 1);
        apply(&mut interp, w).unwrap();
        assert_eq!(html(&interp), "<div><h1></h1><!--placeholder--></div>");
    }

    #[test]
    fn test_config_from_json_defaults() {
        let config: InterpreterConfig = serde_json::from_str(r#"{"initial_capacity": 8}"#).unwrap();
        assert_eq!(config.initial_capacity, 8);
        assert!(config.strict_stack_balance);
    }
}
