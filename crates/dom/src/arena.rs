//! Arena-based host tree storage
//!
//! Every node lives in one Vec, handles are 4-byte indices. Released
//! subtrees leave vacant slots that the free list hands out again.
//!
//! ## Memory Layout
//!
//! ```text
//! Arena: Vec<Option<DomNode>>
//!        [Doc][Node1][----][Node3]...
//!         ↑ index 0 is always the document
//! ```

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::error::{DomError, Result};
use crate::events::{RegisteredListener, SyntheticEvent};
use crate::host::{HostTree, Listener};
use crate::types::{ClientRect, DomNode, NodeIndex, NodeType, ScrollBehavior};

/// Arena allocator for host nodes
///
/// Design:
/// - Single Vec for sequential allocation
/// - Free list for released slots
/// - Listeners stored beside the nodes, keyed by index
pub struct DomArena {
    /// All nodes stored sequentially (cache-friendly)
    nodes: Vec<Option<DomNode>>,

    /// Vacant slots ready for reuse
    free: Vec<NodeIndex>,

    /// Native listeners per node
    pub(crate) listeners: AHashMap<NodeIndex, SmallVec<[RegisteredListener; 2]>>,

    /// Root node ID (the document)
    root_id: NodeIndex,

    /// `release` only detaches, slots are never recycled
    retain_released: bool,

    /// Most recent `scroll_into_view` request
    scroll_target: Option<(NodeIndex, ScrollBehavior)>,
}

impl DomArena {
    /// Create an arena holding just the document node
    pub fn new() -> Self {
        Self::with_capacity(1024) // Pre-allocate for typical page
    }

    /// Create arena with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(Some(DomNode::new(0, NodeType::Document, "#document")));
        Self {
            nodes,
            free: Vec::new(),
            listeners: AHashMap::new(),
            root_id: 0,
            retain_released: false,
            scroll_target: None,
        }
    }

    /// Keep released subtrees alive as detached nodes, the way a
    /// garbage-collected host keeps nodes that are still referenced
    pub fn retain_released(mut self, retain: bool) -> Self {
        self.retain_released = retain;
        self
    }

    /// Create an arena with one element mounted under the document
    pub fn with_mount(tag: &str) -> Result<(Self, NodeIndex)> {
        let mut arena = Self::new();
        let mount = arena.create_element(tag)?;
        let document = arena.document();
        arena.append_child(document, mount)?;
        Ok((arena, mount))
    }

    /// The document node
    pub fn document(&self) -> NodeIndex {
        self.root_id
    }

    fn add_node(&mut self, mut node: DomNode) -> NodeIndex {
        match self.free.pop() {
            Some(index) => {
                node.index = index;
                self.nodes[index as usize] = Some(node);
                index
            }
            None => {
                let index = self.nodes.len() as NodeIndex;
                node.index = index;
                self.nodes.push(Some(node));
                index
            }
        }
    }

    /// Get node by index (immutable)
    pub fn get(&self, index: NodeIndex) -> Result<&DomNode> {
        self.nodes
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or(DomError::NodeNotFound(index))
    }

    /// Get node by index (mutable)
    pub fn get_mut(&mut self, index: NodeIndex) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(index as usize)
            .and_then(Option::as_mut)
            .ok_or(DomError::NodeNotFound(index))
    }

    /// Number of live nodes (document included)
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// True when only the document is left
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Iterator over all live nodes
    pub fn iter(&self) -> impl Iterator<Item = &DomNode> {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    /// Create an element node (detached)
    pub fn create_element(&mut self, tag: &str) -> Result<NodeIndex> {
        validate_name(tag)?;
        Ok(self.add_node(DomNode::new(0, NodeType::Element, tag)))
    }

    /// Create an element node under a namespace (detached)
    pub fn create_element_ns(&mut self, tag: &str, namespace: &str) -> Result<NodeIndex> {
        validate_name(tag)?;
        if namespace.is_empty() {
            return Err(DomError::InvalidNamespace(namespace.to_string()));
        }
        let mut node = DomNode::new(0, NodeType::Element, tag);
        node.namespace = Some(namespace.to_string());
        Ok(self.add_node(node))
    }

    /// Create a text node (detached)
    pub fn create_text(&mut self, text: &str) -> NodeIndex {
        let mut node = DomNode::new(0, NodeType::Text, "#text");
        node.node_value = text.to_string();
        self.add_node(node)
    }

    /// Create a comment node (detached)
    pub fn create_comment(&mut self, text: &str) -> NodeIndex {
        let mut node = DomNode::new(0, NodeType::Comment, "#comment");
        node.node_value = text.to_string();
        self.add_node(node)
    }

    /// Get children of a node
    pub fn children(&self, index: NodeIndex) -> Result<Vec<&DomNode>> {
        let node = self.get(index)?;
        node.children.iter().map(|&child| self.get(child)).collect()
    }

    /// Get parent of a node
    pub fn parent(&self, index: NodeIndex) -> Result<Option<&DomNode>> {
        let node = self.get(index)?;
        match node.parent {
            Some(parent) => Ok(Some(self.get(parent)?)),
            None => Ok(None),
        }
    }

    /// Is `ancestor` equal to or above `node`
    pub fn is_inclusive_ancestor(&self, ancestor: NodeIndex, node: NodeIndex) -> bool {
        let mut current = Some(node);
        while let Some(index) = current {
            if index == ancestor {
                return true;
            }
            current = self.get(index).ok().and_then(|n| n.parent);
        }
        false
    }

    /// Detach a node from its parent, if it has one
    pub fn detach(&mut self, index: NodeIndex) -> Result<()> {
        let parent = self.get(index)?.parent;
        if let Some(parent) = parent {
            self.get_mut(parent)?.children.retain(|c| *c != index);
            self.get_mut(index)?.parent = None;
        }
        Ok(())
    }

    /// Insert `child` under `parent` before `reference` (or last)
    pub fn insert_before(
        &mut self,
        parent: NodeIndex,
        child: NodeIndex,
        reference: Option<NodeIndex>,
    ) -> Result<()> {
        let parent_node = self.get(parent)?;
        if !matches!(
            parent_node.node_type,
            NodeType::Element | NodeType::Document | NodeType::DocumentFragment
        ) {
            return Err(DomError::InvalidNodeType {
                expected: "container".to_string(),
                actual: parent_node.node_type.name().to_string(),
            });
        }
        if self.get(child)?.node_type == NodeType::Document {
            return Err(DomError::HierarchyRequest(
                "document cannot be inserted".to_string(),
            ));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest(format!(
                "inserting {} under {} would create a cycle",
                child, parent
            )));
        }
        if let Some(reference) = reference {
            if self.get(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }
        // Inserting a node before itself is a no-op
        if reference == Some(child) {
            return Ok(());
        }

        self.detach(child)?;

        let parent_node = self.get_mut(parent)?;
        let position = reference
            .and_then(|r| parent_node.children.iter().position(|c| *c == r))
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(position, child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Append `child` as last child of `parent`
    pub fn append_child(&mut self, parent: NodeIndex, child: NodeIndex) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeIndex, child: NodeIndex) -> Result<()> {
        if self.get(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child)
    }

    /// Next sibling in the parent's child list
    pub fn next_sibling(&self, index: NodeIndex) -> Option<NodeIndex> {
        let parent = self.get(index).ok()?.parent?;
        let siblings = &self.get(parent).ok()?.children;
        let position = siblings.iter().position(|c| *c == index)?;
        siblings.get(position + 1).copied()
    }

    /// Structural copy of a node, optionally with its whole subtree.
    ///
    /// Iterative, so deep templates cannot blow the stack.
    pub fn clone_node(&mut self, index: NodeIndex, deep: bool) -> Result<NodeIndex> {
        let copy_of = |node: &DomNode| {
            let mut copy = node.clone();
            copy.parent = None;
            copy.children = SmallVec::new();
            copy.focused = false;
            copy.rect = None;
            copy
        };

        let root = copy_of(self.get(index)?);
        let new_root = self.add_node(root);
        if !deep {
            return Ok(new_root);
        }

        // (source, destination parent)
        let mut stack: Vec<(NodeIndex, NodeIndex)> = self
            .get(index)?
            .children
            .iter()
            .rev()
            .map(|&c| (c, new_root))
            .collect();

        while let Some((source, dest_parent)) = stack.pop() {
            let source_node = self.get(source)?;
            let copy = copy_of(source_node);
            let grandchildren: SmallVec<[NodeIndex; 4]> = source_node.children.clone();

            let new_index = self.add_node(copy);
            self.get_mut(new_index)?.parent = Some(dest_parent);
            self.get_mut(dest_parent)?.children.push(new_index);

            for &child in grandchildren.iter().rev() {
                stack.push((child, new_index));
            }
        }

        Ok(new_root)
    }

    /// Free a node and its subtree. The node is detached first.
    pub fn release_subtree(&mut self, index: NodeIndex) -> Result<()> {
        if index == self.root_id {
            return Err(DomError::HierarchyRequest(
                "document cannot be released".to_string(),
            ));
        }
        self.detach(index)?;

        let mut doomed = Vec::new();
        self.traverse_df(index, |node| {
            doomed.push(node.index);
            Ok(())
        })?;

        for slot in doomed {
            self.nodes[slot as usize] = None;
            self.listeners.remove(&slot);
            self.free.push(slot);
        }
        Ok(())
    }

    /// Traverse tree depth-first (iterative, no recursion)
    pub fn traverse_df<F>(&self, start: NodeIndex, mut visit: F) -> Result<()>
    where
        F: FnMut(&DomNode) -> Result<()>,
    {
        let mut stack = vec![start];

        while let Some(index) = stack.pop() {
            let node = self.get(index)?;
            visit(node)?;

            // Push children in reverse order (so they're visited left-to-right)
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }

        Ok(())
    }

    /// Record the layout box of a node
    pub fn set_client_rect(&mut self, index: NodeIndex, rect: ClientRect) -> Result<()> {
        self.get_mut(index)?.rect = Some(rect);
        Ok(())
    }

    /// Node the viewport was last asked to scroll to
    pub fn scroll_target(&self) -> Option<(NodeIndex, ScrollBehavior)> {
        self.scroll_target
    }

    /// Number of native listeners attached to a node
    pub fn listener_count(&self, index: NodeIndex) -> usize {
        self.listeners.get(&index).map_or(0, |l| l.len())
    }

    /// Drop everything but the document
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        if let Some(Some(document)) = self.nodes.first_mut() {
            document.children.clear();
        }
        self.free.clear();
        self.listeners.clear();
    }
}

impl Default for DomArena {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DomArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomArena")
            .field("nodes", &self.len())
            .field("free", &self.free.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '\'' | '/' | '='));
    if valid {
        Ok(())
    } else {
        Err(DomError::InvalidName(name.to_string()))
    }
}

impl HostTree for DomArena {
    type Node = NodeIndex;
    type Event = SyntheticEvent;
    type Error = DomError;

    fn create_element(&mut self, tag: &str) -> Result<NodeIndex> {
        DomArena::create_element(self, tag)
    }

    fn create_element_ns(&mut self, tag: &str, namespace: &str) -> Result<NodeIndex> {
        DomArena::create_element_ns(self, tag, namespace)
    }

    fn create_text_node(&mut self, text: &str) -> Result<NodeIndex> {
        Ok(self.create_text(text))
    }

    fn create_comment(&mut self, text: &str) -> Result<NodeIndex> {
        Ok(DomArena::create_comment(self, text))
    }

    fn clone_node(&mut self, node: &NodeIndex, deep: bool) -> Result<NodeIndex> {
        DomArena::clone_node(self, *node, deep)
    }

    fn append_child(&mut self, parent: &NodeIndex, child: &NodeIndex) -> Result<()> {
        DomArena::append_child(self, *parent, *child)
    }

    fn insert_before(
        &mut self,
        parent: &NodeIndex,
        child: &NodeIndex,
        reference: Option<&NodeIndex>,
    ) -> Result<()> {
        DomArena::insert_before(self, *parent, *child, reference.copied())
    }

    fn remove_child(&mut self, parent: &NodeIndex, child: &NodeIndex) -> Result<()> {
        DomArena::remove_child(self, *parent, *child)
    }

    fn parent(&self, node: &NodeIndex) -> Option<NodeIndex> {
        self.get(*node).ok()?.parent
    }

    fn next_sibling(&self, node: &NodeIndex) -> Option<NodeIndex> {
        DomArena::next_sibling(self, *node)
    }

    fn children(&self, node: &NodeIndex) -> Vec<NodeIndex> {
        self.get(*node)
            .map(|n| n.children.to_vec())
            .unwrap_or_default()
    }

    fn tag_name(&self, node: &NodeIndex) -> Option<String> {
        self.get(*node).ok()?.tag_name().map(String::from)
    }

    fn get_attribute(
        &self,
        node: &NodeIndex,
        name: &str,
        namespace: Option<&str>,
    ) -> Option<String> {
        self.get(*node)
            .ok()?
            .attr_ns(name, namespace)
            .map(String::from)
    }

    fn set_attribute(
        &mut self,
        node: &NodeIndex,
        name: &str,
        value: &str,
        namespace: Option<&str>,
    ) -> Result<()> {
        validate_name(name)?;
        let target = self.get_mut(*node)?;
        if !target.is_element() {
            return Err(DomError::InvalidNodeType {
                expected: "element".to_string(),
                actual: target.node_type.name().to_string(),
            });
        }
        target.set_attr(name, namespace, value);
        Ok(())
    }

    fn remove_attribute(
        &mut self,
        node: &NodeIndex,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<()> {
        self.get_mut(*node)?.remove_attr(name, namespace);
        Ok(())
    }

    fn text_content(&self, node: &NodeIndex) -> Option<String> {
        let target = self.get(*node).ok()?;
        match target.node_type {
            NodeType::Text | NodeType::Comment => Some(target.node_value.clone()),
            NodeType::Document => None,
            _ => crate::utils::get_text_content(self, *node).ok(),
        }
    }

    fn set_text_content(&mut self, node: &NodeIndex, text: &str) -> Result<()> {
        let node_type = self.get(*node)?.node_type;
        match node_type {
            NodeType::Text | NodeType::Comment => {
                let target = self.get_mut(*node)?;
                target.node_value.clear();
                target.node_value.push_str(text);
                Ok(())
            }
            NodeType::Element | NodeType::DocumentFragment => {
                // DOM semantics: replace every child with one text node
                let old: Vec<NodeIndex> = self.get(*node)?.children.to_vec();
                for child in old {
                    self.release_subtree(child)?;
                }
                if !text.is_empty() {
                    let text_node = self.create_text(text);
                    DomArena::append_child(self, *node, text_node)?;
                }
                Ok(())
            }
            NodeType::Document => Err(DomError::InvalidNodeType {
                expected: "text or element".to_string(),
                actual: node_type.name().to_string(),
            }),
        }
    }

    fn focus(&mut self, node: &NodeIndex) -> Result<()> {
        for other in self.nodes.iter_mut().flatten() {
            other.focused = false;
        }
        self.get_mut(*node)?.focused = true;
        Ok(())
    }

    fn blur(&mut self, node: &NodeIndex) -> Result<()> {
        self.get_mut(*node)?.focused = false;
        Ok(())
    }

    fn scroll_into_view(&mut self, node: &NodeIndex, behavior: ScrollBehavior) -> Result<()> {
        let target = self.get(*node)?;
        if !target.is_element() {
            return Err(DomError::InvalidNodeType {
                expected: "element".to_string(),
                actual: target.node_type.name().to_string(),
            });
        }
        self.scroll_target = Some((*node, behavior));
        Ok(())
    }

    /// Nodes nobody laid out report an empty box, like a detached element
    fn client_rect(&self, node: &NodeIndex) -> Result<ClientRect> {
        Ok(self.get(*node)?.rect.unwrap_or_default())
    }

    fn add_listener(
        &mut self,
        node: &NodeIndex,
        event_type: &str,
        capture: bool,
        listener: Listener<SyntheticEvent>,
    ) -> Result<()> {
        self.get(*node)?;
        let slot = self.listeners.entry(*node).or_default();
        match slot
            .iter_mut()
            .find(|l| l.event_type == event_type && l.capture == capture)
        {
            Some(existing) => existing.callback = listener,
            None => slot.push(RegisteredListener {
                event_type: event_type.to_string(),
                capture,
                callback: listener,
            }),
        }
        Ok(())
    }

    fn remove_listener(&mut self, node: &NodeIndex, event_type: &str, capture: bool) -> Result<()> {
        if let Some(slot) = self.listeners.get_mut(node) {
            slot.retain(|l| !(l.event_type == event_type && l.capture == capture));
            if slot.is_empty() {
                self.listeners.remove(node);
            }
        }
        Ok(())
    }

    fn release(&mut self, node: &NodeIndex) {
        let result = if self.retain_released {
            self.detach(*node)
        } else {
            self.release_subtree(*node)
        };
        if let Err(e) = result {
            tracing::debug!("release of node {} skipped: {}", node, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_basic() {
        let mut arena = DomArena::new();

        let id = arena.create_element("div").unwrap();
        assert_eq!(id, 1);

        let retrieved = arena.get(id).unwrap();
        assert_eq!(retrieved.node_name, "div");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_insert_before_moves_existing_child() {
        let (mut arena, mount) = DomArena::with_mount("main").unwrap();
        let a = arena.create_element("a").unwrap();
        let b = arena.create_element("b").unwrap();
        arena.append_child(mount, a).unwrap();
        arena.append_child(mount, b).unwrap();

        // Moving b in front of a must not duplicate it
        arena.insert_before(mount, b, Some(a)).unwrap();

        let order: Vec<_> = arena
            .children(mount)
            .unwrap()
            .iter()
            .map(|n| n.node_name.clone())
            .collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(arena.next_sibling(b), Some(a));
        assert_eq!(arena.next_sibling(a), None);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut arena = DomArena::new();
        let outer = arena.create_element("div").unwrap();
        let inner = arena.create_element("span").unwrap();
        arena.append_child(outer, inner).unwrap();

        let err = arena.append_child(inner, outer).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest(_)));
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let mut arena = DomArena::new();
        let div = arena.create_element("div").unwrap();
        let text = arena.create_text("hello");
        arena.append_child(div, text).unwrap();
        HostTree::set_attribute(&mut arena, &div, "class", "card", None).unwrap();

        let copy = arena.clone_node(div, true).unwrap();
        HostTree::set_attribute(&mut arena, &copy, "class", "changed", None).unwrap();

        assert_eq!(arena.get(div).unwrap().attr("class"), Some("card"));
        let copy_children = arena.children(copy).unwrap();
        assert_eq!(copy_children.len(), 1);
        assert_eq!(copy_children[0].node_value, "hello");
        assert_ne!(copy_children[0].index, text);
    }

    #[test]
    fn test_release_reuses_slots() {
        let (mut arena, mount) = DomArena::with_mount("main").unwrap();
        let div = arena.create_element("div").unwrap();
        let text = arena.create_text("x");
        arena.append_child(div, text).unwrap();
        arena.append_child(mount, div).unwrap();
        let live = arena.len();

        arena.release_subtree(div).unwrap();
        assert_eq!(arena.len(), live - 2);
        assert!(arena.get(div).is_err());
        assert!(arena.children(mount).unwrap().is_empty());

        let reused = arena.create_element("p").unwrap();
        assert!(reused == div || reused == text);
    }

    #[test]
    fn test_retained_release_only_detaches() {
        let (arena, mount) = DomArena::with_mount("main").unwrap();
        let mut arena = arena.retain_released(true);
        let p = arena.create_element("p").unwrap();
        arena.append_child(mount, p).unwrap();

        HostTree::release(&mut arena, &p);
        assert!(arena.get(p).is_ok());
        assert!(HostTree::parent(&arena, &p).is_none());
        assert_ne!(arena.create_element("b").unwrap(), p);
    }

    #[test]
    fn test_traverse_df() {
        let mut arena = DomArena::new();
        let root = arena.create_element("div").unwrap();
        let child1 = arena.create_element("span").unwrap();
        let child2 = arena.create_element("em").unwrap();
        arena.append_child(root, child1).unwrap();
        arena.append_child(root, child2).unwrap();

        let mut visited = Vec::new();
        arena
            .traverse_df(root, |node| {
                visited.push(node.node_name.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(visited, vec!["div", "span", "em"]);
    }

    #[test]
    fn test_set_text_content_on_element_replaces_children() {
        let mut arena = DomArena::new();
        let div = arena.create_element("div").unwrap();
        let span = arena.create_element("span").unwrap();
        arena.append_child(div, span).unwrap();

        HostTree::set_text_content(&mut arena, &div, "plain").unwrap();

        let children = arena.children(div).unwrap();
        assert_eq!(children.len(), 1);
        assert!(children[0].is_text());
        assert_eq!(HostTree::text_content(&arena, &div).as_deref(), Some("plain"));
    }

    #[test]
    fn test_scroll_and_client_rect() {
        let (mut arena, mount) = DomArena::with_mount("main").unwrap();
        let text = arena.create_text("t");
        arena.append_child(mount, text).unwrap();

        assert_eq!(
            HostTree::client_rect(&arena, &mount).unwrap(),
            ClientRect::default()
        );
        let rect = ClientRect {
            x: 1.0,
            y: 2.0,
            width: 30.0,
            height: 40.0,
        };
        arena.set_client_rect(mount, rect).unwrap();
        assert_eq!(HostTree::client_rect(&arena, &mount).unwrap(), rect);

        HostTree::scroll_into_view(&mut arena, &mount, ScrollBehavior::Smooth).unwrap();
        assert_eq!(arena.scroll_target(), Some((mount, ScrollBehavior::Smooth)));
        assert!(matches!(
            HostTree::scroll_into_view(&mut arena, &text, ScrollBehavior::Auto),
            Err(DomError::InvalidNodeType { .. })
        ));
    }

    #[test]
    fn test_invalid_tag_name() {
        let mut arena = DomArena::new();
        assert!(matches!(
            arena.create_element("not valid"),
            Err(DomError::InvalidName(_))
        ));
        assert!(matches!(
            arena.create_element_ns("svg", ""),
            Err(DomError::InvalidNamespace(_))
        ));
    }
}
