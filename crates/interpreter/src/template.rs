//! Template Cache - static fragments built once, cloned per use
//!
//! A descriptor is compiled into a detached host fragment plus a slot
//! table. Each slot remembers the child-index path from the fragment root,
//! which stays valid for every deep clone since clones are structural.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::rc::Rc;

use dom::HostTree;

use crate::error::{ApplyError, Result};
use crate::types::TemplateId;

/// Child indices from the template root down to a slot's node
pub type SlotPath = SmallVec<[u32; 8]>;

/// Template as the producer describes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub root: TemplateNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateNode {
    Element {
        tag: String,
        #[serde(default)]
        namespace: Option<String>,
        #[serde(default)]
        attrs: Vec<TemplateAttribute>,
        #[serde(default)]
        children: Vec<TemplateNode>,
    },
    Text {
        text: String,
    },
    /// Text node whose content arrives later via SetNode
    DynamicText {
        slot: u32,
    },
    /// Placeholder replaced by a node or text via SetNode
    Dynamic {
        slot: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateAttribute {
    Static {
        name: String,
        value: String,
        #[serde(default)]
        namespace: Option<String>,
    },
    Dynamic {
        name: String,
        #[serde(default)]
        namespace: Option<String>,
        slot: u32,
    },
}

impl TemplateDescriptor {
    pub fn new(root: TemplateNode) -> Self {
        Self { root }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Number of slots declared anywhere in the tree
    pub fn slot_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            match node {
                TemplateNode::Element {
                    attrs, children, ..
                } => {
                    count += attrs
                        .iter()
                        .filter(|a| matches!(a, TemplateAttribute::Dynamic { .. }))
                        .count();
                    stack.extend(children.iter());
                }
                TemplateNode::DynamicText { .. } | TemplateNode::Dynamic { .. } => count += 1,
                TemplateNode::Text { .. } => {}
            }
        }
        count
    }
}

/// What a slot accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    /// Placeholder comment, replaced wholesale
    Node,
    /// Text node, content rewritten
    Text,
    /// Attribute on the element at the slot path
    Attribute {
        name: String,
        namespace: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDef {
    pub path: SlotPath,
    pub kind: SlotKind,
}

#[derive(Debug)]
struct CachedTemplate<N> {
    fragment: N,
    slots: Rc<[SlotDef]>,
}

/// A fresh clone of a template and the handles of its slots, by slot index
#[derive(Debug)]
pub struct TemplateInstance<N> {
    pub root: N,
    pub handles: Vec<N>,
    pub slots: Rc<[SlotDef]>,
}

impl<N> TemplateInstance<N> {
    pub fn kind(&self, slot: u32) -> Option<&SlotKind> {
        self.slots.get(slot as usize).map(|def| &def.kind)
    }
}

#[derive(Debug)]
pub struct TemplateCache<N> {
    templates: AHashMap<TemplateId, CachedTemplate<N>>,
}

impl<N: Clone> TemplateCache<N> {
    pub fn new() -> Self {
        Self {
            templates: AHashMap::new(),
        }
    }

    pub fn contains(&self, id: TemplateId) -> bool {
        self.templates.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Compile and cache a template.
    ///
    /// Returns false when `id` was already registered; the cached fragment
    /// is kept and the descriptor ignored.
    pub fn register<H>(
        &mut self,
        host: &mut H,
        id: TemplateId,
        descriptor: &TemplateDescriptor,
    ) -> Result<bool>
    where
        H: HostTree<Node = N>,
    {
        if self.templates.contains_key(&id) {
            tracing::debug!("template {} already registered, keeping cached copy", id);
            return Ok(false);
        }

        if matches!(
            descriptor.root,
            TemplateNode::Dynamic { .. } | TemplateNode::DynamicText { .. }
        ) {
            return Err(ApplyError::InvalidTemplate {
                id,
                reason: "root must be a static element or text node".to_string(),
            });
        }

        let mut slots: Vec<(u32, SlotDef)> = Vec::new();
        let mut path = SlotPath::new();
        let fragment = build_node(host, &descriptor.root, &mut path, &mut slots)?;

        slots.sort_by_key(|(slot, _)| *slot);
        for (expected, (slot, _)) in slots.iter().enumerate() {
            if *slot as usize != expected {
                host.release(&fragment);
                let reason = if (*slot as usize) < expected {
                    format!("slot {} declared twice", slot)
                } else {
                    format!("slot {} missing", expected)
                };
                return Err(ApplyError::InvalidTemplate { id, reason });
            }
        }

        tracing::debug!("cached template {} with {} slots", id, slots.len());
        self.templates.insert(
            id,
            CachedTemplate {
                fragment,
                slots: slots.into_iter().map(|(_, def)| def).collect(),
            },
        );
        Ok(true)
    }

    /// Deep-clone a cached template and locate its slots in the clone
    pub fn instantiate<H>(&self, host: &mut H, id: TemplateId) -> Result<TemplateInstance<N>>
    where
        H: HostTree<Node = N>,
    {
        let cached = self
            .templates
            .get(&id)
            .ok_or(ApplyError::UnknownTemplate(id))?;

        let root = host
            .clone_node(&cached.fragment, true)
            .map_err(ApplyError::host("LoadTemplate"))?;

        let mut handles = Vec::with_capacity(cached.slots.len());
        for def in cached.slots.iter() {
            let mut node = root.clone();
            for &index in &def.path {
                node = host
                    .children(&node)
                    .into_iter()
                    .nth(index as usize)
                    .ok_or_else(|| ApplyError::InvalidTemplate {
                        id,
                        reason: format!("clone lost the node at path {:?}", def.path),
                    })?;
            }
            handles.push(node);
        }

        Ok(TemplateInstance {
            root,
            handles,
            slots: Rc::clone(&cached.slots),
        })
    }

    /// Drop every cached fragment, handing them back to the host
    pub fn clear<H>(&mut self, host: &mut H)
    where
        H: HostTree<Node = N>,
    {
        for (_, cached) in self.templates.drain() {
            host.release(&cached.fragment);
        }
    }
}

impl<N: Clone> Default for TemplateCache<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn build_node<H: HostTree>(
    host: &mut H,
    node: &TemplateNode,
    path: &mut SlotPath,
    slots: &mut Vec<(u32, SlotDef)>,
) -> Result<H::Node> {
    match node {
        TemplateNode::Element {
            tag,
            namespace,
            attrs,
            children,
        } => {
            let element = match namespace {
                Some(ns) => host.create_element_ns(tag, ns),
                None => host.create_element(tag),
            }
            .map_err(ApplyError::host("register_template"))?;

            // A half-built element goes back to the host with whatever it holds
            if let Err(e) = fill_element(host, &element, attrs, children, path, slots) {
                host.release(&element);
                return Err(e);
            }
            Ok(element)
        }
        TemplateNode::Text { text } => host
            .create_text_node(text)
            .map_err(ApplyError::host("register_template")),
        TemplateNode::DynamicText { slot } => {
            slots.push((
                *slot,
                SlotDef {
                    path: path.clone(),
                    kind: SlotKind::Text,
                },
            ));
            host.create_text_node("")
                .map_err(ApplyError::host("register_template"))
        }
        TemplateNode::Dynamic { slot } => {
            slots.push((
                *slot,
                SlotDef {
                    path: path.clone(),
                    kind: SlotKind::Node,
                },
            ));
            host.create_comment("placeholder")
                .map_err(ApplyError::host("register_template"))
        }
    }
}

fn fill_element<H: HostTree>(
    host: &mut H,
    element: &H::Node,
    attrs: &[TemplateAttribute],
    children: &[TemplateNode],
    path: &mut SlotPath,
    slots: &mut Vec<(u32, SlotDef)>,
) -> Result<()> {
    for attr in attrs {
        match attr {
            TemplateAttribute::Static {
                name,
                value,
                namespace,
            } => host
                .set_attribute(element, name, value, namespace.as_deref())
                .map_err(ApplyError::host("register_template"))?,
            TemplateAttribute::Dynamic {
                name,
                namespace,
                slot,
            } => slots.push((
                *slot,
                SlotDef {
                    path: path.clone(),
                    kind: SlotKind::Attribute {
                        name: name.clone(),
                        namespace: namespace.clone(),
                    },
                },
            )),
        }
    }

    for (index, child) in children.iter().enumerate() {
        path.push(index as u32);
        let built = build_node(host, child, path, slots);
        path.pop();
        let built = built?;
        if let Err(e) = host.append_child(element, &built) {
            host.release(&built);
            return Err(ApplyError::host("register_template")(e));
        }
    }
    Ok(())
}
