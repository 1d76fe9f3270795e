//! Core type definitions for the in-memory host tree
//!
//! Key design principles:
//! 1. Use u32 for indices (4 bytes vs 8 bytes pointer)
//! 2. Use SmallVec for small arrays (avoid heap allocation)
//! 3. A node never owns another node, the arena does

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Node index (slot in the arena)
/// u32 allows 4 billion nodes, enough for any document
pub type NodeIndex = u32;

/// The SVG namespace, the most common non-HTML namespace
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// The MathML namespace
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

/// The XLink namespace (attributes only)
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// The XML namespace (`xml:lang`, `xml:space`)
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The XMLNS namespace (namespace declarations)
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Node type matching DOM specification numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    Comment = 8,
    Document = 9,
    DocumentFragment = 11,
}

impl NodeType {
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Element => "element",
            NodeType::Text => "text",
            NodeType::Comment => "comment",
            NodeType::Document => "document",
            NodeType::DocumentFragment => "fragment",
        }
    }
}

/// A single attribute, optionally namespaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

impl Attribute {
    fn matches(&self, name: &str, namespace: Option<&str>) -> bool {
        self.name == name && self.namespace.as_deref() == namespace
    }
}

/// Layout box of a node in viewport pixels (`getBoundingClientRect`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// How `scroll_into_view` moves the viewport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Instant,
    Smooth,
}

/// The host tree node structure
///
/// Small fixed-size fields first, indices instead of pointers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub index: NodeIndex,
    pub node_type: NodeType,

    // Navigation indices
    pub parent: Option<NodeIndex>,
    pub children: SmallVec<[NodeIndex; 4]>, // Most nodes have <4 children

    /// Tag name for elements, `#text` / `#comment` otherwise
    pub node_name: String,
    pub namespace: Option<String>,
    /// Text for text and comment nodes
    pub node_value: String,
    pub attributes: SmallVec<[Attribute; 2]>,

    /// Set by focus/blur forwarding
    pub focused: bool,
    /// Layout fed in by whoever lays the tree out. None until then.
    pub rect: Option<ClientRect>,
}

impl DomNode {
    pub fn new(index: NodeIndex, node_type: NodeType, node_name: impl Into<String>) -> Self {
        Self {
            index,
            node_type,
            parent: None,
            children: SmallVec::new(),
            node_name: node_name.into(),
            namespace: None,
            node_value: String::new(),
            attributes: SmallVec::new(),
            focused: false,
            rect: None,
        }
    }

    /// Get tag name for element nodes
    pub fn tag_name(&self) -> Option<&str> {
        if self.node_type == NodeType::Element {
            Some(&self.node_name)
        } else {
            None
        }
    }

    /// Check if node is an element
    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// Check if node is text
    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Get a non-namespaced attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attr_ns(name, None)
    }

    /// Get attribute value by name and namespace
    pub fn attr_ns(&self, name: &str, namespace: Option<&str>) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.matches(name, namespace))
            .map(|a| a.value.as_str())
    }

    /// Insert or overwrite an attribute, keeping first-set order
    pub fn set_attr(&mut self, name: &str, namespace: Option<&str>, value: &str) {
        match self.attributes.iter_mut().find(|a| a.matches(name, namespace)) {
            Some(existing) => {
                existing.value.clear();
                existing.value.push_str(value);
            }
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                namespace: namespace.map(String::from),
                value: value.to_string(),
            }),
        }
    }

    /// Remove an attribute, returns whether it existed
    pub fn remove_attr(&mut self, name: &str, namespace: Option<&str>) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| !a.matches(name, namespace));
        before != self.attributes.len()
    }
}
