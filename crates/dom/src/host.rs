//! Host capability surface
//!
//! The interpreter never touches a concrete tree. It talks to these two
//! traits, and `DomArena` is just one implementation of them (a browser
//! binding would be another).

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use crate::types::{ClientRect, ScrollBehavior};

/// Native listener callback, owned by the host once attached
pub type Listener<E> = Rc<dyn Fn(&E)>;

/// A scalar read off a fired event object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

/// A file carried by a form control or a drop, metadata only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

/// A fired host event, read through a fixed field schema
pub trait NativeEvent {
    fn event_type(&self) -> &str;

    /// Read a field by its platform name (`clientX`, `key`, `deltaY`, ...)
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Named values of the enclosing form, for form/input events
    fn form_values(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Selected or dropped files, for file inputs and drag events
    fn files(&self) -> Vec<FileInfo> {
        Vec::new()
    }

    fn bubbles(&self) -> bool;

    fn prevent_default(&self);
}

/// DOM-like tree mutation capability
///
/// Mirrors the subset of the DOM the interpreter needs. Moving a node that
/// already has a parent detaches it first, exactly like the DOM does.
pub trait HostTree {
    type Node: Clone + Eq + Hash + Debug;
    type Event: NativeEvent;
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_element(&mut self, tag: &str) -> Result<Self::Node, Self::Error>;

    fn create_element_ns(&mut self, tag: &str, namespace: &str)
        -> Result<Self::Node, Self::Error>;

    fn create_text_node(&mut self, text: &str) -> Result<Self::Node, Self::Error>;

    fn create_comment(&mut self, text: &str) -> Result<Self::Node, Self::Error>;

    /// Structural copy. Listeners are not copied.
    fn clone_node(&mut self, node: &Self::Node, deep: bool) -> Result<Self::Node, Self::Error>;

    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node)
        -> Result<(), Self::Error>;

    /// Insert `child` before `reference`, or at the end when `reference` is None
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: Option<&Self::Node>,
    ) -> Result<(), Self::Error>;

    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node)
        -> Result<(), Self::Error>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    fn get_attribute(&self, node: &Self::Node, name: &str, namespace: Option<&str>)
        -> Option<String>;

    fn set_attribute(
        &mut self,
        node: &Self::Node,
        name: &str,
        value: &str,
        namespace: Option<&str>,
    ) -> Result<(), Self::Error>;

    fn remove_attribute(
        &mut self,
        node: &Self::Node,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<(), Self::Error>;

    fn text_content(&self, node: &Self::Node) -> Option<String>;

    fn set_text_content(&mut self, node: &Self::Node, text: &str) -> Result<(), Self::Error>;

    fn focus(&mut self, node: &Self::Node) -> Result<(), Self::Error>;

    fn blur(&mut self, node: &Self::Node) -> Result<(), Self::Error>;

    fn scroll_into_view(
        &mut self,
        node: &Self::Node,
        behavior: ScrollBehavior,
    ) -> Result<(), Self::Error>;

    fn client_rect(&self, node: &Self::Node) -> Result<ClientRect, Self::Error>;

    /// Attach a native listener. An existing listener with the same
    /// (node, event type, capture) key is replaced.
    fn add_listener(
        &mut self,
        node: &Self::Node,
        event_type: &str,
        capture: bool,
        listener: Listener<Self::Event>,
    ) -> Result<(), Self::Error>;

    /// Detach a native listener. Missing listeners are not an error.
    fn remove_listener(
        &mut self,
        node: &Self::Node,
        event_type: &str,
        capture: bool,
    ) -> Result<(), Self::Error>;

    /// The caller is done with this detached subtree. Hosts with a garbage
    /// collector can ignore this.
    fn release(&mut self, node: &Self::Node) {
        let _ = node;
    }
}
