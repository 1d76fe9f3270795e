//! DOM Serializer - Convert the host tree to markup
//!
//! Used for snapshot assertions and debug dumps. Two shapes:
//! - compact HTML (`<div class="a">hi</div>`), no whitespace added
//! - indented outline, one node per line

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::*;
use crate::utils::{escape_attribute, escape_text, namespace_prefix};

/// Elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Serializer configuration
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Emit comment nodes (placeholders are comments)
    pub include_comments: bool,
    /// Indented outline instead of compact HTML
    pub pretty: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            include_comments: true,
            pretty: false,
        }
    }
}

/// DOM Tree Serializer
pub struct DomSerializer {
    config: SerializerConfig,
}

impl DomSerializer {
    pub fn new() -> Self {
        Self::with_config(SerializerConfig::default())
    }

    pub fn with_config(config: SerializerConfig) -> Self {
        Self { config }
    }

    /// Serialize the whole document
    pub fn serialize(&self, arena: &DomArena) -> Result<String> {
        self.serialize_from(arena, arena.document())
    }

    /// Serialize a subtree, the start node included
    pub fn serialize_from(&self, arena: &DomArena, start: NodeIndex) -> Result<String> {
        let mut output = String::with_capacity(256);
        self.serialize_node(arena, start, 0, &mut output)?;
        Ok(output)
    }

    /// Serialize only the children of a node (its "inner HTML")
    pub fn inner_html(&self, arena: &DomArena, parent: NodeIndex) -> Result<String> {
        let mut output = String::with_capacity(256);
        for &child in &arena.get(parent)?.children {
            self.serialize_node(arena, child, 0, &mut output)?;
        }
        Ok(output)
    }

    /// Serialize a single node recursively
    fn serialize_node(
        &self,
        arena: &DomArena,
        index: NodeIndex,
        depth: usize,
        output: &mut String,
    ) -> Result<()> {
        let node = arena.get(index)?;
        let indent = if self.config.pretty {
            "  ".repeat(depth)
        } else {
            String::new()
        };
        let newline = if self.config.pretty { "\n" } else { "" };

        match node.node_type {
            NodeType::Element => {
                output.push_str(&indent);
                output.push('<');
                output.push_str(&node.node_name);

                for attr in &node.attributes {
                    output.push(' ');
                    if let Some(ns) = &attr.namespace {
                        output.push_str(namespace_prefix(ns));
                        output.push(':');
                    }
                    output.push_str(&attr.name);
                    if !attr.value.is_empty() {
                        output.push_str("=\"");
                        output.push_str(&escape_attribute(&attr.value));
                        output.push('"');
                    }
                }

                output.push('>');
                if VOID_ELEMENTS.contains(&node.node_name.as_str()) && node.children.is_empty() {
                    output.push_str(newline);
                    return Ok(());
                }
                output.push_str(newline);

                for &child in &node.children {
                    self.serialize_node(arena, child, depth + 1, output)?;
                }

                output.push_str(&indent);
                output.push_str("</");
                output.push_str(&node.node_name);
                output.push('>');
                output.push_str(newline);
            }
            NodeType::Text => {
                output.push_str(&indent);
                output.push_str(&escape_text(&node.node_value));
                output.push_str(newline);
            }
            NodeType::Comment => {
                if self.config.include_comments {
                    output.push_str(&indent);
                    output.push_str("<!--");
                    output.push_str(&node.node_value);
                    output.push_str("-->");
                    output.push_str(newline);
                }
            }
            NodeType::Document | NodeType::DocumentFragment => {
                // Containers only contribute their children
                for &child in &node.children {
                    self.serialize_node(arena, child, depth, output)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostTree;

    #[test]
    fn test_serialize_simple_dom() {
        let (mut arena, mount) = DomArena::with_mount("main").unwrap();
        let div = arena.create_element("div").unwrap();
        let text = arena.create_text("a < b");
        arena.append_child(div, text).unwrap();
        arena.append_child(mount, div).unwrap();
        arena.set_attribute(&div, "title", "say \"hi\"", None).unwrap();

        let html = DomSerializer::new().serialize(&arena).unwrap();
        assert_eq!(
            html,
            "<main><div title=\"say &quot;hi&quot;\">a &lt; b</div></main>"
        );
    }

    #[test]
    fn test_boolean_attribute_and_void_element() {
        let mut arena = DomArena::new();
        let input = arena.create_element("input").unwrap();
        arena.set_attribute(&input, "disabled", "", None).unwrap();

        let html = DomSerializer::new().serialize_from(&arena, input).unwrap();
        assert_eq!(html, "<input disabled>");
    }

    #[test]
    fn test_namespaced_attribute_prefix() {
        let mut arena = DomArena::new();
        let link = arena.create_element_ns("a", SVG_NAMESPACE).unwrap();
        arena
            .set_attribute(&link, "href", "#icon", Some(XLINK_NAMESPACE))
            .unwrap();
        arena
            .set_attribute(&link, "lang", "en", Some(XML_NAMESPACE))
            .unwrap();

        let html = DomSerializer::new().serialize_from(&arena, link).unwrap();
        assert_eq!(html, "<a xlink:href=\"#icon\" xml:lang=\"en\"></a>");
    }

    #[test]
    fn test_comments_can_be_hidden() {
        let (mut arena, mount) = DomArena::with_mount("main").unwrap();
        let marker = arena.create_comment("placeholder");
        arena.append_child(mount, marker).unwrap();

        let with = DomSerializer::new().inner_html(&arena, mount).unwrap();
        let without = DomSerializer::with_config(SerializerConfig {
            include_comments: false,
            pretty: false,
        })
        .inner_html(&arena, mount)
        .unwrap();

        assert_eq!(with, "<!--placeholder-->");
        assert_eq!(without, "");
    }

    #[test]
    fn test_pretty_output() {
        let (mut arena, mount) = DomArena::with_mount("ul").unwrap();
        let li = arena.create_element("li").unwrap();
        let text = arena.create_text("one");
        arena.append_child(li, text).unwrap();
        arena.append_child(mount, li).unwrap();

        let pretty = DomSerializer::with_config(SerializerConfig {
            include_comments: true,
            pretty: true,
        })
        .serialize(&arena)
        .unwrap();
        assert_eq!(pretty, "<ul>\n  <li>\n    one\n  </li>\n</ul>\n");
    }
}
