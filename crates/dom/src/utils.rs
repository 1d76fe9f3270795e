//! Utility functions for host tree processing

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::{NodeIndex, NodeType, XLINK_NAMESPACE, XMLNS_NAMESPACE, XML_NAMESPACE};

/// Concatenated text of a node and all its descendants
pub fn get_text_content(arena: &DomArena, index: NodeIndex) -> Result<String> {
    let mut text = String::new();

    arena.traverse_df(index, |node| {
        if node.node_type == NodeType::Text {
            text.push_str(&node.node_value);
        }
        Ok(())
    })?;

    Ok(text)
}

/// Markup prefix for an attribute namespace. Unknown namespaces print as-is.
pub fn namespace_prefix(namespace: &str) -> &str {
    match namespace {
        XLINK_NAMESPACE => "xlink",
        XML_NAMESPACE => "xml",
        XMLNS_NAMESPACE => "xmlns",
        other => other,
    }
}

/// Escape text content for markup output
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for double-quoted output
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape_text("a & <b>"), "a &amp; &lt;b&gt;");
        assert_eq!(escape_attribute("x=\"1\""), "x=&quot;1&quot;");
    }

    #[test]
    fn test_namespace_prefix() {
        assert_eq!(namespace_prefix(XLINK_NAMESPACE), "xlink");
        assert_eq!(namespace_prefix(XML_NAMESPACE), "xml");
        assert_eq!(namespace_prefix(XMLNS_NAMESPACE), "xmlns");
        assert_eq!(namespace_prefix("urn:custom"), "urn:custom");
    }

    #[test]
    fn test_text_content_concatenates() {
        let mut arena = DomArena::new();
        let p = arena.create_element("p").unwrap();
        let a = arena.create_text("Hello, ");
        let b = arena.create_element("b").unwrap();
        let c = arena.create_text("world");
        arena.append_child(p, a).unwrap();
        arena.append_child(p, b).unwrap();
        arena.append_child(b, c).unwrap();

        assert_eq!(get_text_content(&arena, p).unwrap(), "Hello, world");
    }
}
