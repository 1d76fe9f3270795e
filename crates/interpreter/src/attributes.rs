//! Attribute semantics the host tree does not know about
//!
//! - Boolean attributes are presence-only: `disabled=""` or nothing.
//! - The pseudo-namespace `style` addresses one declaration inside the
//!   element's `style` attribute instead of an attribute of its own.

/// Namespace that routes an attribute write into the inline style
pub const STYLE_NAMESPACE: &str = "style";

const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen",
    "allowpaymentrequest",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "inert",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "selected",
    "truespeed",
    "webkitdirectory",
];

pub fn is_boolean_attribute(name: &str) -> bool {
    BOOLEAN_ATTRIBUTES
        .iter()
        .any(|attr| attr.eq_ignore_ascii_case(name))
}

/// Parsed inline style, declaration order kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn parse(text: &str) -> Self {
        let declarations = text
            .split(';')
            .filter_map(|decl| {
                let (property, value) = decl.split_once(':')?;
                let property = property.trim();
                if property.is_empty() {
                    return None;
                }
                Some((property.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { declarations }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Set in place if present, append otherwise
    pub fn set(&mut self, property: &str, value: &str) {
        match self.declarations.iter_mut().find(|(p, _)| p == property) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self
                .declarations
                .push((property.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, property: &str) -> bool {
        let before = self.declarations.len();
        self.declarations.retain(|(p, _)| p != property);
        self.declarations.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl std::fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (property, value)) in self.declarations.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}: {};", property, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_attributes() {
        assert!(is_boolean_attribute("disabled"));
        assert!(is_boolean_attribute("readOnly"));
        assert!(!is_boolean_attribute("aria-hidden"));
        assert!(!is_boolean_attribute("value"));
    }

    #[test]
    fn test_inline_style_edits() {
        let mut style = InlineStyle::parse("color: red;  margin : 0 ; ;bogus");
        assert_eq!(style.get("margin"), Some("0"));
        assert_eq!(style.get("bogus"), None);

        style.set("color", "blue");
        style.set("display", "none");
        assert_eq!(style.to_string(), "color: blue; margin: 0; display: none;");

        assert!(style.remove("margin"));
        assert!(!style.remove("margin"));
        assert_eq!(style.to_string(), "color: blue; display: none;");
    }

    #[test]
    fn test_empty_style() {
        let mut style = InlineStyle::parse("");
        assert!(style.is_empty());
        style.set("width", "1px");
        assert!(style.remove("width"));
        assert_eq!(style.to_string(), "");
    }
}
