//! Dynamic values - the side channel of an edit stream
//!
//! Static strings (tags, attribute names) travel inside the stream. Live
//! content travels here and is referenced by index. A reference consumes
//! the value, so the same index can never feed two opcodes.

use crate::error::DecodeError;

/// What a value is, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Bytes,
    Bool,
    Absent,
    Node,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::Bool => "bool",
            ValueKind::Absent => "absent",
            ValueKind::Node => "node",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue<N> {
    Text(String),
    /// Raw bytes, must be UTF-8 wherever text is expected
    Bytes(Vec<u8>),
    Bool(bool),
    /// "No value": removes an attribute
    Absent,
    /// A host node the producer built itself
    Node(N),
}

impl<N> DynamicValue<N> {
    pub fn kind(&self) -> ValueKind {
        match self {
            DynamicValue::Text(_) => ValueKind::Text,
            DynamicValue::Bytes(_) => ValueKind::Bytes,
            DynamicValue::Bool(_) => ValueKind::Bool,
            DynamicValue::Absent => ValueKind::Absent,
            DynamicValue::Node(_) => ValueKind::Node,
        }
    }

    /// Text payload, decoding bytes as UTF-8
    pub fn into_text(self, index: u32) -> Result<String, DecodeError> {
        match self {
            DynamicValue::Text(text) => Ok(text),
            DynamicValue::Bytes(bytes) => {
                String::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8 {
                    offset: e.utf8_error().valid_up_to(),
                })
            }
            other => Err(DecodeError::ValueKind {
                index,
                expected: "text",
                actual: other.kind().name(),
            }),
        }
    }
}

impl<N> From<&str> for DynamicValue<N> {
    fn from(value: &str) -> Self {
        DynamicValue::Text(value.to_string())
    }
}

impl<N> From<String> for DynamicValue<N> {
    fn from(value: String) -> Self {
        DynamicValue::Text(value)
    }
}

impl<N> From<bool> for DynamicValue<N> {
    fn from(value: bool) -> Self {
        DynamicValue::Bool(value)
    }
}

impl<N> From<Option<String>> for DynamicValue<N> {
    fn from(value: Option<String>) -> Self {
        value.map_or(DynamicValue::Absent, DynamicValue::Text)
    }
}

/// Ordered value list with take-once semantics
#[derive(Debug)]
pub struct DynamicValues<N> {
    slots: Vec<Option<DynamicValue<N>>>,
}

impl<N> DynamicValues<N> {
    pub fn new(values: Vec<DynamicValue<N>>) -> Self {
        Self {
            slots: values.into_iter().map(Some).collect(),
        }
    }

    pub fn empty() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Kind of the value at `index`, if still present
    pub fn kind(&self, index: u32) -> Result<ValueKind, DecodeError> {
        match self.slots.get(index as usize) {
            None => Err(DecodeError::ValueOutOfRange {
                index,
                len: self.slots.len(),
            }),
            Some(None) => Err(DecodeError::ValueReused { index }),
            Some(Some(value)) => Ok(value.kind()),
        }
    }

    /// Borrow a value without consuming it
    pub fn peek(&self, index: u32) -> Option<&DynamicValue<N>> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    /// Consume the value at `index`
    pub fn take(&mut self, index: u32) -> Result<DynamicValue<N>, DecodeError> {
        let len = self.slots.len();
        match self.slots.get_mut(index as usize) {
            None => Err(DecodeError::ValueOutOfRange { index, len }),
            Some(slot) => slot.take().ok_or(DecodeError::ValueReused { index }),
        }
    }

    /// Consume the value at `index` as text
    pub fn take_text(&mut self, index: u32) -> Result<String, DecodeError> {
        self.take(index)?.into_text(index)
    }
}

impl<N> Default for DynamicValues<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<N> From<Vec<DynamicValue<N>>> for DynamicValues<N> {
    fn from(values: Vec<DynamicValue<N>>) -> Self {
        Self::new(values)
    }
}

impl<N> FromIterator<DynamicValue<N>> for DynamicValues<N> {
    fn from_iter<I: IntoIterator<Item = DynamicValue<N>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
