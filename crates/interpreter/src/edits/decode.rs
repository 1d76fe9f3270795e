use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;

use super::{op, Edit, ValueUse};
use crate::error::DecodeError;
use crate::values::{DynamicValue, DynamicValues};

/// Sequential opcode decoder over a borrowed buffer
pub struct EditReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> EditReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            failed: false,
        }
    }

    /// Byte offset of the next unread byte
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.bytes.len() - self.pos;
        if n > available {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: n - available,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_bool(&mut self) -> Result<bool, DecodeError> {
        let offset = self.pos;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::InvalidBool { value, offset }),
        }
    }

    fn read_str(&mut self) -> Result<&'a str, DecodeError> {
        let len = self.read_u32()? as usize;
        let offset = self.pos;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8 {
            offset: offset + e.valid_up_to(),
        })
    }

    fn read_opt_str(&mut self) -> Result<Option<&'a str>, DecodeError> {
        if self.read_bool()? {
            self.read_str().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Decode the next edit, `None` at a clean end of stream
    pub fn next_edit(&mut self) -> Result<Option<Edit<'a>>, DecodeError> {
        if self.pos == self.bytes.len() {
            return Ok(None);
        }

        let offset = self.pos;
        let tag = self.read_u8()?;
        let edit = match tag {
            op::CREATE_ELEMENT => Edit::CreateElement {
                tag: self.read_str()?,
                id: self.read_u64()?,
            },
            op::CREATE_ELEMENT_NS => Edit::CreateElementNs {
                tag: self.read_str()?,
                ns: self.read_str()?,
                id: self.read_u64()?,
            },
            op::CREATE_TEXT_NODE => Edit::CreateTextNode {
                value: self.read_u32()?,
                id: self.read_u64()?,
            },
            op::CREATE_PLACEHOLDER => Edit::CreatePlaceholder {
                id: self.read_u64()?,
            },
            op::LOAD_TEMPLATE => Edit::LoadTemplate {
                template: self.read_u32()?,
                id: self.read_u64()?,
            },
            op::APPEND_CHILDREN => {
                let target = if self.read_bool()? {
                    Some(self.read_u64()?)
                } else {
                    None
                };
                Edit::AppendChildren {
                    target,
                    count: self.read_u32()?,
                }
            }
            op::REPLACE_WITH => Edit::ReplaceWith {
                id: self.read_u64()?,
                count: self.read_u32()?,
            },
            op::INSERT_AFTER => Edit::InsertAfter {
                id: self.read_u64()?,
                count: self.read_u32()?,
            },
            op::INSERT_BEFORE => Edit::InsertBefore {
                id: self.read_u64()?,
                count: self.read_u32()?,
            },
            op::REMOVE => Edit::Remove {
                id: self.read_u64()?,
            },
            op::SET_TEXT => Edit::SetText {
                id: self.read_u64()?,
                value: self.read_u32()?,
            },
            op::SET_ATTRIBUTE => Edit::SetAttribute {
                id: self.read_u64()?,
                name: self.read_str()?,
                value: self.read_u32()?,
                ns: self.read_opt_str()?,
            },
            op::REMOVE_ATTRIBUTE => Edit::RemoveAttribute {
                id: self.read_u64()?,
                name: self.read_str()?,
                ns: self.read_opt_str()?,
            },
            op::NEW_EVENT_LISTENER => Edit::NewEventListener {
                event: self.read_str()?,
                id: self.read_u64()?,
                handler: self.read_u64()?,
                bubbles: self.read_bool()?,
            },
            op::REMOVE_EVENT_LISTENER => Edit::RemoveEventListener {
                id: self.read_u64()?,
                event: self.read_str()?,
                bubbles: self.read_bool()?,
            },
            op::SET_NODE => Edit::SetNode {
                slot: self.read_u32()?,
                value: self.read_u32()?,
            },
            op::ASSIGN_SLOT_ID => Edit::AssignSlotId {
                slot: self.read_u32()?,
                id: self.read_u64()?,
            },
            op::PUSH_ROOT => Edit::PushRoot {
                id: self.read_u64()?,
            },
            op::POP_ROOT => Edit::PopRoot,
            op::FREE_ID => Edit::FreeId {
                id: self.read_u64()?,
            },
            tag => return Err(DecodeError::InvalidOpcode { tag, offset }),
        };
        Ok(Some(edit))
    }
}

impl<'a> Iterator for EditReader<'a> {
    type Item = Result<Edit<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_edit() {
            Ok(edit) => edit.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode a whole stream into `bump`. Either every opcode decodes or
/// nothing is returned.
pub fn decode_stream<'a, 'b>(
    bytes: &'a [u8],
    bump: &'b Bump,
) -> Result<BumpVec<'b, Edit<'a>>, DecodeError> {
    // Smallest opcode is one byte, most are ~10
    let mut edits = BumpVec::with_capacity_in(bytes.len() / 8 + 1, bump);
    for edit in EditReader::new(bytes) {
        edits.push(edit?);
    }
    Ok(edits)
}

/// Check every value reference before anything is applied: in range,
/// referenced once, and of a kind the opcode can consume.
pub fn validate_values<N>(edits: &[Edit<'_>], values: &DynamicValues<N>) -> Result<(), DecodeError> {
    let mut seen = vec![false; values.len()];

    for edit in edits {
        let Some((index, usage)) = edit.value_ref() else {
            continue;
        };
        let slot = seen
            .get_mut(index as usize)
            .ok_or(DecodeError::ValueOutOfRange {
                index,
                len: values.len(),
            })?;
        if *slot {
            return Err(DecodeError::ValueReused { index });
        }
        *slot = true;

        let kind = values.kind(index)?;
        if let Some(DynamicValue::Bytes(bytes)) = values.peek(index) {
            if usage != ValueUse::Slot {
                std::str::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8 {
                    offset: e.valid_up_to(),
                })?;
            }
        }

        let allowed = match (usage, values.peek(index)) {
            (ValueUse::Text, Some(DynamicValue::Text(_) | DynamicValue::Bytes(_))) => true,
            (ValueUse::Attribute, Some(DynamicValue::Node(_))) => false,
            (ValueUse::Attribute, Some(_)) => true,
            (ValueUse::Slot, Some(_)) => true,
            _ => false,
        };
        if !allowed {
            return Err(DecodeError::ValueKind {
                index,
                expected: match usage {
                    ValueUse::Text => "text",
                    ValueUse::Attribute => "text, bool or absent",
                    ValueUse::Slot => "any value",
                },
                actual: kind.name(),
            });
        }
    }

    Ok(())
}
