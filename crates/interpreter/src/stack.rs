//! Root stack - scratch area for subtree assembly
//!
//! Push/pop only. The applier empties it at the end of every stream.

use crate::error::{ApplyError, Result};

#[derive(Debug)]
pub struct RootStack<N> {
    roots: Vec<N>,
}

impl<N> RootStack<N> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            roots: Vec::with_capacity(capacity),
        }
    }

    pub fn push_root(&mut self, handle: N) {
        self.roots.push(handle);
    }

    pub fn pop_root(&mut self, op: &'static str) -> Result<N> {
        self.roots.pop().ok_or(ApplyError::StackUnderflow {
            op,
            needed: 1,
            available: 0,
        })
    }

    /// Handle `depth` entries below the top (0 = top)
    pub fn peek_root(&self, depth: usize, op: &'static str) -> Result<&N> {
        let len = self.roots.len();
        if depth >= len {
            return Err(ApplyError::StackUnderflow {
                op,
                needed: depth + 1,
                available: len,
            });
        }
        Ok(&self.roots[len - 1 - depth])
    }

    /// Pop `count` handles, returned in push order so the caller can
    /// attach them in the order they were emitted.
    ///
    /// All or nothing: an underflow leaves the stack untouched.
    pub fn pop_many(&mut self, count: usize, op: &'static str) -> Result<Vec<N>> {
        let len = self.roots.len();
        if count > len {
            return Err(ApplyError::StackUnderflow {
                op,
                needed: count,
                available: len,
            });
        }
        Ok(self.roots.split_off(len - count))
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Empty the stack, returning how many roots were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.roots.len();
        self.roots.clear();
        dropped
    }
}

impl<N> Default for RootStack<N> {
    fn default() -> Self {
        Self::new()
    }
}
