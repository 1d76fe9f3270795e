//! Node Registry - NodeId ⇄ host handle
//!
//! Two hash maps, kept in lockstep. The reverse map is what lets a
//! subtree removal find every bound descendant without the producer
//! listing them.
//!
//! No implicit garbage collection: whoever binds an id frees it.

use ahash::AHashMap;
use std::hash::Hash;

use crate::error::{ApplyError, Result};
use crate::types::{NodeId, ROOT_ID};

#[derive(Debug)]
pub struct NodeRegistry<N> {
    by_id: AHashMap<NodeId, N>,
    by_handle: AHashMap<N, NodeId>,
}

impl<N: Clone + Eq + Hash> NodeRegistry<N> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_id: AHashMap::with_capacity(capacity),
            by_handle: AHashMap::with_capacity(capacity),
        }
    }

    /// Registry with the mount element already bound to `ROOT_ID`
    pub fn with_root(mount: N, capacity: usize) -> Self {
        let mut registry = Self::with_capacity(capacity);
        registry.by_handle.insert(mount.clone(), ROOT_ID);
        registry.by_id.insert(ROOT_ID, mount);
        registry
    }

    /// Bind `id` to `handle`.
    ///
    /// A handle carries at most one id, so binding an already-bound handle
    /// under a second id is rejected the same way as a reused id.
    pub fn register(&mut self, id: NodeId, handle: N) -> Result<()> {
        if self.by_id.contains_key(&id) || self.by_handle.contains_key(&handle) {
            return Err(ApplyError::DuplicateId(id));
        }
        self.by_handle.insert(handle.clone(), id);
        self.by_id.insert(id, handle);
        Ok(())
    }

    /// Handle bound to `id`. Never a default.
    pub fn resolve(&self, id: NodeId) -> Result<&N> {
        self.by_id.get(&id).ok_or(ApplyError::UnknownId(id))
    }

    /// Remove the binding, returning the handle it held
    pub fn unregister(&mut self, id: NodeId) -> Result<N> {
        let handle = self.by_id.remove(&id).ok_or(ApplyError::UnknownId(id))?;
        self.by_handle.remove(&handle);
        Ok(handle)
    }

    /// Reverse lookup
    pub fn id_of(&self, handle: &N) -> Option<NodeId> {
        self.by_handle.get(handle).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All bound ids, unordered
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.by_id.keys().copied()
    }

    /// Drop every binding except the mount root's, returning how many went
    pub fn clear_except_root(&mut self) -> usize {
        let before = self.by_id.len();
        self.by_id.retain(|id, _| *id == ROOT_ID);
        self.by_handle.retain(|_, id| *id == ROOT_ID);
        before - self.by_id.len()
    }
}

impl<N: Clone + Eq + Hash> Default for NodeRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer-side id source: monotonic, reusing freed ids.
///
/// Starts at 1, `ROOT_ID` is never handed out.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: NodeId,
    free: Vec<NodeId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: ROOT_ID + 1,
            free: Vec::new(),
        }
    }

    pub fn allocate(&mut self) -> NodeId {
        match self.free.pop() {
            Some(id) => id,
            None => {
                let id = self.next;
                self.next += 1;
                id
            }
        }
    }

    /// Give an id back. Only call once the interpreter has unbound it.
    pub fn free(&mut self, id: NodeId) {
        if id != ROOT_ID && id < self.next && !self.free.contains(&id) {
            self.free.push(id);
        }
    }

    /// Ids currently handed out
    pub fn live(&self) -> usize {
        (self.next - 1) as usize - self.free.len()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
