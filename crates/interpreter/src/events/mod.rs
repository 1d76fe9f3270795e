//! Event Bridge - native listeners in, normalized records out
//!
//! ```text
//! host fires ──▶ Listener closure ──normalize──▶ EventSink (producer)
//!                                                   │
//!            prevent_default ◀── PreventDefault ────┘
//! ```
//!
//! Closures capture only the NodeId, handler reference and a handle to the
//! sink. They never touch the registry or the tree.

mod record;

pub use record::{
    event_data, normalize, AnimationData, CompositionData, DragData, EventCategory, EventData,
    EventRecord, FormData, KeyboardData, Modifiers, MouseData, PointerData, TransitionData,
    WheelData,
};

use ahash::AHashMap;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

use dom::{Listener, NativeEvent};

use crate::types::{HandlerId, NodeId};

/// What the sink wants done with the native event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventResponse {
    #[default]
    Continue,
    PreventDefault,
}

/// Producer-side receiver of event records.
///
/// Called synchronously from inside the host's dispatch.
pub trait EventSink {
    fn handle_event(&self, record: EventRecord) -> EventResponse;
}

impl<F> EventSink for F
where
    F: Fn(EventRecord) -> EventResponse,
{
    fn handle_event(&self, record: EventRecord) -> EventResponse {
        self(record)
    }
}

/// Sink that drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn handle_event(&self, _record: EventRecord) -> EventResponse {
        EventResponse::Continue
    }
}

/// Swappable sink shared by every listener closure
#[derive(Clone)]
pub struct SharedSink {
    inner: Rc<RefCell<Rc<dyn EventSink>>>,
}

impl SharedSink {
    pub fn new(sink: Rc<dyn EventSink>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(sink)),
        }
    }

    /// Already-attached listeners deliver to the new sink from now on
    pub fn replace(&self, sink: Rc<dyn EventSink>) {
        *self.inner.borrow_mut() = sink;
    }

    /// Deliver a record. The borrow is released before the sink runs so
    /// the sink may call `replace`.
    pub fn deliver(&self, record: EventRecord) -> EventResponse {
        let sink = self.inner.borrow().clone();
        sink.handle_event(record)
    }
}

impl std::fmt::Debug for SharedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSink").finish_non_exhaustive()
    }
}

/// Build the native listener for one (node, event, phase) registration
pub fn make_listener<E>(
    sink: SharedSink,
    target: NodeId,
    handler: HandlerId,
    bubbles: bool,
) -> Listener<E>
where
    E: NativeEvent + 'static,
{
    Rc::new(move |event: &E| {
        let record = normalize(event, target, handler, bubbles);
        tracing::trace!(
            "event {} on node {} -> handler {}",
            record.event_type,
            target,
            handler
        );
        if sink.deliver(record) == EventResponse::PreventDefault {
            event.prevent_default();
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerEntry {
    pub event_type: String,
    pub capture: bool,
    pub handler: HandlerId,
}

/// Registered listeners, keyed by (NodeId, event type, capture).
///
/// Grouped per node so a subtree teardown can drop a node's listeners in
/// one lookup.
#[derive(Debug, Default)]
pub struct ListenerTable {
    by_node: AHashMap<NodeId, SmallVec<[ListenerEntry; 2]>>,
    count: usize,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registration, returning the handler it replaced
    pub fn insert(
        &mut self,
        id: NodeId,
        event_type: &str,
        capture: bool,
        handler: HandlerId,
    ) -> Option<HandlerId> {
        let entries = self.by_node.entry(id).or_default();
        match entries
            .iter_mut()
            .find(|e| e.event_type == event_type && e.capture == capture)
        {
            Some(existing) => Some(std::mem::replace(&mut existing.handler, handler)),
            None => {
                entries.push(ListenerEntry {
                    event_type: event_type.to_string(),
                    capture,
                    handler,
                });
                self.count += 1;
                None
            }
        }
    }

    /// Drop one registration. Missing keys are not an error.
    pub fn remove(&mut self, id: NodeId, event_type: &str, capture: bool) -> Option<HandlerId> {
        let entries = self.by_node.get_mut(&id)?;
        let position = entries
            .iter()
            .position(|e| e.event_type == event_type && e.capture == capture)?;
        let removed = entries.remove(position);
        if entries.is_empty() {
            self.by_node.remove(&id);
        }
        self.count -= 1;
        Some(removed.handler)
    }

    /// Drop every registration on a node
    pub fn remove_node(&mut self, id: NodeId) -> SmallVec<[ListenerEntry; 2]> {
        let removed = self.by_node.remove(&id).unwrap_or_default();
        self.count -= removed.len();
        removed
    }

    pub fn get(&self, id: NodeId, event_type: &str, capture: bool) -> Option<HandlerId> {
        self.by_node
            .get(&id)?
            .iter()
            .find(|e| e.event_type == event_type && e.capture == capture)
            .map(|e| e.handler)
    }

    pub fn on_node(&self, id: NodeId) -> &[ListenerEntry] {
        self.by_node.get(&id).map_or(&[], |entries| entries.as_slice())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Nodes that carry at least one listener
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.by_node.keys().copied()
    }

    pub fn clear(&mut self) {
        self.by_node.clear();
        self.count = 0;
    }
}
