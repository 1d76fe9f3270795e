//! Synthetic events and dispatch for the in-memory host
//!
//! Dispatch follows the DOM's three phases: capture (root to parent),
//! target, then bubble (parent to root) when the event bubbles.

use ahash::AHashMap;
use std::cell::Cell;
use std::rc::Rc;

use crate::arena::DomArena;
use crate::error::Result;
use crate::host::{FieldValue, FileInfo, Listener, NativeEvent};
use crate::types::NodeIndex;

/// A native listener as stored by the arena
#[derive(Clone)]
pub struct RegisteredListener {
    pub event_type: String,
    pub capture: bool,
    pub callback: Listener<SyntheticEvent>,
}

impl std::fmt::Debug for RegisteredListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredListener")
            .field("event_type", &self.event_type)
            .field("capture", &self.capture)
            .finish()
    }
}

/// Event object built by tests and embedders
#[derive(Debug, Default)]
pub struct SyntheticEvent {
    event_type: String,
    bubbles: bool,
    fields: AHashMap<String, FieldValue>,
    form_values: Vec<(String, String)>,
    files: Vec<FileInfo>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl SyntheticEvent {
    /// New bubbling event of the given type
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: true,
            ..Default::default()
        }
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_form_value(mut self, name: &str, value: &str) -> Self {
        self.form_values.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_file(mut self, name: &str, size: u64, mime_type: &str) -> Self {
        self.files.push(FileInfo {
            name: name.to_string(),
            size,
            mime_type: mime_type.to_string(),
        });
        self
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }
}

impl NativeEvent for SyntheticEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).cloned()
    }

    fn form_values(&self) -> Vec<(String, String)> {
        self.form_values.clone()
    }

    fn files(&self) -> Vec<FileInfo> {
        self.files.clone()
    }

    fn bubbles(&self) -> bool {
        self.bubbles
    }

    fn prevent_default(&self) {
        self.default_prevented.set(true);
    }
}

impl DomArena {
    /// Fire `event` at `target`. Returns false when a listener prevented
    /// the default action.
    ///
    /// Listeners are collected before any of them runs, so a callback can
    /// never observe a half-updated listener table.
    pub fn dispatch_event(&self, target: NodeIndex, event: &SyntheticEvent) -> Result<bool> {
        self.get(target)?;

        // Ancestors, root first
        let mut path = Vec::new();
        let mut current = self.get(target)?.parent;
        while let Some(index) = current {
            path.push(index);
            current = self.get(index)?.parent;
        }
        path.reverse();

        let pick = |index: NodeIndex, phase: Phase| -> Vec<Listener<SyntheticEvent>> {
            self.listeners
                .get(&index)
                .map(|slot| {
                    slot.iter()
                        .filter(|l| l.event_type == event.event_type)
                        .filter(|l| match phase {
                            Phase::Capture => l.capture,
                            Phase::Target => true,
                            Phase::Bubble => !l.capture,
                        })
                        .map(|l| Rc::clone(&l.callback))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut plan: Vec<Listener<SyntheticEvent>> = Vec::new();
        for &ancestor in &path {
            plan.extend(pick(ancestor, Phase::Capture));
        }
        let capture_len = plan.len();
        plan.extend(pick(target, Phase::Target));
        let target_end = plan.len();
        if event.bubbles {
            for &ancestor in path.iter().rev() {
                plan.extend(pick(ancestor, Phase::Bubble));
            }
        }

        tracing::trace!(
            "dispatch {} on {}: {} capture, {} target, {} bubble",
            event.event_type,
            target,
            capture_len,
            target_end - capture_len,
            plan.len() - target_end
        );

        for callback in plan {
            if event.propagation_stopped.get() {
                break;
            }
            callback(event);
        }

        Ok(!event.default_prevented())
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Capture,
    Target,
    Bubble,
}
