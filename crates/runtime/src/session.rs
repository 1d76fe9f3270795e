//! Patch Session
//!
//! The producer-facing handle around one interpreter: configuration, the
//! event bus listeners report into, the frame/idle scheduler and the
//! desynchronization policy.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use dom::{ClientRect, HostTree, ScrollBehavior};
use interpreter::{
    ApplyError, ApplyStats, DynamicValues, Interpreter, InterpreterConfig, NodeId,
    TemplateDescriptor, TemplateId,
};

use crate::error::{Result, SessionError};
use crate::events::{EventBus, SessionEvent};
use crate::scheduler::Scheduler;

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub id: String,
    pub frame_interval_ms: u64,
    pub idle_timeout_ms: u64,
    pub event_channel_capacity: usize,
    /// Event types whose native default action is always suppressed
    pub prevent_default: Vec<String>,
    pub interpreter: InterpreterConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            frame_interval_ms: 16,
            idle_timeout_ms: 50,
            event_channel_capacity: 1024,
            prevent_default: vec!["submit".to_string()],
            interpreter: InterpreterConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Producer model and host tree agree
    Synchronized,
    /// A stream failed part way; only `resync` is accepted
    Desynchronized,
}

/// One producer talking to one host tree.
///
/// Single-threaded: keep it on a `LocalSet` and hand out `Rc<Session<_>>`
/// to scheduled callbacks. A stream applied while another is running, or
/// from inside a listener, fails with `SessionError::Busy`.
pub struct Session<H>
where
    H: HostTree,
    H::Event: 'static,
{
    pub config: SessionConfig,
    pub event_bus: EventBus,
    interpreter: RefCell<Interpreter<H>>,
    status: Cell<SessionStatus>,
    scheduler: Scheduler,
}

impl<H> Session<H>
where
    H: HostTree,
    H::Event: 'static,
{
    pub fn new(config: SessionConfig, host: H, mount: H::Node) -> Self {
        let event_bus = EventBus::with_capacity(config.event_channel_capacity)
            .with_prevent_default(&config.prevent_default);

        let interpreter = Interpreter::with_config(host, mount, config.interpreter.clone());
        interpreter.set_event_sink(Rc::new(event_bus.clone()));

        let scheduler = Scheduler::new(config.frame_interval(), config.idle_timeout());

        tracing::info!("session {} started", config.id);
        event_bus.publish(SessionEvent::Started {
            session_id: config.id.clone(),
        });

        Self {
            config,
            event_bus,
            interpreter: RefCell::new(interpreter),
            status: Cell::new(SessionStatus::Synchronized),
            scheduler,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status.get()
    }

    /// Apply one edit stream.
    ///
    /// A malformed stream applies nothing and leaves the session usable.
    /// Any other failure marks it desynchronized.
    pub fn apply(&self, bytes: &[u8], values: DynamicValues<H::Node>) -> Result<ApplyStats> {
        if self.status.get() == SessionStatus::Desynchronized {
            return Err(SessionError::Desynchronized);
        }

        let mut interpreter = self
            .interpreter
            .try_borrow_mut()
            .map_err(|_| SessionError::Busy)?;

        match interpreter.apply_edits(bytes, values) {
            Ok(stats) => {
                self.event_bus.publish(SessionEvent::EditsApplied { stats });
                Ok(stats)
            }
            Err(e) => {
                if !matches!(e, ApplyError::MalformedStream(_)) {
                    self.status.set(SessionStatus::Desynchronized);
                }
                tracing::warn!("session {}: {}", self.config.id, e);
                self.event_bus.publish(SessionEvent::ApplyFailed {
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Throw away the producer-built tree so the producer can re-render
    /// from scratch. Templates survive.
    pub fn resync(&self) -> Result<()> {
        let mut interpreter = self
            .interpreter
            .try_borrow_mut()
            .map_err(|_| SessionError::Busy)?;

        interpreter.reset()?;
        self.status.set(SessionStatus::Synchronized);

        tracing::info!("session {} resynchronized", self.config.id);
        self.event_bus.publish(SessionEvent::Resynchronized);
        Ok(())
    }

    pub fn register_template(&self, id: TemplateId, descriptor: &TemplateDescriptor) -> Result<bool> {
        let mut interpreter = self
            .interpreter
            .try_borrow_mut()
            .map_err(|_| SessionError::Busy)?;
        Ok(interpreter.register_template(id, descriptor)?)
    }

    pub fn focus(&self, id: NodeId) -> Result<()> {
        self.with_interpreter_mut(|i| i.focus(id))??;
        Ok(())
    }

    pub fn blur(&self, id: NodeId) -> Result<()> {
        self.with_interpreter_mut(|i| i.blur(id))??;
        Ok(())
    }

    pub fn scroll_into_view(&self, id: NodeId, behavior: ScrollBehavior) -> Result<()> {
        self.with_interpreter_mut(|i| i.scroll_into_view(id, behavior))??;
        Ok(())
    }

    pub fn client_rect(&self, id: NodeId) -> Result<ClientRect> {
        Ok(self.with_interpreter(|i| i.client_rect(id))??)
    }

    /// Read access to the interpreter and its host, e.g. to dispatch a
    /// native event or serialize the tree.
    pub fn with_interpreter<R>(&self, f: impl FnOnce(&Interpreter<H>) -> R) -> Result<R> {
        let interpreter = self
            .interpreter
            .try_borrow()
            .map_err(|_| SessionError::Busy)?;
        Ok(f(&interpreter))
    }

    pub fn with_interpreter_mut<R>(&self, f: impl FnOnce(&mut Interpreter<H>) -> R) -> Result<R> {
        let mut interpreter = self
            .interpreter
            .try_borrow_mut()
            .map_err(|_| SessionError::Busy)?;
        Ok(f(&mut interpreter))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_bus.subscribe()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Cancel pending callbacks and announce the end of the session
    pub fn stop(&self) {
        let cancelled = self.scheduler.cancel_all();
        tracing::info!(
            "session {} stopped, {} callbacks cancelled",
            self.config.id,
            cancelled
        );
        self.event_bus.publish(SessionEvent::Stopped);
    }
}

impl<H> std::fmt::Debug for Session<H>
where
    H: HostTree,
    H::Event: 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.config.id)
            .field("status", &self.status.get())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
