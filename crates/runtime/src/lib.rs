//! Patch session runtime
//!
//! Wraps an [`interpreter::Interpreter`] for a producer:
//!
//! ```text
//! producer ──apply(bytes, values)──▶ Session ──▶ Interpreter ──▶ host
//!     ▲                                 │
//!     └──── SessionEvent ◀── EventBus ◀─┘ (listeners, apply results)
//! ```
//!
//! - **Session**: borrow guard, desynchronization policy, resync
//! - **EventBus**: broadcast of user events and lifecycle events
//! - **Scheduler**: cancellable next-frame / idle callbacks

pub mod error;
pub mod events;
pub mod scheduler;
pub mod session;

pub use error::{Result, SessionError};
pub use events::{EventBus, SessionEvent};
pub use scheduler::{CallbackId, Scheduler, Timing};
pub use session::{Session, SessionConfig, SessionStatus};
