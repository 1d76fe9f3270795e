//! Host tree library
//!
//! The capability surface a DOM patching interpreter drives, plus an
//! in-memory arena implementation of it.
//!
//! ## Layout
//!
//! - **Slots, not pointers**: nodes live in one `Vec`, freed slots are reused
//! - **Handles are copies**: `NodeIndex` is a `u32`, cheap to hash and store
//!
//! ## Core Design
//!
//! ```text
//! interpreter ──HostTree──▶ DomArena (owned nodes)
//!                               ↓
//!                         NodeIndex (u32)
//! ```

pub mod arena;
pub mod error;
pub mod events;
pub mod host;
pub mod serializer;
pub mod types;
pub mod utils;

pub use arena::DomArena;
pub use error::{DomError, Result};
pub use events::SyntheticEvent;
pub use host::{FieldValue, FileInfo, HostTree, Listener, NativeEvent};
pub use serializer::DomSerializer;
pub use types::*;
