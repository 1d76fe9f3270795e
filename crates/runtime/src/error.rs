use thiserror::Error;

use interpreter::ApplyError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session is busy: an edit stream or event dispatch is in progress")]
    Busy,

    #[error("Session is desynchronized, resync before applying more edits")]
    Desynchronized,

    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    #[error("Host error: {0}")]
    Dom(#[from] dom::DomError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
