use haven_types::SessionId;
use thiserror::Error;

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("session {0} is closed and accepts only audit metadata")]
    Closed(SessionId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
