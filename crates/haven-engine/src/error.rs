use haven_types::SessionState;
use thiserror::Error;

/// Errors from the state machine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        from: SessionState,
        to: SessionState,
    },

    #[error("response generation failed: {0}")]
    Responder(String),
}
