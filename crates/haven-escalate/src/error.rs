use haven_types::TransferId;
use thiserror::Error;

/// Errors from escalation collaborators.
///
/// Directory and transfer errors are caught inside the coordinator and
/// degraded to the static fallback; only unknown-transfer lookups surface.
#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("directory lookup failed: {0}")]
    Directory(String),

    #[error("warm transfer client error: {0}")]
    Transfer(String),

    #[error("unknown transfer: {0}")]
    UnknownTransfer(TransferId),
}
