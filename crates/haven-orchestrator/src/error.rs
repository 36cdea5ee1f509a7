use haven_engine::EngineError;
use haven_session::SessionError;
use haven_types::ContractViolation;
use thiserror::Error;

/// Errors surfaced by the orchestrator.
///
/// Invalid sessions (expired, over limit, closed) are NOT errors — they
/// produce a degraded response. Unknown session ids and programming-error
/// contract violations are.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Contract(#[from] ContractViolation),
}
