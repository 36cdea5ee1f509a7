//! # haven-types
//!
//! Shared data model for the Haven crisis-triage core.
//!
//! Everything the pipeline passes between components lives here: session
//! records and their append-only transition log, risk assessments with their
//! construction-time invariant, support resources, warm-transfer records,
//! and the observability event shapes.
//!
//! This crate is intentionally dependency-light — no async, no I/O — so the
//! guard and engine crates can share it without pulling in a runtime.

pub mod event;
pub mod ids;
pub mod resource;
pub mod risk;
pub mod session;
pub mod transfer;

pub use event::{EventPriority, EventType, TriageEvent};
pub use ids::{AssessmentId, EventId, ResourceId, SessionId, TransferId};
pub use resource::{ContactChannel, Resource, ResourceCategory, ResourceKind};
pub use risk::{
    ContractViolation, RiskAssessment, RiskCategory, RiskFactor, RiskSeverity,
};
pub use session::{
    ConsentStatus, Session, SessionState, TransitionRecord, TransitionTrigger,
};
pub use transfer::{TransferRecord, TransferStatus};
