//! # haven-orchestrator
//!
//! The top-level façade over the triage pipeline. Each inbound message runs
//!
//! ```text
//! message → PII redaction (audit copy) → risk classification
//!         → state machine → session store → event sink
//! ```
//!
//! under a per-session write lock: concurrent messages for the same session
//! are strictly serialized, different sessions run fully in parallel. The
//! orchestrator also owns the background expiry sweep and the bounded
//! escalation-polling tasks, cancelling the latter when their session
//! closes.

mod config;
mod error;
mod events;
mod orchestrator;

pub use config::HavenConfig;
pub use error::OrchestratorError;
pub use events::{EventSink, TracingEventSink};
pub use orchestrator::{MessageResponse, Orchestrator, OrchestratorBuilder, StatusReport};
