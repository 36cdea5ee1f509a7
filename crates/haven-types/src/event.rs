//! Observability event shapes.
//!
//! Events are fire-and-forget: sinks consume them, the pipeline never waits
//! on them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, SessionId};

/// Kind of emitted event, dotted-name style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "session.created")]
    SessionCreated,
    #[serde(rename = "session.updated")]
    SessionUpdated,
    #[serde(rename = "session.closed")]
    SessionClosed,
    #[serde(rename = "session.expired")]
    SessionExpired,

    #[serde(rename = "consent.granted")]
    ConsentGranted,
    #[serde(rename = "consent.denied")]
    ConsentDenied,
    #[serde(rename = "consent.withdrawn")]
    ConsentWithdrawn,

    #[serde(rename = "message.received")]
    MessageReceived,
    #[serde(rename = "message.sent")]
    MessageSent,

    #[serde(rename = "risk.assessed")]
    RiskAssessed,
    #[serde(rename = "risk.flag_raised")]
    RiskFlagRaised,
    #[serde(rename = "risk.escalation_triggered")]
    RiskEscalationTriggered,

    #[serde(rename = "resource.provided")]
    ResourceProvided,

    #[serde(rename = "escalation.initiated")]
    EscalationInitiated,
    #[serde(rename = "escalation.completed")]
    EscalationCompleted,
    #[serde(rename = "escalation.failed")]
    EscalationFailed,

    #[serde(rename = "system.warning")]
    SystemWarning,
    #[serde(rename = "system.error")]
    SystemError,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::SessionCreated => "session.created",
            EventType::SessionUpdated => "session.updated",
            EventType::SessionClosed => "session.closed",
            EventType::SessionExpired => "session.expired",
            EventType::ConsentGranted => "consent.granted",
            EventType::ConsentDenied => "consent.denied",
            EventType::ConsentWithdrawn => "consent.withdrawn",
            EventType::MessageReceived => "message.received",
            EventType::MessageSent => "message.sent",
            EventType::RiskAssessed => "risk.assessed",
            EventType::RiskFlagRaised => "risk.flag_raised",
            EventType::RiskEscalationTriggered => "risk.escalation_triggered",
            EventType::ResourceProvided => "resource.provided",
            EventType::EscalationInitiated => "escalation.initiated",
            EventType::EscalationCompleted => "escalation.completed",
            EventType::EscalationFailed => "escalation.failed",
            EventType::SystemWarning => "system.warning",
            EventType::SystemError => "system.error",
        };
        write!(f, "{}", s)
    }
}

/// Event priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventPriority {
    Low,
    Normal,
    High,
    Critical,
}

/// One emitted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageEvent {
    pub id: EventId,
    pub kind: EventType,
    pub session_id: SessionId,
    pub priority: EventPriority,
    pub at: DateTime<Utc>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl TriageEvent {
    pub fn new(kind: EventType, session_id: SessionId, priority: EventPriority) -> Self {
        Self {
            id: EventId::generate(),
            kind,
            session_id,
            priority,
            at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
