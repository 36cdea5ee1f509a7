//! Session records and the session lifecycle state set.
//!
//! A [`Session`] tracks one user's conversation from first contact to close.
//! State moves only along the edges the engine allows; every applied move is
//! appended to the session's transition log, which is append-only and never
//! reordered.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SessionId;
use crate::risk::RiskSeverity;

/// Conversation phase of a triage session.
///
/// `Close` is terminal: a closed session has no outgoing edges and accepts
/// no further mutation beyond audit metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// First contact; consent not yet established.
    Init,
    /// User granted consent to continue.
    Consented,
    /// Gathering what the user needs.
    Triage,
    /// Main supportive conversation loop.
    SupportLoop,
    /// Dedicated risk re-assessment turn.
    RiskCheck,
    /// Surfacing support resources.
    Resources,
    /// Human handoff in progress.
    Escalate,
    /// Terminal.
    Close,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Close)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Init => "INIT",
            SessionState::Consented => "CONSENTED",
            SessionState::Triage => "TRIAGE",
            SessionState::SupportLoop => "SUPPORT_LOOP",
            SessionState::RiskCheck => "RISK_CHECK",
            SessionState::Resources => "RESOURCES",
            SessionState::Escalate => "ESCALATE",
            SessionState::Close => "CLOSE",
        };
        write!(f, "{}", s)
    }
}

/// User consent status.
///
/// Silence is never consent: a session starts `Pending` and only an explicit
/// grant moves it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentStatus {
    Pending,
    Granted,
    Denied,
    Withdrawn,
}

/// What caused a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionTrigger {
    /// Escalation signal (classifier or response flags).
    Escalation,
    /// Emergency-level escalation signal.
    Emergency,
    /// Explicit close request from the conversation.
    CloseRequested,
    /// Consent was denied or withdrawn.
    ConsentDenied,
    ConsentGranted,
    TriageCompleted,
    /// Periodic risk-check predicate fired.
    PeriodicRiskCheck,
    ResourcesRequested,
    /// Unconditional return to the support loop.
    LoopReturn,
    TransferCompleted,
    /// Session passed its expiry deadline.
    Expired,
    /// Session hit its message limit.
    MessageLimit,
    /// Operator or system shutdown close.
    SystemClose,
}

/// Immutable record of one applied state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: SessionState,
    pub to: SessionState,
    pub at: DateTime<Utc>,
    pub trigger: TransitionTrigger,
}

/// One user's ongoing interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: Option<String>,
    pub state: SessionState,
    pub consent_status: ConsentStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Number of user messages processed. Monotonic.
    pub message_count: u32,
    /// Severity labels raised during the session. Append-only.
    pub risk_flags: Vec<RiskSeverity>,
    /// Free-form session metadata.
    pub metadata: HashMap<String, serde_json::Value>,

    pub max_messages: u32,
    pub timeout_minutes: i64,

    /// Append-only, never reordered.
    pub transitions: Vec<TransitionRecord>,
}

impl Session {
    /// Create a new session in `Init` with consent pending.
    pub fn new(user_id: Option<String>, max_messages: u32, timeout_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::generate(),
            user_id,
            state: SessionState::Init,
            consent_status: ConsentStatus::Pending,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::minutes(timeout_minutes),
            message_count: 0,
            risk_flags: Vec::new(),
            metadata: HashMap::new(),
            max_messages,
            timeout_minutes,
            transitions: Vec::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    /// Most recently recorded risk flag, if any.
    pub fn last_risk_flag(&self) -> Option<RiskSeverity> {
        self.risk_flags.last().copied()
    }

    /// Apply a transition, appending it to the log.
    ///
    /// Callers must have validated the edge against the allowed-edge table;
    /// this only records it.
    pub fn record_transition(
        &mut self,
        to: SessionState,
        trigger: TransitionTrigger,
    ) -> &TransitionRecord {
        let record = TransitionRecord {
            from: self.state,
            to,
            at: Utc::now(),
            trigger,
        };
        self.state = to;
        self.transitions.push(record);
        self.updated_at = Utc::now();
        self.transitions.last().unwrap()
    }

    /// Append a risk flag. Flags are never removed or rewritten.
    pub fn push_risk_flag(&mut self, severity: RiskSeverity) {
        self.risk_flags.push(severity);
        self.updated_at = Utc::now();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Audit-only metadata write. The one mutation allowed after close.
    pub fn audit_note(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_in_init_with_pending_consent() {
        let s = Session::new(None, 50, 30);
        assert_eq!(s.state, SessionState::Init);
        assert_eq!(s.consent_status, ConsentStatus::Pending);
        assert_eq!(s.message_count, 0);
        assert!(s.transitions.is_empty());
        assert!(s.expires_at > s.created_at);
    }

    #[test]
    fn record_transition_appends_to_log() {
        let mut s = Session::new(None, 50, 30);
        s.record_transition(SessionState::Consented, TransitionTrigger::ConsentGranted);
        s.record_transition(SessionState::Triage, TransitionTrigger::TriageCompleted);

        assert_eq!(s.state, SessionState::Triage);
        assert_eq!(s.transitions.len(), 2);
        assert_eq!(s.transitions[0].from, SessionState::Init);
        assert_eq!(s.transitions[0].to, SessionState::Consented);
        assert_eq!(s.transitions[1].from, SessionState::Consented);
    }

    #[test]
    fn close_is_terminal() {
        assert!(SessionState::Close.is_terminal());
        assert!(!SessionState::SupportLoop.is_terminal());
    }

    #[test]
    fn risk_flags_accumulate_in_order() {
        let mut s = Session::new(None, 50, 30);
        s.push_risk_flag(RiskSeverity::Medium);
        s.push_risk_flag(RiskSeverity::High);
        assert_eq!(
            s.risk_flags,
            vec![RiskSeverity::Medium, RiskSeverity::High]
        );
        assert_eq!(s.last_risk_flag(), Some(RiskSeverity::High));
    }
}
