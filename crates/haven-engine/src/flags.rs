//! Response flags and the unified escalation signal.

use haven_risk::RiskClassifier;
use haven_types::RiskAssessment;
use serde::{Deserialize, Serialize};

/// Flags a response generator may set on its output (§ external contract).
///
/// Flags only ever assert; merging two flag sets ORs them, so a runtime-
/// carried flag cannot be cleared by a responder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFlags {
    pub consent_granted: bool,
    pub consent_denied: bool,
    pub triage_completed: bool,
    pub escalation_triggered: bool,
    pub emergency_escalation: bool,
    pub session_closed: bool,
    pub resources_requested: bool,
    pub transfer_completed: bool,
}

impl ResponseFlags {
    pub fn merge(self, other: ResponseFlags) -> ResponseFlags {
        ResponseFlags {
            consent_granted: self.consent_granted || other.consent_granted,
            consent_denied: self.consent_denied || other.consent_denied,
            triage_completed: self.triage_completed || other.triage_completed,
            escalation_triggered: self.escalation_triggered || other.escalation_triggered,
            emergency_escalation: self.emergency_escalation || other.emergency_escalation,
            session_closed: self.session_closed || other.session_closed,
            resources_requested: self.resources_requested || other.resources_requested,
            transfer_completed: self.transfer_completed || other.transfer_completed,
        }
    }
}

/// The single escalation signal.
///
/// The response flags and the classifier predicates historically disagreed;
/// this fold is the only place either is read for escalation purposes, and
/// the decision order consumes only the folded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationSignal {
    None,
    Escalate,
    Emergency,
}

impl EscalationSignal {
    /// Fold flags and classifier predicates into one signal. Emergency wins.
    pub fn resolve(
        flags: &ResponseFlags,
        assessment: &RiskAssessment,
        classifier: &RiskClassifier,
    ) -> Self {
        if flags.emergency_escalation || classifier.is_emergency(assessment) {
            EscalationSignal::Emergency
        } else if flags.escalation_triggered || classifier.should_escalate(assessment) {
            EscalationSignal::Escalate
        } else {
            EscalationSignal::None
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, EscalationSignal::None)
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, EscalationSignal::Emergency)
    }
}
