//! The state machine itself: route, respond, decide, transition.

use std::sync::Arc;

use haven_risk::RiskClassifier;
use haven_types::{
    RiskAssessment, RiskSeverity, Session, SessionState, TransitionRecord, TransitionTrigger,
};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::flags::{EscalationSignal, ResponseFlags};
use crate::registry::{HandlerRegistry, Route};
use crate::responder::{GeneratedResponse, ResponseGenerator};
use crate::transitions::is_allowed;

/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// A risk check is due every N messages in the support loop.
    pub risk_check_interval: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_check_interval: 3,
        }
    }
}

/// What one engine pass produced.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    pub response: GeneratedResponse,
    /// The transition applied this turn, if any.
    pub transition: Option<TransitionRecord>,
    /// A decided transition that failed edge validation; state unchanged.
    /// Callers should surface a system warning.
    pub rejected: Option<(SessionState, SessionState)>,
    /// The folded escalation signal for this turn.
    pub signal: EscalationSignal,
}

/// Orchestrates one conversational turn against a session.
pub struct StateMachine {
    registry: HandlerRegistry,
    responder: Arc<dyn ResponseGenerator>,
    classifier: Arc<RiskClassifier>,
    config: EngineConfig,
}

impl StateMachine {
    pub fn new(
        responder: Arc<dyn ResponseGenerator>,
        classifier: Arc<RiskClassifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry: HandlerRegistry::standard(),
            responder,
            classifier,
            config,
        }
    }

    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Process one message: generate the response for the current state's
    /// role, fold the escalation signal, decide the next state, and apply
    /// the transition if the edge table allows it.
    ///
    /// `carried` holds flags asserted by the runtime rather than the
    /// responder (e.g. transfer completion observed by the coordinator).
    pub async fn process(
        &self,
        session: &mut Session,
        message: &str,
        assessment: &RiskAssessment,
        carried: ResponseFlags,
    ) -> Result<EngineOutcome, EngineError> {
        let role = match self.registry.route(session.state) {
            Route::Agent(role) => role,
            Route::Terminal => {
                debug!(session_id = %session.id, "message for terminal session");
                return Ok(EngineOutcome {
                    response: GeneratedResponse::session_ended(),
                    transition: None,
                    rejected: None,
                    signal: EscalationSignal::None,
                });
            }
        };

        let mut response = self
            .responder
            .generate(session, message, assessment, role)
            .await?;
        response.flags = response.flags.merge(carried);

        let signal = EscalationSignal::resolve(&response.flags, assessment, &self.classifier);

        let mut transition = None;
        let mut rejected = None;
        if let Some((next, trigger)) = self.next_state(session, &response.flags, assessment, signal)
        {
            if next != session.state {
                if is_allowed(session.state, next) {
                    info!(
                        session_id = %session.id,
                        from = %session.state,
                        to = %next,
                        trigger = ?trigger,
                        "state transition"
                    );
                    transition = Some(session.record_transition(next, trigger).clone());
                } else {
                    warn!(
                        session_id = %session.id,
                        from = %session.state,
                        to = %next,
                        "transition not in allowed-edge table; staying put"
                    );
                    rejected = Some((session.state, next));
                }
            }
        }

        Ok(EngineOutcome {
            response,
            transition,
            rejected,
            signal,
        })
    }

    /// Apply an externally requested transition, validating the edge.
    ///
    /// An illegal request is a distinct error kind; the session is left in
    /// its current state.
    pub fn request_transition(
        &self,
        session: &mut Session,
        to: SessionState,
        trigger: TransitionTrigger,
    ) -> Result<TransitionRecord, EngineError> {
        if !is_allowed(session.state, to) {
            warn!(
                session_id = %session.id,
                from = %session.state,
                to = %to,
                "rejected illegal transition request"
            );
            return Err(EngineError::IllegalTransition {
                from: session.state,
                to,
            });
        }
        Ok(session.record_transition(to, trigger).clone())
    }

    /// Next-state decision, first match wins:
    /// 1. escalation signal, 2. close, 3. per-state rule, 4. stay.
    fn next_state(
        &self,
        session: &Session,
        flags: &ResponseFlags,
        assessment: &RiskAssessment,
        signal: EscalationSignal,
    ) -> Option<(SessionState, TransitionTrigger)> {
        match signal {
            EscalationSignal::Emergency => {
                return Some((SessionState::Escalate, TransitionTrigger::Emergency));
            }
            EscalationSignal::Escalate => {
                return Some((SessionState::Escalate, TransitionTrigger::Escalation));
            }
            EscalationSignal::None => {}
        }

        if flags.session_closed {
            return Some((SessionState::Close, TransitionTrigger::CloseRequested));
        }
        if flags.consent_denied {
            return Some((SessionState::Close, TransitionTrigger::ConsentDenied));
        }

        match session.state {
            SessionState::Init if flags.consent_granted => {
                Some((SessionState::Consented, TransitionTrigger::ConsentGranted))
            }
            SessionState::Consented if flags.triage_completed => {
                Some((SessionState::Triage, TransitionTrigger::TriageCompleted))
            }
            SessionState::Triage if flags.triage_completed => {
                Some((SessionState::SupportLoop, TransitionTrigger::TriageCompleted))
            }
            SessionState::SupportLoop => {
                if self.risk_check_due(session, assessment) {
                    Some((SessionState::RiskCheck, TransitionTrigger::PeriodicRiskCheck))
                } else if flags.resources_requested {
                    Some((SessionState::Resources, TransitionTrigger::ResourcesRequested))
                } else {
                    None
                }
            }
            SessionState::RiskCheck => {
                Some((SessionState::SupportLoop, TransitionTrigger::LoopReturn))
            }
            SessionState::Resources => {
                Some((SessionState::SupportLoop, TransitionTrigger::LoopReturn))
            }
            SessionState::Escalate if flags.transfer_completed => {
                Some((SessionState::Close, TransitionTrigger::TransferCompleted))
            }
            _ => None,
        }
    }

    /// Periodic-check predicate: every Nth message, any prior risk flag, or
    /// a current assessment at Medium or above.
    fn risk_check_due(&self, session: &Session, assessment: &RiskAssessment) -> bool {
        let interval = self.config.risk_check_interval.max(1);
        session.message_count % interval == 0
            || !session.risk_flags.is_empty()
            || assessment.overall_severity >= RiskSeverity::Medium
    }
}
