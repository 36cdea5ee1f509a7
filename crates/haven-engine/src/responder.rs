//! The response-generation seam.
//!
//! Real response generation (templates, models, localization) lives outside
//! the core; the engine only depends on this trait. [`TemplateResponder`] is
//! the deterministic stand-in used by tests and local development.

use async_trait::async_trait;
use haven_types::{RiskAssessment, Session, SessionState};

use crate::error::EngineError;
use crate::flags::ResponseFlags;
use crate::registry::AgentRole;

/// A generated reply plus the flags it asserts.
#[derive(Debug, Clone)]
pub struct GeneratedResponse {
    pub content: String,
    pub flags: ResponseFlags,
}

impl GeneratedResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            flags: ResponseFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: ResponseFlags) -> Self {
        self.flags = flags;
        self
    }

    /// The fixed terminal reply for closed sessions.
    pub fn session_ended() -> Self {
        Self::new("This session has ended. If you need support, please start a new conversation.")
    }
}

/// Produces the conversational reply for one turn.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        session: &Session,
        message: &str,
        assessment: &RiskAssessment,
        role: AgentRole,
    ) -> Result<GeneratedResponse, EngineError>;
}

/// Deterministic keyword-driven responder for tests and development.
///
/// Consent and intent are read from literal phrases; nothing here attempts
/// language understanding.
#[derive(Debug, Default)]
pub struct TemplateResponder;

impl TemplateResponder {
    fn greeter(&self, session: &Session, message: &str) -> GeneratedResponse {
        let lowered = message.to_lowercase();
        match session.state {
            SessionState::Init => {
                let mut flags = ResponseFlags::default();
                if ["i consent", "yes", "okay", "sure"]
                    .iter()
                    .any(|phrase| lowered.contains(phrase))
                {
                    flags.consent_granted = true;
                } else if ["i do not consent", "no thanks", "decline"]
                    .iter()
                    .any(|phrase| lowered.contains(phrase))
                {
                    flags.consent_denied = true;
                }
                GeneratedResponse::new(
                    "Welcome. This is a supportive space, not a medical service. \
                     Is it okay if we talk for a bit?",
                )
                .with_flags(flags)
            }
            _ => {
                // Consented/Triage intake: one exchange completes triage.
                let flags = ResponseFlags {
                    triage_completed: true,
                    ..ResponseFlags::default()
                };
                GeneratedResponse::new(
                    "Thank you for sharing that. I'd like to understand what \
                     you're going through so I can support you better.",
                )
                .with_flags(flags)
            }
        }
    }

    fn empathy(&self, message: &str) -> GeneratedResponse {
        let lowered = message.to_lowercase();
        let mut flags = ResponseFlags::default();
        if lowered.contains("resource") || lowered.contains("hotline") {
            flags.resources_requested = true;
        }
        if lowered.contains("goodbye") || lowered.contains("end session") {
            flags.session_closed = true;
        }
        GeneratedResponse::new(
            "That sounds really hard. I'm here with you — can you tell me more \
             about how that's been for you?",
        )
        .with_flags(flags)
    }
}

#[async_trait]
impl ResponseGenerator for TemplateResponder {
    async fn generate(
        &self,
        session: &Session,
        message: &str,
        _assessment: &RiskAssessment,
        role: AgentRole,
    ) -> Result<GeneratedResponse, EngineError> {
        let response = match role {
            AgentRole::Greeter => self.greeter(session, message),
            AgentRole::Empathy => self.empathy(message),
            AgentRole::RiskAssessor => GeneratedResponse::new(
                "I want to check in on how safe you're feeling right now. \
                 Are you thinking about hurting yourself?",
            ),
            AgentRole::ResourceGuide => GeneratedResponse::new(
                "Here are some options that can help — would you like crisis \
                 lines, counseling services, or community support?",
            ),
            AgentRole::Escalation => GeneratedResponse::new(
                "I'm connecting you with a trained counselor right now. \
                 Please stay with me while the transfer goes through.",
            ),
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_types::SessionId;

    fn session_in(state: SessionState) -> Session {
        let mut s = Session::new(None, 50, 30);
        if state != SessionState::Init {
            s.state = state;
        }
        s
    }

    fn assessment() -> RiskAssessment {
        RiskAssessment::none(SessionId::generate())
    }

    #[tokio::test]
    async fn greeter_reads_consent() {
        let responder = TemplateResponder;
        let session = session_in(SessionState::Init);

        let yes = responder
            .generate(&session, "yes, I consent", &assessment(), AgentRole::Greeter)
            .await
            .unwrap();
        assert!(yes.flags.consent_granted);

        let no = responder
            .generate(&session, "no thanks", &assessment(), AgentRole::Greeter)
            .await
            .unwrap();
        assert!(no.flags.consent_denied);
    }

    #[tokio::test]
    async fn empathy_flags_resource_requests() {
        let responder = TemplateResponder;
        let session = session_in(SessionState::SupportLoop);
        let out = responder
            .generate(
                &session,
                "is there a hotline I could call?",
                &assessment(),
                AgentRole::Empathy,
            )
            .await
            .unwrap();
        assert!(out.flags.resources_requested);
    }

    #[tokio::test]
    async fn triage_exchange_completes_triage() {
        let responder = TemplateResponder;
        let session = session_in(SessionState::Triage);
        let out = responder
            .generate(
                &session,
                "mostly struggling with sleep and stress",
                &assessment(),
                AgentRole::Greeter,
            )
            .await
            .unwrap();
        assert!(out.flags.triage_completed);
    }
}
