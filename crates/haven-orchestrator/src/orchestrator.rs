//! The façade: one entry point per inbound message.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use haven_engine::{
    EscalationSignal, ResponseFlags, ResponseGenerator, StateMachine, TemplateResponder,
};
use haven_escalate::{
    EscalationCoordinator, MockTransferClient, ResourceDirectory, StaticDirectory,
    WarmTransferClient,
};
use haven_redact::Redactor;
use haven_risk::RiskClassifier;
use haven_session::{
    ExpirySweeper, SessionBackend, SessionStore, SessionValidity,
};
use haven_types::{
    ConsentStatus, EventPriority, EventType, Resource, ResourceCategory, RiskSeverity, Session,
    SessionId, SessionState, TransferId, TransferRecord, TransferStatus, TransitionRecord,
    TransitionTrigger, TriageEvent,
};

use crate::config::HavenConfig;
use crate::error::OrchestratorError;
use crate::events::{EventSink, TracingEventSink};

/// What one processed message returns to the caller.
#[derive(Debug, Clone)]
pub struct MessageResponse {
    pub session_id: SessionId,
    pub content: String,
    pub state: SessionState,
    pub severity: RiskSeverity,
    /// True when the session was invalid and state was left untouched.
    pub degraded: bool,
    pub transition: Option<TransitionRecord>,
    pub transfer: Option<TransferRecord>,
}

impl MessageResponse {
    fn degraded(session: &Session, validity: SessionValidity) -> Self {
        let content = match validity {
            SessionValidity::Closed => {
                "This session has ended. If you need support, please start a new conversation."
            }
            _ => {
                "This session has expired or reached its limit. Please start a new session — \
                 and if you are in immediate danger, call or text 988."
            }
        };
        Self {
            session_id: session.id.clone(),
            content: content.to_string(),
            state: session.state,
            severity: RiskSeverity::None,
            degraded: true,
            transition: None,
            transfer: None,
        }
    }
}

/// Point-in-time system status.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub closed_sessions: usize,
    pub escalations_in_flight: usize,
}

struct EscalationHandle {
    transfer_id: TransferId,
    task: JoinHandle<()>,
}

/// Builder for [`Orchestrator`] collaborator wiring.
pub struct OrchestratorBuilder {
    config: HavenConfig,
    responder: Arc<dyn ResponseGenerator>,
    directory: Arc<dyn ResourceDirectory>,
    transfer_client: Arc<dyn WarmTransferClient>,
    events: Arc<dyn EventSink>,
    backend: Option<Arc<dyn SessionBackend>>,
}

impl OrchestratorBuilder {
    fn new(config: HavenConfig) -> Self {
        Self {
            config,
            responder: Arc::new(TemplateResponder),
            directory: Arc::new(StaticDirectory::builtin()),
            transfer_client: Arc::new(MockTransferClient::progressing()),
            events: Arc::new(TracingEventSink),
            backend: None,
        }
    }

    pub fn responder(mut self, responder: Arc<dyn ResponseGenerator>) -> Self {
        self.responder = responder;
        self
    }

    pub fn directory(mut self, directory: Arc<dyn ResourceDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn transfer_client(mut self, client: Arc<dyn WarmTransferClient>) -> Self {
        self.transfer_client = client;
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn session_backend(mut self, backend: Arc<dyn SessionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Orchestrator {
        let classifier = Arc::new(RiskClassifier::new(self.config.classifier.clone()));
        let store = match self.backend {
            Some(backend) => {
                Arc::new(SessionStore::with_backend(backend, self.config.store.clone()))
            }
            None => Arc::new(SessionStore::in_memory(self.config.store.clone())),
        };
        let machine = StateMachine::new(
            self.responder,
            classifier.clone(),
            self.config.engine.clone(),
        );
        let coordinator = Arc::new(EscalationCoordinator::new(
            self.directory,
            self.transfer_client,
            self.config.escalation.clone(),
        ));

        Orchestrator {
            config: self.config,
            store,
            redactor: Redactor::default(),
            classifier,
            machine,
            coordinator,
            events: self.events,
            sweeper: std::sync::Mutex::new(None),
            escalations: DashMap::new(),
        }
    }
}

/// Top-level coordinator of the triage pipeline.
pub struct Orchestrator {
    config: HavenConfig,
    store: Arc<SessionStore>,
    redactor: Redactor,
    classifier: Arc<RiskClassifier>,
    machine: StateMachine,
    coordinator: Arc<EscalationCoordinator>,
    events: Arc<dyn EventSink>,
    sweeper: std::sync::Mutex<Option<ExpirySweeper>>,
    escalations: DashMap<SessionId, EscalationHandle>,
}

impl Orchestrator {
    /// Orchestrator with default collaborators (template responder, static
    /// directory, in-process transfer mock, tracing sink).
    pub fn new(config: HavenConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: HavenConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Start the background expiry sweep. Idempotent.
    pub fn start_sweeper(&self) {
        let mut slot = self.sweeper.lock().unwrap();
        if slot.is_none() {
            *slot = Some(ExpirySweeper::start(
                self.store.clone(),
                self.config.sweep.clone(),
            ));
            info!("expiry sweeper started");
        }
    }

    /// Stop the sweep and abort any escalation polling.
    pub async fn shutdown(&self) {
        let sweeper = self.sweeper.lock().unwrap().take();
        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
        }
        let session_ids: Vec<SessionId> =
            self.escalations.iter().map(|e| e.key().clone()).collect();
        for id in session_ids {
            self.cancel_escalation(&id).await;
        }
        info!("orchestrator shut down");
    }

    /// Create a session, optionally seeded with metadata (e.g. `location`).
    pub async fn create_session(
        &self,
        user_id: Option<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Session, OrchestratorError> {
        let mut session = self.store.create(user_id.clone()).await?;
        if !metadata.is_empty() {
            session.metadata.extend(metadata);
            self.store.update(&session).await?;
        }
        self.emit(
            TriageEvent::new(
                EventType::SessionCreated,
                session.id.clone(),
                EventPriority::Normal,
            )
            .with_metadata("user_id", json!(user_id)),
        );
        Ok(session)
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<Session, OrchestratorError> {
        Ok(self.store.get(id).await?)
    }

    /// Process one inbound message through the full pipeline.
    ///
    /// Serialized per session id: a second call for the same session waits
    /// for the first; calls for different sessions run in parallel.
    pub async fn process_message(
        &self,
        session_id: &SessionId,
        text: &str,
    ) -> Result<MessageResponse, OrchestratorError> {
        let lock = self.store.session_lock(session_id);
        let _guard = lock.lock().await;

        let mut session = self.store.get(session_id).await?;

        let validity = self.store.validate(&session);
        if !validity.is_valid() {
            debug!(session_id = %session_id, validity = ?validity, "degraded response for invalid session");
            self.cancel_escalation(session_id).await;
            if validity == SessionValidity::Expired {
                self.emit(TriageEvent::new(
                    EventType::SessionExpired,
                    session.id.clone(),
                    EventPriority::Normal,
                ));
            }
            return Ok(MessageResponse::degraded(&session, validity));
        }

        // Audit copy only — the pipeline processes the original text.
        let redaction = self.redactor.redact_text(text);
        self.emit(
            TriageEvent::new(
                EventType::MessageReceived,
                session.id.clone(),
                EventPriority::Normal,
            )
            .with_metadata("content_length", json!(text.len()))
            .with_metadata("redactions", json!(redaction.count()))
            .with_metadata(
                "pii_kinds",
                json!(redaction
                    .kinds()
                    .iter()
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>()),
            ),
        );
        if text.trim().is_empty() {
            self.emit(
                TriageEvent::new(
                    EventType::SystemWarning,
                    session.id.clone(),
                    EventPriority::Low,
                )
                .with_metadata("reason", json!("empty message")),
            );
        }

        session.message_count += 1;

        let assessment =
            self.classifier
                .classify(&session.id, text, session.last_risk_flag())?;
        let severity = assessment.overall_severity;
        self.emit(
            TriageEvent::new(
                EventType::RiskAssessed,
                session.id.clone(),
                if severity >= RiskSeverity::High {
                    EventPriority::High
                } else {
                    EventPriority::Normal
                },
            )
            .with_metadata("severity", json!(severity.to_string()))
            .with_metadata("confidence", json!(assessment.overall_confidence))
            .with_metadata("factors", json!(assessment.factors.len())),
        );
        if severity > RiskSeverity::Low {
            session.push_risk_flag(severity);
            self.emit(
                TriageEvent::new(
                    EventType::RiskFlagRaised,
                    session.id.clone(),
                    EventPriority::High,
                )
                .with_metadata("severity", json!(severity.to_string())),
            );
        }

        // Flags asserted by the runtime rather than the responder.
        let mut carried = ResponseFlags::default();
        let mut transfer_view = None;
        if session.state == SessionState::Escalate {
            if let Some(handle) = self.escalations.get(&session.id) {
                let transfer_id = handle.transfer_id.clone();
                drop(handle);
                if let Ok(record) = self.coordinator.check_status(&transfer_id).await {
                    carried.transfer_completed = record.status == TransferStatus::Completed;
                    transfer_view = Some(record);
                }
            }
        }

        let outcome = self
            .machine
            .process(&mut session, text, &assessment, carried)
            .await?;

        self.apply_consent(&mut session, &outcome.response.flags);

        if let Some((from, to)) = outcome.rejected {
            warn!(session_id = %session.id, from = %from, to = %to, "transition rejected");
            self.emit(
                TriageEvent::new(
                    EventType::SystemWarning,
                    session.id.clone(),
                    EventPriority::High,
                )
                .with_metadata("reason", json!("illegal transition rejected"))
                .with_metadata("from", json!(from.to_string()))
                .with_metadata("to", json!(to.to_string())),
            );
        }

        if let Some(record) = &outcome.transition {
            match record.to {
                SessionState::Escalate => {
                    self.emit(
                        TriageEvent::new(
                            EventType::RiskEscalationTriggered,
                            session.id.clone(),
                            EventPriority::Critical,
                        )
                        .with_metadata("signal", json!(format!("{:?}", outcome.signal))),
                    );
                    let transfer = self.start_escalation(&session, outcome.signal).await;
                    transfer_view = Some(transfer);
                }
                SessionState::Close => {
                    self.cancel_escalation(&session.id).await;
                    self.emit(
                        TriageEvent::new(
                            EventType::SessionClosed,
                            session.id.clone(),
                            EventPriority::Normal,
                        )
                        .with_metadata("trigger", json!(format!("{:?}", record.trigger))),
                    );
                }
                _ => {
                    self.emit(
                        TriageEvent::new(
                            EventType::SessionUpdated,
                            session.id.clone(),
                            EventPriority::Low,
                        )
                        .with_metadata("from", json!(record.from.to_string()))
                        .with_metadata("to", json!(record.to.to_string())),
                    );
                }
            }
        }

        self.store.update(&session).await?;

        self.emit(
            TriageEvent::new(
                EventType::MessageSent,
                session.id.clone(),
                EventPriority::Normal,
            )
            .with_metadata("content_length", json!(outcome.response.content.len())),
        );

        Ok(MessageResponse {
            session_id: session.id.clone(),
            content: outcome.response.content,
            state: session.state,
            severity,
            degraded: false,
            transition: outcome.transition,
            transfer: transfer_view,
        })
    }

    /// Close a session on request, cancelling any escalation polling.
    pub async fn close_session(
        &self,
        id: &SessionId,
        reason: &str,
    ) -> Result<Session, OrchestratorError> {
        let lock = self.store.session_lock(id);
        let _guard = lock.lock().await;

        self.cancel_escalation(id).await;
        let session = self
            .store
            .close(id, TransitionTrigger::CloseRequested, reason)
            .await?;
        self.emit(
            TriageEvent::new(
                EventType::SessionClosed,
                session.id.clone(),
                EventPriority::Normal,
            )
            .with_metadata("reason", json!(reason)),
        );
        Ok(session)
    }

    /// Resources for a session's location (degraded-safe).
    pub async fn resources_for(
        &self,
        id: &SessionId,
        categories: Option<&[ResourceCategory]>,
    ) -> Result<Vec<Resource>, OrchestratorError> {
        let session = self.store.get(id).await?;
        let location = session
            .metadata
            .get("location")
            .and_then(|v| v.as_str())
            .unwrap_or("US")
            .to_string();
        let resources = self.coordinator.resources(&location, categories).await;
        self.emit(
            TriageEvent::new(
                EventType::ResourceProvided,
                session.id.clone(),
                EventPriority::Normal,
            )
            .with_metadata("count", json!(resources.len())),
        );
        Ok(resources)
    }

    pub async fn status(&self) -> Result<StatusReport, OrchestratorError> {
        let stats = self.store.stats().await?;
        Ok(StatusReport {
            total_sessions: stats.total,
            active_sessions: stats.active,
            closed_sessions: stats.closed,
            escalations_in_flight: self.escalations.len(),
        })
    }

    fn apply_consent(&self, session: &mut Session, flags: &ResponseFlags) {
        if flags.consent_granted && session.consent_status == ConsentStatus::Pending {
            session.consent_status = ConsentStatus::Granted;
            self.emit(TriageEvent::new(
                EventType::ConsentGranted,
                session.id.clone(),
                EventPriority::Normal,
            ));
        }
        if flags.consent_denied {
            let (status, kind) = match session.consent_status {
                ConsentStatus::Granted => (ConsentStatus::Withdrawn, EventType::ConsentWithdrawn),
                _ => (ConsentStatus::Denied, EventType::ConsentDenied),
            };
            session.consent_status = status;
            self.emit(TriageEvent::new(
                kind,
                session.id.clone(),
                EventPriority::Normal,
            ));
        }
    }

    /// Kick off the handoff and the bounded status-polling task.
    async fn start_escalation(
        &self,
        session: &Session,
        signal: EscalationSignal,
    ) -> TransferRecord {
        if let Some(existing) = self.escalations.get(&session.id) {
            let transfer_id = existing.transfer_id.clone();
            drop(existing);
            if let Ok(record) = self.coordinator.check_status(&transfer_id).await {
                return record;
            }
        }

        let record = self
            .coordinator
            .escalate(session, signal.is_emergency(), session.last_risk_flag())
            .await;

        self.emit(
            TriageEvent::new(
                EventType::EscalationInitiated,
                session.id.clone(),
                EventPriority::High,
            )
            .with_metadata("transfer_id", json!(record.id.to_string()))
            .with_metadata("resource_id", json!(record.resource_id.to_string()))
            .with_metadata("estimated_wait_minutes", json!(record.estimated_wait_minutes)),
        );

        let coordinator = self.coordinator.clone();
        let events = self.events.clone();
        let session_id = session.id.clone();
        let transfer_id = record.id.clone();
        let timeout = self.config.transfer_wait;
        let task = tokio::spawn(async move {
            match coordinator.wait_for_connection(&transfer_id, timeout).await {
                Ok(record) if record.status.is_connected() => {
                    events.emit(
                        TriageEvent::new(
                            EventType::EscalationCompleted,
                            session_id,
                            EventPriority::High,
                        )
                        .with_metadata("status", json!(record.status.to_string())),
                    );
                }
                Ok(record) => {
                    events.emit(
                        TriageEvent::new(
                            EventType::EscalationFailed,
                            session_id,
                            EventPriority::Critical,
                        )
                        .with_metadata("status", json!(record.status.to_string())),
                    );
                }
                Err(error) => {
                    events.emit(
                        TriageEvent::new(
                            EventType::EscalationFailed,
                            session_id,
                            EventPriority::Critical,
                        )
                        .with_metadata("error", json!(error.to_string())),
                    );
                }
            }
        });

        self.escalations.insert(
            session.id.clone(),
            EscalationHandle {
                transfer_id: record.id.clone(),
                task,
            },
        );

        record
    }

    /// Abort polling and cancel the transfer for a session, if any.
    async fn cancel_escalation(&self, session_id: &SessionId) {
        if let Some((_, handle)) = self.escalations.remove(session_id) {
            handle.task.abort();
            if let Err(error) = self.coordinator.cancel(&handle.transfer_id).await {
                debug!(session_id = %session_id, error = %error, "escalation cancel cleanup");
            }
            debug!(session_id = %session_id, "escalation polling cancelled");
        }
    }

    fn emit(&self, event: TriageEvent) {
        self.events.emit(event);
    }
}
