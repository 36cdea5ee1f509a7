//! The escalation coordinator.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use haven_types::{
    Resource, RiskSeverity, Session, TransferId, TransferRecord, TransferStatus,
};
use tracing::{debug, info, warn};

use crate::directory::{ResourceDirectory, StaticDirectory};
use crate::error::EscalationError;
use crate::transfer::{TransferContext, WarmTransferClient};

/// Coordinator tunables.
#[derive(Debug, Clone)]
pub struct EscalationConfig {
    /// Location used when the session carries none.
    pub default_location: String,
    /// Fixed interval between status polls.
    pub poll_interval: Duration,
    /// Wait estimate for synthetic (degraded-mode) records.
    pub fallback_wait_minutes: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            default_location: "US".to_string(),
            poll_interval: Duration::from_secs(30),
            fallback_wait_minutes: 5,
        }
    }
}

/// Runs one handoff attempt per escalated session and tracks its status.
pub struct EscalationCoordinator {
    directory: Arc<dyn ResourceDirectory>,
    client: Arc<dyn WarmTransferClient>,
    fallback: StaticDirectory,
    active: DashMap<TransferId, TransferRecord>,
    config: EscalationConfig,
}

impl EscalationCoordinator {
    pub fn new(
        directory: Arc<dyn ResourceDirectory>,
        client: Arc<dyn WarmTransferClient>,
        config: EscalationConfig,
    ) -> Self {
        Self {
            directory,
            client,
            fallback: StaticDirectory::builtin(),
            active: DashMap::new(),
            config,
        }
    }

    /// Start a handoff for an escalated session.
    ///
    /// Never errors: a directory or client failure degrades to the static
    /// resource set and a locally tracked record.
    pub async fn escalate(
        &self,
        session: &Session,
        urgent: bool,
        risk_level: Option<RiskSeverity>,
    ) -> TransferRecord {
        let location = session
            .metadata
            .get("location")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.config.default_location)
            .to_string();

        let resource = self.select_resource(&location, urgent).await;
        info!(
            session_id = %session.id,
            resource = %resource.id,
            urgent,
            "initiating warm transfer"
        );

        let context = TransferContext {
            risk_level,
            summary: None,
            metadata: Default::default(),
        };

        let record = match self.client.initiate(&session.id, &resource, &context).await {
            Ok(record) => record,
            Err(error) => {
                warn!(
                    session_id = %session.id,
                    error = %error,
                    "warm transfer initiation failed; tracking locally against static resource"
                );
                TransferRecord::new(
                    session.id.clone(),
                    resource.id.clone(),
                    self.config.fallback_wait_minutes,
                )
            }
        };

        self.active.insert(record.id.clone(), record.clone());
        record
    }

    /// List resources for a location, degrading to the static set when the
    /// directory fails or comes back empty.
    pub async fn resources(
        &self,
        location: &str,
        categories: Option<&[haven_types::ResourceCategory]>,
    ) -> Vec<Resource> {
        match self.directory.resources(location, categories).await {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => self.fallback.lookup(location, categories),
            Err(error) => {
                warn!(location, error = %error, "directory lookup failed; serving static set");
                self.fallback.lookup(location, categories)
            }
        }
    }

    /// Pick the primary resource for a location, crisis categories first
    /// when urgency is flagged. Falls back to the static set on any
    /// directory failure or empty answer.
    pub async fn select_resource(&self, location: &str, urgent: bool) -> Resource {
        let looked_up = if urgent {
            self.directory.crisis_resources(location).await
        } else {
            self.directory.resources(location, None).await
        };

        let mut candidates = match looked_up {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => {
                debug!(location, "directory returned no resources; using static set");
                self.static_candidates(location, urgent)
            }
            Err(error) => {
                warn!(location, error = %error, "directory lookup failed; using static set");
                self.static_candidates(location, urgent)
            }
        };

        // Verified resources first, keeping directory order otherwise.
        candidates.sort_by_key(|r| !r.verified);
        candidates
            .into_iter()
            .next()
            .unwrap_or_else(|| self.fallback.crisis_lookup("US").remove(0))
    }

    fn static_candidates(&self, location: &str, urgent: bool) -> Vec<Resource> {
        if urgent {
            self.fallback.crisis_lookup(location)
        } else {
            self.fallback.lookup(location, None)
        }
    }

    /// Current view of a transfer, refreshed from the client when it
    /// answers. Status never regresses and terminal states stick; a client
    /// error keeps the last known record.
    pub async fn check_status(&self, id: &TransferId) -> Result<TransferRecord, EscalationError> {
        // Snapshot first; never hold a map guard across the remote call.
        if !self.active.contains_key(id) {
            return Err(EscalationError::UnknownTransfer(id.clone()));
        }

        match self.client.status(id).await {
            Ok(observed) => self.merge_observed(id, observed.status),
            Err(error) => {
                debug!(transfer_id = %id, error = %error, "status check failed; keeping last known status");
            }
        }

        self.active
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| EscalationError::UnknownTransfer(id.clone()))
    }

    /// Cancel a transfer (session close or timeout). Best-effort remotely;
    /// the local record always moves to `Cancelled` unless already terminal.
    pub async fn cancel(&self, id: &TransferId) -> Result<TransferRecord, EscalationError> {
        if let Err(error) = self.client.cancel(id).await {
            warn!(transfer_id = %id, error = %error, "remote cancel failed; cancelling locally");
        }

        let mut record = self
            .active
            .get_mut(id)
            .ok_or_else(|| EscalationError::UnknownTransfer(id.clone()))?;
        if !record.status.is_terminal() {
            record.status = TransferStatus::Cancelled;
            info!(transfer_id = %id, "transfer cancelled");
        }
        Ok(record.clone())
    }

    /// Poll until the transfer is connected, completed, or terminally
    /// failed, or until `timeout` elapses — in which case the record is
    /// marked with a synthetic `Timeout` status instead of blocking.
    pub async fn wait_for_connection(
        &self,
        id: &TransferId,
        timeout: Duration,
    ) -> Result<TransferRecord, EscalationError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let record = self.check_status(id).await?;
            if record.status.is_connected() || record.status.is_terminal() {
                return Ok(record);
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                warn!(transfer_id = %id, "transfer wait timed out");
                if let Some(mut stored) = self.active.get_mut(id) {
                    if !stored.status.is_terminal() {
                        stored.status = TransferStatus::Timeout;
                    }
                    return Ok(stored.clone());
                }
                return Err(EscalationError::UnknownTransfer(id.clone()));
            }

            let next_poll = now + self.config.poll_interval;
            tokio::time::sleep_until(next_poll.min(deadline)).await;
        }
    }

    /// Adopt an observed status only if it does not regress.
    fn merge_observed(&self, id: &TransferId, observed: TransferStatus) {
        let Some(mut stored) = self.active.get_mut(id) else {
            return;
        };
        if stored.status.is_terminal() {
            return;
        }
        match (stored.status.progress_rank(), observed.progress_rank()) {
            // Terminal failure reported by the client: adopt it.
            (_, None) => stored.status = observed,
            (Some(current), Some(new)) if new >= current => stored.status = observed,
            _ => {
                warn!(
                    transfer_id = %id,
                    current = %stored.status,
                    observed = %observed,
                    "discarding regressed transfer status"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::MockTransferClient;
    use async_trait::async_trait;
    use haven_types::ResourceCategory;

    struct FailingDirectory;

    #[async_trait]
    impl ResourceDirectory for FailingDirectory {
        async fn resources(
            &self,
            _location: &str,
            _categories: Option<&[ResourceCategory]>,
        ) -> Result<Vec<Resource>, EscalationError> {
            Err(EscalationError::Directory("directory unreachable".into()))
        }
    }

    fn coordinator_with(
        directory: Arc<dyn ResourceDirectory>,
        client: Arc<dyn WarmTransferClient>,
    ) -> EscalationCoordinator {
        EscalationCoordinator::new(
            directory,
            client,
            EscalationConfig {
                poll_interval: Duration::from_secs(1),
                ..EscalationConfig::default()
            },
        )
    }

    fn session() -> Session {
        Session::new(None, 50, 30)
    }

    #[tokio::test]
    async fn escalate_starts_a_pending_transfer() {
        let c = coordinator_with(
            Arc::new(StaticDirectory::builtin()),
            Arc::new(MockTransferClient::progressing()),
        );
        let s = session();
        let record = c.escalate(&s, true, Some(RiskSeverity::High)).await;
        assert_eq!(record.status, TransferStatus::Pending);
        assert_eq!(record.session_id, s.id);
    }

    #[tokio::test]
    async fn urgent_escalation_picks_a_crisis_resource() {
        let c = coordinator_with(
            Arc::new(StaticDirectory::builtin()),
            Arc::new(MockTransferClient::progressing()),
        );
        let resource = c.select_resource("US", true).await;
        assert!(resource.category.is_crisis());
        assert!(resource.verified);
    }

    #[tokio::test]
    async fn directory_failure_falls_back_to_static_set() {
        let c = coordinator_with(
            Arc::new(FailingDirectory),
            Arc::new(MockTransferClient::progressing()),
        );
        let resource = c.select_resource("US", true).await;
        assert!(resource.category.is_crisis());
    }

    #[tokio::test]
    async fn client_failure_still_yields_a_tracked_record() {
        let c = coordinator_with(
            Arc::new(StaticDirectory::builtin()),
            Arc::new(MockTransferClient::failing()),
        );
        let s = session();
        let record = c.escalate(&s, true, None).await;
        assert_eq!(record.status, TransferStatus::Pending);
        // Status checks degrade to the last known local record.
        let seen = c.check_status(&record.id).await.unwrap();
        assert_eq!(seen.status, TransferStatus::Pending);
    }

    #[tokio::test]
    async fn status_never_regresses() {
        let client = Arc::new(MockTransferClient::progressing());
        let c = coordinator_with(Arc::new(StaticDirectory::builtin()), client.clone());
        let s = session();
        let record = c.escalate(&s, true, None).await;

        // Walk to Connected.
        c.check_status(&record.id).await.unwrap();
        let connected = c.check_status(&record.id).await.unwrap();
        assert_eq!(connected.status, TransferStatus::Connected);

        // The client now (incorrectly) reports an earlier status.
        client.set_status(&record.id, TransferStatus::Pending);
        let seen = c.check_status(&record.id).await.unwrap();
        assert_eq!(seen.status, TransferStatus::Connected);
    }

    #[tokio::test]
    async fn terminal_states_stick() {
        let client = Arc::new(MockTransferClient::progressing());
        let c = coordinator_with(Arc::new(StaticDirectory::builtin()), client.clone());
        let s = session();
        let record = c.escalate(&s, true, None).await;

        let cancelled = c.cancel(&record.id).await.unwrap();
        assert_eq!(cancelled.status, TransferStatus::Cancelled);

        client.set_status(&record.id, TransferStatus::Connected);
        let seen = c.check_status(&record.id).await.unwrap();
        assert_eq!(seen.status, TransferStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_connection_reaches_connected() {
        let c = coordinator_with(
            Arc::new(StaticDirectory::builtin()),
            Arc::new(MockTransferClient::progressing()),
        );
        let s = session();
        let record = c.escalate(&s, true, None).await;

        let outcome = c
            .wait_for_connection(&record.id, Duration::from_secs(600))
            .await
            .unwrap();
        assert_eq!(outcome.status, TransferStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_connection_times_out_with_synthetic_status() {
        let c = coordinator_with(
            Arc::new(StaticDirectory::builtin()),
            Arc::new(MockTransferClient::stalled()),
        );
        let s = session();
        let record = c.escalate(&s, true, None).await;

        let outcome = c
            .wait_for_connection(&record.id, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(outcome.status, TransferStatus::Timeout);

        // The timeout is sticky.
        let seen = c.check_status(&record.id).await.unwrap();
        assert_eq!(seen.status, TransferStatus::Timeout);
    }

    #[tokio::test]
    async fn unknown_transfer_is_a_distinct_error() {
        let c = coordinator_with(
            Arc::new(StaticDirectory::builtin()),
            Arc::new(MockTransferClient::progressing()),
        );
        let err = c.check_status(&TransferId::generate()).await.unwrap_err();
        assert!(matches!(err, EscalationError::UnknownTransfer(_)));
    }
}
