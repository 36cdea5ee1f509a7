//! Warm-transfer client contract and the development mock.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use haven_types::{
    Resource, RiskSeverity, SessionId, TransferId, TransferRecord, TransferStatus,
};

use crate::error::EscalationError;

/// Context handed to the receiving resource alongside the transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferContext {
    /// Last known risk level for the session.
    pub risk_level: Option<RiskSeverity>,
    /// Short handoff summary (already redacted by the caller).
    pub summary: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Client for the warm-transfer service. Remote; every call may fail.
#[async_trait]
pub trait WarmTransferClient: Send + Sync {
    async fn initiate(
        &self,
        session_id: &SessionId,
        resource: &Resource,
        context: &TransferContext,
    ) -> Result<TransferRecord, EscalationError>;

    async fn status(&self, transfer_id: &TransferId) -> Result<TransferRecord, EscalationError>;

    async fn cancel(&self, transfer_id: &TransferId) -> Result<bool, EscalationError>;
}

/// How the mock behaves across status polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockBehavior {
    /// Advance one rung per poll up to `Connected`.
    Progressing,
    /// Stay `Pending` forever (exercise timeouts).
    Stalled,
    /// Every call errors (exercise fallback paths).
    Failing,
}

/// Deterministic in-process transfer client for tests and development.
pub struct MockTransferClient {
    behavior: MockBehavior,
    transfers: DashMap<TransferId, TransferRecord>,
    estimated_wait_minutes: u32,
}

impl MockTransferClient {
    /// Transfers progress Pending → Routing → Connected, one rung per poll.
    pub fn progressing() -> Self {
        Self {
            behavior: MockBehavior::Progressing,
            transfers: DashMap::new(),
            estimated_wait_minutes: 5,
        }
    }

    /// Transfers never leave `Pending`.
    pub fn stalled() -> Self {
        Self {
            behavior: MockBehavior::Stalled,
            transfers: DashMap::new(),
            estimated_wait_minutes: 5,
        }
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self {
            behavior: MockBehavior::Failing,
            transfers: DashMap::new(),
            estimated_wait_minutes: 5,
        }
    }

    /// Force a transfer's reported status (test hook; the coordinator must
    /// discard regressions on its own).
    pub fn set_status(&self, transfer_id: &TransferId, status: TransferStatus) {
        if let Some(mut record) = self.transfers.get_mut(transfer_id) {
            record.status = status;
        }
    }
}

impl Default for MockTransferClient {
    fn default() -> Self {
        Self::progressing()
    }
}

#[async_trait]
impl WarmTransferClient for MockTransferClient {
    async fn initiate(
        &self,
        session_id: &SessionId,
        resource: &Resource,
        _context: &TransferContext,
    ) -> Result<TransferRecord, EscalationError> {
        if self.behavior == MockBehavior::Failing {
            return Err(EscalationError::Transfer("mock initiate failure".into()));
        }
        let record = TransferRecord::new(
            session_id.clone(),
            resource.id.clone(),
            self.estimated_wait_minutes,
        );
        self.transfers.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn status(&self, transfer_id: &TransferId) -> Result<TransferRecord, EscalationError> {
        if self.behavior == MockBehavior::Failing {
            return Err(EscalationError::Transfer("mock status failure".into()));
        }
        let mut record = self
            .transfers
            .get_mut(transfer_id)
            .ok_or_else(|| EscalationError::UnknownTransfer(transfer_id.clone()))?;

        if self.behavior == MockBehavior::Progressing {
            record.status = match record.status {
                TransferStatus::Pending => TransferStatus::Routing,
                TransferStatus::Routing => TransferStatus::Connected,
                other => other,
            };
        }
        Ok(record.clone())
    }

    async fn cancel(&self, transfer_id: &TransferId) -> Result<bool, EscalationError> {
        if self.behavior == MockBehavior::Failing {
            return Err(EscalationError::Transfer("mock cancel failure".into()));
        }
        match self.transfers.get_mut(transfer_id) {
            Some(mut record) if !record.status.is_terminal() => {
                record.status = TransferStatus::Cancelled;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;

    fn a_resource() -> Resource {
        StaticDirectory::builtin().crisis_lookup("US").remove(0)
    }

    #[tokio::test]
    async fn progressing_mock_walks_the_ladder() {
        let client = MockTransferClient::progressing();
        let record = client
            .initiate(&SessionId::generate(), &a_resource(), &TransferContext::default())
            .await
            .unwrap();
        assert_eq!(record.status, TransferStatus::Pending);

        let s1 = client.status(&record.id).await.unwrap();
        assert_eq!(s1.status, TransferStatus::Routing);
        let s2 = client.status(&record.id).await.unwrap();
        assert_eq!(s2.status, TransferStatus::Connected);
        let s3 = client.status(&record.id).await.unwrap();
        assert_eq!(s3.status, TransferStatus::Connected);
    }

    #[tokio::test]
    async fn stalled_mock_never_advances() {
        let client = MockTransferClient::stalled();
        let record = client
            .initiate(&SessionId::generate(), &a_resource(), &TransferContext::default())
            .await
            .unwrap();
        for _ in 0..3 {
            let s = client.status(&record.id).await.unwrap();
            assert_eq!(s.status, TransferStatus::Pending);
        }
    }

    #[tokio::test]
    async fn cancel_marks_cancelled_once() {
        let client = MockTransferClient::progressing();
        let record = client
            .initiate(&SessionId::generate(), &a_resource(), &TransferContext::default())
            .await
            .unwrap();
        assert!(client.cancel(&record.id).await.unwrap());
        assert!(!client.cancel(&record.id).await.unwrap());
    }
}
