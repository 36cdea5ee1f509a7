//! Warm-transfer records.
//!
//! Transfer status is monotonic along `Pending < Routing < Connected <
//! Completed`; `Cancelled`, `Timeout`, and `Failed` are terminal. The
//! coordinator never lets an observed status regress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ResourceId, SessionId, TransferId};

/// Status of one warm-transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    Routing,
    Connected,
    Completed,
    Cancelled,
    Timeout,
    Failed,
}

impl TransferStatus {
    /// Position on the progress ladder; terminal failures carry none.
    pub fn progress_rank(&self) -> Option<u8> {
        match self {
            TransferStatus::Pending => Some(0),
            TransferStatus::Routing => Some(1),
            TransferStatus::Connected => Some(2),
            TransferStatus::Completed => Some(3),
            TransferStatus::Cancelled | TransferStatus::Timeout | TransferStatus::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed
                | TransferStatus::Cancelled
                | TransferStatus::Timeout
                | TransferStatus::Failed
        )
    }

    /// True when the user is with (or has been with) a human.
    pub fn is_connected(&self) -> bool {
        matches!(self, TransferStatus::Connected | TransferStatus::Completed)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Routing => "ROUTING",
            TransferStatus::Connected => "CONNECTED",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
            TransferStatus::Timeout => "TIMEOUT",
            TransferStatus::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// One warm-transfer attempt toward a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: TransferId,
    pub session_id: SessionId,
    pub resource_id: ResourceId,
    pub status: TransferStatus,
    pub initiated_at: DateTime<Utc>,
    pub estimated_wait_minutes: u32,
}

impl TransferRecord {
    pub fn new(
        session_id: SessionId,
        resource_id: ResourceId,
        estimated_wait_minutes: u32,
    ) -> Self {
        Self {
            id: TransferId::generate(),
            session_id,
            resource_id,
            status: TransferStatus::Pending,
            initiated_at: Utc::now(),
            estimated_wait_minutes,
        }
    }
}
