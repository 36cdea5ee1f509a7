//! The event sink seam.

use haven_types::TriageEvent;
use tracing::info;

/// Consumes pipeline events. Fire-and-forget: implementations must never
/// block the caller and must swallow their own failures.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TriageEvent);
}

/// Default sink: structured log lines via `tracing`.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: TriageEvent) {
        info!(
            event = %event.kind,
            session_id = %event.session_id,
            priority = ?event.priority,
            "triage event"
        );
    }
}
