//! Background expiry sweep.
//!
//! A cancellable scheduled task with an explicit stop handle. Each tick
//! closes sessions that are past expiry or over their message limit and
//! evicts closed sessions older than the retention window. The sweep takes
//! the same per-session lock message processing uses, so it never closes a
//! session out from under an in-flight message.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::SessionStore;

/// Sweep cadence and retention.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Interval between sweep passes.
    pub interval: Duration,
    /// How long closed sessions are kept before eviction.
    pub retention: chrono::Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            retention: chrono::Duration::days(7),
        }
    }
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub closed: usize,
    pub evicted: usize,
}

/// Handle to the running sweep task.
pub struct ExpirySweeper {
    handle: Option<JoinHandle<()>>,
    stop: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawn the sweep loop.
    pub fn start(store: Arc<SessionStore>, config: SweepConfig) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let interval = config.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match sweep_once(&store, &config).await {
                            Ok(report) if report.closed > 0 || report.evicted > 0 => {
                                info!(
                                    closed = report.closed,
                                    evicted = report.evicted,
                                    "expiry sweep pass"
                                );
                            }
                            Ok(_) => {}
                            Err(error) => {
                                warn!(error = %error, "expiry sweep pass failed");
                            }
                        }
                    }
                    _ = stopped.changed() => {
                        if *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("expiry sweeper stopped");
        });

        Self {
            handle: Some(handle),
            stop,
        }
    }

    /// Stop the loop and wait for it to wind down.
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// One sweep pass. Public so callers can drive it directly in tests or on
/// demand.
pub async fn sweep_once(store: &SessionStore, config: &SweepConfig) -> Result<SweepReport> {
    let mut report = SweepReport::default();
    let now = Utc::now();

    for session in store.list().await? {
        let id = session.id.clone();

        if !session.is_closed() {
            // Re-check under the session's write lock; a message may be
            // in flight for it right now.
            let lock = store.session_lock(&id);
            let _guard = lock.lock().await;

            let current = match store.get(&id).await {
                Ok(current) => current,
                Err(_) => continue, // deleted while we waited
            };
            if current.is_closed() {
                continue;
            }
            if let Some(trigger) = store.validate(&current).close_trigger() {
                store
                    .close(&id, trigger, "session expired or exceeded limits")
                    .await?;
                report.closed += 1;
            }
        } else if now - session.updated_at > config.retention {
            let lock = store.session_lock(&id);
            let _guard = lock.lock().await;
            store.delete(&id).await?;
            report.evicted += 1;
        }
    }

    Ok(report)
}
