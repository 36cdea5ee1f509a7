//! One immutable configuration object for the whole pipeline.

use std::time::Duration;

use haven_engine::EngineConfig;
use haven_escalate::EscalationConfig;
use haven_risk::ClassifierConfig;
use haven_session::{StoreConfig, SweepConfig};

/// Pipeline configuration, assembled once and passed into each component's
/// constructor. There is no global mutable settings object.
#[derive(Debug, Clone)]
pub struct HavenConfig {
    pub store: StoreConfig,
    pub sweep: SweepConfig,
    pub classifier: ClassifierConfig,
    pub engine: EngineConfig,
    pub escalation: EscalationConfig,
    /// Upper bound for waiting on a warm transfer to connect.
    pub transfer_wait: Duration,
}

impl Default for HavenConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            sweep: SweepConfig::default(),
            classifier: ClassifierConfig::default(),
            engine: EngineConfig::default(),
            escalation: EscalationConfig::default(),
            transfer_wait: Duration::from_secs(10 * 60),
        }
    }
}
