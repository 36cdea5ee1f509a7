//! Risk severity model and assessment records.
//!
//! Severity is a total order (`None < Low < Medium < High < Critical`). An
//! assessment's overall severity may never sit below its highest factor —
//! that invariant is enforced at construction time and a violation is a
//! programming error, not a user-facing one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{AssessmentId, SessionId};

/// Ordered risk severity label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RiskSeverity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskSeverity {
    /// Numeric rank, `None` = 0 through `Critical` = 4.
    pub fn rank(&self) -> u8 {
        match self {
            RiskSeverity::None => 0,
            RiskSeverity::Low => 1,
            RiskSeverity::Medium => 2,
            RiskSeverity::High => 3,
            RiskSeverity::Critical => 4,
        }
    }

    /// One level up, capped at `Critical`.
    pub fn bumped(&self) -> Self {
        match self {
            RiskSeverity::None => RiskSeverity::Low,
            RiskSeverity::Low => RiskSeverity::Medium,
            RiskSeverity::Medium => RiskSeverity::High,
            RiskSeverity::High | RiskSeverity::Critical => RiskSeverity::Critical,
        }
    }
}

impl std::fmt::Display for RiskSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskSeverity::None => "NONE",
            RiskSeverity::Low => "LOW",
            RiskSeverity::Medium => "MEDIUM",
            RiskSeverity::High => "HIGH",
            RiskSeverity::Critical => "CRITICAL",
        };
        write!(f, "{}", s)
    }
}

/// Category of detected risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Suicide,
    SelfHarm,
    HarmToOthers,
    SubstanceAbuse,
    DomesticViolence,
    Crisis,
    Other,
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskCategory::Suicide => "SUICIDE",
            RiskCategory::SelfHarm => "SELF_HARM",
            RiskCategory::HarmToOthers => "HARM_TO_OTHERS",
            RiskCategory::SubstanceAbuse => "SUBSTANCE_ABUSE",
            RiskCategory::DomesticViolence => "DOMESTIC_VIOLENCE",
            RiskCategory::Crisis => "CRISIS",
            RiskCategory::Other => "OTHER",
        };
        write!(f, "{}", s)
    }
}

/// One detected risk signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub category: RiskCategory,
    pub severity: RiskSeverity,
    /// Confidence in this factor, [0, 1].
    pub confidence: f64,
    /// Terms that triggered the factor.
    pub keywords: Vec<String>,
    /// Short excerpt of the surrounding text.
    pub context: String,
    pub detected_at: DateTime<Utc>,
}

/// Construction-time contract failures. Programming errors, never surfaced
/// to the conversation.
#[derive(Debug, Error)]
pub enum ContractViolation {
    #[error(
        "overall severity {overall} is below highest factor severity {max_factor}"
    )]
    SeverityBelowFactors {
        overall: RiskSeverity,
        max_factor: RiskSeverity,
    },

    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

/// Complete risk assessment for one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub id: AssessmentId,
    pub session_id: SessionId,
    pub overall_severity: RiskSeverity,
    /// Overall confidence, [0, 1].
    pub overall_confidence: f64,
    pub factors: Vec<RiskFactor>,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Build an assessment, enforcing the severity floor invariant:
    /// `overall_severity >= max(factor.severity)`.
    pub fn new(
        session_id: SessionId,
        overall_severity: RiskSeverity,
        overall_confidence: f64,
        factors: Vec<RiskFactor>,
    ) -> Result<Self, ContractViolation> {
        let max_factor = factors
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(RiskSeverity::None);
        if overall_severity < max_factor {
            return Err(ContractViolation::SeverityBelowFactors {
                overall: overall_severity,
                max_factor,
            });
        }
        if !(0.0..=1.0).contains(&overall_confidence) {
            return Err(ContractViolation::ConfidenceOutOfRange(overall_confidence));
        }

        Ok(Self {
            id: AssessmentId::generate(),
            session_id,
            overall_severity,
            overall_confidence,
            factors,
            assessed_at: Utc::now(),
        })
    }

    /// An empty assessment: no factors, severity `None`, confidence 0.
    pub fn none(session_id: SessionId) -> Self {
        Self {
            id: AssessmentId::generate(),
            session_id,
            overall_severity: RiskSeverity::None,
            overall_confidence: 0.0,
            factors: Vec::new(),
            assessed_at: Utc::now(),
        }
    }
}
