//! # haven-risk
//!
//! Deterministic, stateless risk classification over conversation text.
//!
//! The classifier is a rule engine: locale-keyed keyword tables assign a base
//! severity per category, ordered context modifiers each bump severity by
//! exactly one level (capped at `Critical`), and compound regex detectors
//! contribute extra factors at fixed confidence. No model calls, no I/O —
//! the same text and context always score the same.
//!
//! Escalation thresholds are configuration, passed in at construction:
//!
//! ```
//! use haven_risk::{ClassifierConfig, RiskClassifier};
//! use haven_types::{RiskSeverity, SessionId};
//!
//! let classifier = RiskClassifier::new(ClassifierConfig::default());
//! let assessment = classifier
//!     .classify(&SessionId::generate(), "I have a plan to kill myself tonight", None)
//!     .unwrap();
//! assert_eq!(assessment.overall_severity, RiskSeverity::Critical);
//! assert!(classifier.is_emergency(&assessment));
//! ```

mod classifier;
pub mod lexicon;

pub use classifier::{ClassifierConfig, RiskClassifier};
pub use lexicon::{CompoundRule, Lexicon, LexiconError, LexiconSet};
