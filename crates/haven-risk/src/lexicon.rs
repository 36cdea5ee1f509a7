//! Locale-keyed keyword tables.
//!
//! A [`Lexicon`] is plain data: category keyword lists, modifier term lists,
//! and compound detector rules. Tables are loaded at startup (the built-in
//! `en` table ships with the crate, others can come from JSON) and the
//! matching algorithm in the classifier is locale-agnostic.

use std::collections::HashMap;

use haven_types::{RiskCategory, RiskSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading lexicon data.
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("no lexicon for locale '{0}' and no 'en' fallback")]
    UnknownLocale(String),

    #[error("lexicon parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("compound rule '{name}' has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        source: regex::Error,
    },
}

/// A compound detector: a regex that co-locates two signal groups, emitting
/// an extra factor at fixed confidence when it fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundRule {
    pub name: String,
    /// Case-insensitivity is applied by the classifier at compile time.
    pub pattern: String,
    pub category: RiskCategory,
    pub severity: RiskSeverity,
}

/// Keyword tables for one locale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lexicon {
    pub suicide: Vec<String>,
    pub self_harm: Vec<String>,
    pub harm_to_others: Vec<String>,
    pub crisis: Vec<String>,

    /// Immediacy terms: bump Medium→High or High→Critical.
    pub immediacy: Vec<String>,
    /// Plan terms: bump Low→Medium or Medium→High.
    pub plan: Vec<String>,
    /// Means-available terms: bump Medium→High or High→Critical.
    pub means: Vec<String>,

    /// Hedging terms lower confidence.
    pub hedging: Vec<String>,
    /// High-signal unambiguous keywords raise confidence.
    pub high_signal: Vec<String>,

    pub compound_rules: Vec<CompoundRule>,
}

impl Lexicon {
    /// The built-in English table.
    pub fn builtin_en() -> Self {
        fn owned(terms: &[&str]) -> Vec<String> {
            terms.iter().map(|t| t.to_string()).collect()
        }

        Self {
            suicide: owned(&[
                "kill myself",
                "end my life",
                "suicide",
                "want to die",
                "better off dead",
                "no reason to live",
                "plan to die",
                "final goodbye",
                "last message",
            ]),
            self_harm: owned(&[
                "cut myself",
                "self harm",
                "hurt myself",
                "bleeding",
                "scars",
                "burn myself",
                "hit myself",
                "punish myself",
            ]),
            harm_to_others: owned(&[
                "kill them",
                "hurt someone",
                "attack",
                "violent",
                "weapon",
                "revenge",
                "payback",
                "make them suffer",
            ]),
            crisis: owned(&[
                "emergency",
                "crisis",
                "help now",
                "immediate",
                "urgent",
                "can't take it",
                "breaking point",
                "last straw",
            ]),
            immediacy: owned(&["now", "tonight", "today", "immediately", "right now"]),
            plan: owned(&["plan", "going to", "will", "intend", "decided"]),
            means: owned(&["gun", "pills", "rope", "knife", "weapon"]),
            hedging: owned(&["joke", "just kidding", "not really", "metaphor"]),
            high_signal: owned(&["suicide", "kill myself", "end my life"]),
            compound_rules: vec![
                CompoundRule {
                    name: "suicide_plan".into(),
                    pattern: r"(plan|going to|will|intend).*(kill|die|suicide)".into(),
                    category: RiskCategory::Suicide,
                    severity: RiskSeverity::Medium,
                },
                CompoundRule {
                    name: "immediate_risk".into(),
                    pattern: r"(right now|tonight|today|immediately).*(kill|die|suicide|harm)"
                        .into(),
                    category: RiskCategory::Crisis,
                    severity: RiskSeverity::High,
                },
                CompoundRule {
                    name: "means_available".into(),
                    pattern: r"(gun|pills|rope|knife|weapon).*(have|got|access)".into(),
                    category: RiskCategory::Suicide,
                    severity: RiskSeverity::Medium,
                },
            ],
        }
    }

    /// Load a single lexicon from JSON.
    pub fn from_json(data: &str) -> Result<Self, LexiconError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Keyword lists per category, in scan order.
    pub fn category_tables(&self) -> [(RiskCategory, &[String]); 4] {
        [
            (RiskCategory::Suicide, self.suicide.as_slice()),
            (RiskCategory::SelfHarm, self.self_harm.as_slice()),
            (RiskCategory::HarmToOthers, self.harm_to_others.as_slice()),
            (RiskCategory::Crisis, self.crisis.as_slice()),
        ]
    }

    /// Base severity for a category before modifiers.
    pub fn base_severity(category: RiskCategory) -> RiskSeverity {
        match category {
            RiskCategory::Suicide | RiskCategory::HarmToOthers => RiskSeverity::High,
            RiskCategory::SelfHarm | RiskCategory::Crisis => RiskSeverity::Medium,
            _ => RiskSeverity::Low,
        }
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin_en()
    }
}

/// Lexicons keyed by locale tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexiconSet {
    lexicons: HashMap<String, Lexicon>,
}

impl LexiconSet {
    /// The built-in set: just `en`.
    pub fn builtin() -> Self {
        let mut lexicons = HashMap::new();
        lexicons.insert("en".to_string(), Lexicon::builtin_en());
        Self { lexicons }
    }

    /// Load a locale-keyed table map from JSON.
    pub fn from_json(data: &str) -> Result<Self, LexiconError> {
        let lexicons: HashMap<String, Lexicon> = serde_json::from_str(data)?;
        Ok(Self { lexicons })
    }

    pub fn insert(&mut self, locale: impl Into<String>, lexicon: Lexicon) {
        self.lexicons.insert(locale.into(), lexicon);
    }

    /// Resolve a locale, falling back to `en`.
    pub fn resolve(&self, locale: &str) -> Result<&Lexicon, LexiconError> {
        self.lexicons
            .get(locale)
            .or_else(|| self.lexicons.get("en"))
            .ok_or_else(|| LexiconError::UnknownLocale(locale.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set_resolves_en() {
        let set = LexiconSet::builtin();
        assert!(set.resolve("en").is_ok());
    }

    #[test]
    fn unknown_locale_falls_back_to_en() {
        let set = LexiconSet::builtin();
        let lex = set.resolve("fr").unwrap();
        assert!(lex.suicide.contains(&"suicide".to_string()));
    }

    #[test]
    fn empty_set_reports_unknown_locale() {
        let set = LexiconSet::default();
        assert!(matches!(
            set.resolve("en"),
            Err(LexiconError::UnknownLocale(_))
        ));
    }

    #[test]
    fn lexicon_round_trips_through_json() {
        let lex = Lexicon::builtin_en();
        let json = serde_json::to_string(&lex).unwrap();
        let back = Lexicon::from_json(&json).unwrap();
        assert_eq!(back.suicide, lex.suicide);
        assert_eq!(back.compound_rules.len(), lex.compound_rules.len());
    }

    #[test]
    fn base_severity_table() {
        assert_eq!(
            Lexicon::base_severity(RiskCategory::Suicide),
            RiskSeverity::High
        );
        assert_eq!(
            Lexicon::base_severity(RiskCategory::HarmToOthers),
            RiskSeverity::High
        );
        assert_eq!(
            Lexicon::base_severity(RiskCategory::SelfHarm),
            RiskSeverity::Medium
        );
        assert_eq!(
            Lexicon::base_severity(RiskCategory::Crisis),
            RiskSeverity::Medium
        );
        assert_eq!(
            Lexicon::base_severity(RiskCategory::Other),
            RiskSeverity::Low
        );
    }
}
