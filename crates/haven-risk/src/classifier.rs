//! The rule engine.

use chrono::Utc;
use regex::Regex;
use tracing::{debug, warn};

use haven_types::{
    ContractViolation, RiskAssessment, RiskFactor, RiskSeverity, SessionId,
};

use crate::lexicon::{CompoundRule, Lexicon, LexiconError, LexiconSet};

/// Confidence floor for `should_escalate`.
const ESCALATION_CONFIDENCE_FLOOR: f64 = 0.7;
/// Confidence floor for `is_emergency`.
const EMERGENCY_CONFIDENCE_FLOOR: f64 = 0.8;

/// Fixed confidence assigned to compound detector factors.
const COMPOUND_CONFIDENCE: f64 = 0.8;

/// Bytes of surrounding text captured around a matched keyword.
const CONTEXT_WINDOW: usize = 50;

/// Classifier configuration. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Severity at or above which `should_escalate` can fire.
    pub escalation_threshold: RiskSeverity,
    /// Severity at or above which `is_emergency` can fire.
    pub emergency_threshold: RiskSeverity,
    /// Lexicon locale tag.
    pub locale: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            escalation_threshold: RiskSeverity::High,
            emergency_threshold: RiskSeverity::Critical,
            locale: "en".to_string(),
        }
    }
}

/// Deterministic keyword/pattern risk classifier.
pub struct RiskClassifier {
    config: ClassifierConfig,
    lexicon: Lexicon,
    compound: Vec<(CompoundRule, Regex)>,
}

impl RiskClassifier {
    /// Construct with the built-in lexicon set.
    pub fn new(config: ClassifierConfig) -> Self {
        Self::with_lexicons(config, LexiconSet::builtin())
            .expect("built-in lexicon is valid")
    }

    /// Construct against an externally loaded lexicon set.
    pub fn with_lexicons(
        config: ClassifierConfig,
        lexicons: LexiconSet,
    ) -> Result<Self, LexiconError> {
        let lexicon = lexicons.resolve(&config.locale)?.clone();
        let compound = lexicon
            .compound_rules
            .iter()
            .map(|rule| {
                Regex::new(&format!("(?i){}", rule.pattern))
                    .map(|re| (rule.clone(), re))
                    .map_err(|source| LexiconError::InvalidPattern {
                        name: rule.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            lexicon,
            compound,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Assess one message.
    ///
    /// `previous` is the session's last recorded risk flag; a prior `High`
    /// makes a current `Medium` sticky-escalate to `High`.
    ///
    /// Empty or whitespace-only input yields the `None`/0.0 assessment and a
    /// warning — malformed input is never an error here.
    pub fn classify(
        &self,
        session_id: &SessionId,
        text: &str,
        previous: Option<RiskSeverity>,
    ) -> Result<RiskAssessment, ContractViolation> {
        if text.trim().is_empty() {
            warn!(session_id = %session_id, "empty input to risk classifier");
            return Ok(RiskAssessment::none(session_id.clone()));
        }

        let lowered = text.to_lowercase();
        let mut factors = Vec::new();

        for (category, keywords) in self.lexicon.category_tables() {
            let matched: Vec<String> = keywords
                .iter()
                .filter(|kw| lowered.contains(kw.to_lowercase().as_str()))
                .cloned()
                .collect();
            if matched.is_empty() {
                continue;
            }

            let severity = self.apply_modifiers(&lowered, Lexicon::base_severity(category));
            let confidence = self.category_confidence(&lowered, &matched);
            let context = excerpt_around(&lowered, &matched[0]);

            debug!(
                session_id = %session_id,
                category = %category,
                severity = %severity,
                matched = matched.len(),
                "risk keywords matched"
            );

            factors.push(RiskFactor {
                category,
                severity,
                confidence,
                keywords: matched,
                context,
                detected_at: Utc::now(),
            });
        }

        for (rule, re) in &self.compound {
            if re.is_match(text) {
                debug!(session_id = %session_id, rule = %rule.name, "compound pattern fired");
                factors.push(RiskFactor {
                    category: rule.category,
                    severity: rule.severity,
                    confidence: COMPOUND_CONFIDENCE,
                    keywords: vec![rule.name.clone()],
                    context: format!("pattern match: {}", rule.name),
                    detected_at: Utc::now(),
                });
            }
        }

        let mut overall = factors
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(RiskSeverity::None);

        // Sticky escalation: a session already at High does not drop to
        // Medium on one calmer message.
        if previous == Some(RiskSeverity::High) && overall == RiskSeverity::Medium {
            overall = RiskSeverity::High;
        }

        let confidence = weighted_confidence(&factors);

        RiskAssessment::new(session_id.clone(), overall, confidence, factors)
    }

    /// Escalation predicate: severity at threshold with confident detection.
    pub fn should_escalate(&self, assessment: &RiskAssessment) -> bool {
        assessment.overall_severity >= self.config.escalation_threshold
            && assessment.overall_confidence >= ESCALATION_CONFIDENCE_FLOOR
    }

    /// Emergency predicate: stricter threshold, stricter confidence.
    pub fn is_emergency(&self, assessment: &RiskAssessment) -> bool {
        assessment.overall_severity >= self.config.emergency_threshold
            && assessment.overall_confidence >= EMERGENCY_CONFIDENCE_FLOOR
    }

    /// Apply context modifiers in fixed order, each bumping exactly one
    /// level: immediacy, then plan, then means.
    fn apply_modifiers(&self, lowered: &str, base: RiskSeverity) -> RiskSeverity {
        let mut severity = base;

        if self.any_term(&self.lexicon.immediacy, lowered) {
            severity = match severity {
                RiskSeverity::Medium => RiskSeverity::High,
                RiskSeverity::High => RiskSeverity::Critical,
                s => s,
            };
        }
        if self.any_term(&self.lexicon.plan, lowered) {
            severity = match severity {
                RiskSeverity::Low => RiskSeverity::Medium,
                RiskSeverity::Medium => RiskSeverity::High,
                s => s,
            };
        }
        if self.any_term(&self.lexicon.means, lowered) {
            severity = match severity {
                RiskSeverity::Medium => RiskSeverity::High,
                RiskSeverity::High => RiskSeverity::Critical,
                s => s,
            };
        }

        severity
    }

    /// 0.6 base, +0.1 per keyword (cap +0.3), +0.2 for a high-signal term,
    /// -0.2 when hedging is present; clamped to [0, 1].
    fn category_confidence(&self, lowered: &str, matched: &[String]) -> f64 {
        let mut bonus = (0.1 * matched.len() as f64).min(0.3);

        let high_signal = matched.iter().any(|kw| {
            self.lexicon
                .high_signal
                .iter()
                .any(|hs| hs.eq_ignore_ascii_case(kw))
        });
        if high_signal {
            bonus += 0.2;
        }

        if self
            .lexicon
            .hedging
            .iter()
            .any(|term| lowered.contains(term.to_lowercase().as_str()))
        {
            bonus -= 0.2;
        }

        (0.6 + bonus).clamp(0.0, 1.0)
    }

    /// Multi-word terms match as substrings; single words require word
    /// boundaries ("now" must not fire inside "know").
    fn any_term(&self, terms: &[String], lowered: &str) -> bool {
        terms.iter().any(|term| {
            let term_l = term.to_lowercase();
            if term_l.contains(' ') {
                lowered.contains(term_l.as_str())
            } else {
                word_present(lowered, &term_l)
            }
        })
    }
}

/// Severity-rank-weighted average of factor confidences; 0 with no factors.
fn weighted_confidence(factors: &[RiskFactor]) -> f64 {
    let total_weight: f64 = factors.iter().map(|f| f.severity.rank() as f64).sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    let weighted: f64 = factors
        .iter()
        .map(|f| f.confidence * f.severity.rank() as f64)
        .sum();
    weighted / total_weight
}

/// Whole-word occurrence check over lowercase text.
fn word_present(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let mut search_from = 0;
    while let Some(found) = haystack[search_from..].find(term) {
        let start = search_from + found;
        let end = start + term.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        if before_ok && after_ok {
            return true;
        }
        search_from = end;
    }
    false
}

/// Up to [`CONTEXT_WINDOW`] bytes either side of the first keyword hit,
/// snapped to character boundaries.
fn excerpt_around(lowered: &str, keyword: &str) -> String {
    let keyword_l = keyword.to_lowercase();
    let Some(pos) = lowered.find(keyword_l.as_str()) else {
        return String::new();
    };
    let mut start = pos.saturating_sub(CONTEXT_WINDOW);
    let mut end = (pos + keyword_l.len() + CONTEXT_WINDOW).min(lowered.len());
    while start > 0 && !lowered.is_char_boundary(start) {
        start -= 1;
    }
    while end < lowered.len() && !lowered.is_char_boundary(end) {
        end += 1;
    }
    lowered[start..end].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_types::RiskCategory;

    fn classifier() -> RiskClassifier {
        RiskClassifier::new(ClassifierConfig::default())
    }

    fn classify(text: &str) -> RiskAssessment {
        classifier()
            .classify(&SessionId::generate(), text, None)
            .unwrap()
    }

    #[test]
    fn empty_input_yields_none_without_error() {
        let a = classify("   ");
        assert_eq!(a.overall_severity, RiskSeverity::None);
        assert_eq!(a.overall_confidence, 0.0);
        assert!(a.factors.is_empty());
    }

    #[test]
    fn benign_text_has_no_factors() {
        let a = classify("the weather was nice and we talked about gardening");
        assert_eq!(a.overall_severity, RiskSeverity::None);
        assert!(a.factors.is_empty());
    }

    #[test]
    fn plan_plus_immediacy_compound_to_critical_emergency() {
        let c = classifier();
        let a = c
            .classify(
                &SessionId::generate(),
                "I have a plan to kill myself tonight",
                None,
            )
            .unwrap();

        assert_eq!(a.overall_severity, RiskSeverity::Critical);
        assert!(a.overall_confidence >= 0.8);
        assert!(c.is_emergency(&a));
        assert!(c.should_escalate(&a));

        // Both the keyword factor and the suicide_plan compound fired.
        assert!(a
            .factors
            .iter()
            .any(|f| f.category == RiskCategory::Suicide
                && f.severity == RiskSeverity::Critical));
        assert!(a
            .factors
            .iter()
            .any(|f| f.keywords.contains(&"suicide_plan".to_string())));
    }

    #[test]
    fn suicide_keyword_alone_is_high() {
        let a = classify("sometimes I want to die");
        assert_eq!(a.overall_severity, RiskSeverity::High);
    }

    #[test]
    fn immediacy_requires_word_boundary() {
        // "now" inside "know" must not bump severity.
        let a = classify("I know I want to die someday");
        assert_eq!(a.overall_severity, RiskSeverity::High);

        let b = classify("I want to die now");
        assert_eq!(b.overall_severity, RiskSeverity::Critical);
    }

    #[test]
    fn self_harm_is_medium_without_modifiers() {
        let a = classify("I cut myself again yesterday");
        let factor = a
            .factors
            .iter()
            .find(|f| f.category == RiskCategory::SelfHarm)
            .unwrap();
        assert_eq!(factor.severity, RiskSeverity::Medium);
    }

    #[test]
    fn plan_terms_bump_medium_to_high() {
        let a = classify("I decided to cut myself");
        let factor = a
            .factors
            .iter()
            .find(|f| f.category == RiskCategory::SelfHarm)
            .unwrap();
        assert_eq!(factor.severity, RiskSeverity::High);
    }

    #[test]
    fn hedging_lowers_confidence_below_escalation_floor() {
        let c = classifier();
        let a = c
            .classify(
                &SessionId::generate(),
                "I want to die, just kidding",
                None,
            )
            .unwrap();
        assert_eq!(a.overall_severity, RiskSeverity::High);
        assert!(a.overall_confidence < ESCALATION_CONFIDENCE_FLOOR);
        assert!(!c.should_escalate(&a));
    }

    #[test]
    fn sticky_escalation_holds_high_after_high() {
        let c = classifier();
        let a = c
            .classify(
                &SessionId::generate(),
                "I cut myself again yesterday",
                Some(RiskSeverity::High),
            )
            .unwrap();
        assert_eq!(a.overall_severity, RiskSeverity::High);
    }

    #[test]
    fn no_sticky_bump_without_prior_high() {
        let a = classify("I cut myself again yesterday");
        assert_eq!(a.overall_severity, RiskSeverity::Medium);
    }

    #[test]
    fn high_signal_keyword_raises_confidence() {
        let plain = classify("sometimes I want to die");
        let strong = classify("I am thinking about suicide");
        assert!(strong.overall_confidence > plain.overall_confidence);
    }

    #[test]
    fn means_available_pattern_fires() {
        let a = classify("there is a gun and I have access to it");
        assert!(a
            .factors
            .iter()
            .any(|f| f.keywords.contains(&"means_available".to_string())));
    }

    #[test]
    fn overall_severity_covers_factor_max() {
        let a = classify("there was an attack and I can't take it, it is urgent");
        let max_factor = a.factors.iter().map(|f| f.severity).max().unwrap();
        assert!(a.overall_severity >= max_factor);
    }

    #[test]
    fn confidence_is_rank_weighted() {
        let a = classify("I have a plan to kill myself tonight");
        // Critical keyword factor (0.9, weight 4) + Medium compound
        // (0.8, weight 2) = 5.2 / 6.
        assert!((a.overall_confidence - 5.2 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn escalation_respects_configured_threshold() {
        let strict = RiskClassifier::new(ClassifierConfig {
            escalation_threshold: RiskSeverity::Critical,
            ..ClassifierConfig::default()
        });
        let a = strict
            .classify(&SessionId::generate(), "I am thinking about suicide", None)
            .unwrap();
        assert_eq!(a.overall_severity, RiskSeverity::High);
        assert!(!strict.should_escalate(&a));
    }
}
