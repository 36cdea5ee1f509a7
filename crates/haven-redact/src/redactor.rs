//! The redaction pass itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{PatternCatalog, PiiKind};

/// One redacted span, recorded for audit.
///
/// Offsets refer to the text as it was before substitution. The original
/// value is not retained — only a truncated blake3 hash for correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedSpan {
    pub kind: PiiKind,
    pub start: usize,
    pub end: usize,
    pub replacement: &'static str,
    pub value_hash: String,
}

/// Result of redacting one piece of text.
#[derive(Debug, Clone)]
pub struct Redaction {
    pub text: String,
    pub spans: Vec<RedactedSpan>,
}

impl Redaction {
    pub fn count(&self) -> usize {
        self.spans.len()
    }

    /// Distinct kinds redacted, in first-seen order.
    pub fn kinds(&self) -> Vec<PiiKind> {
        let mut kinds = Vec::new();
        for span in &self.spans {
            if !kinds.contains(&span.kind) {
                kinds.push(span.kind);
            }
        }
        kinds
    }
}

/// Pattern-driven PII redactor. Pure over its inputs; no state beyond the
/// compiled catalog.
pub struct Redactor {
    catalog: PatternCatalog,
}

impl Redactor {
    pub fn new(catalog: PatternCatalog) -> Self {
        Self { catalog }
    }

    /// Redact all catalog matches in `text`.
    ///
    /// Each pass collects matches across every pattern, resolves overlaps in
    /// favor of the earlier-starting (then longer) span, and substitutes
    /// rightmost-first so earlier offsets stay valid. Passes repeat until
    /// nothing matches, so a fragment shadowed by an overlapping match in one
    /// pass is still caught — the result is a fixpoint and re-redacting it
    /// changes nothing. Span offsets refer to the text of the pass that
    /// found them.
    pub fn redact_text(&self, text: &str) -> Redaction {
        let mut current = text.to_string();
        let mut spans = Vec::new();
        // Shadowing nests at most a couple of levels deep.
        for _ in 0..8 {
            let pass = self.redact_pass(&current);
            if pass.spans.is_empty() {
                break;
            }
            spans.extend(pass.spans);
            current = pass.text;
        }
        Redaction {
            text: current,
            spans,
        }
    }

    fn redact_pass(&self, text: &str) -> Redaction {
        let mut candidates: Vec<(PiiKind, usize, usize)> = Vec::new();
        for (kind, re) in self.catalog.patterns() {
            for m in re.find_iter(text) {
                candidates.push((*kind, m.start(), m.end()));
            }
        }

        // Earlier start wins; longer span wins a tie.
        candidates.sort_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)));
        let mut kept: Vec<(PiiKind, usize, usize)> = Vec::new();
        let mut covered_to = 0usize;
        for (kind, start, end) in candidates {
            if start >= covered_to {
                kept.push((kind, start, end));
                covered_to = end;
            }
        }

        let spans: Vec<RedactedSpan> = kept
            .iter()
            .map(|(kind, start, end)| RedactedSpan {
                kind: *kind,
                start: *start,
                end: *end,
                replacement: kind.token(),
                value_hash: hash_value(&text[*start..*end]),
            })
            .collect();

        let mut redacted = text.to_string();
        for (kind, start, end) in kept.iter().rev() {
            redacted.replace_range(*start..*end, kind.token());
        }

        Redaction {
            text: redacted,
            spans,
        }
    }

    /// Redact a structured value recursively, preserving shape.
    ///
    /// Strings are redacted, objects and arrays are walked, every other
    /// leaf passes through unchanged. Never errors.
    pub fn redact_value(&self, value: &Value) -> (Value, Vec<RedactedSpan>) {
        let mut spans = Vec::new();
        let redacted = self.redact_value_inner(value, &mut spans);
        (redacted, spans)
    }

    fn redact_value_inner(&self, value: &Value, spans: &mut Vec<RedactedSpan>) -> Value {
        match value {
            Value::String(s) => {
                let redaction = self.redact_text(s);
                spans.extend(redaction.spans);
                Value::String(redaction.text)
            }
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, val) in map {
                    out.insert(key.clone(), self.redact_value_inner(val, spans));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.redact_value_inner(item, spans))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Whether any catalog pattern matches.
    pub fn contains_pii(&self, text: &str) -> bool {
        self.catalog
            .patterns()
            .iter()
            .any(|(_, re)| re.is_match(text))
    }

    /// Kinds present in `text`, in catalog order.
    pub fn detected_kinds(&self, text: &str) -> Vec<PiiKind> {
        self.catalog
            .patterns()
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(kind, _)| *kind)
            .collect()
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(PatternCatalog::standard())
    }
}

fn hash_value(value: &str) -> String {
    let hex = blake3::hash(value.as_bytes()).to_hex();
    hex.as_str()[..8].to_string()
}
