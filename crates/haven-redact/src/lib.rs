//! # haven-redact
//!
//! PII detection and redaction for conversation text and structured data.
//!
//! Every pattern in the catalog maps to a fixed placeholder token
//! (`[PHONE]`, `[EMAIL]`, …). Redaction is irreversible in place: the span's
//! original value is replaced by its token and only a truncated blake3 hash
//! of the value is retained for audit correlation.
//!
//! Redaction is idempotent — placeholder tokens never match any source
//! pattern, so re-redacting already-redacted text changes nothing.

pub mod catalog;
mod redactor;

pub use catalog::{PatternCatalog, PiiKind};
pub use redactor::{RedactedSpan, Redaction, Redactor};
