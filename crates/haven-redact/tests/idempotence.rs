//! Property tests: redaction is idempotent over arbitrary text and
//! structured values — placeholder tokens never re-match the catalog.

use haven_redact::Redactor;
use proptest::prelude::*;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Text mixing prose with PII-shaped fragments so patterns actually fire.
fn arb_text() -> impl Strategy<Value = String> {
    let pii = proptest::sample::select(vec![
        "555-123-4567",
        "jane.doe@example.com",
        "123-45-6789",
        "4111 1111 1111 1111",
        "10.0.0.1",
        "John Smith",
        "42 Maple Street",
        "12/31/1999",
        "90210",
        "Zoloft",
        "MRN: 1234567",
    ]);
    let fragment = prop_oneof![
        pii.prop_map(str::to_string),
        "[a-z ]{0,20}",
    ];
    proptest::collection::vec(fragment, 0..6).prop_map(|parts| parts.join(" "))
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        arb_text().prop_map(Value::String),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::hash_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// redact(redact(x)) == redact(x) for arbitrary text.
    #[test]
    fn text_redaction_is_idempotent(text in arb_text()) {
        let redactor = Redactor::default();
        let once = redactor.redact_text(&text);
        let twice = redactor.redact_text(&once.text);
        prop_assert_eq!(&once.text, &twice.text);
        prop_assert_eq!(twice.spans.len(), 0);
    }

    /// Same property over structured values, shape preserved.
    #[test]
    fn value_redaction_is_idempotent(value in arb_value()) {
        let redactor = Redactor::default();
        let (once, _) = redactor.redact_value(&value);
        let (twice, spans) = redactor.redact_value(&once);
        prop_assert_eq!(once, twice);
        prop_assert_eq!(spans.len(), 0);
    }

    /// Redacted output never leaks a digit run that was part of a match.
    #[test]
    fn phone_digits_never_survive(prefix in "[a-z ]{0,12}") {
        let redactor = Redactor::default();
        let text = format!("{} 555-123-4567", prefix);
        let out = redactor.redact_text(&text);
        prop_assert!(out.text.contains("[PHONE]"));
        prop_assert!(!out.text.contains("555-123-4567"));
    }
}
