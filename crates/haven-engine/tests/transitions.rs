//! Property tests: any message sequence drives the session only along
//! allowed edges, and the transition log stays an unbroken chain.

use std::sync::Arc;

use haven_engine::{
    is_allowed, EngineConfig, ResponseFlags, StateMachine, TemplateResponder,
};
use haven_risk::{ClassifierConfig, RiskClassifier};
use haven_types::Session;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn arb_message() -> impl Strategy<Value = String> {
    let scripted = proptest::sample::select(vec![
        "yes, that's okay",
        "no thanks",
        "I've been feeling overwhelmed",
        "could you share a resource?",
        "goodbye",
        "I want to die",
        "I have a plan to kill myself tonight",
        "just a rough week, nothing serious",
    ]);
    prop_oneof![scripted.prop_map(str::to_string), "[a-z ]{0,30}"]
}

fn arb_carried() -> impl Strategy<Value = ResponseFlags> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(escalation_triggered, transfer_completed, resources_requested)| ResponseFlags {
            escalation_triggered,
            transfer_completed,
            resources_requested,
            ..ResponseFlags::default()
        },
    )
}

fn machine() -> StateMachine {
    StateMachine::new(
        Arc::new(TemplateResponder),
        Arc::new(RiskClassifier::new(ClassifierConfig::default())),
        EngineConfig::default(),
    )
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Every recorded transition is in the allowed-edge table.
    #[test]
    fn all_transitions_follow_the_edge_table(
        turns in proptest::collection::vec((arb_message(), arb_carried()), 1..12),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let classifier = RiskClassifier::new(ClassifierConfig::default());
            let m = machine();
            let mut session = Session::new(None, 50, 30);

            for (message, carried) in turns {
                session.message_count += 1;
                let assessment = classifier
                    .classify(&session.id, &message, session.last_risk_flag())
                    .unwrap();
                m.process(&mut session, &message, &assessment, carried)
                    .await
                    .unwrap();
            }

            for record in &session.transitions {
                prop_assert!(
                    is_allowed(record.from, record.to),
                    "illegal edge {} -> {} recorded",
                    record.from,
                    record.to
                );
            }
            Ok(())
        })?;
    }

    /// The log is an unbroken, time-ordered chain from Init.
    #[test]
    fn transition_log_is_an_ordered_chain(
        turns in proptest::collection::vec((arb_message(), arb_carried()), 1..12),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let classifier = RiskClassifier::new(ClassifierConfig::default());
            let m = machine();
            let mut session = Session::new(None, 50, 30);

            for (message, carried) in turns {
                session.message_count += 1;
                let assessment = classifier
                    .classify(&session.id, &message, session.last_risk_flag())
                    .unwrap();
                m.process(&mut session, &message, &assessment, carried)
                    .await
                    .unwrap();
            }

            if let Some(first) = session.transitions.first() {
                prop_assert_eq!(first.from, haven_types::SessionState::Init);
            }
            for pair in session.transitions.windows(2) {
                prop_assert_eq!(pair[0].to, pair[1].from);
                prop_assert!(pair[0].at <= pair[1].at);
            }
            if let Some(last) = session.transitions.last() {
                prop_assert_eq!(last.to, session.state);
            }
            Ok(())
        })?;
    }
}
