//! The allowed-edge table.
//!
//! Every transition the engine applies is checked against this table; a
//! request for any edge not listed is rejected and the session stays put.

use haven_types::SessionState;

use SessionState::*;

/// Allowed outgoing edges per state. `Close` has none.
pub const ALLOWED_EDGES: &[(SessionState, &[SessionState])] = &[
    (Init, &[Consented, Escalate, Close]),
    (Consented, &[Triage, Escalate, Close]),
    (Triage, &[SupportLoop, Escalate, Close]),
    (SupportLoop, &[RiskCheck, Resources, Escalate, Close]),
    (RiskCheck, &[SupportLoop, Escalate, Close]),
    (Resources, &[SupportLoop, Escalate, Close]),
    (Escalate, &[Close]),
    (Close, &[]),
];

/// Outgoing edges allowed from `state`.
pub fn allowed_from(state: SessionState) -> &'static [SessionState] {
    ALLOWED_EDGES
        .iter()
        .find(|(from, _)| *from == state)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

/// Whether `from -> to` is in the table.
pub fn is_allowed(from: SessionState, to: SessionState) -> bool {
    allowed_from(from).contains(&to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_has_no_outgoing_edges() {
        assert!(allowed_from(Close).is_empty());
        assert!(!is_allowed(Close, Init));
        assert!(!is_allowed(Close, Escalate));
    }

    #[test]
    fn escalate_only_reaches_close() {
        assert_eq!(allowed_from(Escalate), &[Close]);
    }

    #[test]
    fn every_non_terminal_state_can_escalate_and_close() {
        for state in [Init, Consented, Triage, SupportLoop, RiskCheck, Resources] {
            assert!(is_allowed(state, Escalate), "{state} cannot escalate");
            assert!(is_allowed(state, Close), "{state} cannot close");
        }
    }

    #[test]
    fn loop_states_return_to_support() {
        assert!(is_allowed(RiskCheck, SupportLoop));
        assert!(is_allowed(Resources, SupportLoop));
        assert!(!is_allowed(RiskCheck, Resources));
    }

    #[test]
    fn forward_path_is_linear() {
        assert!(is_allowed(Init, Consented));
        assert!(!is_allowed(Init, Triage));
        assert!(is_allowed(Consented, Triage));
        assert!(!is_allowed(Consented, SupportLoop));
        assert!(is_allowed(Triage, SupportLoop));
        assert!(!is_allowed(SupportLoop, Triage));
    }
}
