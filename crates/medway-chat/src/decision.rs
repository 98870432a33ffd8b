//! Pure route decision logic.
//!
//! Every user turn is classified, even mid-results, so the user can
//! always escape a stuck context. The decision over what to do with the
//! classified intent is a pure function of five signals, unit-testable
//! without any I/O.

use medway_core::types::{Flow, Intent, Stage, Urgency};

/// Signals feeding one route decision.
#[derive(Clone, Copy, Debug)]
pub struct RouteSignals {
    /// Intent assigned by the classifier.
    pub intent: Intent,
    /// Emergency flag from the classifier (not from a prior analysis).
    pub classifier_emergency: bool,
    pub active_flow: Flow,
    pub stage: Stage,
    /// Urgency of the stored triage analysis, if one exists.
    pub last_urgency: Option<Urgency>,
}

/// Outcome of the route decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Switch to or re-execute a flow.
    FlowChange {
        /// True when the pharmacy override broke an active emergency
        /// triage context.
        forced: bool,
    },
    /// Plain contextual chat within the current flow.
    Contextual,
}

/// Decide how to route a classified turn.
///
/// A turn is a flow change when the intent is anything but chat, when the
/// current flow has not yet reached its results stage, or when the
/// classifier flagged an emergency. Independently, a pharmacy request is
/// allowed to break out of an active emergency triage context even at the
/// results stage.
pub fn decide(signals: &RouteSignals) -> Route {
    let is_flow_change = signals.intent != Intent::Chat
        || signals.stage < Stage::Results
        || signals.classifier_emergency;

    let force_switch = signals.active_flow == Flow::Triage
        && signals.last_urgency == Some(Urgency::Emergency)
        && signals.intent == Intent::Pharmacy;

    if is_flow_change || force_switch {
        Route::FlowChange {
            forced: force_switch,
        }
    } else {
        Route::Contextual
    }
}

/// Resolve the query a flow change should execute with.
///
/// Triage continued from triage without an emergency flag accumulates:
/// consecutive symptom descriptions concatenate onto the prior query.
/// Every other combination takes the newly extracted text verbatim.
pub fn effective_query(
    new_flow: Flow,
    active_flow: Flow,
    classifier_emergency: bool,
    has_prior_analysis: bool,
    prior_query: &str,
    extracted: &str,
) -> String {
    let accumulate = new_flow == Flow::Triage
        && active_flow == Flow::Triage
        && !classifier_emergency
        && has_prior_analysis
        && !prior_query.is_empty();

    if accumulate {
        format!("{}. {}", prior_query, extracted)
    } else {
        extracted.to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn signals() -> RouteSignals {
        RouteSignals {
            intent: Intent::Chat,
            classifier_emergency: false,
            active_flow: Flow::Triage,
            stage: Stage::Results,
            last_urgency: Some(Urgency::Moderate),
        }
    }

    // ---- is_flow_change components ----

    #[test]
    fn test_chat_at_results_is_contextual() {
        assert_eq!(decide(&signals()), Route::Contextual);
    }

    #[test]
    fn test_non_chat_intent_is_flow_change() {
        for intent in [Intent::Triage, Intent::Pharmacy, Intent::Directory] {
            let s = RouteSignals {
                intent,
                ..signals()
            };
            assert!(matches!(decide(&s), Route::FlowChange { .. }));
        }
    }

    #[test]
    fn test_chat_before_results_is_flow_change() {
        for stage in [
            Stage::Initial,
            Stage::RegionSelect,
            Stage::ProvinceSelect,
            Stage::DistrictSelect,
        ] {
            let s = RouteSignals { stage, ..signals() };
            assert!(
                matches!(decide(&s), Route::FlowChange { .. }),
                "stage {:?} should route as flow change",
                stage
            );
        }
    }

    #[test]
    fn test_classifier_emergency_forces_flow_change() {
        let s = RouteSignals {
            classifier_emergency: true,
            ..signals()
        };
        assert!(matches!(decide(&s), Route::FlowChange { .. }));
    }

    // ---- force_switch ----

    #[test]
    fn test_pharmacy_breaks_emergency_triage() {
        let s = RouteSignals {
            intent: Intent::Pharmacy,
            active_flow: Flow::Triage,
            stage: Stage::Results,
            last_urgency: Some(Urgency::Emergency),
            classifier_emergency: false,
        };
        assert_eq!(decide(&s), Route::FlowChange { forced: true });
    }

    #[test]
    fn test_force_switch_requires_emergency_urgency() {
        let s = RouteSignals {
            intent: Intent::Pharmacy,
            last_urgency: Some(Urgency::High),
            ..signals()
        };
        // Still a flow change (non-chat intent), but not forced
        assert_eq!(decide(&s), Route::FlowChange { forced: false });
    }

    #[test]
    fn test_directory_does_not_get_force_switch() {
        let s = RouteSignals {
            intent: Intent::Directory,
            last_urgency: Some(Urgency::Emergency),
            ..signals()
        };
        assert_eq!(decide(&s), Route::FlowChange { forced: false });
    }

    #[test]
    fn test_chat_never_forced_even_during_emergency() {
        let s = RouteSignals {
            intent: Intent::Chat,
            last_urgency: Some(Urgency::Emergency),
            ..signals()
        };
        assert_eq!(decide(&s), Route::Contextual);
    }

    // ---- Concrete scenario: emergency pivot from pharmacy results ----

    #[test]
    fn test_emergency_pivot_from_pharmacy_results() {
        // User in pharmacy results says "I have chest pain"; classifier
        // returns triage + emergency. Must route as a flow change despite
        // stage already being Results for the old flow.
        let s = RouteSignals {
            intent: Intent::Triage,
            classifier_emergency: true,
            active_flow: Flow::Pharmacy,
            stage: Stage::Results,
            last_urgency: None,
        };
        assert!(matches!(decide(&s), Route::FlowChange { .. }));
    }

    // ---- effective_query ----

    #[test]
    fn test_triage_accumulates_onto_prior_query() {
        let q = effective_query(
            Flow::Triage,
            Flow::Triage,
            false,
            true,
            "fiebre y dolor de cabeza",
            "ahora tambien nauseas",
        );
        assert_eq!(q, "fiebre y dolor de cabeza. ahora tambien nauseas");
    }

    #[test]
    fn test_emergency_does_not_accumulate() {
        let q = effective_query(
            Flow::Triage,
            Flow::Triage,
            true,
            true,
            "fiebre",
            "dolor en el pecho",
        );
        assert_eq!(q, "dolor en el pecho");
    }

    #[test]
    fn test_no_prior_analysis_does_not_accumulate() {
        let q = effective_query(Flow::Triage, Flow::Triage, false, false, "fiebre", "tos");
        assert_eq!(q, "tos");
    }

    #[test]
    fn test_cross_flow_never_accumulates() {
        let q = effective_query(
            Flow::Pharmacy,
            Flow::Triage,
            false,
            true,
            "fiebre",
            "paracetamol",
        );
        assert_eq!(q, "paracetamol");
    }

    #[test]
    fn test_empty_prior_query_takes_new_verbatim() {
        let q = effective_query(Flow::Triage, Flow::Triage, false, true, "", "mareos");
        assert_eq!(q, "mareos");
    }
}
