//! Reactive nearby-facility search rule.
//!
//! `plan` derives whether the accumulated state is sufficient to search
//! and, if so, what to ask the places collaborator. The orchestrator
//! re-evaluates it after every mutation; `InFlightLatch` guarantees at
//! most one outstanding request.

use std::sync::atomic::{AtomicBool, Ordering};

use medway_core::config::SearchConfig;
use medway_core::types::{Coordinates, Flow, Stage};
use medway_location::LocationSnapshot;

use crate::state::ConversationState;

/// A fully resolved search dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchPlan {
    pub query: String,
    /// Place name scope, or empty when only coordinates anchor the search.
    pub place_name: String,
    pub coordinates: Option<Coordinates>,
    pub flow: Flow,
}

/// Derive a search plan from the current state, or `None` when the state
/// is not yet sufficient.
///
/// Sufficient means: results stage reached, a flow active, a non-empty
/// query or stored result, and either a known location or the directory
/// flow (which falls back to a fixed city-level scope).
pub fn plan(
    state: &ConversationState,
    location: &LocationSnapshot,
    config: &SearchConfig,
    default_city: &str,
) -> Option<SearchPlan> {
    if state.stage != Stage::Results || state.flow == Flow::None || !state.has_subject() {
        return None;
    }
    if !location.is_usable() && state.flow != Flow::Directory {
        return None;
    }

    let query = match state.flow {
        Flow::Pharmacy => config.pharmacy_category.clone(),
        Flow::Triage => state
            .triage
            .as_ref()
            .filter(|t| !t.specialty.is_empty())
            .map(|t| t.specialty.clone())
            .unwrap_or_else(|| config.generic_facility.clone()),
        Flow::Directory | Flow::None => state.query.clone(),
    };

    let place_name = match &location.place_name {
        Some(name) => name.clone(),
        None if location.coordinates.is_some() => String::new(),
        None => default_city.to_string(),
    };

    Some(SearchPlan {
        query,
        place_name,
        coordinates: location.coordinates,
        flow: state.flow,
    })
}

/// Single-slot latch guarding the outstanding search request.
#[derive(Debug, Default)]
pub struct InFlightLatch {
    busy: AtomicBool,
}

impl InFlightLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot. Returns false when a request is already outstanding.
    pub fn try_begin(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the slot. Idempotent.
    pub fn finish(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Tests
// =============================================================================
