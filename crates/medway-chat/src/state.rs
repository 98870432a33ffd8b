//! Consolidated conversation state.
//!
//! Everything a flow decision depends on lives in one value: the active
//! flow, the stage within it, the accumulated query, at most one analysis
//! result per flow, the current facility results, and the in-progress
//! manual location picks. The orchestrator snapshots and mutates this
//! under a short-lived lock, never across an await.

use serde::{Deserialize, Serialize};

use medway_core::types::{Flow, MedicationInfo, PlaceRecord, Stage, TriageAnalysis, Urgency};

/// Mutable conversation state for one session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub flow: Flow,
    pub stage: Stage,
    /// Accumulated free-text search subject for the active flow.
    pub query: String,
    /// Stored triage result; populated only while the triage flow owns it.
    pub triage: Option<TriageAnalysis>,
    /// Stored medication result; populated only for the pharmacy flow.
    pub medications: Option<Vec<MedicationInfo>>,
    /// Facility results, replaced wholesale on each completed search.
    pub places: Vec<PlaceRecord>,
    /// Whether the consumer is currently looking at the results surface.
    pub viewing_results: bool,
    /// Region chosen so far in the manual cascade.
    pub pending_region: Option<String>,
    /// Province chosen so far in the manual cascade.
    pub pending_province: Option<String>,
}

impl ConversationState {
    /// Urgency of the stored triage result, if any.
    pub fn last_urgency(&self) -> Option<Urgency> {
        self.triage.as_ref().map(|t| t.urgency)
    }

    /// Whether the active flow has a usable search subject: a non-empty
    /// query or a stored analysis result.
    pub fn has_subject(&self) -> bool {
        match self.flow {
            Flow::None => false,
            Flow::Triage => self.triage.is_some() || !self.query.is_empty(),
            Flow::Pharmacy => self.medications.is_some() || !self.query.is_empty(),
            Flow::Directory => !self.query.is_empty(),
        }
    }

    /// Drop results that do not belong to `entered`, keeping the entered
    /// flow's own result untouched. Used when switching flows.
    pub fn clear_other_flow_results(&mut self, entered: Flow) {
        if entered != Flow::Triage {
            self.triage = None;
        }
        if entered != Flow::Pharmacy {
            self.medications = None;
        }
    }

    /// Reset to the initial state.
    pub fn clear(&mut self) {
        *self = ConversationState::default();
    }
}
