use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// The task track currently governing interpretation of user input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// No flow chosen yet. Only valid before the first intent.
    #[default]
    None,
    /// Symptom triage: analyze symptoms, recommend a specialty and urgency.
    Triage,
    /// Medication lookup: identify medications and where to buy them.
    Pharmacy,
    /// Facility directory: free-text search for health facilities.
    Directory,
}

/// Intent assigned to a user turn by the external classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Triage,
    Pharmacy,
    Directory,
    /// Conversational turn that continues the current context.
    Chat,
}

impl Intent {
    /// The flow this intent selects, if any. `Chat` selects no flow.
    pub fn flow(&self) -> Option<Flow> {
        match self {
            Intent::Triage => Some(Flow::Triage),
            Intent::Pharmacy => Some(Flow::Pharmacy),
            Intent::Directory => Some(Flow::Directory),
            Intent::Chat => None,
        }
    }
}

/// Position within a flow's multi-step sequence.
///
/// Ordered: everything below `Results` counts as "still collecting input",
/// which the route decision uses to treat mid-flow turns as flow changes.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing collected yet.
    #[default]
    Initial,
    /// Waiting for a manual region pick.
    RegionSelect,
    /// Waiting for a manual province pick.
    ProvinceSelect,
    /// Waiting for a manual district pick.
    DistrictSelect,
    /// Flow complete; results surface is live and searches may fire.
    Results,
}

/// Urgency level assigned by the triage analyzer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Moderate,
    High,
    /// Triggers the emergency bypass: results stage is reached immediately
    /// and an alert turn is emitted, regardless of location status.
    Emergency,
}

/// Who authored a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnAuthor {
    User,
    System,
}

/// What a turn carries.
///
/// Non-`Text` kinds are interactive prompts rendered by the presentation
/// layer. They carry empty text and are excluded from any history fed back
/// into classifier or analyzer calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    #[default]
    Text,
    /// Offer automatic/manual location acquisition.
    LocationPrompt,
    RegionPick,
    ProvincePick,
    DistrictPick,
    InsurancePick,
    IntentPick,
}

impl TurnKind {
    /// Whether this kind is an interactive prompt (empty text, UI-only).
    pub fn is_prompt(&self) -> bool {
        !matches!(self, TurnKind::Text)
    }
}

/// Processing state of an uploaded document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Uploaded; the file store is still processing it.
    Processing,
    /// Ready to be attached to contextual-chat calls.
    Active,
    /// Processing failed; the document is unusable.
    Failed,
}

// =============================================================================
// Structs
// =============================================================================

/// A single conversation turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub text: String,
    pub author: TurnAuthor,
    pub kind: TurnKind,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a plain text turn.
    pub fn text(author: TurnAuthor, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            author,
            kind: TurnKind::Text,
            timestamp: Utc::now(),
        }
    }

    /// Create a system-authored interactive prompt turn (empty text).
    pub fn prompt(kind: TurnKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: String::new(),
            author: TurnAuthor::System,
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Geographic coordinates from a device position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Structured result of a symptom triage analysis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriageAnalysis {
    /// Recommended medical specialty, e.g. "Medicina Interna".
    pub specialty: String,
    pub urgency: Urgency,
    pub urgency_explanation: String,
    pub detected_symptoms: Vec<String>,
    pub advice: Vec<String>,
    /// Analyzer confidence in [0, 1].
    pub confidence: f64,
}

/// One medication record from the medication analyzer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MedicationInfo {
    pub name: String,
    pub description: String,
    pub dosage: String,
    pub warnings: Vec<String>,
    pub requires_prescription: bool,
}

/// One facility returned by the places-search collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub rating: Option<f64>,
    pub open_now: Option<bool>,
}

/// An uploaded document tracked by the file store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub state: DocumentState,
}

impl Document {
    /// Whether the file store is still processing this document.
    pub fn is_pending(&self) -> bool {
        self.state == DocumentState::Processing
    }
}

// =============================================================================
// Tests
// =============================================================================
