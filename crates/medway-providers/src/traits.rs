//! Async trait seams for every external collaborator.
//!
//! All methods return `medway_core::Result`; the orchestrator decides per
//! call site whether a failure is surfaced, logged, or silently abandoned.

use async_trait::async_trait;
use uuid::Uuid;

use medway_core::types::{
    Coordinates, Document, Flow, MedicationInfo, PlaceRecord, TriageAnalysis,
};
use medway_core::Result;

use crate::types::{ChatMessage, ChatReply, ClassifiedIntent, UserInput};

/// Classifies a free-form user turn (text or voice) into an intent.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, input: &UserInput) -> Result<ClassifiedIntent>;
}

/// Analyzes accumulated symptoms into a structured triage result.
#[async_trait]
pub trait TriageAnalyzer: Send + Sync {
    async fn analyze(&self, query: &str) -> Result<TriageAnalysis>;
}

/// Identifies medications mentioned in a query.
#[async_trait]
pub trait MedicationAnalyzer: Send + Sync {
    async fn analyze(&self, query: &str) -> Result<Vec<MedicationInfo>>;
}

/// Free conversation over the trimmed turn history plus attached documents.
#[async_trait]
pub trait ContextualChat: Send + Sync {
    async fn respond(&self, history: &[ChatMessage], attached: &[Document]) -> Result<ChatReply>;
}

/// Resolves raw coordinates to a human-readable place name.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String>;
}

/// Nearby-facility search.
#[async_trait]
pub trait PlacesSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        place_name: &str,
        coordinates: Option<Coordinates>,
        flow: Flow,
    ) -> Result<Vec<PlaceRecord>>;
}

/// Upload storage with asynchronous server-side processing.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(&self, name: &str, bytes: &[u8]) -> Result<Document>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    /// Current state of every non-deleted document.
    async fn list_active(&self) -> Result<Vec<Document>>;
}

/// Device positioning capability.
#[async_trait]
pub trait Positioning: Send + Sync {
    /// Whether the platform offers positioning at all. When false, the
    /// location machine fails fast without entering `Requesting`.
    fn is_supported(&self) -> bool;

    /// Obtain the current device position. May be slow; callers apply
    /// their own timeout.
    async fn current_position(&self) -> Result<Coordinates>;
}
