//! Collaborator contracts consumed by the conversation core.
//!
//! The orchestrator never talks to a concrete model, geocoding API, or
//! places backend; it only sees the async traits defined here. Production
//! implementations live outside this workspace, and the `stub` module
//! provides scripted implementations for development and tests.

pub mod stub;
pub mod traits;
pub mod types;

pub use traits::{
    ContextualChat, FileStore, Geocoder, IntentClassifier, MedicationAnalyzer, PlacesSearch,
    Positioning, TriageAnalyzer,
};
pub use types::{ChatAction, ChatMessage, ChatReply, ClassifiedIntent, UserInput};
