//! Conversation core: intent routing, flow state, and reactive search.
//!
//! The orchestrator classifies every user turn, decides whether it
//! continues the current flow, restarts it, or overrides it (including the
//! emergency override), drives location acquisition alongside flow logic,
//! and fires a nearby-facility search whenever flow + query + location
//! become jointly sufficient. Results of superseded requests are dropped
//! via the session guard.

pub mod decision;
pub mod error;
pub mod orchestrator;
pub mod search;
pub mod state;
pub mod transcript;

pub use decision::{decide, effective_query, Route, RouteSignals};
pub use error::ConversationError;
pub use orchestrator::{ConversationOrchestrator, ProviderSet};
pub use search::{plan, InFlightLatch, SearchPlan};
pub use state::ConversationState;
pub use transcript::TranscriptStore;
