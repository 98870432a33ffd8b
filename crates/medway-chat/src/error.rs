//! Error types for the conversation core.

use medway_core::MedwayError;

/// Errors surfaced by the conversation orchestrator.
///
/// Collaborator failures mostly never reach the caller: classifier and
/// analyzer errors abandon the step silently, so the surviving variants
/// are input validation plus a provider wrapper for the few paths that
/// do propagate.
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("provider error: {0}")]
    Provider(String),
}

impl From<MedwayError> for ConversationError {
    fn from(err: MedwayError) -> Self {
        ConversationError::Provider(err.to_string())
    }
}
