use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Flow, TurnAuthor, Urgency};

/// All domain events that can occur during a conversation.
///
/// Events are emitted by the orchestrator after state changes and consumed
/// by presentation-layer listeners (live transcript updates, the results
/// surface, and out-of-surface notifications).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    /// A turn was appended to the transcript.
    TurnAppended { turn_id: Uuid, author: TurnAuthor },

    /// The active flow changed.
    FlowChanged { from: Flow, to: Flow },

    /// The triage analyzer flagged an emergency.
    EmergencyDetected { specialty: String, urgency: Urgency },

    /// A location became known (device position or manual pick).
    LocationResolved { place_name: String },

    /// Device positioning failed.
    LocationFailed { reason: String },

    /// A nearby-facility search was dispatched.
    SearchStarted { query: String },

    /// A nearby-facility search completed and its results were committed.
    ///
    /// `background` is true when the consumer was not viewing the results
    /// surface at completion time; listeners should raise a notification.
    SearchCompleted { result_count: usize, background: bool },

    /// The session was fully reset.
    SessionReset { generation: u64 },
}

/// Broadcast channel fanning domain events out to any number of listeners.
///
/// Sending never blocks; events published with no active subscriber are
/// dropped, which is the desired behavior for purely reactive consumers.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: tokio::sync::broadcast::Sender<DomainEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventBus {
    /// Create a bus with the given per-subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // Err only means there are no subscribers right now.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

// =============================================================================
// Tests
// =============================================================================
