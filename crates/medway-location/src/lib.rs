//! Location acquisition for the conversation core.
//!
//! Two paths lead to a usable location: the automatic path walks a small
//! state machine (Idle -> Requesting -> Searching -> Success) driven by the
//! device-positioning and reverse-geocoding collaborators, and the manual
//! path (cascading region/province/district picks) jumps straight to
//! Success with no coordinates.

pub mod acquire;
pub mod state;

pub use acquire::{AcquireOutcome, LocationAcquirer};
pub use state::{LocationMachine, LocationSnapshot, LocationStatus, ManualPick, PositionErrorKind};
