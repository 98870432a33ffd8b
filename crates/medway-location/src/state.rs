//! Location state machine with validated transitions.
//!
//! Automatic path:
//! - Idle -> Requesting (device position requested)
//! - Requesting -> Searching (raw coordinates obtained; already usable)
//! - Searching -> Success (reverse geocode resolved a place name)
//! - Requesting/Searching -> Error (positioning failed or timed out)
//!
//! The manual path (`select_manual`) and a classifier-detected location
//! (`commit_known`) bypass the automatic transitions entirely and set
//! Success directly with no coordinates.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use medway_core::types::Coordinates;
use medway_core::{MedwayError, Result};

/// Status of the location machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    /// No acquisition in progress.
    #[default]
    Idle,
    /// Waiting for the device position.
    Requesting,
    /// Coordinates obtained; resolving a place name.
    Searching,
    /// A location is known (named, positioned, or both).
    Success,
    /// Positioning failed; manual fallback remains available.
    Error,
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationStatus::Idle => write!(f, "Idle"),
            LocationStatus::Requesting => write!(f, "Requesting"),
            LocationStatus::Searching => write!(f, "Searching"),
            LocationStatus::Success => write!(f, "Success"),
            LocationStatus::Error => write!(f, "Error"),
        }
    }
}

impl LocationStatus {
    /// Returns whether an automatic-path transition to `target` is valid.
    pub fn can_transition_to(&self, target: &LocationStatus) -> bool {
        matches!(
            (self, target),
            (LocationStatus::Idle, LocationStatus::Requesting)
                | (LocationStatus::Requesting, LocationStatus::Searching)
                | (LocationStatus::Searching, LocationStatus::Success)
                // Failure transitions
                | (LocationStatus::Requesting, LocationStatus::Error)
                | (LocationStatus::Searching, LocationStatus::Error)
        )
    }
}

/// Cause of a positioning failure, carried in the snapshot so the
/// presentation layer can show a cause-specific message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionErrorKind {
    PermissionDenied,
    Unavailable,
    Timeout,
}

impl PositionErrorKind {
    /// User-facing message for the error turn.
    pub fn message(&self) -> &'static str {
        match self {
            PositionErrorKind::PermissionDenied => {
                "No pudimos acceder a tu ubicaci\u{00f3}n porque el permiso fue denegado. \
                 Puedes elegirla manualmente."
            }
            PositionErrorKind::Unavailable | PositionErrorKind::Timeout => {
                "No pudimos obtener tu ubicaci\u{00f3}n. Puedes elegirla manualmente."
            }
        }
    }
}

/// A manual location selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualPick {
    /// Single pick from a flat list.
    Single(String),
    /// Cascading region -> province -> district pick.
    Cascade {
        region: String,
        province: String,
        district: String,
    },
}

impl ManualPick {
    /// Human-readable place name for the pick.
    pub fn label(&self) -> String {
        match self {
            ManualPick::Single(name) => name.clone(),
            ManualPick::Cascade {
                region,
                province,
                district,
            } => [district.as_str(), province.as_str(), region.as_str()]
                .iter()
                .filter(|part| !part.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Immutable view of the machine at one point in time.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LocationSnapshot {
    pub status: LocationStatus,
    /// Present only when a device position was obtained.
    pub coordinates: Option<Coordinates>,
    /// May be set independently of coordinates (manual picks).
    pub place_name: Option<String>,
    pub error: Option<PositionErrorKind>,
}

impl LocationSnapshot {
    /// Whether the snapshot can anchor a nearby search: either a name or
    /// raw coordinates is enough.
    pub fn is_usable(&self) -> bool {
        self.place_name.is_some() || self.coordinates.is_some()
    }
}

/// Thread-safe location machine.
///
/// Automatic transitions are validated; the manual and known-location
/// commits bypass validation since manual selection stays available as a
/// fallback from any status.
#[derive(Debug, Default)]
pub struct LocationMachine {
    inner: Mutex<LocationSnapshot>,
}

impl LocationMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current view of the machine.
    pub fn snapshot(&self) -> LocationSnapshot {
        self.inner.lock().expect("location mutex poisoned").clone()
    }

    /// Idle -> Requesting.
    pub fn begin_request(&self) -> Result<()> {
        self.transition(LocationStatus::Requesting, |snap| {
            snap.error = None;
        })
    }

    /// Requesting -> Searching, storing the raw coordinates.
    pub fn coordinates_obtained(&self, coordinates: Coordinates) -> Result<()> {
        self.transition(LocationStatus::Searching, |snap| {
            snap.coordinates = Some(coordinates);
        })
    }

    /// Searching -> Success with an optional resolved place name.
    ///
    /// `None` covers reverse-geocode failure: the coordinates stay usable
    /// for search even without a human-readable name.
    pub fn resolved(&self, place_name: Option<String>) -> Result<()> {
        self.transition(LocationStatus::Success, |snap| {
            snap.place_name = place_name;
        })
    }

    /// Requesting/Searching -> Error with a failure cause.
    pub fn fail(&self, kind: PositionErrorKind) -> Result<()> {
        self.transition(LocationStatus::Error, |snap| {
            snap.error = Some(kind);
        })
    }

    /// Manual pick: Success with no coordinates, from any status.
    pub fn select_manual(&self, pick: &ManualPick) {
        let mut snap = self.inner.lock().expect("location mutex poisoned");
        snap.status = LocationStatus::Success;
        snap.coordinates = None;
        snap.place_name = Some(pick.label());
        snap.error = None;
        tracing::debug!(place = %pick.label(), "Location set by manual pick");
    }

    /// Classifier-detected location mention: Success, from any status.
    pub fn commit_known(&self, place_name: &str) {
        let mut snap = self.inner.lock().expect("location mutex poisoned");
        snap.status = LocationStatus::Success;
        snap.coordinates = None;
        snap.place_name = Some(place_name.to_string());
        snap.error = None;
        tracing::debug!(place = %place_name, "Location committed from classifier");
    }

    /// Reset to Idle with all fields cleared.
    pub fn reset(&self) {
        let mut snap = self.inner.lock().expect("location mutex poisoned");
        *snap = LocationSnapshot::default();
    }

    fn transition(
        &self,
        target: LocationStatus,
        apply: impl FnOnce(&mut LocationSnapshot),
    ) -> Result<()> {
        let mut snap = self.inner.lock().expect("location mutex poisoned");
        if snap.status.can_transition_to(&target) {
            tracing::debug!("Location state: {} -> {}", snap.status, target);
            snap.status = target;
            apply(&mut snap);
            Ok(())
        } else {
            Err(MedwayError::Location(format!(
                "Invalid state transition: {} -> {}",
                snap.status, target
            )))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn coords() -> Coordinates {
        Coordinates {
            lat: -12.046,
            lng: -77.043,
        }
    }

    // ---- Status transitions ----

    #[test]
    fn test_valid_transitions() {
        assert!(LocationStatus::Idle.can_transition_to(&LocationStatus::Requesting));
        assert!(LocationStatus::Requesting.can_transition_to(&LocationStatus::Searching));
        assert!(LocationStatus::Searching.can_transition_to(&LocationStatus::Success));
        assert!(LocationStatus::Requesting.can_transition_to(&LocationStatus::Error));
        assert!(LocationStatus::Searching.can_transition_to(&LocationStatus::Error));
    }

    #[test]
    fn test_invalid_transitions() {
        // Cannot skip states
        assert!(!LocationStatus::Idle.can_transition_to(&LocationStatus::Searching));
        assert!(!LocationStatus::Idle.can_transition_to(&LocationStatus::Success));
        assert!(!LocationStatus::Requesting.can_transition_to(&LocationStatus::Success));

        // Error is not reachable from Idle or terminal states
        assert!(!LocationStatus::Idle.can_transition_to(&LocationStatus::Error));
        assert!(!LocationStatus::Success.can_transition_to(&LocationStatus::Error));

        // No transitions out of terminal states
        assert!(!LocationStatus::Success.can_transition_to(&LocationStatus::Requesting));
        assert!(!LocationStatus::Error.can_transition_to(&LocationStatus::Searching));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(LocationStatus::Idle.to_string(), "Idle");
        assert_eq!(LocationStatus::Requesting.to_string(), "Requesting");
        assert_eq!(LocationStatus::Searching.to_string(), "Searching");
        assert_eq!(LocationStatus::Success.to_string(), "Success");
        assert_eq!(LocationStatus::Error.to_string(), "Error");
    }

    // ---- Automatic path ----

    #[test]
    fn test_automatic_happy_path() {
        let machine = LocationMachine::new();
        machine.begin_request().unwrap();
        machine.coordinates_obtained(coords()).unwrap();
        machine.resolved(Some("San Isidro, Lima".to_string())).unwrap();

        let snap = machine.snapshot();
        assert_eq!(snap.status, LocationStatus::Success);
        assert_eq!(snap.coordinates, Some(coords()));
        assert_eq!(snap.place_name.as_deref(), Some("San Isidro, Lima"));
        assert!(snap.is_usable());
    }

    #[test]
    fn test_coordinates_usable_before_name() {
        let machine = LocationMachine::new();
        machine.begin_request().unwrap();
        machine.coordinates_obtained(coords()).unwrap();

        let snap = machine.snapshot();
        assert_eq!(snap.status, LocationStatus::Searching);
        assert!(snap.place_name.is_none());
        assert!(snap.is_usable());
    }

    #[test]
    fn test_resolved_without_name_keeps_coordinates() {
        let machine = LocationMachine::new();
        machine.begin_request().unwrap();
        machine.coordinates_obtained(coords()).unwrap();
        machine.resolved(None).unwrap();

        let snap = machine.snapshot();
        assert_eq!(snap.status, LocationStatus::Success);
        assert!(snap.place_name.is_none());
        assert!(snap.is_usable());
    }

    #[test]
    fn test_failure_from_requesting() {
        let machine = LocationMachine::new();
        machine.begin_request().unwrap();
        machine.fail(PositionErrorKind::PermissionDenied).unwrap();

        let snap = machine.snapshot();
        assert_eq!(snap.status, LocationStatus::Error);
        assert_eq!(snap.error, Some(PositionErrorKind::PermissionDenied));
        assert!(!snap.is_usable());
    }

    #[test]
    fn test_invalid_machine_transition_rejected() {
        let machine = LocationMachine::new();
        let result = machine.coordinates_obtained(coords());
        assert!(result.is_err());
        assert_eq!(machine.snapshot().status, LocationStatus::Idle);
    }

    // ---- Manual path ----

    #[test]
    fn test_manual_pick_sets_success_without_coordinates() {
        let machine = LocationMachine::new();
        let pick = ManualPick::Cascade {
            region: "Lima".to_string(),
            province: "Lima".to_string(),
            district: "Miraflores".to_string(),
        };
        machine.select_manual(&pick);

        let snap = machine.snapshot();
        assert_eq!(snap.status, LocationStatus::Success);
        assert!(snap.coordinates.is_none());
        assert_eq!(snap.place_name.as_deref(), Some("Miraflores, Lima, Lima"));
    }

    #[test]
    fn test_manual_pick_from_error_state() {
        let machine = LocationMachine::new();
        machine.begin_request().unwrap();
        machine.fail(PositionErrorKind::Timeout).unwrap();

        machine.select_manual(&ManualPick::Single("Callao".to_string()));
        let snap = machine.snapshot();
        assert_eq!(snap.status, LocationStatus::Success);
        assert!(snap.error.is_none());
        assert_eq!(snap.place_name.as_deref(), Some("Callao"));
    }

    #[test]
    fn test_manual_pick_clears_stale_coordinates() {
        let machine = LocationMachine::new();
        machine.begin_request().unwrap();
        machine.coordinates_obtained(coords()).unwrap();

        machine.select_manual(&ManualPick::Single("Cusco".to_string()));
        let snap = machine.snapshot();
        assert!(snap.coordinates.is_none());
    }

    #[test]
    fn test_cascade_label_skips_empty_parts() {
        let pick = ManualPick::Cascade {
            region: "Lima".to_string(),
            province: String::new(),
            district: "Barranco".to_string(),
        };
        assert_eq!(pick.label(), "Barranco, Lima");
    }

    // ---- Known location from classifier ----

    #[test]
    fn test_commit_known_from_idle() {
        let machine = LocationMachine::new();
        machine.commit_known("Surquillo");
        let snap = machine.snapshot();
        assert_eq!(snap.status, LocationStatus::Success);
        assert_eq!(snap.place_name.as_deref(), Some("Surquillo"));
        assert!(snap.coordinates.is_none());
    }

    // ---- Reset ----

    #[test]
    fn test_reset_clears_everything() {
        let machine = LocationMachine::new();
        machine.begin_request().unwrap();
        machine.coordinates_obtained(coords()).unwrap();
        machine.resolved(Some("Lima".to_string())).unwrap();

        machine.reset();
        let snap = machine.snapshot();
        assert_eq!(snap.status, LocationStatus::Idle);
        assert!(snap.coordinates.is_none());
        assert!(snap.place_name.is_none());
        assert!(snap.error.is_none());
    }

    // ---- Error messages ----

    #[test]
    fn test_error_messages_are_cause_specific() {
        let denied = PositionErrorKind::PermissionDenied.message();
        let generic = PositionErrorKind::Unavailable.message();
        assert_ne!(denied, generic);
        assert_eq!(PositionErrorKind::Timeout.message(), generic);
    }
}
