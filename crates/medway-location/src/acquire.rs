//! Asynchronous device-location acquisition driver.
//!
//! Walks the location machine through the automatic path using the
//! positioning and geocoding collaborators. Every commit that follows an
//! await re-checks the session guard first; a superseded acquisition
//! leaves the machine untouched and reports `Superseded`.

use std::sync::Arc;
use std::time::Duration;

use medway_core::session::SessionGuard;
use medway_core::MedwayError;
use medway_providers::{Geocoder, Positioning};

use crate::state::{LocationMachine, LocationSnapshot, LocationStatus, PositionErrorKind};

/// Result of one acquisition attempt.
#[derive(Clone, Debug)]
pub enum AcquireOutcome {
    /// The machine reached Success; snapshot included.
    Resolved(LocationSnapshot),
    /// Positioning failed; the machine is in Error with this cause.
    Failed(PositionErrorKind),
    /// The platform offers no positioning capability. Terminal, and the
    /// machine state was not touched.
    Unsupported,
    /// A reset or newer turn superseded this attempt; nothing was committed.
    Superseded,
}

/// Drives the automatic acquisition path.
pub struct LocationAcquirer {
    machine: Arc<LocationMachine>,
    positioning: Arc<dyn Positioning>,
    geocoder: Arc<dyn Geocoder>,
    guard: Arc<SessionGuard>,
    timeout: Duration,
}

impl LocationAcquirer {
    pub fn new(
        machine: Arc<LocationMachine>,
        positioning: Arc<dyn Positioning>,
        geocoder: Arc<dyn Geocoder>,
        guard: Arc<SessionGuard>,
        timeout: Duration,
    ) -> Self {
        Self {
            machine,
            positioning,
            geocoder,
            guard,
            timeout,
        }
    }

    /// Run one acquisition attempt.
    ///
    /// A machine left in Error by a prior attempt is reset first so the
    /// user can retry the automatic path after a failure.
    pub async fn acquire(&self) -> AcquireOutcome {
        if !self.positioning.is_supported() {
            return AcquireOutcome::Unsupported;
        }

        if self.machine.snapshot().status == LocationStatus::Error {
            self.machine.reset();
        }

        let token = self.guard.current();
        if self.machine.begin_request().is_err() {
            // An acquisition is already in flight or a location exists.
            return AcquireOutcome::Superseded;
        }

        let position =
            tokio::time::timeout(self.timeout, self.positioning.current_position()).await;

        if !self.guard.is_current(token) {
            return AcquireOutcome::Superseded;
        }

        let coordinates = match position {
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "Position timed out");
                let _ = self.machine.fail(PositionErrorKind::Timeout);
                return AcquireOutcome::Failed(PositionErrorKind::Timeout);
            }
            Ok(Err(MedwayError::LocationPermissionDenied)) => {
                tracing::info!("Position permission denied");
                let _ = self.machine.fail(PositionErrorKind::PermissionDenied);
                return AcquireOutcome::Failed(PositionErrorKind::PermissionDenied);
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Position unavailable");
                let _ = self.machine.fail(PositionErrorKind::Unavailable);
                return AcquireOutcome::Failed(PositionErrorKind::Unavailable);
            }
            Ok(Ok(coordinates)) => coordinates,
        };

        if self.machine.coordinates_obtained(coordinates).is_err() {
            // Machine was reset between the guard check and the commit.
            return AcquireOutcome::Superseded;
        }

        let place_name = match self.geocoder.reverse_geocode(coordinates).await {
            Ok(name) => Some(name),
            Err(e) => {
                // Coordinates alone are enough for search; degrade quietly.
                tracing::warn!(error = %e, "Reverse geocode failed");
                None
            }
        };

        if !self.guard.is_current(token) {
            return AcquireOutcome::Superseded;
        }
        if self.machine.resolved(place_name).is_err() {
            return AcquireOutcome::Superseded;
        }

        AcquireOutcome::Resolved(self.machine.snapshot())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use medway_core::types::Coordinates;
    use medway_providers::stub::{FixedGeocoder, PositionFailure, StubPositioning};

    fn coords() -> Coordinates {
        Coordinates {
            lat: -12.046,
            lng: -77.043,
        }
    }

    fn acquirer(
        positioning: StubPositioning,
        geocoder: FixedGeocoder,
    ) -> (LocationAcquirer, Arc<LocationMachine>, Arc<SessionGuard>) {
        let machine = Arc::new(LocationMachine::new());
        let guard = Arc::new(SessionGuard::new());
        let acquirer = LocationAcquirer::new(
            Arc::clone(&machine),
            Arc::new(positioning),
            Arc::new(geocoder),
            Arc::clone(&guard),
            Duration::from_millis(200),
        );
        (acquirer, machine, guard)
    }

    // ---- Happy path ----

    #[tokio::test]
    async fn test_acquire_resolves_name_and_coordinates() {
        let (acquirer, machine, _) = acquirer(
            StubPositioning::fixed(coords()),
            FixedGeocoder::new("San Isidro, Lima"),
        );

        match acquirer.acquire().await {
            AcquireOutcome::Resolved(snap) => {
                assert_eq!(snap.status, LocationStatus::Success);
                assert_eq!(snap.coordinates, Some(coords()));
                assert_eq!(snap.place_name.as_deref(), Some("San Isidro, Lima"));
            }
            other => panic!("Unexpected outcome: {:?}", other),
        }
        assert_eq!(machine.snapshot().status, LocationStatus::Success);
    }

    // ---- Unsupported platform ----

    #[tokio::test]
    async fn test_unsupported_platform_is_terminal_without_state_change() {
        let (acquirer, machine, _) = acquirer(
            StubPositioning::unsupported(),
            FixedGeocoder::new("anywhere"),
        );

        assert!(matches!(
            acquirer.acquire().await,
            AcquireOutcome::Unsupported
        ));
        assert_eq!(machine.snapshot().status, LocationStatus::Idle);
    }

    // ---- Failure causes ----

    #[tokio::test]
    async fn test_permission_denied_failure() {
        let (acquirer, machine, _) = acquirer(
            StubPositioning::failing(PositionFailure::PermissionDenied),
            FixedGeocoder::new("anywhere"),
        );

        assert!(matches!(
            acquirer.acquire().await,
            AcquireOutcome::Failed(PositionErrorKind::PermissionDenied)
        ));
        let snap = machine.snapshot();
        assert_eq!(snap.status, LocationStatus::Error);
        assert_eq!(snap.error, Some(PositionErrorKind::PermissionDenied));
    }

    #[tokio::test]
    async fn test_generic_failure() {
        let (acquirer, machine, _) = acquirer(
            StubPositioning::failing(PositionFailure::Unavailable),
            FixedGeocoder::new("anywhere"),
        );

        assert!(matches!(
            acquirer.acquire().await,
            AcquireOutcome::Failed(PositionErrorKind::Unavailable)
        ));
        assert_eq!(machine.snapshot().status, LocationStatus::Error);
    }

    #[tokio::test]
    async fn test_position_timeout() {
        let (acquirer, machine, _) = acquirer(
            StubPositioning::failing(PositionFailure::Hang),
            FixedGeocoder::new("anywhere"),
        );

        assert!(matches!(
            acquirer.acquire().await,
            AcquireOutcome::Failed(PositionErrorKind::Timeout)
        ));
        assert_eq!(machine.snapshot().error, Some(PositionErrorKind::Timeout));
    }

    // ---- Geocode degradation ----

    #[tokio::test]
    async fn test_geocode_failure_degrades_to_unnamed_success() {
        let (acquirer, machine, _) = acquirer(
            StubPositioning::fixed(coords()),
            FixedGeocoder::failing("quota exceeded"),
        );

        match acquirer.acquire().await {
            AcquireOutcome::Resolved(snap) => {
                assert_eq!(snap.status, LocationStatus::Success);
                assert!(snap.place_name.is_none());
                assert!(snap.is_usable());
            }
            other => panic!("Unexpected outcome: {:?}", other),
        }
        assert_eq!(machine.snapshot().status, LocationStatus::Success);
    }

    // ---- Retry after failure ----

    #[tokio::test]
    async fn test_retry_after_error_resets_machine() {
        let machine = Arc::new(LocationMachine::new());
        let guard = Arc::new(SessionGuard::new());

        let failing = LocationAcquirer::new(
            Arc::clone(&machine),
            Arc::new(StubPositioning::failing(PositionFailure::Unavailable)),
            Arc::new(FixedGeocoder::new("x")),
            Arc::clone(&guard),
            Duration::from_millis(200),
        );
        failing.acquire().await;
        assert_eq!(machine.snapshot().status, LocationStatus::Error);

        let working = LocationAcquirer::new(
            Arc::clone(&machine),
            Arc::new(StubPositioning::fixed(coords())),
            Arc::new(FixedGeocoder::new("Lince, Lima")),
            Arc::clone(&guard),
            Duration::from_millis(200),
        );
        assert!(matches!(
            working.acquire().await,
            AcquireOutcome::Resolved(_)
        ));
        assert_eq!(
            machine.snapshot().place_name.as_deref(),
            Some("Lince, Lima")
        );
    }

    // ---- Stale suppression ----

    #[tokio::test]
    async fn test_reset_during_position_suppresses_commit() {
        let positioning = StubPositioning::fixed(coords());
        positioning.set_delay(Duration::from_millis(50));
        let (acquirer, machine, guard) = acquirer(positioning, FixedGeocoder::new("x"));

        let acquirer = Arc::new(acquirer);
        let task = {
            let acquirer = Arc::clone(&acquirer);
            tokio::spawn(async move { acquirer.acquire().await })
        };

        // Let the request start, then invalidate the session
        tokio::time::sleep(Duration::from_millis(10)).await;
        guard.new_session();
        machine.reset();

        assert!(matches!(task.await.unwrap(), AcquireOutcome::Superseded));
        let snap = machine.snapshot();
        assert_eq!(snap.status, LocationStatus::Idle);
        assert!(snap.coordinates.is_none());
    }

    #[tokio::test]
    async fn test_reset_during_geocode_suppresses_commit() {
        let geocoder = FixedGeocoder::new("San Borja, Lima");
        geocoder.set_delay(Duration::from_millis(50));
        let (acquirer, machine, guard) = acquirer(StubPositioning::fixed(coords()), geocoder);

        let acquirer = Arc::new(acquirer);
        let task = {
            let acquirer = Arc::clone(&acquirer);
            tokio::spawn(async move { acquirer.acquire().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        guard.new_session();

        assert!(matches!(task.await.unwrap(), AcquireOutcome::Superseded));
        // Coordinates were committed before the reset; the name never was
        assert!(machine.snapshot().place_name.is_none());
    }
}
