//! Session generation guard.
//!
//! External calls (classification, analysis, geocoding, search) complete
//! asynchronously and may interleave with new user turns or a full reset.
//! Nothing is ever truly cancelled: instead every handler captures the
//! current token before awaiting and re-checks it before committing any
//! state mutation. A reset bumps the token, which silently invalidates
//! every in-flight operation from the prior generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generation counter value captured at dispatch time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Raw generation number, for logging and events.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Monotonically increasing session generation guard.
///
/// Cloneable handles share the same counter via `Arc` at the call sites;
/// the guard itself is plain atomics and can be shared by reference.
#[derive(Debug)]
pub struct SessionGuard {
    current: AtomicU64,
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGuard {
    /// Create a guard at generation zero.
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
        }
    }

    /// The token of the current generation. Capture this before awaiting.
    pub fn current(&self) -> SessionToken {
        SessionToken(self.current.load(Ordering::SeqCst))
    }

    /// Start a new generation, invalidating every previously captured token.
    pub fn new_session(&self) -> SessionToken {
        let next = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation = next, "Session guard advanced");
        SessionToken(next)
    }

    /// Whether a captured token still belongs to the current generation.
    pub fn is_current(&self, token: SessionToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }
}

// =============================================================================
// Tests
// =============================================================================
