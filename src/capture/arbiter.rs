use crate::error::CaptureError;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Process-wide "active capture owner" token.
///
/// The hardware capture handle is exclusively owned by at most one session at
/// a time. Whichever session acquires the arbiter first holds it until its
/// lease is released (stop, error, teardown); acquisition while held fails
/// fast with `CaptureError::AlreadyActive`. The full-encounter recorder and
/// all per-field dictation recorders share one domain.
#[derive(Clone)]
pub struct CaptureArbiter {
    owner: Arc<Mutex<Option<Uuid>>>,
}

impl CaptureArbiter {
    /// Create an isolated arbiter domain (one per test, typically).
    pub fn new() -> Self {
        Self {
            owner: Arc::new(Mutex::new(None)),
        }
    }

    /// The shared process-wide domain used by the application.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<CaptureArbiter> = OnceLock::new();
        GLOBAL.get_or_init(CaptureArbiter::new).clone()
    }

    /// Try to acquire exclusive capture ownership for `session`.
    pub fn try_acquire(&self, session: Uuid) -> Result<CaptureLease, CaptureError> {
        let mut owner = lock_owner(&self.owner);
        if let Some(holder) = *owner {
            warn!(%session, %holder, "capture device already held");
            return Err(CaptureError::AlreadyActive);
        }
        *owner = Some(session);
        debug!(%session, "capture lease acquired");
        Ok(CaptureLease {
            owner: Arc::clone(&self.owner),
            session,
            released: false,
        })
    }

    /// Session currently holding the device, if any
    pub fn holder(&self) -> Option<Uuid> {
        *lock_owner(&self.owner)
    }

    pub fn is_free(&self) -> bool {
        self.holder().is_none()
    }
}

impl Default for CaptureArbiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive hold on the capture device. Released explicitly or on drop;
/// releasing an already-released lease is a no-op.
pub struct CaptureLease {
    owner: Arc<Mutex<Option<Uuid>>>,
    session: Uuid,
    released: bool,
}

impl CaptureLease {
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut owner = lock_owner(&self.owner);
        if *owner == Some(self.session) {
            *owner = None;
            debug!(session = %self.session, "capture lease released");
        }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }
}

impl Drop for CaptureLease {
    fn drop(&mut self) {
        self.release();
    }
}

// A poisoned lock only means a holder panicked mid-update; the owner value
// itself stays coherent, so recover the guard.
fn lock_owner(owner: &Mutex<Option<Uuid>>) -> std::sync::MutexGuard<'_, Option<Uuid>> {
    match owner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
