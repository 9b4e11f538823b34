// Bridges provider session-changed events into the shared session store.

use parking_lot::ReentrantMutex;
use std::cell::Cell;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::domain::entities::{Identity, Session};
use crate::domain::ports::{IdentityListener, IdentityProvider, Unsubscribe};
use crate::use_cases::session_store::SessionStore;

/// One synchronizer per mounted surface. Every instance registers its own
/// provider listener and writes into the same store; the store drops the
/// duplicate writes.
pub struct SessionSynchronizer<P: ?Sized> {
    pub provider: Arc<P>,
    pub store: SessionStore,
    pub surface: String,
}

impl<P> SessionSynchronizer<P>
where
    P: IdentityProvider + ?Sized,
{
    pub fn new(provider: Arc<P>, store: SessionStore, surface: impl Into<String>) -> Self {
        Self {
            provider,
            store,
            surface: surface.into(),
        }
    }

    /// Registers with the provider. The returned handle is the stop function.
    ///
    /// If registration fails the session degrades to `Unauthenticated` and the
    /// handle is inert.
    pub fn start(&self) -> SyncHandle {
        let surface: Arc<str> = Arc::from(self.surface.as_str());
        // Held across each store write so `stop` cannot return mid-write. Re-entrant
        // because a store listener may stop this instance from inside the write.
        let gate = Arc::new(ReentrantMutex::new(Cell::new(true)));

        let listener_gate = gate.clone();
        let listener_store = self.store.clone();
        let listener_surface = surface.clone();
        let listener: IdentityListener = Arc::new(move |identity: Option<Identity>| {
            let active = listener_gate.lock();
            if !active.get() {
                trace!(surface = %listener_surface, "provider event after stop ignored");
                return;
            }
            let session = Session::from(identity);
            let changed = listener_store.set(session);
            trace!(surface = %listener_surface, changed, "provider event applied");
        });

        match self.provider.subscribe(listener) {
            Ok(unsubscribe) => {
                info!(surface = %surface, "session synchronizer started");
                SyncHandle {
                    gate,
                    unsubscribe: Some(unsubscribe),
                    surface,
                }
            }
            Err(err) => {
                warn!(
                    surface = %surface,
                    code = %err.code,
                    error = %err,
                    "provider subscription failed; session degraded to signed out"
                );
                gate.lock().set(false);
                self.store.set(Session::Unauthenticated);
                SyncHandle {
                    gate,
                    unsubscribe: None,
                    surface,
                }
            }
        }
    }
}

/// Stop function for a started synchronizer. Dropping it also stops.
#[must_use = "dropping the handle stops the synchronizer"]
pub struct SyncHandle {
    gate: Arc<ReentrantMutex<Cell<bool>>>,
    unsubscribe: Option<Unsubscribe>,
    surface: Arc<str>,
}

impl SyncHandle {
    /// Unregisters from the provider. Once this returns no provider callback
    /// reaches the store through this instance.
    pub fn stop(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.gate.lock().get()
    }

    fn release(&mut self) {
        {
            let active = self.gate.lock();
            if active.get() {
                active.set(false);
            }
        }
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
            debug!(surface = %self.surface, "session synchronizer stopped");
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.release();
    }
}
