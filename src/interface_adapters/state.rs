use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::domain::ports::{Clock, IdentityProvider};
use crate::use_cases::credential_flow::CredentialFlow;
use crate::use_cases::session_store::SessionStore;
use crate::use_cases::synchronizer::{SessionSynchronizer, SyncHandle};

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default()
    }
}

pub type SurfaceFlow = CredentialFlow<dyn IdentityProvider, SystemClock>;

/// Everything a mounted surface shares: one store and one provider.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub provider: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store: SessionStore::new(),
            provider,
        }
    }

    /// Mounts a surface: starts its own synchronizer and credential flow.
    pub fn mount(&self, surface: &str) -> MountedSurface {
        let sync =
            SessionSynchronizer::new(self.provider.clone(), self.store.clone(), surface).start();
        let flow = Arc::new(CredentialFlow::new(
            self.provider.clone(),
            SystemClock,
            surface,
        ));
        info!(surface, "surface mounted");

        MountedSurface {
            name: surface.to_string(),
            flow,
            sync: Some(sync),
        }
    }
}

/// A mounted UI surface. Unmounting stops its synchronizer and discards any
/// in-flight credential result.
pub struct MountedSurface {
    pub name: String,
    pub flow: Arc<SurfaceFlow>,
    sync: Option<SyncHandle>,
}

impl MountedSurface {
    pub fn is_synchronizing(&self) -> bool {
        self.sync.as_ref().is_some_and(SyncHandle::is_active)
    }

    pub fn unmount(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(sync) = self.sync.take() {
            sync.stop();
            self.flow.unmount();
            info!(surface = %self.name, "surface unmounted");
        }
    }
}

impl Drop for MountedSurface {
    fn drop(&mut self) {
        self.release();
    }
}
