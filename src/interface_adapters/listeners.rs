use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use tracing::trace;

use crate::domain::entities::Identity;
use crate::domain::ports::{IdentityListener, Unsubscribe};

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: Vec<(u64, IdentityListener)>,
}

#[derive(Default)]
struct RegistryInner {
    table: Mutex<ListenerTable>,
    // Serializes state changes with their delivery so every listener sees
    // events in the order the provider state changed. Re-entrant because a
    // listener may call back into the provider.
    delivery: ReentrantMutex<()>,
}

/// Session-changed listener bookkeeping shared by the provider adapters.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener and immediately hands it the current identity, the way
    /// hosted providers report the restored session on registration.
    pub fn register<F>(&self, listener: IdentityListener, current: F) -> Unsubscribe
    where
        F: FnOnce() -> Option<Identity>,
    {
        let _delivery = self.inner.delivery.lock();
        let id = {
            let mut table = self.inner.table.lock();
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, listener.clone()));
            id
        };
        trace!(listener_id = id, "provider listener registered");
        listener(current());

        let inner = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.table.lock().entries.retain(|(entry_id, _)| *entry_id != id);
                trace!(listener_id = id, "provider listener removed");
            }
        })
    }

    /// Applies a state change and delivers its result to every listener.
    pub fn publish<F>(&self, update: F)
    where
        F: FnOnce() -> Option<Identity>,
    {
        let _delivery = self.inner.delivery.lock();
        let identity = update();
        let listeners: Vec<IdentityListener> = self
            .inner
            .table
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(identity.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.inner.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
