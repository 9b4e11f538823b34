// Page-lifetime holder of the current session with synchronous fan-out.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::domain::entities::Session;

/// Callback invoked with every accepted session value.
pub type SessionListener = Arc<dyn Fn(&Session) + Send + Sync>;

struct StoreState {
    current: Session,
    /// Registered listeners in subscription order.
    listeners: Vec<(u64, SessionListener)>,
    next_listener_id: u64,
    /// Accepted values waiting to be delivered, oldest first.
    pending: VecDeque<Session>,
    /// True while some caller is running the delivery loop.
    delivering: bool,
}

struct Shared {
    state: Mutex<StoreState>,
    latest_tx: watch::Sender<Session>,
}

impl Shared {
    fn is_registered(&self, id: u64) -> bool {
        self.state
            .lock()
            .listeners
            .iter()
            .any(|(listener_id, _)| *listener_id == id)
    }

    fn remove_listener(&self, id: u64) {
        let mut state = self.state.lock();
        state.listeners.retain(|(listener_id, _)| *listener_id != id);
    }
}

// Releases the delivery flag if a listener unwinds mid-round. Values still
// queued stay queued and go out with the next accepted `set`.
struct DeliveryRound<'a> {
    shared: &'a Shared,
    finished: bool,
}

impl Drop for DeliveryRound<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.shared.state.lock().delivering = false;
            warn!("session listener panicked; delivery round abandoned");
        }
    }
}

/// Shared session state for every mounted surface.
///
/// The store is constructed once per application load and passed to each
/// surface explicitly. Writes replace the held value as a whole; writing a value
/// equal to the current one is ignored without notifying anybody, which lets
/// several synchronizers apply the same provider event safely.
#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<Shared>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Creates a store holding `Session::Unauthenticated`.
    pub fn new() -> Self {
        Self::with_session(Session::Unauthenticated)
    }

    /// Creates a store holding the provided session.
    pub fn with_session(initial: Session) -> Self {
        let (latest_tx, _latest_rx) = watch::channel(initial.clone());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState {
                    current: initial,
                    listeners: Vec::new(),
                    next_listener_id: 0,
                    pending: VecDeque::new(),
                    delivering: false,
                }),
                latest_tx,
            }),
        }
    }

    /// Returns the session currently held.
    pub fn get(&self) -> Session {
        self.shared.state.lock().current.clone()
    }

    /// Replaces the held session and notifies subscribers in subscription order.
    ///
    /// Returns `false` when the value equals the current one (no notification).
    /// A `set` issued while another call is delivering, including one made from
    /// inside a listener, is applied at once and delivered after the round in
    /// progress, so subscribers always see values in the order they were applied.
    pub fn set(&self, session: Session) -> bool {
        let mut state = self.shared.state.lock();
        if state.current == session {
            trace!("session unchanged; skipping notification");
            return false;
        }

        debug!(
            authenticated = session.is_authenticated(),
            "session replaced"
        );
        state.current = session.clone();
        state.pending.push_back(session);
        if state.delivering {
            return true;
        }

        state.delivering = true;
        drop(state);

        let mut round = DeliveryRound {
            shared: &self.shared,
            finished: false,
        };
        loop {
            let (next, listeners) = {
                let mut state = self.shared.state.lock();
                let Some(next) = state.pending.pop_front() else {
                    // Cleared under the same lock as the empty check so a
                    // concurrent `set` either sees the flag or gets queued here.
                    state.delivering = false;
                    round.finished = true;
                    break;
                };
                (next, state.listeners.clone())
            };

            self.shared.latest_tx.send_replace(next.clone());
            for (id, listener) in listeners {
                // Skip listeners released by an earlier listener in this round.
                if self.shared.is_registered(id) {
                    listener(&next);
                }
            }
        }
        true
    }

    /// Registers a listener; dropping the returned subscription unregisters it.
    pub fn subscribe<F>(&self, listener: F) -> StoreSubscription
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        let mut state = self.shared.state.lock();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        let listener: SessionListener = Arc::new(listener);
        state.listeners.push((id, listener));
        trace!(listener_id = id, "store listener registered");

        StoreSubscription {
            id,
            shared: Arc::downgrade(&self.shared),
            released: false,
        }
    }

    /// Latest-value feed for async consumers.
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.shared.latest_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().listeners.len()
    }
}

/// Registration handle returned by [`SessionStore::subscribe`].
#[must_use = "dropping the subscription unregisters the listener"]
pub struct StoreSubscription {
    id: u64,
    shared: Weak<Shared>,
    released: bool,
}

impl StoreSubscription {
    /// Unregisters the listener. Same as dropping the handle.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(shared) = self.shared.upgrade() {
            shared.remove_listener(self.id);
            trace!(listener_id = self.id, "store listener released");
        }
    }
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
