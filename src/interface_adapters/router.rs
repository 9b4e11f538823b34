use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::entities::{NavigationAction, Session};
use crate::domain::ports::Navigator;
use crate::use_cases::redirect::{evaluate, RoutePolicy};
use crate::use_cases::session_store::{SessionStore, StoreSubscription};

struct GuardState {
    // None until the first session has been observed.
    previous: Option<Session>,
    route: String,
}

struct GuardInner {
    policy: RoutePolicy,
    navigator: Arc<dyn Navigator>,
    state: Mutex<GuardState>,
}

impl GuardInner {
    fn observe(&self, next: &Session) {
        let action = {
            let mut state = self.state.lock();
            let action = evaluate(state.previous.as_ref(), next, &state.route, &self.policy);
            state.previous = Some(next.clone());
            if let NavigationAction::NavigateTo(route) = &action {
                state.route = route.clone();
            }
            action
        };

        // The navigator may call back into the guard.
        match action {
            NavigationAction::NavigateTo(route) => {
                info!(route = %route, authenticated = next.is_authenticated(), "session redirect");
                self.navigator.navigate(&route);
            }
            NavigationAction::NoOp => {
                debug!(authenticated = next.is_authenticated(), "session change kept route");
            }
        }
    }
}

/// Applies the redirect policy to every store notification.
///
/// The store only notifies on real changes, so the guard navigates at most
/// once per logical session transition no matter how many synchronizers feed
/// the store.
pub struct RouteGuard {
    inner: Arc<GuardInner>,
    _subscription: StoreSubscription,
}

impl RouteGuard {
    /// Subscribes to `store` and evaluates the session already held.
    pub fn mount(
        store: &SessionStore,
        policy: RoutePolicy,
        navigator: Arc<dyn Navigator>,
        initial_route: impl Into<String>,
    ) -> Self {
        let inner = Arc::new(GuardInner {
            policy,
            navigator,
            state: Mutex::new(GuardState {
                previous: None,
                route: initial_route.into(),
            }),
        });

        let listener_inner = inner.clone();
        let subscription = store.subscribe(move |session| listener_inner.observe(session));
        inner.observe(&store.get());

        Self {
            inner,
            _subscription: subscription,
        }
    }

    /// Records a navigation the user made on their own.
    pub fn set_route(&self, route: impl Into<String>) {
        self.inner.state.lock().route = route.into();
    }

    pub fn current_route(&self) -> String {
        self.inner.state.lock().route.clone()
    }
}

/// Navigator for headless runs: logs the target route.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: &str) {
        info!(route, "navigate");
    }
}
