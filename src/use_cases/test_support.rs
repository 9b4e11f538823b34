use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::domain::entities::{Identity, OAuthProviderKind, Session};
use crate::domain::errors::ProviderError;
use crate::domain::ports::{Clock, IdentityListener, IdentityProvider, Navigator, Unsubscribe};

pub(crate) fn identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        display_name: None,
        email_verified: true,
    }
}

// Shared fixed time source for deterministic use-case tests.
pub(crate) struct FixedClock(pub(crate) u64);

impl Clock for FixedClock {
    fn now_epoch_millis(&self) -> u64 {
        self.0
    }
}

// Records every session a store listener receives.
#[derive(Clone, Default)]
pub(crate) struct SessionLog {
    sessions: Arc<Mutex<Vec<Session>>>,
}

impl SessionLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn listener(&self) -> impl Fn(&Session) + Send + Sync + 'static {
        let sessions = self.sessions.clone();
        move |session: &Session| sessions.lock().push(session.clone())
    }

    pub(crate) fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub(crate) fn routes(&self) -> Vec<String> {
        self.routes.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().push(route.to_string());
    }
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: Vec<(u64, IdentityListener)>,
}

// Scriptable identity provider double.
//
// Successful sign-in style calls emit a session-changed event to every
// registered listener, like a hosted provider does. Calls can be held open
// until `release()` to exercise in-flight behavior.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    listeners: Arc<Mutex<ListenerTable>>,
    calls: Mutex<Vec<&'static str>>,
    // Queued failures; a `None` name matches whichever call comes next.
    failures: Mutex<Vec<(Option<&'static str>, ProviderError)>>,
    fail_subscribe: bool,
    hold_calls: bool,
    gate: Notify,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_subscribe() -> Self {
        Self {
            fail_subscribe: true,
            ..Self::default()
        }
    }

    // Every provider call waits for `release()` before resolving.
    pub(crate) fn held() -> Self {
        Self {
            hold_calls: true,
            ..Self::default()
        }
    }

    pub(crate) fn release(&self) {
        self.gate.notify_one();
    }

    pub(crate) fn fail_next(&self, code: &str) {
        self.failures
            .lock()
            .push((None, ProviderError::new(code, "scripted failure")));
    }

    pub(crate) fn fail_call(&self, name: &'static str, code: &str) {
        self.failures
            .lock()
            .push((Some(name), ProviderError::new(code, "scripted failure")));
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|call| **call == name).count()
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.lock().entries.len()
    }

    // Delivers an event to every registered listener.
    pub(crate) fn emit(&self, identity: Option<Identity>) {
        let listeners: Vec<IdentityListener> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(identity.clone());
        }
    }

    pub(crate) fn listener_at(&self, index: usize) -> Option<IdentityListener> {
        self.listeners
            .lock()
            .entries
            .get(index)
            .map(|(_, listener)| listener.clone())
    }

    // Delivers an event to the listener registered in position `index`.
    pub(crate) fn emit_to(&self, index: usize, identity: Option<Identity>) {
        if let Some(listener) = self.listener_at(index) {
            listener(identity);
        }
    }

    async fn begin(&self, name: &'static str) -> Result<(), ProviderError> {
        self.calls.lock().push(name);
        if self.hold_calls {
            self.gate.notified().await;
        }
        let mut failures = self.failures.lock();
        let matching = failures
            .iter()
            .position(|(target, _)| target.is_none_or(|target| target == name));
        match matching {
            Some(index) => Err(failures.remove(index).1),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn subscribe(&self, listener: IdentityListener) -> Result<Unsubscribe, ProviderError> {
        if self.fail_subscribe {
            return Err(ProviderError::new("auth/internal-error", "provider offline"));
        }
        let mut table = self.listeners.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.push((id, listener));

        let listeners = self.listeners.clone();
        Ok(Box::new(move || {
            listeners.lock().entries.retain(|(entry_id, _)| *entry_id != id);
        }))
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<Identity, ProviderError> {
        self.begin("sign_in").await?;
        let signed_in = Identity {
            email: email.to_string(),
            ..identity("uid-login")
        };
        self.emit(Some(signed_in.clone()));
        Ok(signed_in)
    }

    async fn sign_in_with_oauth(&self, kind: OAuthProviderKind) -> Result<Identity, ProviderError> {
        self.begin("sign_in_with_oauth").await?;
        let signed_in = identity(&format!("uid-{}", kind.provider_id()));
        self.emit(Some(signed_in.clone()));
        Ok(signed_in)
    }

    async fn register(&self, email: &str, _password: &str) -> Result<Identity, ProviderError> {
        self.begin("register").await?;
        let created = Identity {
            email: email.to_string(),
            email_verified: false,
            ..identity("uid-new")
        };
        self.emit(Some(created.clone()));
        Ok(created)
    }

    async fn update_profile(&self, display_name: &str) -> Result<Identity, ProviderError> {
        self.begin("update_profile").await?;
        Ok(Identity {
            display_name: Some(display_name.to_string()),
            email_verified: false,
            ..identity("uid-new")
        })
    }

    async fn send_password_reset(&self, _email: &str) -> Result<(), ProviderError> {
        self.begin("send_password_reset").await
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.begin("sign_out").await?;
        self.emit(None);
        Ok(())
    }
}
