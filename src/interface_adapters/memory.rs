// Local identity provider with an in-process account table.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::entities::{Identity, OAuthProviderKind};
use crate::domain::errors::{codes, ProviderError};
use crate::domain::ports::{IdentityListener, IdentityProvider, Unsubscribe};
use crate::interface_adapters::listeners::ListenerRegistry;

// Wrong passwords tolerated per account before sign-in is throttled. An
// accepted reset request lifts the lock.
const MAX_FAILED_SIGN_INS: u32 = 5;
// Reset emails accepted per address between successful sign-ins.
const MAX_RESET_REQUESTS: u32 = 5;
const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    identity: Identity,
    password: String,
    failed_sign_ins: u32,
    reset_requests: u32,
}

#[derive(Default)]
struct Directory {
    accounts: HashMap<String, Account>,
    oauth: HashMap<&'static str, Identity>,
    current: Option<Identity>,
}

/// In-memory identity provider. Mirrors the observable behavior of a hosted
/// provider: listeners get the current identity on registration and after every
/// sign-in, registration, profile update and sign-out.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    directory: Mutex<Directory>,
    listeners: ListenerRegistry,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account that can sign in with email and password.
    pub fn with_account(self, email: &str, password: &str, display_name: Option<&str>) -> Self {
        let key = normalize(email);
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: key.clone(),
            display_name: display_name.map(str::to_string),
            email_verified: true,
        };
        self.directory.lock().accounts.insert(
            key,
            Account {
                identity,
                password: password.to_string(),
                failed_sign_ins: 0,
                reset_requests: 0,
            },
        );
        self
    }

    /// Makes the third-party popup for `kind` complete with `identity`.
    /// Kinds without an account behave as if the user closed the popup.
    pub fn with_oauth_account(self, kind: OAuthProviderKind, identity: Identity) -> Self {
        self.directory.lock().oauth.insert(kind.provider_id(), identity);
        self
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.directory.lock().current.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn sign_in_as(&self, identity: Identity) {
        self.listeners.publish(|| {
            self.directory.lock().current = Some(identity.clone());
            Some(identity)
        });
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn subscribe(&self, listener: IdentityListener) -> Result<Unsubscribe, ProviderError> {
        Ok(self
            .listeners
            .register(listener, || self.directory.lock().current.clone()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let identity = {
            let mut directory = self.directory.lock();
            let account = directory
                .accounts
                .get_mut(&normalize(email))
                .ok_or_else(|| ProviderError::new(codes::USER_NOT_FOUND, "no user record"))?;
            if account.failed_sign_ins >= MAX_FAILED_SIGN_INS {
                return Err(ProviderError::new(
                    codes::TOO_MANY_REQUESTS,
                    "account temporarily locked",
                ));
            }
            if account.password != password {
                account.failed_sign_ins += 1;
                return Err(ProviderError::new(codes::WRONG_PASSWORD, "password mismatch"));
            }
            account.failed_sign_ins = 0;
            account.reset_requests = 0;
            account.identity.clone()
        };

        self.sign_in_as(identity.clone());
        Ok(identity)
    }

    async fn sign_in_with_oauth(&self, kind: OAuthProviderKind) -> Result<Identity, ProviderError> {
        let linked = self.directory.lock().oauth.get(kind.provider_id()).cloned();
        let identity = linked.ok_or_else(|| {
            ProviderError::new(codes::POPUP_CLOSED_BY_USER, "popup closed before completion")
        })?;

        self.sign_in_as(identity.clone());
        Ok(identity)
    }

    async fn register(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let key = normalize(email);
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ProviderError::new(
                codes::WEAK_PASSWORD,
                "password should be at least 6 characters",
            ));
        }
        let identity = {
            let mut directory = self.directory.lock();
            if directory.accounts.contains_key(&key) {
                return Err(ProviderError::new(codes::EMAIL_ALREADY_IN_USE, "email exists"));
            }
            let identity = Identity {
                id: Uuid::new_v4().to_string(),
                email: key.clone(),
                display_name: None,
                email_verified: false,
            };
            directory.accounts.insert(
                key,
                Account {
                    identity: identity.clone(),
                    password: password.to_string(),
                    failed_sign_ins: 0,
                    reset_requests: 0,
                },
            );
            identity
        };

        self.sign_in_as(identity.clone());
        Ok(identity)
    }

    async fn update_profile(&self, display_name: &str) -> Result<Identity, ProviderError> {
        let updated = {
            let mut directory = self.directory.lock();
            let current = directory
                .current
                .clone()
                .ok_or_else(|| ProviderError::new("auth/no-current-user", "nobody signed in"))?;
            let updated = Identity {
                display_name: Some(display_name.to_string()),
                ..current
            };
            if let Some(account) = directory.accounts.get_mut(&updated.email) {
                account.identity = updated.clone();
            }
            updated
        };

        self.sign_in_as(updated.clone());
        Ok(updated)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let mut directory = self.directory.lock();
        let account = directory
            .accounts
            .get_mut(&normalize(email))
            .ok_or_else(|| ProviderError::new(codes::USER_NOT_FOUND, "no user record"))?;
        if account.reset_requests >= MAX_RESET_REQUESTS {
            return Err(ProviderError::new(codes::TOO_MANY_REQUESTS, "reset quota reached"));
        }
        account.reset_requests += 1;
        account.failed_sign_ins = 0;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.listeners.publish(|| {
            self.directory.lock().current = None;
            None
        });
        Ok(())
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
