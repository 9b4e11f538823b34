use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::entities::{Identity, OAuthProviderKind};
use crate::domain::errors::ProviderError;

// Callback invoked by the provider whenever its signed-in identity changes.
pub type IdentityListener = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

// Releases a provider listener registration when called.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

// The flows and synchronizers depend on this trait, not on a concrete provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    // Registers a session-changed listener. Implementations invoke each listener
    // in the order events occur and never after its Unsubscribe has run.
    fn subscribe(&self, listener: IdentityListener) -> Result<Unsubscribe, ProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    async fn sign_in_with_oauth(&self, kind: OAuthProviderKind) -> Result<Identity, ProviderError>;

    async fn register(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    async fn update_profile(&self, display_name: &str) -> Result<Identity, ProviderError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> u64;
}

// Port for issuing route changes in the host UI.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}
