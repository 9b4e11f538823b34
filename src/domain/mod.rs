pub mod entities;
pub mod errors;
pub mod ports;

// Re-export the domain boundary types and ports.
pub use entities::{
    CredentialFlowRequest, FlowKind, Identity, NavigationAction, OAuthProviderKind, Profile,
    Session,
};
pub use errors::{DomainError, ProviderError};
pub use ports::{Clock, IdentityListener, IdentityProvider, Navigator, Unsubscribe};
