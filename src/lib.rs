pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use domain::{DomainError, Identity, IdentityProvider, NavigationAction, Session};
pub use frameworks::console::run;
pub use use_cases::{evaluate, CredentialFlow, RoutePolicy, SessionStore, SessionSynchronizer};
