pub mod credential_flow;
pub mod redirect;
pub mod session_store;
pub mod synchronizer;

#[cfg(test)]
pub(crate) mod test_support;

pub use credential_flow::{CredentialFlow, FlowStatus};
pub use redirect::{evaluate, RoutePolicy};
pub use session_store::{SessionListener, SessionStore, StoreSubscription};
pub use synchronizer::{SessionSynchronizer, SyncHandle};
