// Interface adapters: identity provider clients, route guard and surface wiring.

pub mod clients;
pub mod listeners;
pub mod memory;
pub mod router;
pub mod state;

pub use clients::{RestClientError, RestIdentityProvider};
pub use memory::InMemoryIdentityProvider;
pub use router::{RouteGuard, TracingNavigator};
pub use state::{AppState, MountedSurface, SystemClock};
