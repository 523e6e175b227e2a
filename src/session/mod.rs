pub mod authorize;
pub mod endpoint;
pub mod lifecycle;
pub mod store;
pub mod token;

use endpoint::HttpTokenEndpoint;
use lifecycle::{Session, SystemClock};

/// The session type the binary runs with.
pub type ProviderSession = Session<HttpTokenEndpoint, SystemClock>;
