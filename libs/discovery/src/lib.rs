//! UDP multicast discovery: request/response datagrams, heartbeats, and
//! pruning of stale node sightings.

pub mod error;
pub mod messages;
pub mod service;

pub use error::DiscoveryError;
pub use messages::{
    networks_for_request, DiscoveryMessage, DISCOVERY_MULTICAST_GROUP, DISCOVERY_PORT,
    DISCOVERY_RETRY_COUNT, DISCOVERY_TIMEOUT_SECS, PROTOCOL_VERSION,
};
pub use service::{spawn_listener, DiscoveryService};
