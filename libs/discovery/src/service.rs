//! UDP multicast discovery service (spec C7).

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use socket2::{Domain, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, instrument, warn};

use crate::error::DiscoveryError;
use crate::messages::{DiscoveryMessage, DISCOVERY_MULTICAST_GROUP, DISCOVERY_PORT};

const RECV_BUFFER_BYTES: usize = 8192;

/// Joins the discovery multicast group and tracks which nodes have recently
/// been heard from, independent of whatever the caller does with message
/// contents.
pub struct DiscoveryService {
    node_id: String,
    socket: UdpSocket,
    multicast_addr: SocketAddr,
    seen_nodes: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl DiscoveryService {
    pub async fn bind(node_id: impl Into<String>) -> Result<Self, DiscoveryError> {
        Self::bind_on(node_id, DISCOVERY_PORT, DISCOVERY_MULTICAST_GROUP).await
    }

    pub async fn bind_on(
        node_id: impl Into<String>,
        port: u16,
        multicast_group: &str,
    ) -> Result<Self, DiscoveryError> {
        let group: Ipv4Addr = multicast_group.parse().map_err(|_| {
            DiscoveryError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "invalid multicast group address",
            ))
        })?;

        // Multiple local processes (and, in tests, multiple sockets in one
        // process) bind the same discovery port; SO_REUSEADDR lets each
        // receive its own copy of the multicast traffic.
        let raw = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
        raw.set_reuse_address(true)?;
        raw.set_nonblocking(true)?;
        raw.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())?;
        let socket = UdpSocket::from_std(raw.into())?;

        socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)?;
        socket.set_multicast_ttl_v4(2)?;

        Ok(Self {
            node_id: node_id.into(),
            socket,
            multicast_addr: SocketAddr::new(group.into(), port),
            seen_nodes: RwLock::new(HashMap::new()),
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    #[instrument(skip(self, message))]
    async fn send_to(&self, message: &DiscoveryMessage, addr: SocketAddr) -> Result<(), DiscoveryError> {
        let encoded = serde_json::to_vec(message)?;
        self.socket.send_to(&encoded, addr).await?;
        Ok(())
    }

    pub async fn broadcast(&self, message: &DiscoveryMessage) -> Result<(), DiscoveryError> {
        self.send_to(message, self.multicast_addr).await
    }

    pub async fn reply(&self, message: &DiscoveryMessage, addr: SocketAddr) -> Result<(), DiscoveryError> {
        self.send_to(message, addr).await
    }

    /// Reads one datagram, recording the sender in `seen_nodes`. Returns
    /// `None` for datagrams that do not decode as a `DiscoveryMessage`
    /// (malformed input is dropped, never a fatal error).
    pub async fn recv(&self) -> Result<Option<(DiscoveryMessage, SocketAddr)>, DiscoveryError> {
        let mut buf = vec![0u8; RECV_BUFFER_BYTES];
        let (len, addr) = self.socket.recv_from(&mut buf).await?;

        match serde_json::from_slice::<DiscoveryMessage>(&buf[..len]) {
            Ok(message) => {
                if message.sender_node_id() != self.node_id {
                    self.seen_nodes
                        .write()
                        .insert(message.sender_node_id().to_string(), Utc::now());
                }
                Ok(Some((message, addr)))
            }
            Err(err) => {
                warn!(?err, "dropping malformed discovery datagram");
                Ok(None)
            }
        }
    }

    /// Drops sightings older than `max_age_secs` (spec §4.3 stale-entry
    /// pruning).
    pub fn prune_stale(&self, max_age_secs: i64) {
        let cutoff = Utc::now() - ChronoDuration::seconds(max_age_secs);
        self.seen_nodes.write().retain(|_, last_seen| *last_seen > cutoff);
    }

    pub fn seen_node_count(&self) -> usize {
        self.seen_nodes.read().len()
    }

    pub fn is_recently_seen(&self, node_id: &str, max_age_secs: i64) -> bool {
        let cutoff = Utc::now() - ChronoDuration::seconds(max_age_secs);
        self.seen_nodes
            .read()
            .get(node_id)
            .is_some_and(|last_seen| *last_seen > cutoff)
    }
}

/// Drives the read loop on a background task, handing each decoded message
/// to `on_message`. Mirrors the interval-driven background service shape
/// used elsewhere in this workspace, adapted to a blocking receive instead
/// of a timer tick.
pub fn spawn_listener<F>(service: Arc<DiscoveryService>, on_message: F) -> tokio::task::JoinHandle<()>
where
    F: Fn(DiscoveryMessage, SocketAddr) + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(node_id = %service.node_id, "discovery listener started");
        loop {
            match service.recv().await {
                Ok(Some((message, addr))) => {
                    debug!(?addr, "discovery message received");
                    on_message(message, addr);
                }
                Ok(None) => continue,
                Err(err) => {
                    warn!(?err, "discovery socket read failed");
                    break;
                }
            }
        }
        info!(node_id = %service.node_id, "discovery listener stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_and_response_round_trip_over_loopback_multicast() {
        let sender = DiscoveryService::bind_on("node-a", 18_700, "239.255.10.10").await.unwrap();
        let receiver = DiscoveryService::bind_on("node-b", 18_700, "239.255.10.10").await.unwrap();

        sender
            .broadcast(&DiscoveryMessage::request(
                "node-a",
                tiktrue_license::Tier::Pro,
                vec![],
                vec![],
            ))
            .await
            .unwrap();

        let (message, _addr) = receiver.recv().await.unwrap().unwrap();
        assert_eq!(message.sender_node_id(), "node-a");
        assert_eq!(receiver.seen_node_count(), 1);
    }

    #[tokio::test]
    async fn pruning_removes_entries_older_than_the_cutoff() {
        let receiver = DiscoveryService::bind_on("node-b", 18_701, "239.255.10.11").await.unwrap();
        receiver
            .seen_nodes
            .write()
            .insert("stale-node".to_string(), Utc::now() - ChronoDuration::seconds(120));
        receiver.prune_stale(60);
        assert_eq!(receiver.seen_node_count(), 0);
    }
}
