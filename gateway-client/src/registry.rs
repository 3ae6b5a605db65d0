//! Endpoint registry: trust store, connection pool and channel topology
//!
//! One authenticated connection per distinct `host:port`, created lazily
//! on first registration and cached for the registry's lifetime. All
//! registry state sits behind a single async mutex: registration is rare
//! and a single-writer discipline keeps the pool and the topology
//! consistent under concurrent registration. Pooled handles handed out of
//! lookups are `Arc`-shared and used without the lock.

use crate::config::GatewayConfig;
use crate::endpoint::{validate_pem, Endpoint};
use crate::transport::{
    Broadcaster, Deliverer, Dialer, Discoverer, Endorser, OrdererHandles, PeerHandles,
    TonicDialer,
};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One pooled validator connection.
pub struct PeerConnection {
    /// Endpoint the connection was dialed for
    pub endpoint: Endpoint,
    /// Typed stub handles sharing the connection
    pub handles: PeerHandles,
}

/// One pooled ordering connection with its live broadcast stream.
pub struct OrdererConnection {
    /// Endpoint the connection was dialed for
    pub endpoint: Endpoint,
    /// Typed stub handles sharing the connection
    pub handles: OrdererHandles,
}

/// An organization's trust root and member endpoints.
struct Organization {
    trust_root: Vec<u8>,
    peers: HashSet<String>,
    orderers: HashSet<String>,
}

/// The endpoints currently known to serve a channel. Records the most
/// recently supplied organization id.
struct ChannelTopology {
    org_id: String,
    peers: HashSet<String>,
    orderers: HashSet<String>,
}

#[derive(Default)]
struct RegistryState {
    peers: HashMap<String, Arc<PeerConnection>>,
    orderers: HashMap<String, Arc<OrdererConnection>>,
    organizations: HashMap<String, Organization>,
    channels: HashMap<String, ChannelTopology>,
}

/// An ordering handle paired with its endpoint key, for error context
/// during fan-out.
#[derive(Clone)]
pub struct OrdererRef {
    /// Endpoint key (`host:port`)
    pub url: String,
    /// The live broadcast stream
    pub broadcaster: Arc<dyn Broadcaster>,
}

/// Registry of trust roots, pooled connections and channel topology.
pub struct EndpointRegistry {
    config: GatewayConfig,
    dialer: Arc<dyn Dialer>,
    state: Mutex<RegistryState>,
}

impl EndpointRegistry {
    /// Create a registry dialing real TLS connections
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_dialer(config, Arc::new(TonicDialer))
    }

    /// Create a registry with an injected dialer
    pub fn with_dialer(config: GatewayConfig, dialer: Arc<dyn Dialer>) -> Self {
        Self {
            config,
            dialer,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// The configuration the registry dials with
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Register the TLS trust root for an organization. The material is
    /// held verbatim for the registry's lifetime; re-registration replaces
    /// the trust root but keeps recorded memberships.
    pub async fn register_trust_root(&self, org_id: &str, cert_pem: &[u8]) -> Result<()> {
        if self.config.validate_trust_roots {
            validate_pem(cert_pem).map_err(|reason| Error::InvalidTrustMaterial {
                org: org_id.to_string(),
                reason,
            })?;
        }

        let mut state = self.state.lock().await;
        state
            .organizations
            .entry(org_id.to_string())
            .and_modify(|org| org.trust_root = cert_pem.to_vec())
            .or_insert_with(|| Organization {
                trust_root: cert_pem.to_vec(),
                peers: HashSet::new(),
                orderers: HashSet::new(),
            });

        tracing::debug!(org = org_id, "trust root registered");
        Ok(())
    }

    /// Register a validator endpoint under a channel and organization.
    /// Dials on first reference; later registrations of the same endpoint
    /// only add membership.
    pub async fn register_peer(
        &self,
        channel_id: &str,
        org_id: &str,
        host: &str,
        port: u16,
    ) -> Result<()> {
        let endpoint = Endpoint::new(host, port);
        let url = endpoint.url();

        let mut state = self.state.lock().await;
        let trust_root = state
            .organizations
            .get(org_id)
            .ok_or_else(|| Error::MissingTrustRoot(org_id.to_string()))?
            .trust_root
            .clone();

        if !state.peers.contains_key(&url) {
            let handles = self
                .dialer
                .dial_peer(&endpoint, &trust_root, self.config.as_localhost)
                .await?;
            state.peers.insert(
                url.clone(),
                Arc::new(PeerConnection {
                    endpoint: endpoint.clone(),
                    handles,
                }),
            );
            tracing::info!(endpoint = %endpoint, org = org_id, "validator connection established");
        }

        if let Some(org) = state.organizations.get_mut(org_id) {
            org.peers.insert(url.clone());
        }
        let channel = channel_entry(&mut state.channels, channel_id, org_id);
        channel.peers.insert(url);

        Ok(())
    }

    /// Register an ordering endpoint under a channel and organization.
    /// The broadcast stream is opened as part of connection establishment;
    /// if it cannot be opened the whole registration fails and nothing is
    /// recorded.
    pub async fn register_orderer(
        &self,
        channel_id: &str,
        org_id: &str,
        host: &str,
        port: u16,
    ) -> Result<()> {
        let endpoint = Endpoint::new(host, port);
        let url = endpoint.url();

        let mut state = self.state.lock().await;
        let trust_root = state
            .organizations
            .get(org_id)
            .ok_or_else(|| Error::MissingTrustRoot(org_id.to_string()))?
            .trust_root
            .clone();

        if !state.orderers.contains_key(&url) {
            let handles = self
                .dialer
                .dial_orderer(&endpoint, &trust_root, self.config.as_localhost)
                .await?;
            state.orderers.insert(
                url.clone(),
                Arc::new(OrdererConnection {
                    endpoint: endpoint.clone(),
                    handles,
                }),
            );
            tracing::info!(endpoint = %endpoint, org = org_id, "ordering connection established");
        }

        if let Some(org) = state.organizations.get_mut(org_id) {
            org.orderers.insert(url.clone());
        }
        let channel = channel_entry(&mut state.channels, channel_id, org_id);
        channel.orderers.insert(url);

        Ok(())
    }

    /// Endorsement handles for all validators bound to the channel
    pub async fn endorsers_for(&self, channel_id: &str) -> Vec<Arc<dyn Endorser>> {
        self.endorsers_for_orgs(channel_id, &[]).await
    }

    /// Endorsement handles for the channel's validators, restricted to the
    /// named organizations when the list is non-empty
    pub async fn endorsers_for_orgs(
        &self,
        channel_id: &str,
        orgs: &[String],
    ) -> Vec<Arc<dyn Endorser>> {
        let state = self.state.lock().await;
        let Some(channel) = state.channels.get(channel_id) else {
            return Vec::new();
        };

        let mut member_of_orgs: Option<HashSet<&String>> = None;
        if !orgs.is_empty() {
            let mut members = HashSet::new();
            for org_id in orgs {
                if let Some(org) = state.organizations.get(org_id) {
                    members.extend(org.peers.iter());
                }
            }
            member_of_orgs = Some(members);
        }

        channel
            .peers
            .iter()
            .filter(|url| {
                member_of_orgs
                    .as_ref()
                    .map(|members| members.contains(url))
                    .unwrap_or(true)
            })
            .filter_map(|url| state.peers.get(url))
            .map(|connection| connection.handles.endorser.clone())
            .collect()
    }

    /// Delivery handles for all validators bound to the channel
    pub async fn deliverers_for(&self, channel_id: &str) -> Vec<Arc<dyn Deliverer>> {
        let state = self.state.lock().await;
        state
            .channels
            .get(channel_id)
            .map(|channel| {
                channel
                    .peers
                    .iter()
                    .filter_map(|url| state.peers.get(url))
                    .map(|connection| connection.handles.deliverer.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Discovery handles for all validators bound to the channel
    pub async fn discoverers_for(&self, channel_id: &str) -> Vec<Arc<dyn Discoverer>> {
        let state = self.state.lock().await;
        state
            .channels
            .get(channel_id)
            .map(|channel| {
                channel
                    .peers
                    .iter()
                    .filter_map(|url| state.peers.get(url))
                    .map(|connection| connection.handles.discoverer.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Broadcast handles for all orderers bound to the channel
    pub async fn orderers_for(&self, channel_id: &str) -> Vec<OrdererRef> {
        let state = self.state.lock().await;
        state
            .channels
            .get(channel_id)
            .map(|channel| {
                channel
                    .orderers
                    .iter()
                    .filter_map(|url| state.orderers.get(url))
                    .map(|connection| OrdererRef {
                        url: connection.endpoint.url(),
                        broadcaster: connection.handles.broadcaster.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of pooled connections (validators plus orderers)
    pub async fn connection_count(&self) -> usize {
        let state = self.state.lock().await;
        state.peers.len() + state.orderers.len()
    }

    /// Organization id most recently recorded for the channel
    pub async fn channel_org(&self, channel_id: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .channels
            .get(channel_id)
            .map(|channel| channel.org_id.clone())
    }
}

/// Fetch or create the channel entry, recording the supplied organization
/// id. Last write wins when channels are touched by multiple
/// organizations.
fn channel_entry<'a>(
    channels: &'a mut HashMap<String, ChannelTopology>,
    channel_id: &str,
    org_id: &str,
) -> &'a mut ChannelTopology {
    let channel = channels
        .entry(channel_id.to_string())
        .or_insert_with(|| ChannelTopology {
            org_id: org_id.to_string(),
            peers: HashSet::new(),
            orderers: HashSet::new(),
        });
    channel.org_id = org_id.to_string();
    channel
}
