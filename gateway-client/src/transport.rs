//! Transport seam between the registry and the RPC stubs
//!
//! The registry pools connections and hands the pipeline typed handles.
//! Those handles are trait objects so the pipeline can be exercised
//! against in-memory transports; the production implementations here wrap
//! the `gateway-wire` tonic clients over one shared channel per endpoint.

use crate::endpoint::Endpoint;
use crate::{Error, Result};
use async_trait::async_trait;
use gateway_wire::common::Envelope;
use gateway_wire::orderer::atomic_broadcast_client::AtomicBroadcastClient;
use gateway_wire::orderer::BroadcastResponse;
use gateway_wire::peer::deliver_client::DeliverClient;
use gateway_wire::peer::discovery_client::DiscoveryClient;
use gateway_wire::peer::endorser_client::EndorserClient;
use gateway_wire::peer::{
    DeliverResponse, DiscoveryQueryResult, ProposalResponse, SignedDiscoveryRequest,
    SignedProposal,
};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint as TransportEndpoint};
use tonic::Status;

/// Stream of delivery responses for one commit-status query.
pub type DeliverStream =
    Pin<Box<dyn Stream<Item = std::result::Result<DeliverResponse, Status>> + Send>>;

/// Endorsement calls against a validator endpoint.
#[async_trait]
pub trait Endorser: Send + Sync {
    /// Execute and endorse a signed proposal
    async fn process_proposal(
        &self,
        proposal: SignedProposal,
    ) -> std::result::Result<ProposalResponse, Status>;
}

/// Ledger-delivery calls against a validator endpoint.
#[async_trait]
pub trait Deliverer: Send + Sync {
    /// Send a signed request envelope and return the response stream
    async fn deliver_filtered(
        &self,
        request: Envelope,
    ) -> std::result::Result<DeliverStream, Status>;
}

/// Topology discovery calls against a validator endpoint.
#[async_trait]
pub trait Discoverer: Send + Sync {
    /// Run a signed discovery query
    async fn discover(
        &self,
        request: SignedDiscoveryRequest,
    ) -> std::result::Result<DiscoveryQueryResult, Status>;
}

/// The long-lived broadcast stream of an ordering endpoint.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Send one envelope and await its acknowledgement
    async fn broadcast(
        &self,
        envelope: Envelope,
    ) -> std::result::Result<BroadcastResponse, Status>;
}

/// The typed handles of one pooled validator connection.
#[derive(Clone)]
pub struct PeerHandles {
    /// Endorsement stub
    pub endorser: Arc<dyn Endorser>,
    /// Delivery stub
    pub deliverer: Arc<dyn Deliverer>,
    /// Discovery stub
    pub discoverer: Arc<dyn Discoverer>,
}

/// The typed handles of one pooled ordering connection.
#[derive(Clone)]
pub struct OrdererHandles {
    /// The live broadcast stream
    pub broadcaster: Arc<dyn Broadcaster>,
}

/// Establishes authenticated connections. The registry talks to this seam
/// so tests can pool in-memory transports.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Dial a validator endpoint and build its three stubs
    async fn dial_peer(
        &self,
        endpoint: &Endpoint,
        trust_root: &[u8],
        as_localhost: bool,
    ) -> Result<PeerHandles>;

    /// Dial an ordering endpoint and open its broadcast stream. Stream
    /// failure fails the whole dial: an orderer without a live broadcast
    /// stream is useless.
    async fn dial_orderer(
        &self,
        endpoint: &Endpoint,
        trust_root: &[u8],
        as_localhost: bool,
    ) -> Result<OrdererHandles>;
}

/// Production dialer: TLS channel per endpoint, trust anchor from the
/// organization's registered PEM bytes.
#[derive(Debug, Default)]
pub struct TonicDialer;

#[async_trait]
impl Dialer for TonicDialer {
    async fn dial_peer(
        &self,
        endpoint: &Endpoint,
        trust_root: &[u8],
        as_localhost: bool,
    ) -> Result<PeerHandles> {
        let channel = connect(endpoint, trust_root, as_localhost).await?;
        Ok(PeerHandles {
            endorser: Arc::new(GrpcEndorser::new(EndorserClient::new(channel.clone()))),
            deliverer: Arc::new(GrpcDeliverer::new(DeliverClient::new(channel.clone()))),
            discoverer: Arc::new(GrpcDiscoverer::new(DiscoveryClient::new(channel))),
        })
    }

    async fn dial_orderer(
        &self,
        endpoint: &Endpoint,
        trust_root: &[u8],
        as_localhost: bool,
    ) -> Result<OrdererHandles> {
        let channel = connect(endpoint, trust_root, as_localhost).await?;
        let client = AtomicBroadcastClient::new(channel);
        let broadcaster =
            GrpcBroadcaster::open(client)
                .await
                .map_err(|status| Error::Connection {
                    endpoint: endpoint.url(),
                    reason: format!("broadcast stream: {}", status),
                })?;
        Ok(OrdererHandles {
            broadcaster: Arc::new(broadcaster),
        })
    }
}

/// Dial one endpoint with the organization's trust anchor. Server-name
/// verification uses the registered host even when the dial address was
/// rewritten to loopback.
async fn connect(endpoint: &Endpoint, trust_root: &[u8], as_localhost: bool) -> Result<Channel> {
    let connection_error = |reason: String| Error::Connection {
        endpoint: endpoint.url(),
        reason,
    };

    let tls = ClientTlsConfig::new()
        .ca_certificate(Certificate::from_pem(trust_root))
        .domain_name(endpoint.tls_server_name());

    let address = format!("https://{}", endpoint.dial_address(as_localhost));
    tracing::debug!(endpoint = %endpoint, address = %address, "dialing");

    TransportEndpoint::from_shared(address)
        .map_err(|e| connection_error(e.to_string()))?
        .tls_config(tls)
        .map_err(|e| connection_error(e.to_string()))?
        .connect()
        .await
        .map_err(|e| connection_error(e.to_string()))
}

/// Endorser stub over a pooled channel.
pub struct GrpcEndorser {
    client: EndorserClient<Channel>,
}

impl GrpcEndorser {
    pub(crate) fn new(client: EndorserClient<Channel>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Endorser for GrpcEndorser {
    async fn process_proposal(
        &self,
        proposal: SignedProposal,
    ) -> std::result::Result<ProposalResponse, Status> {
        let mut client = self.client.clone();
        let response = client.process_proposal(proposal).await?;
        Ok(response.into_inner())
    }
}

/// Deliverer stub over a pooled channel.
pub struct GrpcDeliverer {
    client: DeliverClient<Channel>,
}

impl GrpcDeliverer {
    pub(crate) fn new(client: DeliverClient<Channel>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Deliverer for GrpcDeliverer {
    async fn deliver_filtered(
        &self,
        request: Envelope,
    ) -> std::result::Result<DeliverStream, Status> {
        let mut client = self.client.clone();
        let outbound = tokio_stream::once(request);
        let stream = client.deliver_filtered(outbound).await?.into_inner();
        Ok(Box::pin(stream))
    }
}

/// Discoverer stub over a pooled channel.
pub struct GrpcDiscoverer {
    client: DiscoveryClient<Channel>,
}

impl GrpcDiscoverer {
    pub(crate) fn new(client: DiscoveryClient<Channel>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Discoverer for GrpcDiscoverer {
    async fn discover(
        &self,
        request: SignedDiscoveryRequest,
    ) -> std::result::Result<DiscoveryQueryResult, Status> {
        let mut client = self.client.clone();
        let response = client.discover(request).await?;
        Ok(response.into_inner())
    }
}

/// The persistent duplex broadcast stream of one ordering endpoint.
/// Opened during registration; acknowledgements are paired with their
/// envelopes by serializing exchanges behind one lock.
pub struct GrpcBroadcaster {
    sender: mpsc::Sender<Envelope>,
    responses: Mutex<tonic::codec::Streaming<BroadcastResponse>>,
}

impl GrpcBroadcaster {
    /// Open the broadcast stream on an established channel
    pub(crate) async fn open(
        mut client: AtomicBroadcastClient<Channel>,
    ) -> std::result::Result<Self, Status> {
        let (sender, receiver) = mpsc::channel(16);
        let responses = client
            .broadcast(ReceiverStream::new(receiver))
            .await?
            .into_inner();
        Ok(Self {
            sender,
            responses: Mutex::new(responses),
        })
    }
}

#[async_trait]
impl Broadcaster for GrpcBroadcaster {
    async fn broadcast(
        &self,
        envelope: Envelope,
    ) -> std::result::Result<BroadcastResponse, Status> {
        // lock before sending so each ack matches the envelope sent
        let mut responses = self.responses.lock().await;
        self.sender
            .send(envelope)
            .await
            .map_err(|_| Status::unavailable("broadcast stream closed"))?;
        match responses.message().await? {
            Some(ack) => Ok(ack),
            None => Err(Status::aborted(
                "broadcast stream ended before acknowledgement",
            )),
        }
    }
}
