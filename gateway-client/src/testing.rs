//! In-memory transport doubles
//!
//! Scripted implementations of the transport traits so the registry and
//! the submission pipeline can be exercised without a network. Used by the
//! crate's own tests and usable from integration tests.

use crate::endpoint::Endpoint;
use crate::transport::{
    Broadcaster, Deliverer, DeliverStream, Dialer, Discoverer, Endorser, OrdererHandles,
    PeerHandles,
};
use crate::{Error, Result};
use async_trait::async_trait;
use gateway_wire::common::{Envelope, Status as AckStatus};
use gateway_wire::orderer::BroadcastResponse;
use gateway_wire::peer::{
    deliver_response, CommitStatusRequest, DeliverResponse, DiscoveryQueryResult, Endorsement,
    FilteredBlock, FilteredTransaction, ProposalResponse, Response, SignedDiscoveryRequest,
    SignedProposal, TxValidationCode,
};
use prost::Message;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tonic::{Code, Status};

/// Scripted endorser. Replays one configured reply and records every
/// request it receives.
pub struct MockEndorser {
    /// Number of proposals processed
    pub calls: Arc<AtomicUsize>,
    requests: Mutex<Vec<SignedProposal>>,
    reply: EndorserReply,
    delay: Option<std::time::Duration>,
}

enum EndorserReply {
    Respond(ProposalResponse),
    Fail(Code, String),
}

impl MockEndorser {
    /// Endorser that approves every proposal with the given chaincode
    /// response payload
    pub fn succeeding(result: impl Into<Vec<u8>>) -> Self {
        Self::with_response(ProposalResponse {
            response: Some(Response {
                status: 200,
                message: String::new(),
                payload: result.into(),
            }),
            payload: b"simulation-results".to_vec(),
            endorsement: Some(Endorsement {
                endorser: b"mock-endorser".to_vec(),
                signature: b"mock-endorsement-signature".to_vec(),
            }),
        })
    }

    /// Endorser replaying exactly the given response
    pub fn with_response(response: ProposalResponse) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
            reply: EndorserReply::Respond(response),
            delay: None,
        }
    }

    /// Endorser failing every call with the given RPC status
    pub fn failing(code: Code, message: impl Into<String>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
            reply: EndorserReply::Fail(code, message.into()),
            delay: None,
        }
    }

    /// Sleep this long before replying, for deadline tests
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The most recent request, if any
    pub fn last_request(&self) -> Option<SignedProposal> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl Endorser for MockEndorser {
    async fn process_proposal(
        &self,
        proposal: SignedProposal,
    ) -> std::result::Result<ProposalResponse, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(proposal);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            EndorserReply::Respond(response) => Ok(response.clone()),
            EndorserReply::Fail(code, message) => Err(Status::new(*code, message.clone())),
        }
    }
}

/// Scripted deliverer. Streams a configured sequence of responses and
/// records every request envelope.
pub struct MockDeliverer {
    /// Number of delivery streams opened
    pub calls: Arc<AtomicUsize>,
    requests: Mutex<Vec<Envelope>>,
    script: DeliverScript,
}

enum DeliverScript {
    Responses(Vec<DeliverResponse>),
    Confirm(TxValidationCode, u64),
    Hang,
}

impl MockDeliverer {
    /// Deliverer replaying the given responses then ending the stream
    pub fn with_responses(responses: Vec<DeliverResponse>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
            script: DeliverScript::Responses(responses),
        }
    }

    /// Deliverer reporting a single validation verdict for one transaction
    pub fn with_verdict(tx_id: impl Into<String>, code: TxValidationCode, block: u64) -> Self {
        Self::with_responses(vec![filtered_block_response(tx_id, code, block)])
    }

    /// Deliverer answering every status query with the given verdict for
    /// whichever transaction id the query names
    pub fn confirming(code: TxValidationCode, block: u64) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
            script: DeliverScript::Confirm(code, block),
        }
    }

    /// Deliverer whose stream never yields, for deadline tests
    pub fn hanging() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
            script: DeliverScript::Hang,
        }
    }

    /// The most recent request envelope, if any
    pub fn last_request(&self) -> Option<Envelope> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

/// A filtered-block delivery response holding one transaction verdict.
pub fn filtered_block_response(
    tx_id: impl Into<String>,
    code: TxValidationCode,
    block: u64,
) -> DeliverResponse {
    DeliverResponse {
        r#type: Some(deliver_response::Type::FilteredBlock(FilteredBlock {
            channel_id: String::new(),
            number: block,
            filtered_transactions: vec![FilteredTransaction {
                tx_id: tx_id.into(),
                tx_validation_code: code as i32,
            }],
        })),
    }
}

#[async_trait]
impl Deliverer for MockDeliverer {
    async fn deliver_filtered(
        &self,
        request: Envelope,
    ) -> std::result::Result<DeliverStream, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let responses: Vec<DeliverResponse> = match &self.script {
            DeliverScript::Hang => return Ok(Box::pin(tokio_stream::pending())),
            DeliverScript::Responses(responses) => responses.clone(),
            DeliverScript::Confirm(code, block) => {
                let queried = CommitStatusRequest::decode(request.payload.as_slice())
                    .map_err(|e| Status::invalid_argument(e.to_string()))?;
                vec![filtered_block_response(queried.transaction_id, *code, *block)]
            }
        };
        let items: Vec<std::result::Result<DeliverResponse, Status>> =
            responses.into_iter().map(Ok).collect();
        Ok(Box::pin(tokio_stream::iter(items)))
    }
}

/// Scripted discoverer replaying one query result.
pub struct MockDiscoverer {
    /// Number of discovery queries run
    pub calls: Arc<AtomicUsize>,
    result: DiscoveryQueryResult,
}

impl MockDiscoverer {
    /// Discoverer returning an empty result set
    pub fn empty() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            result: DiscoveryQueryResult::default(),
        }
    }
}

#[async_trait]
impl Discoverer for MockDiscoverer {
    async fn discover(
        &self,
        _request: SignedDiscoveryRequest,
    ) -> std::result::Result<DiscoveryQueryResult, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Scripted broadcaster. Acknowledges every envelope with a configured
/// status and records what was sent.
pub struct MockBroadcaster {
    /// Number of envelopes broadcast
    pub calls: Arc<AtomicUsize>,
    envelopes: Mutex<Vec<Envelope>>,
    reply: BroadcasterReply,
}

enum BroadcasterReply {
    Ack(AckStatus),
    Fail(Code, String),
}

impl MockBroadcaster {
    /// Broadcaster acknowledging every envelope with success
    pub fn accepting() -> Self {
        Self::acking(AckStatus::Success)
    }

    /// Broadcaster acknowledging every envelope with the given status
    pub fn acking(status: AckStatus) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            envelopes: Mutex::new(Vec::new()),
            reply: BroadcasterReply::Ack(status),
        }
    }

    /// Broadcaster failing every send with the given RPC status
    pub fn failing(code: Code, message: impl Into<String>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            envelopes: Mutex::new(Vec::new()),
            reply: BroadcasterReply::Fail(code, message.into()),
        }
    }

    /// The most recent envelope sent, if any
    pub fn last_envelope(&self) -> Option<Envelope> {
        self.envelopes.lock().ok().and_then(|e| e.last().cloned())
    }
}

#[async_trait]
impl Broadcaster for MockBroadcaster {
    async fn broadcast(
        &self,
        envelope: Envelope,
    ) -> std::result::Result<BroadcastResponse, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut envelopes) = self.envelopes.lock() {
            envelopes.push(envelope);
        }
        match &self.reply {
            BroadcasterReply::Ack(status) => Ok(BroadcastResponse {
                status: *status as i32,
                info: String::new(),
            }),
            BroadcasterReply::Fail(code, message) => Err(Status::new(*code, message.clone())),
        }
    }
}

/// In-memory dialer. Counts dials, hands out configured handles (or
/// fresh defaults) and can be told to refuse orderer streams.
pub struct MockDialer {
    /// Number of validator connections established
    pub peer_dials: Arc<AtomicUsize>,
    /// Number of ordering connections established
    pub orderer_dials: Arc<AtomicUsize>,
    peer_handles: Mutex<HashMap<String, PeerHandles>>,
    default_peer: Option<PeerHandles>,
    default_orderer: Option<OrdererHandles>,
    fail_orderer_stream: bool,
}

impl MockDialer {
    /// Dialer handing out fresh default doubles for every endpoint
    pub fn new() -> Self {
        Self {
            peer_dials: Arc::new(AtomicUsize::new(0)),
            orderer_dials: Arc::new(AtomicUsize::new(0)),
            peer_handles: Mutex::new(HashMap::new()),
            default_peer: None,
            default_orderer: None,
            fail_orderer_stream: false,
        }
    }

    /// Hand out these handles for every validator dial
    pub fn with_peer_handles(mut self, handles: PeerHandles) -> Self {
        self.default_peer = Some(handles);
        self
    }

    /// Hand out these handles when the given `host:port` is dialed
    pub fn with_peer_handles_for(self, url: impl Into<String>, handles: PeerHandles) -> Self {
        if let Ok(mut map) = self.peer_handles.lock() {
            map.insert(url.into(), handles);
        }
        self
    }

    /// Hand out these handles for every ordering dial
    pub fn with_orderer_handles(mut self, handles: OrdererHandles) -> Self {
        self.default_orderer = Some(handles);
        self
    }

    /// Refuse to open broadcast streams, failing every ordering dial
    pub fn failing_orderer_stream(mut self) -> Self {
        self.fail_orderer_stream = true;
        self
    }
}

impl Default for MockDialer {
    fn default() -> Self {
        Self::new()
    }
}

fn default_peer_handles() -> PeerHandles {
    PeerHandles {
        endorser: Arc::new(MockEndorser::succeeding(Vec::new())),
        deliverer: Arc::new(MockDeliverer::with_responses(Vec::new())),
        discoverer: Arc::new(MockDiscoverer::empty()),
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial_peer(
        &self,
        endpoint: &Endpoint,
        _trust_root: &[u8],
        _as_localhost: bool,
    ) -> Result<PeerHandles> {
        self.peer_dials.fetch_add(1, Ordering::SeqCst);
        if let Ok(map) = self.peer_handles.lock() {
            if let Some(handles) = map.get(&endpoint.url()) {
                return Ok(handles.clone());
            }
        }
        Ok(self
            .default_peer
            .clone()
            .unwrap_or_else(default_peer_handles))
    }

    async fn dial_orderer(
        &self,
        endpoint: &Endpoint,
        _trust_root: &[u8],
        _as_localhost: bool,
    ) -> Result<OrdererHandles> {
        self.orderer_dials.fetch_add(1, Ordering::SeqCst);
        if self.fail_orderer_stream {
            return Err(Error::Connection {
                endpoint: endpoint.url(),
                reason: "broadcast stream refused".to_string(),
            });
        }
        Ok(self.default_orderer.clone().unwrap_or_else(|| OrdererHandles {
            broadcaster: Arc::new(MockBroadcaster::accepting()),
        }))
    }
}
