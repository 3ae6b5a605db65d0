//! The submission pipeline
//!
//! Four operations over registered endpoints: `evaluate` runs a proposal
//! on one validator and returns the chaincode result, `endorse` collects
//! endorsements from every required validator and assembles the
//! transaction envelope, `submit` broadcasts the signed envelope to the
//! ordering service, and `commit_status` watches the delivery stream for
//! the validation verdict. No operation retries; failures surface to the
//! caller with the failing endpoint's context, and endorsement-time RPC
//! failures keep their gRPC status inspectable.

use crate::commit::{CommitOutcome, CommitRequest};
use crate::identity::SigningIdentity;
use crate::proposal::{Proposal, ProposalBuilder};
use crate::registry::EndpointRegistry;
use crate::transaction::Transaction;
use crate::{Error, Result};
use gateway_wire::common::{Envelope, Header, Payload, Status as AckStatus};
use gateway_wire::gateway::PreparedTransaction;
use gateway_wire::peer::{
    deliver_response, ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeProposalPayload,
    ProposalResponse, SignedProposal, Transaction as TransactionData, TransactionAction,
    TxValidationCode,
};
use prost::Message;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

/// Picks one member from a channel's registered endpoints.
pub trait Selector: Send + Sync {
    /// Index of the chosen member; `candidates` is always non-zero and the
    /// returned index must be below it
    fn choose(&self, candidates: usize) -> usize;
}

/// Default selection policy: always the first registered member.
#[derive(Debug, Default)]
pub struct FirstMemberSelector;

impl Selector for FirstMemberSelector {
    fn choose(&self, _candidates: usize) -> usize {
        0
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Deadline for the whole call; falls back to the configured default
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Options with the given deadline
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Client gateway over a set of registered endpoints, acting as one
/// signing identity.
pub struct Gateway {
    registry: Arc<EndpointRegistry>,
    signer: SigningIdentity,
    selector: Arc<dyn Selector>,
}

impl Gateway {
    /// Create a gateway acting as the given identity
    pub fn new(registry: Arc<EndpointRegistry>, signer: SigningIdentity) -> Self {
        Self {
            registry,
            signer,
            selector: Arc::new(FirstMemberSelector),
        }
    }

    /// Replace the endpoint selection policy
    pub fn with_selector(mut self, selector: Arc<dyn Selector>) -> Self {
        self.selector = selector;
        self
    }

    /// The registry the gateway dispatches through
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// The identity the gateway signs as
    pub fn signer(&self) -> &SigningIdentity {
        &self.signer
    }

    /// Scope operations to one channel
    pub fn network(&self, channel_id: impl Into<String>) -> Network<'_> {
        Network {
            gateway: self,
            channel_id: channel_id.into(),
        }
    }

    /// Run a signed proposal on one validator and return the chaincode
    /// result without committing anything
    pub async fn evaluate(&self, proposal: &Proposal, options: CallOptions) -> Result<Vec<u8>> {
        let unit = self.signed_proposal_unit(proposal)?;
        let endorsers = self
            .registry
            .endorsers_for_orgs(proposal.channel_id(), proposal.endorsing_organizations())
            .await;
        if endorsers.is_empty() {
            return Err(Error::NoEndpoints {
                role: "validator",
                channel: proposal.channel_id().to_string(),
            });
        }

        let endorser = endorsers[self.selector.choose(endorsers.len()) % endorsers.len()].clone();
        tracing::debug!(
            transaction_id = proposal.transaction_id(),
            channel = proposal.channel_id(),
            "evaluating proposal"
        );

        let response = with_deadline(self.effective_timeout(&options), async move {
            endorser.process_proposal(unit).await.map_err(Error::from)
        })
        .await?;

        let result = response.response.unwrap_or_default();
        if result.status != AckStatus::Success as i32 {
            return Err(Error::EndorsementRejected {
                status: result.status,
                message: result.message,
            });
        }
        Ok(result.payload)
    }

    /// Collect endorsements from every required validator and assemble the
    /// transaction envelope ready for signing and submission
    pub async fn endorse(&self, proposal: &Proposal, options: CallOptions) -> Result<Transaction> {
        let unit = self.signed_proposal_unit(proposal)?;
        let endorsers = self
            .registry
            .endorsers_for_orgs(proposal.channel_id(), proposal.endorsing_organizations())
            .await;
        if endorsers.is_empty() {
            return Err(Error::NoEndpoints {
                role: "validator",
                channel: proposal.channel_id().to_string(),
            });
        }

        tracing::debug!(
            transaction_id = proposal.transaction_id(),
            channel = proposal.channel_id(),
            validators = endorsers.len(),
            "collecting endorsements"
        );

        let responses = with_deadline(self.effective_timeout(&options), async {
            let mut responses = Vec::with_capacity(endorsers.len());
            for endorser in &endorsers {
                let response = endorser.process_proposal(unit.clone()).await?;
                let result = response.response.clone().unwrap_or_default();
                if result.status != AckStatus::Success as i32 {
                    return Err(Error::EndorsementRejected {
                        status: result.status,
                        message: result.message,
                    });
                }
                if response.endorsement.is_none() {
                    return Err(Error::EndorsementRejected {
                        status: result.status,
                        message: "response carried no endorsement".to_string(),
                    });
                }
                responses.push(response);
            }
            Ok(responses)
        })
        .await?;

        let prepared = assemble_prepared(proposal, &responses)?;
        Transaction::from_prepared(prepared, self.signer.hash_fn())
    }

    /// Broadcast a signed transaction envelope to every ordering endpoint
    /// of its channel and return the commit-status query for it
    pub async fn submit(
        &self,
        transaction: &Transaction,
        options: CallOptions,
    ) -> Result<CommitRequest> {
        let envelope = self.signed_envelope(transaction)?;
        let orderers = self.registry.orderers_for(transaction.channel_id()).await;
        if orderers.is_empty() {
            return Err(Error::NoEndpoints {
                role: "ordering",
                channel: transaction.channel_id().to_string(),
            });
        }

        with_deadline(self.effective_timeout(&options), async {
            for orderer in &orderers {
                let ack = orderer
                    .broadcaster
                    .broadcast(envelope.clone())
                    .await
                    .map_err(|source| Error::Broadcast {
                        endpoint: orderer.url.clone(),
                        source,
                    })?;
                if ack.status != AckStatus::Success as i32 {
                    return Err(Error::BroadcastRejected {
                        endpoint: orderer.url.clone(),
                        status: ack.status,
                    });
                }
                tracing::debug!(
                    transaction_id = transaction.transaction_id(),
                    orderer = %orderer.url,
                    "envelope acknowledged"
                );
            }
            Ok(())
        })
        .await?;

        Ok(CommitRequest::new(
            transaction.channel_id(),
            transaction.transaction_id(),
            self.signer.creator(),
            self.signer.hash_fn(),
        ))
    }

    /// Watch one validator's delivery stream for the transaction's
    /// validation verdict. A stream that ends, or a deadline that elapses,
    /// before a verdict yields a `NotValidated` outcome rather than an
    /// error.
    pub async fn commit_status(
        &self,
        request: &CommitRequest,
        options: CallOptions,
    ) -> Result<CommitOutcome> {
        let envelope = self.signed_commit_envelope(request)?;
        let deliverers = self.registry.deliverers_for(request.channel_id()).await;
        if deliverers.is_empty() {
            return Err(Error::NoEndpoints {
                role: "validator",
                channel: request.channel_id().to_string(),
            });
        }

        let deliverer =
            deliverers[self.selector.choose(deliverers.len()) % deliverers.len()].clone();
        let transaction_id = request.transaction_id().to_string();

        let scan = async {
            let mut stream = deliverer
                .deliver_filtered(envelope)
                .await
                .map_err(Error::from)?;
            while let Some(message) = stream.next().await {
                match message.map_err(Error::from)?.r#type {
                    Some(deliver_response::Type::FilteredBlock(block)) => {
                        for transaction in block.filtered_transactions {
                            if transaction.tx_id == transaction_id {
                                let code = TxValidationCode::try_from(
                                    transaction.tx_validation_code,
                                )
                                .unwrap_or(TxValidationCode::InvalidOtherReason);
                                return Ok(Some(CommitOutcome {
                                    transaction_id: transaction.tx_id,
                                    code,
                                    block_number: Some(block.number),
                                }));
                            }
                        }
                    }
                    // terminal status: the stream delivers nothing further
                    Some(deliver_response::Type::Status(_)) => break,
                    None => {}
                }
            }
            Ok::<_, Error>(None)
        };

        let verdict = match self.effective_timeout(&options) {
            Some(deadline) => match tokio::time::timeout(deadline, scan).await {
                Ok(result) => result?,
                Err(_) => None,
            },
            None => scan.await?,
        };

        Ok(verdict.unwrap_or_else(|| {
            tracing::debug!(
                transaction_id = request.transaction_id(),
                "status query ended without a verdict"
            );
            CommitOutcome {
                transaction_id: request.transaction_id().to_string(),
                code: TxValidationCode::NotValidated,
                block_number: None,
            }
        }))
    }

    /// Reconstruct a proposal from hand-off bytes and an externally
    /// produced signature, using this gateway's digest function
    pub fn new_signed_proposal(&self, bytes: &[u8], signature: Vec<u8>) -> Result<Proposal> {
        Proposal::from_bytes_signed(bytes, signature, self.signer.hash_fn())
    }

    /// Reconstruct an endorsed transaction from hand-off bytes and an
    /// externally produced signature
    pub fn new_signed_transaction(&self, bytes: &[u8], signature: Vec<u8>) -> Result<Transaction> {
        Transaction::from_bytes_signed(bytes, signature, self.signer.hash_fn())
    }

    /// Reconstruct a commit-status query from hand-off bytes and an
    /// externally produced signature
    pub fn new_signed_commit(&self, bytes: &[u8], signature: Vec<u8>) -> Result<CommitRequest> {
        CommitRequest::from_bytes_signed(bytes, signature, self.signer.hash_fn())
    }

    /// Per-call deadline, falling back to the configured default
    fn effective_timeout(&self, options: &CallOptions) -> Option<Duration> {
        options.timeout.or(self.registry.config().default_timeout())
    }

    /// Signed wire unit for a proposal: pre-attached signature when
    /// present, inline signing otherwise. Fails before any endpoint lookup
    /// or RPC when neither is possible.
    fn signed_proposal_unit(&self, proposal: &Proposal) -> Result<SignedProposal> {
        let mut unit = proposal.signed_proposal();
        if unit.signature.is_empty() {
            unit.signature = self.signer.sign(proposal.digest())?;
        }
        Ok(unit)
    }

    fn signed_envelope(&self, transaction: &Transaction) -> Result<Envelope> {
        let mut envelope = transaction.envelope();
        if envelope.signature.is_empty() {
            envelope.signature = self.signer.sign(transaction.digest())?;
        }
        Ok(envelope)
    }

    fn signed_commit_envelope(&self, request: &CommitRequest) -> Result<Envelope> {
        let mut envelope = request.envelope();
        if envelope.signature.is_empty() {
            envelope.signature = self.signer.sign(request.digest())?;
        }
        Ok(envelope)
    }
}

/// Assemble the transaction envelope from the proposal and the collected
/// endorsements. The proposal's header is carried over unchanged; the
/// transient map is stripped so private data never reaches the ledger.
fn assemble_prepared(
    proposal: &Proposal,
    responses: &[ProposalResponse],
) -> Result<PreparedTransaction> {
    let wire_proposal = gateway_wire::peer::Proposal::decode(proposal.payload_bytes())?;
    let header = Header::decode(wire_proposal.header.as_slice())?;
    let mut proposal_payload = ChaincodeProposalPayload::decode(wire_proposal.payload.as_slice())?;
    proposal_payload.transient_map.clear();

    let first = responses
        .first()
        .ok_or_else(|| Error::Other("no endorsement responses collected".to_string()))?;

    let action_payload = ChaincodeActionPayload {
        chaincode_proposal_payload: proposal_payload.encode_to_vec(),
        action: Some(ChaincodeEndorsedAction {
            proposal_response_payload: first.payload.clone(),
            endorsements: responses
                .iter()
                .filter_map(|response| response.endorsement.clone())
                .collect(),
        }),
    };
    let transaction = TransactionData {
        actions: vec![TransactionAction {
            header: header.signature_header.clone(),
            payload: action_payload.encode_to_vec(),
        }],
    };
    let payload = Payload {
        header: Some(header),
        data: transaction.encode_to_vec(),
    };

    Ok(PreparedTransaction {
        transaction_id: proposal.transaction_id().to_string(),
        envelope: Some(Envelope {
            payload: payload.encode_to_vec(),
            signature: Vec::new(),
        }),
        result: first.response.clone(),
    })
}

/// Run a future under an optional deadline.
async fn with_deadline<F, T>(timeout: Option<Duration>, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(deadline) => match tokio::time::timeout(deadline, future).await {
            Ok(result) => result,
            Err(_) => Err(Error::DeadlineExceeded(deadline)),
        },
        None => future.await,
    }
}

/// Operations scoped to one channel.
pub struct Network<'a> {
    gateway: &'a Gateway,
    channel_id: String,
}

impl<'a> Network<'a> {
    /// The channel this network is scoped to
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// A contract under the chaincode's default namespace
    pub fn contract(&self, chaincode_id: impl Into<String>) -> Contract<'a> {
        Contract {
            gateway: self.gateway,
            channel_id: self.channel_id.clone(),
            chaincode_id: chaincode_id.into(),
            contract_name: None,
        }
    }

    /// A named contract inside a chaincode
    pub fn contract_with_name(
        &self,
        chaincode_id: impl Into<String>,
        contract_name: impl Into<String>,
    ) -> Contract<'a> {
        Contract {
            gateway: self.gateway,
            channel_id: self.channel_id.clone(),
            chaincode_id: chaincode_id.into(),
            contract_name: Some(contract_name.into()),
        }
    }
}

/// Invocation surface of one smart contract.
pub struct Contract<'a> {
    gateway: &'a Gateway,
    channel_id: String,
    chaincode_id: String,
    contract_name: Option<String>,
}

impl<'a> Contract<'a> {
    /// Start building a proposal for the named transaction
    pub fn propose(&self, transaction_name: impl Into<String>) -> ProposalBuilder<'a> {
        let mut builder = ProposalBuilder::new(
            &self.gateway.signer,
            self.channel_id.clone(),
            self.chaincode_id.clone(),
            transaction_name,
        );
        if let Some(name) = &self.contract_name {
            builder = builder.contract_name(name.clone());
        }
        builder
    }

    /// Evaluate a transaction and return its result without committing
    pub async fn evaluate_transaction<I, S>(&self, name: impl Into<String>, args: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let proposal = self.propose(name).args(args).build();
        self.gateway.evaluate(&proposal, CallOptions::default()).await
    }

    /// Endorse, submit and await the commit of a transaction, returning
    /// its result. Fails with [`Error::Commit`] when validation rejects
    /// the transaction.
    pub async fn submit_transaction<I, S>(&self, name: impl Into<String>, args: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let proposal = self.propose(name).args(args).build();
        let transaction = self.gateway.endorse(&proposal, CallOptions::default()).await?;
        let request = self.gateway.submit(&transaction, CallOptions::default()).await?;
        let outcome = self
            .gateway
            .commit_status(&request, CallOptions::default())
            .await?;

        if !outcome.is_committed() {
            return Err(Error::Commit {
                transaction_id: outcome.transaction_id,
                code: outcome.code.as_str_name().to_string(),
            });
        }
        tracing::info!(
            transaction_id = transaction.transaction_id(),
            block = outcome.block_number,
            "transaction committed"
        );
        Ok(transaction.result().to_vec())
    }
}
