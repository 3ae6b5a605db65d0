//! Validator endpoint messages and clients (`ledger.peer`).
//!
//! Covers the three services a validator exposes to the gateway:
//! endorsement (`Endorser`), ledger delivery (`Deliver`) and topology
//! discovery (`Discovery`).

use std::collections::HashMap;

/// A proposal to execute chaincode, built once and signed over.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Proposal {
    /// Marshalled `common::Header`.
    #[prost(bytes = "vec", tag = "1")]
    pub header: Vec<u8>,
    /// Marshalled `ChaincodeProposalPayload`.
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

/// The unit the endorser verifies: proposal bytes plus the creator's
/// signature over them.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedProposal {
    #[prost(bytes = "vec", tag = "1")]
    pub proposal_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// Invocation input plus transient (private) data that must not end up in
/// the ledger.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeProposalPayload {
    /// Marshalled `ChaincodeInvocationSpec`.
    #[prost(bytes = "vec", tag = "1")]
    pub input: Vec<u8>,
    #[prost(map = "string, bytes", tag = "2")]
    pub transient_map: HashMap<String, Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeInvocationSpec {
    #[prost(message, optional, tag = "1")]
    pub chaincode_spec: Option<ChaincodeSpec>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeSpec {
    #[prost(message, optional, tag = "1")]
    pub chaincode_id: Option<ChaincodeId>,
    #[prost(message, optional, tag = "2")]
    pub input: Option<ChaincodeInput>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeId {
    #[prost(string, tag = "1")]
    pub name: String,
}

/// Ordered invocation arguments. The first argument names the transaction
/// being invoked.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeInput {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub args: Vec<Vec<u8>>,
}

/// Chaincode execution result.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    /// One of `common::Status`.
    #[prost(int32, tag = "1")]
    pub status: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

/// A validator's signature over its simulated execution.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Endorsement {
    /// Marshalled `common::SerializedIdentity` of the endorsing validator.
    #[prost(bytes = "vec", tag = "1")]
    pub endorser: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// What `ProcessProposal` returns: the chaincode response, the marshalled
/// simulation results and the endorsement over them.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProposalResponse {
    #[prost(message, optional, tag = "1")]
    pub response: Option<Response>,
    /// Marshalled proposal-response payload (simulation results).
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub endorsement: Option<Endorsement>,
}

/// Endorsed simulation results plus the endorsements proving them.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeEndorsedAction {
    #[prost(bytes = "vec", tag = "1")]
    pub proposal_response_payload: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub endorsements: Vec<Endorsement>,
}

/// One action of a transaction: the proposal payload it was built from
/// (transient data stripped) and the endorsed results.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeActionPayload {
    /// Marshalled `ChaincodeProposalPayload` without the transient map.
    #[prost(bytes = "vec", tag = "1")]
    pub chaincode_proposal_payload: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub action: Option<ChaincodeEndorsedAction>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionAction {
    /// Marshalled `common::SignatureHeader` of the proposal creator.
    #[prost(bytes = "vec", tag = "1")]
    pub header: Vec<u8>,
    /// Marshalled `ChaincodeActionPayload`.
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}

/// The data of an endorser-transaction envelope payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Transaction {
    #[prost(message, repeated, tag = "1")]
    pub actions: Vec<TransactionAction>,
}

/// Query for the validation outcome of a submitted transaction.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitStatusRequest {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(string, tag = "2")]
    pub transaction_id: String,
    /// Marshalled `common::SerializedIdentity` of the requester.
    #[prost(bytes = "vec", tag = "3")]
    pub identity: Vec<u8>,
}

/// Per-transaction summary inside a filtered block.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilteredTransaction {
    #[prost(string, tag = "1")]
    pub tx_id: String,
    #[prost(enumeration = "TxValidationCode", tag = "2")]
    pub tx_validation_code: i32,
}

/// A committed block reduced to transaction ids and validation codes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilteredBlock {
    #[prost(string, tag = "1")]
    pub channel_id: String,
    #[prost(uint64, tag = "2")]
    pub number: u64,
    #[prost(message, repeated, tag = "3")]
    pub filtered_transactions: Vec<FilteredTransaction>,
}

/// One message of the delivery stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeliverResponse {
    #[prost(oneof = "deliver_response::Type", tags = "1, 2")]
    pub r#type: Option<deliver_response::Type>,
}

/// Nested message and enum types in `DeliverResponse`.
pub mod deliver_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        /// Terminal status; the service will send nothing further.
        #[prost(enumeration = "crate::common::Status", tag = "1")]
        Status(i32),
        #[prost(message, tag = "2")]
        FilteredBlock(super::FilteredBlock),
    }
}

/// Outcome of transaction validation at commit time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TxValidationCode {
    Valid = 0,
    NilEnvelope = 1,
    BadPayload = 2,
    BadCommonHeader = 3,
    EndorsementPolicyFailure = 10,
    MvccReadConflict = 11,
    DuplicateTxid = 12,
    /// The outcome is not yet known; the query ended without a verdict.
    NotValidated = 254,
    InvalidOtherReason = 255,
}

impl TxValidationCode {
    /// Proto-style string name, useful in log output.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            TxValidationCode::Valid => "VALID",
            TxValidationCode::NilEnvelope => "NIL_ENVELOPE",
            TxValidationCode::BadPayload => "BAD_PAYLOAD",
            TxValidationCode::BadCommonHeader => "BAD_COMMON_HEADER",
            TxValidationCode::EndorsementPolicyFailure => "ENDORSEMENT_POLICY_FAILURE",
            TxValidationCode::MvccReadConflict => "MVCC_READ_CONFLICT",
            TxValidationCode::DuplicateTxid => "DUPLICATE_TXID",
            TxValidationCode::NotValidated => "NOT_VALIDATED",
            TxValidationCode::InvalidOtherReason => "INVALID_OTHER_REASON",
        }
    }
}

/// Signed topology discovery query.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedDiscoveryRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// Discovery query results, one marshalled entry per queried item.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DiscoveryQueryResult {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub results: Vec<Vec<u8>>,
}

/// Client for the `ledger.peer.Endorser` service.
pub mod endorser_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct EndorserClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl EndorserClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> EndorserClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub async fn process_proposal(
            &mut self,
            request: impl tonic::IntoRequest<super::SignedProposal>,
        ) -> std::result::Result<tonic::Response<super::ProposalResponse>, tonic::Status>
        {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path =
                http::uri::PathAndQuery::from_static("/ledger.peer.Endorser/ProcessProposal");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("ledger.peer.Endorser", "ProcessProposal"));
            self.inner.unary(req, path, codec).await
        }
    }
}

/// Client for the `ledger.peer.Deliver` service.
pub mod deliver_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct DeliverClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl DeliverClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> DeliverClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub async fn deliver_filtered(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = crate::common::Envelope>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::DeliverResponse>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path =
                http::uri::PathAndQuery::from_static("/ledger.peer.Deliver/DeliverFiltered");
            let mut req = request.into_streaming_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("ledger.peer.Deliver", "DeliverFiltered"));
            self.inner.streaming(req, path, codec).await
        }
    }
}

/// Client for the `ledger.peer.Discovery` service.
pub mod discovery_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct DiscoveryClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl DiscoveryClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> DiscoveryClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub async fn discover(
            &mut self,
            request: impl tonic::IntoRequest<super::SignedDiscoveryRequest>,
        ) -> std::result::Result<tonic::Response<super::DiscoveryQueryResult>, tonic::Status>
        {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/ledger.peer.Discovery/Discover");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("ledger.peer.Discovery", "Discover"));
            self.inner.unary(req, path, codec).await
        }
    }
}
