//! Messages shared by the validator and ordering services (`ledger.common`).

/// A marshalled payload plus the signature over it. The outermost message
/// on every wire interaction.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    /// Marshalled `Payload` (or service-specific request) bytes.
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
    /// Signature by the creator named in the payload header.
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// The contents of an `Envelope`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payload {
    #[prost(message, optional, tag = "1")]
    pub header: Option<Header>,
    /// Marshalled message whose shape depends on the header type.
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

/// Paired channel and signature headers, kept as opaque bytes so the
/// signed byte ranges are stable.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Header {
    /// Marshalled `ChannelHeader`.
    #[prost(bytes = "vec", tag = "1")]
    pub channel_header: Vec<u8>,
    /// Marshalled `SignatureHeader`.
    #[prost(bytes = "vec", tag = "2")]
    pub signature_header: Vec<u8>,
}

/// Channel-scoped routing and identification data.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelHeader {
    /// One of `HeaderType`.
    #[prost(int32, tag = "1")]
    pub r#type: i32,
    #[prost(int32, tag = "2")]
    pub version: i32,
    /// Creation time, nanoseconds since the Unix epoch.
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
    #[prost(string, tag = "4")]
    pub channel_id: String,
    /// Transaction id, derived from the creator identity and nonce.
    #[prost(string, tag = "5")]
    pub tx_id: String,
    #[prost(uint64, tag = "6")]
    pub epoch: u64,
}

/// Creator identity and the nonce that makes the transaction id unique.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignatureHeader {
    /// Marshalled `SerializedIdentity` of the creator.
    #[prost(bytes = "vec", tag = "1")]
    pub creator: Vec<u8>,
    /// Random bytes, used once.
    #[prost(bytes = "vec", tag = "2")]
    pub nonce: Vec<u8>,
}

/// An organization-scoped identity: the organization id plus the
/// credential bytes (PEM certificate) proving membership.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SerializedIdentity {
    #[prost(string, tag = "1")]
    pub msp_id: String,
    #[prost(bytes = "vec", tag = "2")]
    pub id_bytes: Vec<u8>,
}

/// Purpose of an `Envelope` payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum HeaderType {
    Message = 0,
    /// A transaction carrying chaincode endorsements.
    EndorserTransaction = 3,
    /// A commit-status query sent on the delivery stream.
    CommitStatusRequest = 5,
}

impl HeaderType {
    /// Proto-style string name, useful in log output.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            HeaderType::Message => "MESSAGE",
            HeaderType::EndorserTransaction => "ENDORSER_TRANSACTION",
            HeaderType::CommitStatusRequest => "COMMIT_STATUS_REQUEST",
        }
    }
}

/// HTTP-style status codes carried in service acknowledgements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Status {
    Unknown = 0,
    Success = 200,
    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,
    InternalServerError = 500,
    ServiceUnavailable = 503,
}

impl Status {
    /// Whether the status indicates acceptance.
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}
