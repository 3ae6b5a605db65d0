//! Error types for the gateway

use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Trust root bytes are not a well-formed PEM certificate
    #[error("Invalid trust material for organization '{org}': {reason}")]
    InvalidTrustMaterial {
        /// Organization the material was registered for
        org: String,
        /// Why the material was rejected
        reason: String,
    },

    /// No trust root registered for the organization being dialed
    #[error("No trust root registered for organization '{0}'")]
    MissingTrustRoot(String),

    /// Transport dial failed, or the orderer broadcast stream could not
    /// be opened
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connection {
        /// Endpoint key (`host:port`)
        endpoint: String,
        /// Underlying transport failure
        reason: String,
    },

    /// Dispatch attempted with no signature attached and no signing
    /// implementation supplied
    #[error("No signing implementation supplied and no signature attached")]
    UndefinedSigner,

    /// Remote call failure, propagated unwrapped so the status code and
    /// structured details stay inspectable
    #[error(transparent)]
    Rpc(#[from] tonic::Status),

    /// Broadcast to an orderer failed in flight
    #[error("Broadcast to orderer {endpoint} failed: {source}")]
    Broadcast {
        /// Orderer endpoint key
        endpoint: String,
        /// Underlying stream failure
        #[source]
        source: tonic::Status,
    },

    /// Orderer acknowledged the envelope with a non-success status
    #[error("Broadcast rejected by orderer {endpoint} with status {status}")]
    BroadcastRejected {
        /// Orderer endpoint key
        endpoint: String,
        /// `common::Status` value returned in the acknowledgement
        status: i32,
    },

    /// A validator returned a non-success chaincode response at
    /// endorsement time
    #[error("Endorsement failed with status {status}: {message}")]
    EndorsementRejected {
        /// `common::Status` value of the chaincode response
        status: i32,
        /// Message carried in the chaincode response
        message: String,
    },

    /// The transaction was committed with a non-valid validation code
    #[error("Transaction {transaction_id} failed to commit: {code}")]
    Commit {
        /// Transaction id
        transaction_id: String,
        /// Validation code name
        code: String,
    },

    /// No endpoints of the required role are registered for the channel
    #[error("No {role} endpoints registered for channel '{channel}'")]
    NoEndpoints {
        /// Endpoint role ("validator" or "ordering")
        role: &'static str,
        /// Channel id
        channel: String,
    },

    /// The call deadline elapsed before a response arrived
    #[error("Call deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// The call was cancelled by the caller
    #[error("Call cancelled")]
    Cancelled,

    /// Wire message decoding failed
    #[error("Wire decoding error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
