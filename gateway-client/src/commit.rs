//! The commit-status signable unit and commit outcomes

use crate::identity::Hash;
use crate::Result;
use gateway_wire::common::Envelope;
use gateway_wire::peer::{CommitStatusRequest, TxValidationCode};
use prost::Message;

/// A signed query for a transaction's validation outcome.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    request_bytes: Vec<u8>,
    transaction_id: String,
    channel_id: String,
    digest: Vec<u8>,
    signature: Option<Vec<u8>>,
}

impl CommitRequest {
    /// Build the unsigned commit-status request for a transaction
    pub(crate) fn new(
        channel_id: impl Into<String>,
        transaction_id: impl Into<String>,
        identity: Vec<u8>,
        hash: Hash,
    ) -> Self {
        let channel_id = channel_id.into();
        let transaction_id = transaction_id.into();
        let request_bytes = CommitStatusRequest {
            channel_id: channel_id.clone(),
            transaction_id: transaction_id.clone(),
            identity,
        }
        .encode_to_vec();
        let digest = hash(&request_bytes);
        Self {
            request_bytes,
            transaction_id,
            channel_id,
            digest,
            signature: None,
        }
    }

    /// Reconstruct from serialized bytes previously produced by
    /// [`CommitRequest::bytes`].
    pub fn from_bytes(bytes: &[u8], hash: Hash) -> Result<Self> {
        let request = CommitStatusRequest::decode(bytes)?;
        let digest = hash(bytes);
        Ok(Self {
            request_bytes: bytes.to_vec(),
            transaction_id: request.transaction_id,
            channel_id: request.channel_id,
            digest,
            signature: None,
        })
    }

    /// Reconstruct and attach an externally produced signature
    pub fn from_bytes_signed(bytes: &[u8], signature: Vec<u8>, hash: Hash) -> Result<Self> {
        let mut request = Self::from_bytes(bytes, hash)?;
        request.attach_signature(signature);
        Ok(request)
    }

    /// Serialized request bytes for hand-off to an external signer
    pub fn bytes(&self) -> &[u8] {
        &self.request_bytes
    }

    /// Digest to sign
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Transaction id being queried
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Channel being queried
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Whether a signature is attached
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Attach a signature. Request bytes and digest are untouched.
    pub fn attach_signature(&mut self, signature: Vec<u8>) {
        self.signature = Some(signature);
    }

    /// The envelope sent on the delivery stream
    pub(crate) fn envelope(&self) -> Envelope {
        Envelope {
            payload: self.request_bytes.clone(),
            signature: self.signature.clone().unwrap_or_default(),
        }
    }
}

/// Validation outcome for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Transaction id the outcome belongs to
    pub transaction_id: String,

    /// Validation code; `NotValidated` when the query ended without a
    /// definitive verdict
    pub code: TxValidationCode,

    /// Block the transaction was committed in, when known
    pub block_number: Option<u64>,
}

impl CommitOutcome {
    /// Whether the transaction committed successfully
    pub fn is_committed(&self) -> bool {
        self.code == TxValidationCode::Valid
    }

    /// Whether the outcome is a definitive verdict
    pub fn is_definitive(&self) -> bool {
        self.code != TxValidationCode::NotValidated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::sha256;

    #[test]
    fn test_request_round_trip() {
        let request = CommitRequest::new("mychannel", "tx1", b"creator".to_vec(), sha256);

        let restored = CommitRequest::from_bytes(request.bytes(), sha256).unwrap();
        assert_eq!(restored.transaction_id(), "tx1");
        assert_eq!(restored.channel_id(), "mychannel");
        assert_eq!(restored.digest(), request.digest());
    }

    #[test]
    fn test_signing_leaves_bytes_and_digest_unchanged() {
        let mut request = CommitRequest::new("mychannel", "tx1", Vec::new(), sha256);
        let bytes_before = request.bytes().to_vec();
        let digest_before = request.digest().to_vec();

        assert!(!request.is_signed());
        request.attach_signature(b"sig".to_vec());
        assert!(request.is_signed());

        assert_eq!(request.bytes(), bytes_before);
        assert_eq!(request.digest(), digest_before);
        assert_eq!(request.envelope().signature, b"sig");
    }

    #[test]
    fn test_outcome_predicates() {
        let committed = CommitOutcome {
            transaction_id: "tx1".to_string(),
            code: TxValidationCode::Valid,
            block_number: Some(4),
        };
        assert!(committed.is_committed());
        assert!(committed.is_definitive());

        let unknown = CommitOutcome {
            transaction_id: "tx1".to_string(),
            code: TxValidationCode::NotValidated,
            block_number: None,
        };
        assert!(!unknown.is_committed());
        assert!(!unknown.is_definitive());

        let conflicted = CommitOutcome {
            transaction_id: "tx1".to_string(),
            code: TxValidationCode::MvccReadConflict,
            block_number: Some(9),
        };
        assert!(!conflicted.is_committed());
        assert!(conflicted.is_definitive());
    }
}
