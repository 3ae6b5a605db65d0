//! The prepared-transaction signable unit
//!
//! Produced by endorsement, signed by the client, broadcast to the
//! ordering service. Digest is over the envelope payload bytes; signing
//! fills the envelope signature field and nothing else.

use crate::identity::Hash;
use crate::{Error, Result};
use gateway_wire::common::{ChannelHeader, Envelope, Header, Payload};
use gateway_wire::gateway::PreparedTransaction;
use prost::Message;

/// An endorsed transaction awaiting signature and broadcast.
#[derive(Debug, Clone)]
pub struct Transaction {
    prepared: PreparedTransaction,
    digest: Vec<u8>,
    channel_id: String,
}

impl Transaction {
    /// Wrap a freshly assembled prepared transaction. Digest and channel
    /// id are derived from the envelope payload bytes once, here.
    pub(crate) fn from_prepared(prepared: PreparedTransaction, hash: Hash) -> Result<Self> {
        let payload_bytes = prepared
            .envelope
            .as_ref()
            .map(|e| e.payload.as_slice())
            .ok_or_else(|| Error::Other("prepared transaction has no envelope".to_string()))?;
        let digest = hash(payload_bytes);
        let channel_id = channel_of(payload_bytes)?;
        Ok(Self {
            prepared,
            digest,
            channel_id,
        })
    }

    /// Reconstruct from serialized bytes previously produced by
    /// [`Transaction::bytes`]. The payload is taken as-is.
    pub fn from_bytes(bytes: &[u8], hash: Hash) -> Result<Self> {
        let prepared = PreparedTransaction::decode(bytes)?;
        Self::from_prepared(prepared, hash)
    }

    /// Reconstruct and attach an externally produced signature
    pub fn from_bytes_signed(bytes: &[u8], signature: Vec<u8>, hash: Hash) -> Result<Self> {
        let mut transaction = Self::from_bytes(bytes, hash)?;
        transaction.attach_signature(signature);
        Ok(transaction)
    }

    /// Serialized form for hand-off to an external signer
    pub fn bytes(&self) -> Vec<u8> {
        self.prepared.encode_to_vec()
    }

    /// Digest to sign
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Transaction id carried from the proposal
    pub fn transaction_id(&self) -> &str {
        &self.prepared.transaction_id
    }

    /// Channel the transaction commits to
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Chaincode response payload captured at endorsement time
    pub fn result(&self) -> &[u8] {
        self.prepared
            .result
            .as_ref()
            .map(|r| r.payload.as_slice())
            .unwrap_or_default()
    }

    /// Whether a signature is attached
    pub fn is_signed(&self) -> bool {
        self.prepared
            .envelope
            .as_ref()
            .map(|e| !e.signature.is_empty())
            .unwrap_or(false)
    }

    /// Attach a signature. Payload bytes, transaction id and digest are
    /// untouched.
    pub fn attach_signature(&mut self, signature: Vec<u8>) {
        if let Some(envelope) = self.prepared.envelope.as_mut() {
            envelope.signature = signature;
        }
    }

    /// The envelope dispatched to orderers. Empty signature when unsigned.
    pub(crate) fn envelope(&self) -> Envelope {
        self.prepared.envelope.clone().unwrap_or_default()
    }

    /// Raw envelope payload bytes (the signed byte range)
    pub(crate) fn payload_bytes(&self) -> &[u8] {
        self.prepared
            .envelope
            .as_ref()
            .map(|e| e.payload.as_slice())
            .unwrap_or_default()
    }
}

/// Channel id from an envelope payload's channel header.
fn channel_of(payload_bytes: &[u8]) -> Result<String> {
    let payload = Payload::decode(payload_bytes)?;
    let header = payload
        .header
        .ok_or_else(|| Error::Other("envelope payload has no header".to_string()))?;
    let channel_header = ChannelHeader::decode(header.channel_header.as_slice())?;
    Ok(channel_header.channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::sha256;
    use gateway_wire::common::SignatureHeader;
    use gateway_wire::peer::Response;

    fn prepared_fixture() -> PreparedTransaction {
        let channel_header = ChannelHeader {
            r#type: 3,
            version: 1,
            timestamp: 0,
            channel_id: "mychannel".to_string(),
            tx_id: "tx1".to_string(),
            epoch: 0,
        };
        let header = Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: SignatureHeader::default().encode_to_vec(),
        };
        let payload = Payload {
            header: Some(header),
            data: b"transaction".to_vec(),
        };
        PreparedTransaction {
            transaction_id: "tx1".to_string(),
            envelope: Some(Envelope {
                payload: payload.encode_to_vec(),
                signature: Vec::new(),
            }),
            result: Some(Response {
                status: 200,
                message: String::new(),
                payload: b"RESULT".to_vec(),
            }),
        }
    }

    #[test]
    fn test_channel_recovered_from_payload_header() {
        let transaction = Transaction::from_prepared(prepared_fixture(), sha256).unwrap();
        assert_eq!(transaction.channel_id(), "mychannel");
        assert_eq!(transaction.transaction_id(), "tx1");
        assert_eq!(transaction.result(), b"RESULT");
    }

    #[test]
    fn test_signing_leaves_payload_and_digest_unchanged() {
        let mut transaction =
            Transaction::from_prepared(prepared_fixture(), sha256).unwrap();

        let payload_before = transaction.payload_bytes().to_vec();
        let digest_before = transaction.digest().to_vec();

        assert!(!transaction.is_signed());
        transaction.attach_signature(b"sig".to_vec());
        assert!(transaction.is_signed());

        assert_eq!(transaction.payload_bytes(), payload_before);
        assert_eq!(transaction.digest(), digest_before);
        assert_eq!(transaction.envelope().signature, b"sig");
    }

    #[test]
    fn test_offline_reconstruction_is_byte_stable() {
        let transaction = Transaction::from_prepared(prepared_fixture(), sha256).unwrap();

        let restored = Transaction::from_bytes(&transaction.bytes(), sha256).unwrap();
        assert_eq!(restored.digest(), transaction.digest());
        assert_eq!(restored.transaction_id(), transaction.transaction_id());
        assert_eq!(restored.channel_id(), transaction.channel_id());

        let signed =
            Transaction::from_bytes_signed(&transaction.bytes(), b"sig".to_vec(), sha256)
                .unwrap();
        assert!(signed.is_signed());
        assert_eq!(signed.digest(), transaction.digest());
        assert_eq!(signed.payload_bytes(), transaction.payload_bytes());
    }

    #[test]
    fn test_missing_envelope_is_rejected() {
        let prepared = PreparedTransaction {
            transaction_id: "tx1".to_string(),
            envelope: None,
            result: None,
        };
        assert!(Transaction::from_prepared(prepared, sha256).is_err());
    }
}
