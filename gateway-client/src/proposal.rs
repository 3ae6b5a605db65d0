//! Proposal construction and the proposal signable unit
//!
//! A proposal's payload bytes, transaction id and digest are derived
//! exactly once, at build time. Signing never rebuilds any of them: it is
//! a pure attachment, so inline and offline signing produce byte-identical
//! dispatch requests.

use crate::identity::{Hash, SigningIdentity};
use crate::{Error, Result};
use gateway_wire::common::{ChannelHeader, Header, HeaderType, SignatureHeader};
use gateway_wire::gateway::ProposedTransaction;
use gateway_wire::peer::{
    ChaincodeId, ChaincodeInput, ChaincodeInvocationSpec, ChaincodeProposalPayload,
    ChaincodeSpec, SignedProposal,
};
use prost::Message;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Separator between contract name and transaction name in the first
/// chaincode argument.
const NAME_SEPARATOR: &str = ":";

/// Builds a proposal from invocation inputs. Obtained from
/// [`Contract::propose`](crate::gateway::Contract::propose).
#[derive(Debug)]
pub struct ProposalBuilder<'a> {
    signer: &'a SigningIdentity,
    channel_id: String,
    chaincode_id: String,
    contract_name: Option<String>,
    transaction_name: String,
    args: Vec<Vec<u8>>,
    transient: HashMap<String, Vec<u8>>,
    endorsing_organizations: Vec<String>,
}

impl<'a> ProposalBuilder<'a> {
    /// Start building a proposal for the named transaction
    pub fn new(
        signer: &'a SigningIdentity,
        channel_id: impl Into<String>,
        chaincode_id: impl Into<String>,
        transaction_name: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            channel_id: channel_id.into(),
            chaincode_id: chaincode_id.into(),
            contract_name: None,
            transaction_name: transaction_name.into(),
            args: Vec::new(),
            transient: HashMap::new(),
            endorsing_organizations: Vec::new(),
        }
    }

    /// Namespace the transaction under a contract name
    pub fn contract_name(mut self, name: impl Into<String>) -> Self {
        self.contract_name = Some(name.into());
        self
    }

    /// Append one invocation argument
    pub fn add_arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append string invocation arguments in order
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.into().into_bytes()));
        self
    }

    /// Attach transient (private) data, kept out of the ledger
    pub fn transient(mut self, transient: HashMap<String, Vec<u8>>) -> Self {
        self.transient = transient;
        self
    }

    /// Restrict which organizations' validators must endorse
    pub fn endorsing_organizations<I, S>(mut self, orgs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endorsing_organizations = orgs.into_iter().map(|o| o.into()).collect();
        self
    }

    /// Produce the unsigned proposal. Payload bytes, transaction id and
    /// digest are fixed from here on.
    pub fn build(self) -> Proposal {
        let qualified_name = match &self.contract_name {
            Some(contract) => format!(
                "{}{}{}",
                contract, NAME_SEPARATOR, self.transaction_name
            ),
            None => self.transaction_name.clone(),
        };

        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(qualified_name.into_bytes());
        args.extend(self.args);

        let nonce = rand::random::<[u8; 24]>().to_vec();
        let creator = self.signer.creator();
        let transaction_id = derive_transaction_id(&nonce, &creator);

        let channel_header = ChannelHeader {
            r#type: HeaderType::EndorserTransaction as i32,
            version: 1,
            timestamp: now_nanos(),
            channel_id: self.channel_id.clone(),
            tx_id: transaction_id.clone(),
            epoch: 0,
        };
        let signature_header = SignatureHeader { creator, nonce };
        let header = Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: signature_header.encode_to_vec(),
        };

        let invocation = ChaincodeInvocationSpec {
            chaincode_spec: Some(ChaincodeSpec {
                chaincode_id: Some(ChaincodeId {
                    name: self.chaincode_id,
                }),
                input: Some(ChaincodeInput { args }),
            }),
        };
        let payload = ChaincodeProposalPayload {
            input: invocation.encode_to_vec(),
            transient_map: self.transient,
        };

        let proposal_bytes = gateway_wire::peer::Proposal {
            header: header.encode_to_vec(),
            payload: payload.encode_to_vec(),
        }
        .encode_to_vec();

        let digest = self.signer.hash(&proposal_bytes);

        Proposal {
            proposed: ProposedTransaction {
                transaction_id,
                proposal: Some(SignedProposal {
                    proposal_bytes,
                    signature: Vec::new(),
                }),
                endorsing_organizations: self.endorsing_organizations,
                channel_id: self.channel_id,
            },
            digest,
        }
    }
}

/// Transaction id: hex SHA-256 over nonce then creator bytes.
fn derive_transaction_id(nonce: &[u8], creator: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(creator);
    hex::encode(hasher.finalize())
}

fn now_nanos() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// A proposal signable unit: payload bytes, transaction id, digest and an
/// optional signature. Immutable after construction except for the one
/// allowed transition, unsigned to signed.
#[derive(Debug, Clone)]
pub struct Proposal {
    proposed: ProposedTransaction,
    digest: Vec<u8>,
}

impl Proposal {
    /// Reconstruct a proposal from serialized bytes previously produced by
    /// [`Proposal::bytes`]. The payload is taken as-is; the digest is the
    /// hash of the same payload bytes, so the result is byte-identical to
    /// the unit the bytes came from.
    pub fn from_bytes(bytes: &[u8], hash: Hash) -> Result<Self> {
        let proposed = ProposedTransaction::decode(bytes)?;
        let proposal_bytes = proposed
            .proposal
            .as_ref()
            .map(|p| p.proposal_bytes.as_slice())
            .ok_or_else(|| Error::Other("proposal bytes missing".to_string()))?;
        let digest = hash(proposal_bytes);
        Ok(Self { proposed, digest })
    }

    /// Reconstruct a proposal and attach an externally produced signature
    pub fn from_bytes_signed(bytes: &[u8], signature: Vec<u8>, hash: Hash) -> Result<Self> {
        let mut proposal = Self::from_bytes(bytes, hash)?;
        proposal.attach_signature(signature);
        Ok(proposal)
    }

    /// Serialized form for hand-off to an external signer
    pub fn bytes(&self) -> Vec<u8> {
        self.proposed.encode_to_vec()
    }

    /// Digest to sign
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Transaction id derived at construction
    pub fn transaction_id(&self) -> &str {
        &self.proposed.transaction_id
    }

    /// Channel the proposal targets
    pub fn channel_id(&self) -> &str {
        &self.proposed.channel_id
    }

    /// Organizations whose validators must endorse; empty implies the
    /// full channel set
    pub fn endorsing_organizations(&self) -> &[String] {
        &self.proposed.endorsing_organizations
    }

    /// Whether a signature is attached
    pub fn is_signed(&self) -> bool {
        self.proposed
            .proposal
            .as_ref()
            .map(|p| !p.signature.is_empty())
            .unwrap_or(false)
    }

    /// Attach a signature. Payload bytes, transaction id and digest are
    /// untouched.
    pub fn attach_signature(&mut self, signature: Vec<u8>) {
        if let Some(proposal) = self.proposed.proposal.as_mut() {
            proposal.signature = signature;
        }
    }

    /// The wire unit dispatched to validators. Empty signature field when
    /// unsigned.
    pub(crate) fn signed_proposal(&self) -> SignedProposal {
        self.proposed.proposal.clone().unwrap_or_default()
    }

    /// Raw proposal payload bytes (the signed byte range)
    pub(crate) fn payload_bytes(&self) -> &[u8] {
        self.proposed
            .proposal
            .as_ref()
            .map(|p| p.proposal_bytes.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{sha256, Identity};

    fn test_signer() -> SigningIdentity {
        SigningIdentity::new(Identity::new("org1", b"cert".to_vec()))
    }

    fn decode_args(proposal: &Proposal) -> Vec<Vec<u8>> {
        let wire_proposal =
            gateway_wire::peer::Proposal::decode(proposal.payload_bytes()).unwrap();
        let payload =
            ChaincodeProposalPayload::decode(wire_proposal.payload.as_slice()).unwrap();
        let invocation =
            ChaincodeInvocationSpec::decode(payload.input.as_slice()).unwrap();
        invocation
            .chaincode_spec
            .unwrap()
            .input
            .unwrap()
            .args
    }

    #[test]
    fn test_first_arg_is_transaction_name() {
        let signer = test_signer();
        let proposal = ProposalBuilder::new(&signer, "mychannel", "basic", "T").build();

        let args = decode_args(&proposal);
        assert_eq!(args[0], b"T");
    }

    #[test]
    fn test_first_arg_qualified_by_contract_name() {
        let signer = test_signer();
        let proposal = ProposalBuilder::new(&signer, "mychannel", "basic", "T")
            .contract_name("C")
            .build();

        let args = decode_args(&proposal);
        assert_eq!(args[0], b"C:T");
    }

    #[test]
    fn test_args_follow_transaction_name_in_order() {
        let signer = test_signer();
        let proposal = ProposalBuilder::new(&signer, "mychannel", "basic", "transfer")
            .args(["one", "two", "three"])
            .build();

        let args = decode_args(&proposal);
        assert_eq!(args.len(), 4);
        assert_eq!(args[1], b"one");
        assert_eq!(args[2], b"two");
        assert_eq!(args[3], b"three");
    }

    #[test]
    fn test_transient_and_endorsing_orgs_carried_verbatim() {
        let signer = test_signer();
        let mut transient = HashMap::new();
        transient.insert("price".to_string(), b"3000".to_vec());

        let proposal = ProposalBuilder::new(&signer, "mychannel", "basic", "transfer")
            .transient(transient)
            .endorsing_organizations(["MY_ORG"])
            .build();

        assert_eq!(proposal.endorsing_organizations(), ["MY_ORG"]);

        let wire_proposal =
            gateway_wire::peer::Proposal::decode(proposal.payload_bytes()).unwrap();
        let payload =
            ChaincodeProposalPayload::decode(wire_proposal.payload.as_slice()).unwrap();
        assert_eq!(payload.transient_map.get("price").unwrap(), b"3000");
    }

    #[test]
    fn test_transaction_id_matches_channel_header() {
        let signer = test_signer();
        let proposal = ProposalBuilder::new(&signer, "mychannel", "basic", "T").build();

        let wire_proposal =
            gateway_wire::peer::Proposal::decode(proposal.payload_bytes()).unwrap();
        let header = Header::decode(wire_proposal.header.as_slice()).unwrap();
        let channel_header =
            ChannelHeader::decode(header.channel_header.as_slice()).unwrap();

        assert_eq!(channel_header.tx_id, proposal.transaction_id());
        assert_eq!(channel_header.channel_id, "mychannel");
    }

    #[test]
    fn test_signing_leaves_payload_id_and_digest_unchanged() {
        let signer = test_signer();
        let mut proposal =
            ProposalBuilder::new(&signer, "mychannel", "basic", "T").build();

        let payload_before = proposal.payload_bytes().to_vec();
        let digest_before = proposal.digest().to_vec();
        let id_before = proposal.transaction_id().to_string();

        assert!(!proposal.is_signed());
        proposal.attach_signature(b"MY_SIGNATURE".to_vec());
        assert!(proposal.is_signed());

        assert_eq!(proposal.payload_bytes(), payload_before);
        assert_eq!(proposal.digest(), digest_before);
        assert_eq!(proposal.transaction_id(), id_before);
    }

    #[test]
    fn test_offline_reconstruction_is_byte_stable() {
        let signer = test_signer();
        let proposal = ProposalBuilder::new(&signer, "mychannel", "basic", "T")
            .args(["a"])
            .build();

        // serialize/deserialize cycle before signing
        let restored = Proposal::from_bytes(&proposal.bytes(), sha256).unwrap();
        assert_eq!(restored.digest(), proposal.digest());
        assert_eq!(restored.transaction_id(), proposal.transaction_id());
        assert_eq!(restored.payload_bytes(), proposal.payload_bytes());

        // attaching an external signature changes none of the derived values
        let signed =
            Proposal::from_bytes_signed(&proposal.bytes(), b"sig".to_vec(), sha256)
                .unwrap();
        assert!(signed.is_signed());
        assert_eq!(signed.digest(), proposal.digest());
        assert_eq!(signed.transaction_id(), proposal.transaction_id());
        assert_eq!(signed.payload_bytes(), proposal.payload_bytes());
    }

    #[test]
    fn test_distinct_proposals_get_distinct_transaction_ids() {
        let signer = test_signer();
        let a = ProposalBuilder::new(&signer, "mychannel", "basic", "T").build();
        let b = ProposalBuilder::new(&signer, "mychannel", "basic", "T").build();
        assert_ne!(a.transaction_id(), b.transaction_id());
    }
}
