//! Application-facing signable-unit wrappers (`ledger.gateway`).
//!
//! These messages carry everything an external signer needs to reconstruct
//! a signable unit from raw bytes: the serialized payload, the transaction
//! id derived from it, and the routing fields the submission pipeline reads.

/// A proposal prepared for evaluation or endorsement, with its routing
/// metadata. Serializing this message is the offline-signing hand-off
/// format for proposals.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProposedTransaction {
    #[prost(string, tag = "1")]
    pub transaction_id: String,
    #[prost(message, optional, tag = "2")]
    pub proposal: Option<crate::peer::SignedProposal>,
    /// When non-empty, restricts which organizations' validators must
    /// endorse; empty implies the full channel set.
    #[prost(string, repeated, tag = "3")]
    pub endorsing_organizations: Vec<String>,
    #[prost(string, tag = "4")]
    pub channel_id: String,
}

/// An endorsed transaction ready for signing and broadcast. Serializing
/// this message is the offline-signing hand-off format for transactions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PreparedTransaction {
    #[prost(string, tag = "1")]
    pub transaction_id: String,
    /// The envelope to broadcast; its signature field is empty until the
    /// transaction is signed.
    #[prost(message, optional, tag = "2")]
    pub envelope: Option<crate::common::Envelope>,
    /// The chaincode response returned at endorsement time.
    #[prost(message, optional, tag = "3")]
    pub result: Option<crate::peer::Response>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_proposed_transaction_round_trip() {
        let proposed = ProposedTransaction {
            transaction_id: "abc123".to_string(),
            proposal: Some(crate::peer::SignedProposal {
                proposal_bytes: b"proposal".to_vec(),
                signature: Vec::new(),
            }),
            endorsing_organizations: vec!["MY_ORG".to_string()],
            channel_id: "mychannel".to_string(),
        };

        let bytes = proposed.encode_to_vec();
        let decoded = ProposedTransaction::decode(bytes.as_slice()).unwrap();

        assert_eq!(decoded, proposed);
    }
}
