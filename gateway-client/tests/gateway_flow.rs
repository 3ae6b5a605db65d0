//! End-to-end pipeline tests over in-memory transports
//!
//! Exercises the full propose / endorse / submit / commit-status flow with
//! real Ed25519 signatures, both inline and fully offline.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _};
use gateway_client::testing::{MockBroadcaster, MockDeliverer, MockDialer, MockEndorser, MockDiscoverer};
use gateway_client::transport::{OrdererHandles, PeerHandles};
use gateway_client::{
    CallOptions, EndpointRegistry, Gateway, GatewayConfig, Identity, SigningIdentity,
};
use gateway_wire::peer::TxValidationCode;
use std::sync::Arc;

const CERT: &[u8] = b"-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";
const SEED: [u8; 32] = [7u8; 32];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init();
}

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&SEED)
}

fn ed25519_signer() -> SigningIdentity {
    let key = signing_key();
    SigningIdentity::new(Identity::new("org1", b"client-cert".to_vec()))
        .with_sign(Arc::new(move |digest| Ok(key.sign(digest).to_bytes().to_vec())))
}

async fn registered_network(
    endorser: Arc<MockEndorser>,
    deliverer: Arc<MockDeliverer>,
    broadcaster: Arc<MockBroadcaster>,
) -> Arc<EndpointRegistry> {
    let dialer = MockDialer::new()
        .with_peer_handles(PeerHandles {
            endorser,
            deliverer,
            discoverer: Arc::new(MockDiscoverer::empty()),
        })
        .with_orderer_handles(OrdererHandles { broadcaster });

    let registry = Arc::new(EndpointRegistry::with_dialer(
        GatewayConfig::default(),
        Arc::new(dialer),
    ));
    registry.register_trust_root("org1", CERT).await.unwrap();
    registry
        .register_peer("mychannel", "org1", "peer1.org1.example.com", 7051)
        .await
        .unwrap();
    registry
        .register_orderer("mychannel", "org1", "orderer.example.com", 7050)
        .await
        .unwrap();
    registry
}

#[tokio::test]
async fn test_inline_signed_submission_flow() {
    init_tracing();

    let endorser = Arc::new(MockEndorser::succeeding(b"TRANSFER_OK".to_vec()));
    let deliverer = Arc::new(MockDeliverer::confirming(TxValidationCode::Valid, 42));
    let broadcaster = Arc::new(MockBroadcaster::accepting());
    let registry =
        registered_network(endorser.clone(), deliverer.clone(), broadcaster.clone()).await;

    let gateway = Gateway::new(registry, ed25519_signer());
    let result = gateway
        .network("mychannel")
        .contract("basic")
        .submit_transaction("transfer", ["alice", "bob", "50"])
        .await
        .unwrap();
    assert_eq!(result, b"TRANSFER_OK");

    // every dispatched unit carried a verifiable signature over its digest
    let verifying_key = signing_key().verifying_key();

    let proposal = endorser.last_request().unwrap();
    let digest = gateway_client::sha256(&proposal.proposal_bytes);
    let signature = Signature::from_slice(&proposal.signature).unwrap();
    verifying_key.verify(&digest, &signature).unwrap();

    let envelope = broadcaster.last_envelope().unwrap();
    let digest = gateway_client::sha256(&envelope.payload);
    let signature = Signature::from_slice(&envelope.signature).unwrap();
    verifying_key.verify(&digest, &signature).unwrap();

    let status_query = deliverer.last_request().unwrap();
    let digest = gateway_client::sha256(&status_query.payload);
    let signature = Signature::from_slice(&status_query.signature).unwrap();
    verifying_key.verify(&digest, &signature).unwrap();
}

#[tokio::test]
async fn test_offline_signed_submission_flow() {
    init_tracing();

    let endorser = Arc::new(MockEndorser::succeeding(b"OFFLINE_OK".to_vec()));
    let deliverer = Arc::new(MockDeliverer::confirming(TxValidationCode::Valid, 3));
    let broadcaster = Arc::new(MockBroadcaster::accepting());
    let registry = registered_network(endorser, deliverer, broadcaster).await;

    // the gateway itself holds no signing implementation; signatures are
    // produced out of band over the handed-off digests
    let gateway = Gateway::new(
        registry,
        SigningIdentity::new(Identity::new("org1", b"client-cert".to_vec())),
    );
    let key = signing_key();

    let unsigned = gateway
        .network("mychannel")
        .contract("basic")
        .propose("transfer")
        .args(["alice", "bob", "50"])
        .build();

    let signature = key.sign(unsigned.digest()).to_bytes().to_vec();
    let proposal = gateway
        .new_signed_proposal(&unsigned.bytes(), signature)
        .unwrap();
    assert_eq!(proposal.digest(), unsigned.digest());
    assert_eq!(proposal.transaction_id(), unsigned.transaction_id());

    let transaction = gateway
        .endorse(&proposal, CallOptions::default())
        .await
        .unwrap();
    let signature = key.sign(transaction.digest()).to_bytes().to_vec();
    let transaction = gateway
        .new_signed_transaction(&transaction.bytes(), signature)
        .unwrap();

    let request = gateway
        .submit(&transaction, CallOptions::default())
        .await
        .unwrap();
    let signature = key.sign(request.digest()).to_bytes().to_vec();
    let request = gateway
        .new_signed_commit(request.bytes(), signature)
        .unwrap();

    let outcome = gateway
        .commit_status(&request, CallOptions::default())
        .await
        .unwrap();
    assert!(outcome.is_committed());
    assert_eq!(outcome.transaction_id, proposal.transaction_id());
    assert_eq!(outcome.block_number, Some(3));
    assert_eq!(transaction.result(), b"OFFLINE_OK");
}

#[tokio::test]
async fn test_evaluate_flow_commits_nothing() {
    init_tracing();

    let endorser = Arc::new(MockEndorser::succeeding(b"QUERY_RESULT".to_vec()));
    let deliverer = Arc::new(MockDeliverer::with_responses(Vec::new()));
    let broadcaster = Arc::new(MockBroadcaster::accepting());
    let registry =
        registered_network(endorser.clone(), deliverer, broadcaster.clone()).await;

    let gateway = Gateway::new(registry, ed25519_signer());
    let result = gateway
        .network("mychannel")
        .contract("basic")
        .evaluate_transaction("query", ["alice"])
        .await
        .unwrap();

    assert_eq!(result, b"QUERY_RESULT");
    assert_eq!(endorser.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(
        broadcaster.calls.load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}
