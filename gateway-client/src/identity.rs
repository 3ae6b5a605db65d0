//! Client identity and the signing adapter
//!
//! Signing is injected: the gateway only ever calls a supplied function
//! with a digest and attaches whatever bytes come back. Key custody stays
//! outside this crate, whether the signer is inline or a process away.

use crate::{Error, Result};
use gateway_wire::common::SerializedIdentity;
use prost::Message;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Digest function over canonical payload bytes. Pluggable; defaults to
/// SHA-256.
pub type Hash = fn(&[u8]) -> Vec<u8>;

/// Injected signing function: digest in, signature bytes out.
pub type Sign = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync>;

/// SHA-256 digest, the default hash
pub fn sha256(message: &[u8]) -> Vec<u8> {
    Sha256::digest(message).to_vec()
}

/// A client identity: organization id plus credential bytes (PEM
/// certificate) proving membership.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Organization (MSP) id
    pub msp_id: String,

    /// Credential bytes, typically a PEM certificate
    pub credentials: Vec<u8>,
}

impl Identity {
    /// Create an identity
    pub fn new(msp_id: impl Into<String>, credentials: impl Into<Vec<u8>>) -> Self {
        Self {
            msp_id: msp_id.into(),
            credentials: credentials.into(),
        }
    }

    /// Deterministic creator bytes placed in signature headers
    pub fn to_bytes(&self) -> Vec<u8> {
        SerializedIdentity {
            msp_id: self.msp_id.clone(),
            id_bytes: self.credentials.clone(),
        }
        .encode_to_vec()
    }
}

/// An identity paired with its hash function and optional signing
/// implementation.
#[derive(Clone)]
pub struct SigningIdentity {
    identity: Identity,
    hash: Hash,
    sign: Option<Sign>,
}

impl SigningIdentity {
    /// Create a signer-less identity; dispatch will require pre-attached
    /// signatures until a sign function is supplied
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            hash: sha256,
            sign: None,
        }
    }

    /// Supply the signing implementation
    pub fn with_sign(mut self, sign: Sign) -> Self {
        self.sign = Some(sign);
        self
    }

    /// Replace the digest function
    pub fn with_hash(mut self, hash: Hash) -> Self {
        self.hash = hash;
        self
    }

    /// The identity being signed for
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Digest the given payload bytes
    pub fn hash(&self, message: &[u8]) -> Vec<u8> {
        (self.hash)(message)
    }

    /// The digest function itself, for reconstructing signable units
    pub fn hash_fn(&self) -> Hash {
        self.hash
    }

    /// Creator bytes for signature headers
    pub fn creator(&self) -> Vec<u8> {
        self.identity.to_bytes()
    }

    /// Whether a signing implementation was supplied
    pub fn can_sign(&self) -> bool {
        self.sign.is_some()
    }

    /// Sign a digest with the injected implementation. Fails with
    /// `UndefinedSigner` when none was supplied.
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>> {
        match &self.sign {
            Some(sign) => sign(digest),
            None => Err(Error::UndefinedSigner),
        }
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("identity", &self.identity)
            .field("can_sign", &self.sign.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creator_bytes_round_trip() {
        let identity = Identity::new("org1", b"cert bytes".to_vec());
        let bytes = identity.to_bytes();

        let decoded = SerializedIdentity::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.msp_id, "org1");
        assert_eq!(decoded.id_bytes, b"cert bytes");
    }

    #[test]
    fn test_sign_without_implementation_fails() {
        let signer = SigningIdentity::new(Identity::new("org1", Vec::new()));

        let err = signer.sign(b"digest").unwrap_err();
        assert!(matches!(err, Error::UndefinedSigner));
    }

    #[test]
    fn test_injected_sign_receives_digest() {
        let signer = SigningIdentity::new(Identity::new("org1", Vec::new()))
            .with_sign(Arc::new(|digest| Ok(digest.to_vec())));

        let signature = signer.sign(b"digest").unwrap();
        assert_eq!(signature, b"digest");
    }

    #[test]
    fn test_default_hash_is_sha256() {
        let signer = SigningIdentity::new(Identity::new("org1", Vec::new()));
        assert_eq!(signer.hash(b"message"), sha256(b"message"));
        assert_eq!(signer.hash(b"message").len(), 32);
    }

    #[test]
    fn test_custom_hash_replaces_default() {
        fn fixed(_: &[u8]) -> Vec<u8> {
            b"MY_DIGEST".to_vec()
        }

        let signer =
            SigningIdentity::new(Identity::new("org1", Vec::new())).with_hash(fixed);
        assert_eq!(signer.hash(b"anything"), b"MY_DIGEST");
    }
}
