//! Ledger Gateway Client
//!
//! Client-side gateway for a permissioned distributed ledger: registers
//! per-organization trust roots and endpoints, builds and signs proposals,
//! and drives the evaluate / endorse / submit / commit-status pipeline
//! against validator and ordering endpoints.
//!
//! # Design
//!
//! - **One connection per endpoint**: dialed lazily on first registration,
//!   keyed by `host:port`, shared across channels
//! - **Signable units**: payload bytes, transaction id and digest are
//!   derived exactly once; signing is a pure attachment, so inline and
//!   offline signing produce byte-identical dispatch requests
//! - **No retries**: failures surface immediately with the failing
//!   endpoint's context, and endorsement-time RPC errors keep their gRPC
//!   status inspectable

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod commit;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod proposal;
pub mod registry;
pub mod testing;
pub mod transaction;
pub mod transport;

// Re-exports
pub use commit::{CommitOutcome, CommitRequest};
pub use config::GatewayConfig;
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use gateway::{CallOptions, Contract, FirstMemberSelector, Gateway, Network, Selector};
pub use identity::{sha256, Hash, Identity, Sign, SigningIdentity};
pub use proposal::{Proposal, ProposalBuilder};
pub use registry::EndpointRegistry;
pub use transaction::Transaction;
