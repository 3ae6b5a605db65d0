//! Wire-schema definitions for the ledger gateway
//!
//! Message structs and RPC client stubs for the services the gateway talks
//! to. The message definitions are maintained here directly in the form
//! `tonic` code generation emits, so the schema is reviewable source and the
//! build needs no protoc toolchain.
//!
//! Packages:
//! - `common` — envelope, header and identity messages shared by all services
//! - `peer` — validator endpoint: endorsement, delivery and discovery
//! - `orderer` — ordering endpoint: the atomic broadcast stream
//! - `gateway` — application-facing signable-unit wrappers

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod common;
pub mod gateway;
pub mod orderer;
pub mod peer;
