//! # Credenza
//!
//! An implementation of the [W3C Verifiable Credentials Data Model v1.1] with
//! JWS enveloping proofs, credential revocation via [Revocation List 2020],
//! and a [SIOPv2] / [OpenID4VP] presentation layer.
//!
//! The crate is organised around three roles:
//!
//! * [`issuer::IssuerAgent`]: issues credentials, maintains the revocation
//!   list, and publishes it as a signed list credential.
//! * [`holder::HolderAgent`]: verifies and stores received credentials and
//!   builds Verifiable Presentations scoped to a verifier and challenge.
//! * [`verifier::VerifierAgent`]: verifies presentations and individual
//!   credentials, consulting the published revocation list.
//!
//! Cryptographic signing is delegated to implementations of the
//! [`provider::Signer`] trait so that key material can live in platform
//! keystores. Signature *verification* is self-contained: verification keys
//! travel in JWS headers or are derived from `did:key` identifiers.
//!
//! [W3C Verifiable Credentials Data Model v1.1]: https://www.w3.org/TR/vc-data-model
//! [Revocation List 2020]: https://w3c-ccg.github.io/vc-status-rl-2020
//! [SIOPv2]: https://openid.net/specs/openid-connect-self-issued-v2-1_0.html
//! [OpenID4VP]: https://openid.net/specs/openid-4-verifiable-presentations-1_0.html

pub mod core;
pub mod dif_exch;
pub mod holder;
pub mod issuer;
pub mod jose;
pub mod provider;
pub mod siop;
pub mod status;
pub mod store;
pub mod validator;
pub mod verifier;
pub mod w3c_vc;

pub use crate::core::{Kind, OneMany};
