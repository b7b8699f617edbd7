//! # Status
//!
//! Credential revocation via [Revocation List 2020]: a bitstring of revoked
//! credential indices, maintained by the issuer and published as a signed
//! credential for holders and verifiers to consume.
//!
//! [Revocation List 2020]: https://w3c-ccg.github.io/vc-status-rl-2020

pub mod credential;
pub mod list;

pub use credential::{decode_list, list_credential};
pub use list::RevocationList;
