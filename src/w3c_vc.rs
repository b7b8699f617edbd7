//! # W3C Verifiable Credentials
//!
//! Data model types for Verifiable Credentials and Presentations
//! ([W3C VC Data Model v1.1]), the JWT claim envelopes that secure them, and
//! the registry of credential subject types known to the process.
//!
//! [W3C VC Data Model v1.1]: https://www.w3.org/TR/vc-data-model

pub mod model;
pub mod proof;
pub mod registry;

/// The base context for Verifiable Credentials and Presentations.
pub const BASE_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// The base type tag for Verifiable Credentials.
pub const VC_TYPE: &str = "VerifiableCredential";

/// The base type tag for Verifiable Presentations.
pub const VP_TYPE: &str = "VerifiablePresentation";
