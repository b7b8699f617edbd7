//! # SIOPv2 / OpenID for Verifiable Presentations
//!
//! Request and response marshalling for [SIOPv2] with the [OpenID4VP]
//! extension: the verifier (relying party) prepares an authentication
//! request URL; the wallet answers with an `id_token` (self-issued) and a
//! `vp_token` (a Verifiable Presentation scoped to the request's nonce);
//! the verifier validates both.
//!
//! [SIOPv2]: https://openid.net/specs/openid-connect-self-issued-v2-1_0.html
//! [OpenID4VP]: https://openid.net/specs/openid-4-verifiable-presentations-1_0.html

pub mod error;
pub mod types;
pub mod verifier;
pub mod wallet;

pub use error::Error;
pub use types::{AuthenticationResponse, ClientMetadata, IdToken, RequestObject, ResponseMode};
pub use verifier::OidcSiopVerifier;
pub use wallet::OidcSiopWallet;

/// `Result` type for the SIOP layer.
pub type Result<T> = std::result::Result<T, Error>;
