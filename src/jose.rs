//! # JSON Object Signing and Encryption (JOSE)
//!
//! JOSE ([RFC7515], [RFC7517], [RFC7519]) types and helpers used to envelope
//! Verifiable Credentials and Presentations in compact JWS form.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
//! [RFC7519]: https://www.rfc-editor.org/rfc/rfc7519

pub mod jwk;
pub mod jws;
pub mod jwt;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Digital signature algorithms supported for JWS signing and verification,
/// as per the IANA "JSON Web Signature and Encryption Algorithms" registry.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum Algorithm {
    /// ECDSA using P-256 and SHA-256.
    #[default]
    ES256,

    /// EdDSA using Ed25519.
    EdDSA,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ES256 => write!(f, "ES256"),
            Self::EdDSA => write!(f, "EdDSA"),
        }
    }
}
