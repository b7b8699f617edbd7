//! # JSON Web Token (JWT)
//!
//! JWT header and envelope types ([RFC7519]).
//!
//! [RFC7519]: https://www.rfc-editor.org/rfc/rfc7519

use serde::{Deserialize, Serialize};

use crate::jose::jwk::PublicKeyJwk;
use crate::jose::Algorithm;

/// The JWT `typ` header parameter, declaring the media type of the token.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum Type {
    /// Verifiable Credential, Verifiable Presentation, and ID Token
    /// envelopes all use the plain JWT media type.
    #[default]
    #[serde(rename = "JWT")]
    Jwt,

    /// Authorization Request Object ([RFC9101]).
    ///
    /// [RFC9101]: https://www.rfc-editor.org/rfc/rfc9101
    #[serde(rename = "oauth-authz-req+jwt")]
    Request,
}

/// JWS protected header.
///
/// The key used to verify the signature is located from the header in the
/// order `jwk`, `x5c`, `kid`, unless the caller supplies the key out of
/// band.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Header {
    /// Digital signature algorithm identifier as per IANA "JSON Web Signature
    /// and Encryption Algorithms" registry.
    pub alg: Algorithm,

    /// Declares the media type of the JWS.
    pub typ: Type,

    /// Key identifier. When the signer's identifier is a DID URL or a
    /// JWK-thumbprint URN, the identifier doubles as the `kid`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// The public key material the token is bound to, embedded in full.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<PublicKeyJwk>,

    /// A certificate (or certificate chain) corresponding to the key used to
    /// sign the JWT. Preserved when parsing; certificate-based key resolution
    /// is not performed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
}

/// A decoded JWT: header and typed claims.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwt<T> {
    /// The JWT header.
    pub header: Header,

    /// The JWT claims.
    pub claims: T,
}
