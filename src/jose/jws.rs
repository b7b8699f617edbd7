//! # JSON Web Signature (JWS)
//!
//! JWS ([RFC7515]) represents content secured with digital signatures using
//! JSON-based data structures. This module implements the compact
//! serialization: parsing, signing, and signature verification.
//!
//! Verification keys are resolved in priority order: a caller-supplied key,
//! the header's embedded `jwk`, then the header's `kid` through a
//! [`KeyResolver`]. A `kid` carrying a JWK-thumbprint URN additionally pins
//! any embedded `jwk` to that thumbprint.
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515

use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::Verifier as _;
use p256::ecdsa::signature::Verifier as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::jose::jwk::{Curve, PublicKeyJwk, THUMBPRINT_URN};
use crate::jose::jwt::{Header, Type};
use crate::provider::{KeyResolver, Signer};

/// Errors produced by the JWS codec. Malformed input and failed signature
/// checks are expected outcomes for a verifier, so callers typically map
/// these onto verification result variants rather than propagating them.
#[derive(Error, Debug)]
pub enum Error {
    /// The token is not a structurally valid compact JWS: bad segmenting,
    /// bad Base64, bad JSON, or an unsupported `alg`.
    #[error("invalid JWS structure: {0}")]
    InvalidStructure(String),

    /// The signature did not verify, or no verification key could be
    /// resolved.
    #[error("invalid JWS signature: {0}")]
    InvalidSignature(String),
}

/// A parsed compact JWS. The payload is kept as raw bytes; interpreting it
/// is the caller's concern.
#[derive(Clone, Debug)]
pub struct JwsSigned {
    /// The decoded protected header.
    pub header: Header,

    /// The raw payload bytes.
    pub payload: Vec<u8>,

    /// The raw signature bytes.
    pub signature: Vec<u8>,

    /// The signature input: `base64url(header) "." base64url(payload)`.
    pub signing_input: String,
}

impl JwsSigned {
    /// Deserializes the payload into typed claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStructure`] if the payload is not valid JSON
    /// for the target type.
    pub fn to_claims<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| Error::InvalidStructure(format!("issue deserializing claims: {e}")))
    }
}

/// Which key hints the signer embeds in the protected header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyBinding {
    /// Set `kid` to the signer's verification method.
    #[default]
    KeyId,

    /// Embed the signer's public key as `jwk`.
    Jwk,

    /// Set `kid` and embed `jwk`.
    KeyIdAndJwk,
}

/// Parse a compact JWS into its constituent parts.
///
/// # Errors
///
/// Returns [`Error::InvalidStructure`] if the token does not split into three
/// parts, a part is not valid Base64URL, or the header is not valid JSON.
pub fn parse(token: &str) -> Result<JwsSigned, Error> {
    let parts = token.split('.').collect::<Vec<&str>>();
    if parts.len() != 3 {
        return Err(Error::InvalidStructure("token is not three dot-separated parts".into()));
    }

    let header_bytes = Base64UrlUnpadded::decode_vec(parts[0])
        .map_err(|e| Error::InvalidStructure(format!("issue decoding header: {e}")))?;
    let header: Header = serde_json::from_slice(&header_bytes)
        .map_err(|e| Error::InvalidStructure(format!("issue deserializing header: {e}")))?;

    let payload = Base64UrlUnpadded::decode_vec(parts[1])
        .map_err(|e| Error::InvalidStructure(format!("issue decoding payload: {e}")))?;
    let signature = Base64UrlUnpadded::decode_vec(parts[2])
        .map_err(|e| Error::InvalidStructure(format!("issue decoding signature: {e}")))?;

    Ok(JwsSigned {
        header,
        payload,
        signature,
        signing_input: format!("{}.{}", parts[0], parts[1]),
    })
}

/// Encode the provided claims and sign, returning the token in compact JWS
/// form.
///
/// # Errors
///
/// Returns an error if the claims cannot be serialized or the signer fails.
pub async fn encode<T>(
    typ: Type, claims: &T, signer: &impl Signer, binding: KeyBinding,
) -> anyhow::Result<String>
where
    T: Serialize + Send + Sync,
{
    tracing::debug!("jws::encode");

    let mut header = Header {
        alg: signer.algorithm(),
        typ,
        ..Header::default()
    };
    match binding {
        KeyBinding::KeyId => {
            header.kid = Some(signer.verification_method());
        }
        KeyBinding::Jwk => {
            header.jwk = Some(signer.public_jwk().await?);
        }
        KeyBinding::KeyIdAndJwk => {
            header.kid = Some(signer.verification_method());
            header.jwk = Some(signer.public_jwk().await?);
        }
    }

    let header_enc = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header)?);
    let claims_enc = Base64UrlUnpadded::encode_string(&serde_json::to_vec(claims)?);
    let signing_input = format!("{header_enc}.{claims_enc}");

    let sig = signer.try_sign(signing_input.as_bytes()).await?;
    let sig_enc = Base64UrlUnpadded::encode_string(&sig);

    Ok(format!("{signing_input}.{sig_enc}"))
}

/// Verify a parsed JWS, resolving the verification key from the caller, the
/// header, or the resolver. Returns the key the signature verified against.
///
/// # Errors
///
/// Returns [`Error::InvalidSignature`] if no key can be resolved or the
/// signature does not verify.
pub fn verify(
    jws: &JwsSigned, expected_key: Option<&PublicKeyJwk>, resolver: &dyn KeyResolver,
) -> Result<PublicKeyJwk, Error> {
    let jwk = resolve_key(jws, expected_key, resolver)?;
    verify_signature(&jwk, &jws.signing_input, &jws.signature)?;
    Ok(jwk)
}

// Key resolution priority: caller-supplied key, embedded `jwk` (pinned to the
// `kid` thumbprint when the `kid` is a thumbprint URN), then `kid` via the
// resolver.
fn resolve_key(
    jws: &JwsSigned, expected_key: Option<&PublicKeyJwk>, resolver: &dyn KeyResolver,
) -> Result<PublicKeyJwk, Error> {
    if let Some(key) = expected_key {
        return Ok(key.clone());
    }

    if let Some(jwk) = &jws.header.jwk {
        if let Some(kid) = &jws.header.kid {
            if let Some(thumbprint) = kid.strip_prefix(THUMBPRINT_URN) {
                let computed = jwk
                    .thumbprint()
                    .map_err(|e| Error::InvalidSignature(format!("issue computing thumbprint: {e}")))?;
                if thumbprint != computed {
                    return Err(Error::InvalidSignature(
                        "embedded JWK does not match 'kid' thumbprint".into(),
                    ));
                }
            }
        }
        return Ok(jwk.clone());
    }

    let Some(kid) = &jws.header.kid else {
        return Err(Error::InvalidSignature("no verification key in header".into()));
    };
    resolver.resolve(kid).map_err(|e| Error::InvalidSignature(format!("issue resolving key: {e}")))
}

/// Verify the signature of the provided message using the JWK.
///
/// # Errors
///
/// Returns [`Error::InvalidSignature`] if the signature is invalid or the key
/// is malformed.
pub fn verify_signature(jwk: &PublicKeyJwk, msg: &str, sig: &[u8]) -> Result<(), Error> {
    match jwk.crv {
        Curve::P256 => verify_es256(jwk, msg, sig),
        Curve::Ed25519 => verify_eddsa(jwk, msg, sig),
    }
}

// Verify the signature of the provided message using the ES256 algorithm.
fn verify_es256(jwk: &PublicKeyJwk, msg: &str, sig: &[u8]) -> Result<(), Error> {
    use p256::ecdsa::{Signature, VerifyingKey};

    let y = jwk
        .y
        .as_ref()
        .ok_or_else(|| Error::InvalidSignature("EC key is missing 'y'".into()))?;

    let mut sec1 = vec![0x04]; // uncompressed format
    sec1.append(
        &mut Base64UrlUnpadded::decode_vec(&jwk.x)
            .map_err(|e| Error::InvalidSignature(format!("issue decoding 'x': {e}")))?,
    );
    sec1.append(
        &mut Base64UrlUnpadded::decode_vec(y)
            .map_err(|e| Error::InvalidSignature(format!("issue decoding 'y': {e}")))?,
    );

    let verifying_key = VerifyingKey::from_sec1_bytes(&sec1)
        .map_err(|e| Error::InvalidSignature(format!("issue building verifying key: {e}")))?;
    let signature = Signature::from_slice(sig)
        .map_err(|e| Error::InvalidSignature(format!("issue building signature: {e}")))?;

    verifying_key
        .verify(msg.as_bytes(), &signature)
        .map_err(|e| Error::InvalidSignature(format!("signature verification failed: {e}")))
}

// Verify the signature of the provided message using the EdDSA algorithm.
fn verify_eddsa(jwk: &PublicKeyJwk, msg: &str, sig: &[u8]) -> Result<(), Error> {
    use ed25519_dalek::{Signature, VerifyingKey};

    let x_bytes = Base64UrlUnpadded::decode_vec(&jwk.x)
        .map_err(|e| Error::InvalidSignature(format!("issue decoding 'x': {e}")))?;
    let bytes: [u8; 32] = x_bytes
        .try_into()
        .map_err(|_| Error::InvalidSignature("invalid public key length".into()))?;
    let verifying_key = VerifyingKey::from_bytes(&bytes)
        .map_err(|e| Error::InvalidSignature(format!("issue building verifying key: {e}")))?;
    let signature = Signature::from_slice(sig)
        .map_err(|e| Error::InvalidSignature(format!("issue building signature: {e}")))?;

    verifying_key
        .verify(msg.as_bytes(), &signature)
        .map_err(|e| Error::InvalidSignature(format!("signature verification failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LocalKeyResolver;

    #[test]
    fn parse_rejects_bad_segmenting() {
        let Err(Error::InvalidStructure(_)) = parse("only.two") else {
            panic!("should reject two-part token");
        };
        let Err(Error::InvalidStructure(_)) = parse("a.b.c.d") else {
            panic!("should reject four-part token");
        };
    }

    #[test]
    fn parse_rejects_bad_base64() {
        let Err(Error::InvalidStructure(_)) = parse("!!!.payload.sig") else {
            panic!("should reject invalid base64");
        };
    }

    #[test]
    fn parse_rejects_unknown_alg() {
        // {"alg":"HS256","typ":"JWT"}
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
        let token = format!("{header}.e30.c2ln");
        let Err(Error::InvalidStructure(_)) = parse(&token) else {
            panic!("should reject unknown alg");
        };
    }

    #[test]
    fn verify_requires_resolvable_key() {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"ES256","typ":"JWT"}"#);
        let token = format!("{header}.e30.c2ln");
        let jws = parse(&token).expect("should parse");

        let Err(Error::InvalidSignature(_)) = verify(&jws, None, &LocalKeyResolver) else {
            panic!("should fail without a key");
        };
    }
}
