//! # Providers
//!
//! Traits implemented by library users to supply cryptographic signing, key
//! resolution, credential claims data, and time. Each agent owns its provider
//! instances; key material never crosses an agent boundary.

use std::future::Future;

use anyhow::bail;
use chrono::{DateTime, Utc};

use crate::jose::jwk::PublicKeyJwk;
use crate::jose::Algorithm;
use crate::store::Attachment;
use crate::w3c_vc::model::CredentialSubject;

/// Signer is used by implementers to provide signing functionality for
/// Verifiable Credential issuance and Verifiable Presentation submissions.
///
/// Signing may dispatch to a platform keystore, so the fallible operations
/// are asynchronous.
pub trait Signer: Send + Sync {
    /// Sign the provided message bytes, returning the raw signature
    /// (`r || s` for ECDSA).
    fn try_sign(&self, msg: &[u8]) -> impl Future<Output = anyhow::Result<Vec<u8>>> + Send;

    /// The public key of the key pair used in signing, as a JWK. The
    /// possibility of key rotation means this key should only be referenced
    /// at the point of signing.
    fn public_jwk(&self) -> impl Future<Output = anyhow::Result<PublicKeyJwk>> + Send;

    /// The algorithm used by the signer.
    fn algorithm(&self) -> Algorithm;

    /// The identifier a verifier should use to locate the key that verifies
    /// this signer's signatures. Doubles as the agent's identifier: a
    /// `did:key` DID or a JWK-thumbprint URN.
    fn verification_method(&self) -> String;
}

/// Resolves a JWS `kid` header value to the public key it identifies.
///
/// The default resolver handles identifiers that materially contain their
/// key. Implementers can supply a resolver with access to external key
/// directories.
pub trait KeyResolver: Send + Sync {
    /// Resolve the key identifier to a public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier cannot be resolved.
    fn resolve(&self, kid: &str) -> anyhow::Result<PublicKeyJwk>;
}

/// Key resolution without any external lookup: `did:key` identifiers decode
/// locally. Thumbprint URNs carry no key material, so tokens bound to a
/// thumbprint must embed their JWK in the header instead.
#[derive(Clone, Debug, Default)]
pub struct LocalKeyResolver;

impl KeyResolver for LocalKeyResolver {
    fn resolve(&self, kid: &str) -> anyhow::Result<PublicKeyJwk> {
        if kid.starts_with("did:key:") {
            return PublicKeyJwk::from_did_key(kid);
        }
        bail!("cannot resolve key from '{kid}'");
    }
}

/// A source of the current time, injected so that temporal validity checks
/// are testable. Comparison against `nbf`/`exp` is exact, no skew allowance.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The system clock.
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {}

/// The claims and attachments to issue for one subject and credential type.
#[derive(Clone, Debug, Default)]
pub struct CredentialData {
    /// Claims about the subject, becoming the credential's
    /// `credentialSubject`.
    pub subject: CredentialSubject,

    /// Opaque attachments delivered to the holder alongside the credential.
    pub attachments: Vec<Attachment>,
}

/// Supplies the claims an issuer asserts for a given subject and credential
/// type.
pub trait DataProvider: Send + Sync {
    /// Returns the claims (and any attachments) for the subject and
    /// credential type.
    ///
    /// # Errors
    ///
    /// Returns an error if no data is available for the subject or the
    /// credential type is not handled.
    fn get_credential(
        &self, subject_id: &str, credential_type: &str,
    ) -> impl Future<Output = anyhow::Result<CredentialData>> + Send;
}
