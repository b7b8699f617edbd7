//! # Enveloping Proofs
//!
//! Securing credentials and presentations with JWS enveloping proofs, per
//! [Securing Verifiable Credentials using JOSE and COSE]. The credential (or
//! presentation) is the payload of a JWT whose registered claims mirror the
//! document's own fields.
//!
//! [Securing Verifiable Credentials using JOSE and COSE]: https://w3c.github.io/vc-jose-cose

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::jose::jws::{self, KeyBinding};
use crate::jose::jwt::Type;
use crate::provider::Signer;
use crate::w3c_vc::model::{VerifiableCredential, VerifiablePresentation};

// How long a signed presentation remains acceptable to a verifier.
fn presentation_validity() -> TimeDelta {
    TimeDelta::hours(1)
}

/// Claims of a Verifiable Credential JWT. The envelope restates the
/// credential's identity and validity window as registered JWT claims.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct VcClaims {
    /// The issuer's key identifier: the credential's `issuer`.
    pub iss: String,

    /// The credential's `id`.
    pub jti: String,

    /// The subject's key identifier: the `credentialSubject.id` the
    /// credential is intended for.
    pub sub: String,

    /// The credential's `issuanceDate` as a UNIX timestamp.
    pub nbf: i64,

    /// The credential's `issuanceDate` as a UNIX timestamp.
    pub iat: i64,

    /// The credential's `expirationDate` as a UNIX timestamp.
    pub exp: i64,

    /// The Verifiable Credential itself.
    pub vc: VerifiableCredential,
}

impl From<VerifiableCredential> for VcClaims {
    fn from(vc: VerifiableCredential) -> Self {
        Self {
            iss: vc.issuer.clone(),
            jti: vc.id.clone(),
            sub: vc.credential_subject.id().unwrap_or_default().to_string(),
            nbf: vc.issuance_date.timestamp(),
            iat: vc.issuance_date.timestamp(),
            exp: vc.expiration_date.timestamp(),
            vc,
        }
    }
}

/// Claims of a Verifiable Presentation JWT. `iss` and `sub` are both the
/// holder; `aud` binds the presentation to one verifier and `nonce` to one
/// challenge.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct VpClaims {
    /// The holder's key identifier.
    pub iss: String,

    /// The holder's key identifier (same as `iss`; the presentation is
    /// self-issued).
    pub sub: String,

    /// The presentation's `id`.
    pub jti: String,

    /// The verifier's key identifier the presentation is scoped to.
    pub aud: String,

    /// The challenge from the verifier's request, echoed to prevent replay.
    pub nonce: String,

    /// The time the presentation was created, as a UNIX timestamp.
    pub nbf: i64,

    /// The time the presentation was created, as a UNIX timestamp.
    pub iat: i64,

    /// The time the presentation expires, as a UNIX timestamp.
    pub exp: i64,

    /// The Verifiable Presentation itself.
    pub vp: VerifiablePresentation,
}

impl VpClaims {
    /// Builds the claims for a presentation scoped to the given verifier and
    /// challenge, valid from `now`.
    #[must_use]
    pub fn new(
        vp: VerifiablePresentation, audience: impl Into<String>, nonce: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            iss: vp.holder.clone(),
            sub: vp.holder.clone(),
            jti: vp.id.clone(),
            aud: audience.into(),
            nonce: nonce.into(),
            nbf: now.timestamp(),
            iat: now.timestamp(),
            exp: (now + presentation_validity()).timestamp(),
            vp,
        }
    }
}

/// Envelope the credential in a JWT and sign it, returning the compact JWS.
///
/// # Errors
///
/// Returns an error if serialization or signing fails.
pub async fn sign_credential(
    vc: VerifiableCredential, signer: &impl Signer, binding: KeyBinding,
) -> anyhow::Result<String> {
    let claims = VcClaims::from(vc);
    jws::encode(Type::Jwt, &claims, signer, binding).await
}

/// Envelope the presentation in a JWT scoped to `audience` and `nonce`, and
/// sign it, returning the compact JWS.
///
/// # Errors
///
/// Returns an error if serialization or signing fails.
pub async fn sign_presentation(
    vp: VerifiablePresentation, audience: &str, nonce: &str, now: DateTime<Utc>,
    signer: &impl Signer, binding: KeyBinding,
) -> anyhow::Result<String> {
    let claims = VpClaims::new(vp, audience, nonce, now);
    jws::encode(Type::Jwt, &claims, signer, binding).await
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::w3c_vc::model::{AtomicAttribute, CredentialSubject};

    #[test]
    fn vc_claims_mirror_credential() {
        let vc = VerifiableCredential::builder()
            .id("urn:uuid:5cbdb0ff-e800-4a3b-aa6a-b4b4775cba45")
            .add_type("AtomicAttribute2023")
            .issuer("did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK")
            .valid_between(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            )
            .subject(CredentialSubject::Atomic(AtomicAttribute {
                id: Some("did:example:holder".into()),
                name: "given-name".into(),
                value: "Susanne".into(),
                mime_type: None,
            }))
            .build()
            .expect("should build");

        let claims = VcClaims::from(vc.clone());
        assert_eq!(claims.iss, vc.issuer);
        assert_eq!(claims.jti, vc.id);
        assert_eq!(claims.sub, "did:example:holder");
        assert_eq!(claims.nbf, vc.issuance_date.timestamp());
        assert_eq!(claims.exp, vc.expiration_date.timestamp());
    }
}
