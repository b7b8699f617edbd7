//! # Validator
//!
//! Verifies credential and presentation envelopes against cryptographic,
//! temporal, and revocation predicates. Verification outcomes are expected
//! results, modelled as enums, never exceptional control flow.

use bitvec::order::Msb0;
use bitvec::vec::BitVec;

use crate::jose::jwk::{PublicKeyJwk, THUMBPRINT_URN};
use crate::jose::jws::{self, JwsSigned};
use crate::provider::{Clock, KeyResolver, LocalKeyResolver, SystemClock};
use crate::status;
use crate::w3c_vc::model::VerifiableCredential;
use crate::w3c_vc::proof::{VcClaims, VpClaims};

/// The revocation state of a credential, as far as the validator can tell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationStatus {
    /// The credential's bit is clear in the loaded list.
    Valid,

    /// The credential's bit is set in the loaded list.
    Revoked,

    /// No list has been loaded, the credential carries no status entry, or
    /// its status entry points to a list other than the loaded one.
    Unknown,
}

/// The outcome of verifying a credential envelope.
#[derive(Clone, Debug)]
pub enum CredentialVerification {
    /// All predicates passed. Carries the parsed claims.
    Success(Box<VcClaims>),

    /// Predicates passed but the credential is revoked in the loaded list.
    /// Carries the parsed claims.
    Revoked(Box<VcClaims>),

    /// The credential is bound to a different subject than expected.
    SubjectMismatch,

    /// The credential's validity window has passed.
    Expired,

    /// The credential's validity window has not begun.
    NotYetValid,

    /// The envelope is malformed or its signature did not verify.
    InvalidStructure,
}

/// The outcome of verifying a presentation envelope.
#[derive(Clone, Debug)]
pub enum PresentationVerification {
    /// The presentation verified. Contained credentials are partitioned by
    /// revocation state; a presentation wrapping revoked credentials still
    /// verifies; the verifier receives the partition.
    Success(Box<VerifiedPresentation>),

    /// The presentation's validity window has passed.
    Expired,

    /// The presentation's validity window has not begun.
    NotYetValid,

    /// The envelope is malformed, its signature did not verify, or it is
    /// scoped to a different audience or challenge.
    InvalidStructure,
}

/// A verified presentation with its contained credentials partitioned by
/// outcome.
#[derive(Clone, Debug)]
pub struct VerifiedPresentation {
    /// The parsed presentation claims.
    pub presentation: VpClaims,

    /// Contained credentials that verified and are not revoked.
    pub verifiable_credentials: Vec<VcClaims>,

    /// Contained credentials that verified but are revoked.
    pub revoked_verifiable_credentials: Vec<VcClaims>,

    /// Contained credentials that did not verify, as received.
    pub not_verified_credentials: Vec<String>,
}

// The revocation list in force, together with the URL its credential was
// published under.
#[derive(Clone, Debug)]
struct LoadedList {
    url: String,
    bits: BitVec<u8, Msb0>,
}

/// Verifies VC and VP envelopes. Each agent owns its validator; the validator
/// owns its key resolver and clock.
pub struct Validator {
    revocation: Option<LoadedList>,
    resolver: Box<dyn KeyResolver>,
    clock: Box<dyn Clock>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Creates a validator with local key resolution and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            revocation: None,
            resolver: Box::new(LocalKeyResolver),
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the key resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl KeyResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Verifies a credential envelope: structure, signature against the
    /// issuer's key, validity window, subject binding, and revocation state.
    ///
    /// `expected_subject` is the key identifier the caller expects the
    /// credential to be bound to; a holder passes its own identifier when
    /// receiving credentials. Pass `None` to skip subject binding.
    #[must_use]
    pub fn verify_vc_jws(
        &self, token: &str, expected_subject: Option<&str>,
    ) -> CredentialVerification {
        let Ok(jws) = jws::parse(token) else {
            return CredentialVerification::InvalidStructure;
        };
        let Ok(claims) = jws.to_claims::<VcClaims>() else {
            return CredentialVerification::InvalidStructure;
        };

        if self.verify_issuer_signature(&jws, &claims.iss).is_err() {
            return CredentialVerification::InvalidStructure;
        }

        let now = self.clock.now().timestamp();
        if now < claims.nbf {
            return CredentialVerification::NotYetValid;
        }
        if now > claims.exp {
            return CredentialVerification::Expired;
        }

        if let Some(expected) = expected_subject {
            if claims.sub != expected {
                return CredentialVerification::SubjectMismatch;
            }
        }

        if self.check_revocation_status(&claims.vc) == RevocationStatus::Revoked {
            return CredentialVerification::Revoked(Box::new(claims));
        }

        CredentialVerification::Success(Box::new(claims))
    }

    /// Verifies a presentation envelope: structure, signature against the
    /// holder's key, audience and challenge binding, validity window, and
    /// each contained credential (bound to the presentation's holder).
    #[must_use]
    pub fn verify_vp_jws(
        &self, token: &str, expected_challenge: &str, expected_audience: &str,
    ) -> PresentationVerification {
        let Ok(jws) = jws::parse(token) else {
            return PresentationVerification::InvalidStructure;
        };
        let Ok(claims) = jws.to_claims::<VpClaims>() else {
            return PresentationVerification::InvalidStructure;
        };

        if self.verify_issuer_signature(&jws, &claims.iss).is_err() {
            return PresentationVerification::InvalidStructure;
        }

        if claims.aud != expected_audience {
            return PresentationVerification::InvalidStructure;
        }
        if claims.nonce != expected_challenge {
            return PresentationVerification::InvalidStructure;
        }

        let now = self.clock.now().timestamp();
        if now < claims.nbf {
            return PresentationVerification::NotYetValid;
        }
        if now > claims.exp {
            return PresentationVerification::Expired;
        }

        let mut verified = VerifiedPresentation {
            presentation: claims.clone(),
            verifiable_credentials: vec![],
            revoked_verifiable_credentials: vec![],
            not_verified_credentials: vec![],
        };
        for vc_jws in &claims.vp.verifiable_credential {
            match self.verify_vc_jws(vc_jws, Some(&claims.iss)) {
                CredentialVerification::Success(vc) => {
                    verified.verifiable_credentials.push(*vc);
                }
                CredentialVerification::Revoked(vc) => {
                    verified.revoked_verifiable_credentials.push(*vc);
                }
                _ => verified.not_verified_credentials.push(vc_jws.clone()),
            }
        }

        PresentationVerification::Success(Box::new(verified))
    }

    /// Verifies and loads a revocation list credential. A subsequently
    /// verified credential whose status entry points at the loaded list is
    /// checked against its bitstring.
    ///
    /// Returns `false` on any verification or decoding failure.
    pub fn set_revocation_list(&mut self, token: &str) -> bool {
        let Ok(jws) = jws::parse(token) else {
            return false;
        };
        let Ok(claims) = jws.to_claims::<VcClaims>() else {
            return false;
        };
        if self.verify_issuer_signature(&jws, &claims.iss).is_err() {
            return false;
        }

        let Ok(bits) = status::decode_list(&claims.vc) else {
            return false;
        };

        // the published URL is the list subject's id, less its fragment
        let Some(subject_id) = claims.vc.credential_subject.id() else {
            return false;
        };
        let url = subject_id.split('#').next().unwrap_or(subject_id).to_string();

        self.revocation = Some(LoadedList { url, bits });
        true
    }

    /// Looks up the credential's bit in the loaded revocation list.
    ///
    /// Returns [`RevocationStatus::Unknown`] when no list has been loaded,
    /// the credential carries no status entry, or the entry points to a list
    /// other than the loaded one.
    #[must_use]
    pub fn check_revocation_status(&self, vc: &VerifiableCredential) -> RevocationStatus {
        let Some(list) = &self.revocation else {
            return RevocationStatus::Unknown;
        };
        let Some(credential_status) = &vc.credential_status else {
            return RevocationStatus::Unknown;
        };
        if credential_status.status_list_credential != list.url {
            return RevocationStatus::Unknown;
        }

        match list.bits.get(credential_status.status_list_index as usize) {
            Some(bit) if *bit => RevocationStatus::Revoked,
            Some(_) => RevocationStatus::Valid,
            None => RevocationStatus::Unknown,
        }
    }

    // Verify the JWS signature and confirm the verifying key belongs to the
    // claimed issuer identifier.
    fn verify_issuer_signature(&self, jws: &JwsSigned, iss: &str) -> Result<(), jws::Error> {
        let key = if jws.header.jwk.is_none() && jws.header.kid.is_none() {
            // no key hints in the header: fall back to the payload's issuer
            let resolved = self.resolver.resolve(iss).map_err(|e| {
                jws::Error::InvalidSignature(format!("issue resolving issuer key: {e}"))
            })?;
            jws::verify(jws, Some(&resolved), &*self.resolver)?
        } else {
            jws::verify(jws, None, &*self.resolver)?
        };

        if !key_matches_identifier(&key, iss) {
            return Err(jws::Error::InvalidSignature(
                "verification key does not belong to the issuer identifier".into(),
            ));
        }
        Ok(())
    }
}

// Confirms the key is the one the identifier names: a did:key identifier must
// decode to the same key, a thumbprint URN must match the key's thumbprint.
// Other identifier schemes are the resolver's responsibility.
pub(crate) fn key_matches_identifier(key: &PublicKeyJwk, identifier: &str) -> bool {
    if identifier.starts_with("did:key:") {
        return PublicKeyJwk::from_did_key(identifier)
            .is_ok_and(|derived| derived.x == key.x && derived.y == key.y);
    }
    if let Some(thumbprint) = identifier.strip_prefix(THUMBPRINT_URN) {
        return key.thumbprint().is_ok_and(|computed| computed == thumbprint);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::w3c_vc::model::{CredentialStatus, StatusPurpose, STATUS_TYPE};

    #[test]
    fn malformed_token_is_invalid_structure() {
        let validator = Validator::new();
        assert!(matches!(
            validator.verify_vc_jws("not-a-jws", None),
            CredentialVerification::InvalidStructure
        ));
        assert!(matches!(
            validator.verify_vp_jws("not-a-jws", "c", "aud"),
            PresentationVerification::InvalidStructure
        ));
    }

    #[test]
    fn status_unknown_without_list() {
        let validator = Validator::new();
        let vc = VerifiableCredential {
            credential_status: Some(CredentialStatus {
                id: "https://example.com/status/2024#0".into(),
                type_: STATUS_TYPE.into(),
                status_purpose: StatusPurpose::Revocation,
                status_list_index: 0,
                status_list_credential: "https://example.com/status/2024".into(),
            }),
            ..VerifiableCredential::default()
        };
        assert_eq!(validator.check_revocation_status(&vc), RevocationStatus::Unknown);
    }

    #[test]
    fn status_unknown_without_entry() {
        let validator = Validator::new();
        let vc = VerifiableCredential::default();
        assert_eq!(validator.check_revocation_status(&vc), RevocationStatus::Unknown);
    }

    #[test]
    fn set_revocation_list_rejects_garbage() {
        let mut validator = Validator::new();
        assert!(!validator.set_revocation_list("junk"));
    }
}
