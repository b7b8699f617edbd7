//! # Verifier
//!
//! The verifier agent: verifies presentations scoped to it and individual
//! credentials, consulting the published revocation list.

use tracing::instrument;

use crate::provider::Signer;
use crate::validator::{
    CredentialVerification, PresentationVerification, Validator, VerifiedPresentation,
};
use crate::w3c_vc::model::CredentialSubject;

/// The verifier agent. Owns its signer (the source of its identifier) and
/// its validator.
pub struct VerifierAgent<S: Signer> {
    signer: S,
    validator: Validator,
}

impl<S: Signer> VerifierAgent<S> {
    /// Creates a verifier agent with a default validator.
    pub fn new(signer: S) -> Self {
        Self {
            signer,
            validator: Validator::new(),
        }
    }

    /// Replaces the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// The verifier's key identifier: the audience holders scope their
    /// presentations to.
    pub fn identifier(&self) -> String {
        self.signer.verification_method()
    }

    /// Verifies a presentation envelope against this verifier as audience
    /// and the given challenge.
    #[instrument(level = "debug", skip_all)]
    #[must_use]
    pub fn verify_presentation(&self, vp_jws: &str, challenge: &str) -> PresentationVerification {
        tracing::debug!("verifier::verify_presentation");
        self.validator.verify_vp_jws(vp_jws, challenge, &self.identifier())
    }

    /// Verifies a single credential envelope. `expected_subject` binds the
    /// credential to a subject: a verifier that is itself the intended
    /// holder passes its own identifier; pass `None` to skip the binding
    /// check.
    #[must_use]
    pub fn verify_vc_jws(
        &self, vc_jws: &str, expected_subject: Option<&str>,
    ) -> CredentialVerification {
        self.validator.verify_vc_jws(vc_jws, expected_subject)
    }

    /// Verifies and loads a revocation list credential.
    ///
    /// Returns `false` on any verification or decoding failure.
    pub fn set_revocation_list(&mut self, token: &str) -> bool {
        self.validator.set_revocation_list(token)
    }

    /// Returns `true` if the ordered list of atomic attribute names across
    /// the presentation's verified credentials equals `names`.
    #[allow(clippy::unused_self)]
    #[must_use]
    pub fn verify_presentation_contains_attributes(
        &self, presentation: &VerifiedPresentation, names: &[String],
    ) -> bool {
        presentation_attributes(presentation) == names
    }
}

/// The ordered list of atomic attribute names across the presentation's
/// verified credentials.
#[must_use]
pub fn presentation_attributes(presentation: &VerifiedPresentation) -> Vec<String> {
    presentation
        .verifiable_credentials
        .iter()
        .filter_map(|claims| match &claims.vc.credential_subject {
            CredentialSubject::Atomic(attribute) => Some(attribute.name.clone()),
            _ => None,
        })
        .collect()
}
