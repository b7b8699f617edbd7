//! # Holder
//!
//! The holder agent: verifies and stores credentials issued to it, tracks
//! their revocation status, and builds Verifiable Presentations scoped to a
//! verifier and challenge.

use tracing::instrument;

use crate::core::generate;
use crate::jose::jws::KeyBinding;
use crate::provider::{Clock, Signer, SystemClock};
use crate::store::{Attachment, InMemorySubjectStore, StoredCredential, SubjectStore};
use crate::validator::{CredentialVerification, RevocationStatus, Validator};
use crate::w3c_vc::model::VerifiablePresentation;
use crate::w3c_vc::proof::{self, VcClaims};

/// A credential as received from an issuer, with any attachments delivered
/// alongside it.
#[derive(Clone, Debug, Default)]
pub struct CredentialInput {
    /// The credential in compact JWS form.
    pub vc_jws: String,

    /// Attachments received with the credential.
    pub attachments: Vec<Attachment>,
}

/// The per-credential partitioned outcome of a store request. Each input is
/// independently classified; partial success is normal.
#[derive(Clone, Debug, Default)]
pub struct StoredCredentialsResult {
    /// Credentials that verified and were persisted.
    pub accepted: Vec<VcClaims>,

    /// Credentials that verified but are revoked, as received. Not
    /// persisted.
    pub rejected: Vec<String>,

    /// Credentials that failed verification: malformed, mis-signed, not
    /// bound to this holder, or outside their validity window. Not
    /// persisted.
    pub not_verified: Vec<String>,

    /// Attachments of the accepted credentials.
    pub attachments: Vec<Attachment>,
}

/// A stored credential together with its revocation status, derived at the
/// time of the call.
#[derive(Clone, Debug)]
pub struct CredentialView {
    /// The credential in compact JWS form, exactly as stored.
    pub vc_jws: String,

    /// The parsed claims.
    pub claims: VcClaims,

    /// The credential's revocation status against the currently loaded
    /// list.
    pub status: RevocationStatus,
}

/// The holder agent. Owns its signer, credential store, and validator; the
/// validator in turn owns the revocation list in force.
///
/// Mutating operations take `&mut self`, serializing them per holder
/// instance.
pub struct HolderAgent<S: Signer, T: SubjectStore = InMemorySubjectStore> {
    signer: S,
    store: T,
    validator: Validator,
    clock: Box<dyn Clock>,
}

impl<S: Signer> HolderAgent<S, InMemorySubjectStore> {
    /// Creates a holder agent with an in-memory store and a default
    /// validator.
    pub fn new(signer: S) -> Self {
        Self {
            signer,
            store: InMemorySubjectStore::default(),
            validator: Validator::new(),
            clock: Box::new(SystemClock),
        }
    }
}

impl<S: Signer, T: SubjectStore> HolderAgent<S, T> {
    /// Replaces the credential store.
    #[must_use]
    pub fn with_store<U: SubjectStore>(self, store: U) -> HolderAgent<S, U> {
        HolderAgent {
            signer: self.signer,
            store,
            validator: self.validator,
            clock: self.clock,
        }
    }

    /// Replaces the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Replaces the clock used to timestamp presentations.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The holder's key identifier.
    pub fn identifier(&self) -> String {
        self.signer.verification_method()
    }

    /// Verifies and stores the given credentials. Each input is classified
    /// independently: verified credentials are persisted (atomically per
    /// input), revoked ones are rejected, and everything else, including
    /// credentials bound to a different subject, is not verified.
    #[instrument(level = "debug", skip_all)]
    #[allow(clippy::unused_async)]
    pub async fn store_credentials(
        &mut self, inputs: Vec<CredentialInput>,
    ) -> StoredCredentialsResult {
        tracing::debug!("holder::store_credentials");

        let identifier = self.identifier();
        let mut result = StoredCredentialsResult::default();

        for input in inputs {
            match self.validator.verify_vc_jws(&input.vc_jws, Some(&identifier)) {
                CredentialVerification::Success(claims) => {
                    result.accepted.push(*claims.clone());
                    result.attachments.extend(input.attachments.iter().cloned());
                    self.store.insert(StoredCredential {
                        vc_jws: input.vc_jws,
                        claims: *claims,
                        attachments: input.attachments,
                    });
                }
                CredentialVerification::Revoked(_) => result.rejected.push(input.vc_jws),
                _ => result.not_verified.push(input.vc_jws),
            }
        }
        result
    }

    /// Stores the given credentials without verification. The caller asserts
    /// their validity. Returns `false` if any input does not parse.
    #[allow(clippy::unused_async)]
    pub async fn store_validated_credentials(&mut self, inputs: Vec<CredentialInput>) -> bool {
        tracing::debug!("holder::store_validated_credentials");

        let mut all_stored = true;
        for input in inputs {
            let Ok(claims) = crate::jose::jws::parse(&input.vc_jws)
                .and_then(|jws| jws.to_claims::<VcClaims>())
            else {
                all_stored = false;
                continue;
            };
            self.store.insert(StoredCredential {
                vc_jws: input.vc_jws,
                claims,
                attachments: input.attachments,
            });
        }
        all_stored
    }

    /// Verifies and loads a revocation list credential. The list takes
    /// effect immediately: it governs subsequent stores, status lookups, and
    /// presentation building.
    ///
    /// Returns `false` on any verification or decoding failure.
    pub fn set_revocation_list(&mut self, token: &str) -> bool {
        self.validator.set_revocation_list(token)
    }

    /// Returns stored credentials with their revocation status, derived at
    /// call time. When `attribute_types` is given, only credentials whose
    /// type list overlaps it are returned.
    #[must_use]
    pub fn get_credentials(&self, attribute_types: Option<&[String]>) -> Vec<CredentialView> {
        self.store
            .all()
            .iter()
            .filter(|stored| matches_types(stored, attribute_types))
            .map(|stored| CredentialView {
                vc_jws: stored.vc_jws.clone(),
                claims: stored.claims.clone(),
                status: self.validator.check_revocation_status(&stored.claims.vc),
            })
            .collect()
    }

    /// Builds and signs a presentation for the given challenge and audience,
    /// selecting stored credentials that match `attribute_types` (when
    /// given) and are not revoked.
    ///
    /// Returns `None` when no credential qualifies.
    ///
    /// # Errors
    ///
    /// Returns an error if presentation building or signing fails.
    #[instrument(level = "debug", skip_all)]
    pub async fn create_presentation(
        &self, challenge: &str, audience: &str, attribute_types: Option<&[String]>,
    ) -> anyhow::Result<Option<String>> {
        tracing::debug!("holder::create_presentation");

        let selected: Vec<String> = self
            .get_credentials(attribute_types)
            .into_iter()
            .filter(|view| view.status != RevocationStatus::Revoked)
            .map(|view| view.vc_jws)
            .collect();

        self.create_presentation_from(&selected, challenge, audience).await
    }

    /// Builds and signs a presentation wrapping the given serialized
    /// credentials, trusting the caller that they are valid.
    ///
    /// Returns `None` when `credentials` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if presentation building or signing fails.
    pub async fn create_presentation_from(
        &self, credentials: &[String], challenge: &str, audience: &str,
    ) -> anyhow::Result<Option<String>> {
        if credentials.is_empty() {
            return Ok(None);
        }

        let mut builder = VerifiablePresentation::builder()
            .id(generate::urn())
            .holder(self.identifier());
        for vc_jws in credentials {
            builder = builder.add_credential(vc_jws);
        }
        let vp = builder.build()?;

        let vp_jws = proof::sign_presentation(
            vp,
            audience,
            challenge,
            self.clock.now(),
            &self.signer,
            KeyBinding::KeyIdAndJwk,
        )
        .await?;

        Ok(Some(vp_jws))
    }
}

// Any-match over the credential's ordered type list.
fn matches_types(stored: &StoredCredential, attribute_types: Option<&[String]>) -> bool {
    let Some(types) = attribute_types else {
        return true;
    };
    stored.claims.vc.type_.iter().any(|t| types.contains(t))
}
