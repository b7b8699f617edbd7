//! # Revocation List Credential
//!
//! Publishing a revocation bitstring as a signed Verifiable Credential of
//! type `RevocationList2020Credential`, and extracting the bitstring from a
//! received one.

use anyhow::bail;
use bitvec::order::Msb0;
use bitvec::vec::BitVec;
use chrono::{DateTime, TimeDelta, Utc};

use crate::core::generate;
use crate::jose::jws::KeyBinding;
use crate::provider::Signer;
use crate::status::list::{self, RevocationList};
use crate::w3c_vc::model::{CredentialSubject, RevocationListSubject, VerifiableCredential};
use crate::w3c_vc::proof;
use crate::w3c_vc::registry::REVOCATION_LIST;

/// The `credentialSubject.type` of a revocation list credential.
pub const LIST_SUBJECT_TYPE: &str = "RevocationList2020";

/// Builds and signs the credential publishing the given list, valid for the
/// given window. The credential's `id` is the URL the issuer publishes the
/// list at, derived from `base_url` and the list's time period.
///
/// # Errors
///
/// Returns an error if encoding, credential building, or signing fails.
pub async fn list_credential(
    list: &RevocationList, base_url: &str, now: DateTime<Utc>, validity: TimeDelta,
    signer: &impl Signer,
) -> anyhow::Result<String> {
    let base_url = base_url.trim_end_matches('/');
    let id = format!("{base_url}/{}", list.time_period());

    let vc = VerifiableCredential::builder()
        .id(generate::urn())
        .add_type(REVOCATION_LIST)
        .issuer(signer.verification_method())
        .valid_between(now, now + validity)
        .subject(CredentialSubject::RevocationList(RevocationListSubject {
            id: format!("{id}#list"),
            type_: LIST_SUBJECT_TYPE.into(),
            encoded_list: list.encode()?,
        }))
        .build()?;

    proof::sign_credential(vc, signer, KeyBinding::KeyIdAndJwk).await
}

/// Extracts the revocation bitstring from a received list credential.
///
/// # Errors
///
/// Returns an error if the credential is not a revocation list credential or
/// the encoded list does not decode.
pub fn decode_list(vc: &VerifiableCredential) -> anyhow::Result<BitVec<u8, Msb0>> {
    if !vc.type_.iter().any(|t| t == REVOCATION_LIST) {
        bail!("credential is not a revocation list credential");
    }
    let CredentialSubject::RevocationList(subject) = &vc.credential_subject else {
        bail!("credential subject is not a revocation list");
    };
    list::decode_bits(&subject.encoded_list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_other_credentials() {
        let vc = VerifiableCredential {
            type_: vec!["VerifiableCredential".into(), "AtomicAttribute2023".into()],
            ..VerifiableCredential::default()
        };
        assert!(decode_list(&vc).is_err());
    }
}
