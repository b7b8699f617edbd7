//! # Data Model
//!
//! Verifiable Credential and Verifiable Presentation types per the
//! [W3C VC Data Model v1.1], restricted to JWS-secured (enveloping proof)
//! credentials.
//!
//! [W3C VC Data Model v1.1]: https://www.w3.org/TR/vc-data-model

use std::collections::HashMap;

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::w3c_vc::{BASE_CONTEXT, VC_TYPE, VP_TYPE};

/// A `VerifiableCredential`: an issuer-signed assertion about a subject.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifiableCredential {
    /// The @context property maps property URIs into short-form aliases. It
    /// is an ordered set where the first item is the base credentials
    /// context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// The credential's URI, typically a UUID URN such as
    /// "`urn:uuid:e248bd25-cb53-4f7f-b381-f19ee59cba73`".
    pub id: String,

    /// Uniquely identifies the type of the credential: an ordered set whose
    /// first item is "`VerifiableCredential`", followed by the concrete type
    /// tag.
    #[serde(rename = "type")]
    pub type_: Vec<String>,

    /// The key identifier of the issuer: a `did:key` DID or JWK-thumbprint
    /// URN resolvable to the key that verifies the credential's signature.
    pub issuer: String,

    /// An RFC3339 date-time from which the credential is valid.
    #[serde(rename = "issuanceDate")]
    pub issuance_date: DateTime<Utc>,

    /// An RFC3339 date-time at which the credential ceases to be valid.
    /// Always later than `issuance_date`.
    #[serde(rename = "expirationDate")]
    pub expiration_date: DateTime<Utc>,

    /// Claims about the credential subject.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,

    /// Where and how the current revocation status of the credential can be
    /// checked.
    #[serde(rename = "credentialStatus")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<CredentialStatus>,
}

impl VerifiableCredential {
    /// Returns a new [`VcBuilder`], used to build a `VerifiableCredential`.
    #[must_use]
    pub fn builder() -> VcBuilder {
        VcBuilder::new()
    }
}

/// Claims about the subject referenced by a credential. A closed set of
/// variants; additional subject types deserialize into [`ExtensionSubject`]
/// and are accepted when their type tag has been registered at process start.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CredentialSubject {
    /// The subject of a revocation list credential.
    RevocationList(RevocationListSubject),

    /// A single named attribute asserted about the subject.
    Atomic(AtomicAttribute),

    /// A subject variant registered by the embedding application.
    Extension(ExtensionSubject),
}

impl Default for CredentialSubject {
    fn default() -> Self {
        Self::Atomic(AtomicAttribute::default())
    }
}

impl CredentialSubject {
    /// The URI identifying the subject of the claims, if set.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::RevocationList(subject) => Some(subject.id.as_str()),
            Self::Atomic(subject) => subject.id.as_deref(),
            Self::Extension(subject) => subject.id.as_deref(),
        }
    }

    /// Sets the URI identifying the subject of the claims.
    pub fn set_id(&mut self, id: impl Into<String>) {
        match self {
            Self::RevocationList(subject) => subject.id = id.into(),
            Self::Atomic(subject) => subject.id = Some(id.into()),
            Self::Extension(subject) => subject.id = Some(id.into()),
        }
    }
}

/// A single named attribute about a subject: the most common credential
/// subject shape.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AtomicAttribute {
    /// A URI that uniquely identifies the subject of the claim: the
    /// holder's key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The attribute name, e.g. "`given-name`".
    pub name: String,

    /// The attribute value. For binary content this is a digest of the
    /// attachment delivered alongside the credential.
    pub value: String,

    /// Media type of the value, set when the value is a digest of attached
    /// binary content.
    #[serde(rename = "mimeType")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// The subject of a `RevocationList2020Credential`: the compressed, encoded
/// bitstring of revoked credential indices.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RevocationListSubject {
    /// A URI identifying the list.
    pub id: String,

    /// Always "`RevocationList2020`".
    #[serde(rename = "type")]
    pub type_: String,

    /// `base64url(gzip(bitstring))` where bit `i` set means the credential
    /// assigned index `i` is revoked.
    #[serde(rename = "encodedList")]
    pub encoded_list: String,
}

/// A subject variant not built into the library. The embedding application
/// registers its type tags at initialization; claims are carried untyped.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExtensionSubject {
    /// A URI that uniquely identifies the subject of the claims.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Claims about the subject.
    #[serde(flatten)]
    pub claims: HashMap<String, Value>,
}

/// The purpose of a status entry.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusPurpose {
    /// The list tracks revocation.
    #[default]
    Revocation,
}

/// Used for the discovery of information about the current revocation status
/// of a credential.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CredentialStatus {
    /// A URI identifying this status entry.
    pub id: String,

    /// The status method. Always "`RevocationList2020Status`".
    #[serde(rename = "type")]
    pub type_: String,

    /// The purpose of the referenced list.
    #[serde(rename = "statusPurpose")]
    pub status_purpose: StatusPurpose,

    /// The position of the credential's status bit in the referenced list.
    #[serde(rename = "statusListIndex")]
    pub status_list_index: u32,

    /// The URL of the signed credential publishing the list.
    #[serde(rename = "statusListCredential")]
    pub status_list_credential: String,
}

/// The status method type tag for [`CredentialStatus`] entries.
pub const STATUS_TYPE: &str = "RevocationList2020Status";

/// A Verifiable Presentation: a holder-signed wrapper around one or more
/// credentials, scoped to a verifier and a challenge.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifiablePresentation {
    /// The @context property, as for credentials.
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// A unique identifier for the presentation.
    pub id: String,

    /// The type of presentation: "`VerifiablePresentation`".
    #[serde(rename = "type")]
    pub type_: Vec<String>,

    /// The key identifier of the entity generating the presentation.
    pub holder: String,

    /// The wrapped credentials, as raw compact-JWS strings.
    #[serde(rename = "verifiableCredential")]
    pub verifiable_credential: Vec<String>,
}

impl VerifiablePresentation {
    /// Returns a new [`VpBuilder`], used to build a `VerifiablePresentation`.
    #[must_use]
    pub fn builder() -> VpBuilder {
        VpBuilder::new()
    }
}

/// `VcBuilder` is used to build a [`VerifiableCredential`].
#[derive(Clone, Debug, Default)]
pub struct VcBuilder {
    vc: VerifiableCredential,
}

impl VcBuilder {
    /// Returns a new `VcBuilder` with the base context and type set.
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self::default();
        builder.vc.context.push(BASE_CONTEXT.into());
        builder.vc.type_.push(VC_TYPE.into());
        builder
    }

    /// Sets the `id` property.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.vc.id = id.into();
        self
    }

    /// Appends to the `type` property.
    #[must_use]
    pub fn add_type(mut self, type_: impl Into<String>) -> Self {
        self.vc.type_.push(type_.into());
        self
    }

    /// Sets the `issuer` property.
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.vc.issuer = issuer.into();
        self
    }

    /// Sets the validity window.
    #[must_use]
    pub fn valid_between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.vc.issuance_date = from;
        self.vc.expiration_date = until;
        self
    }

    /// Sets the `credentialSubject` property.
    #[must_use]
    pub fn subject(mut self, subject: CredentialSubject) -> Self {
        self.vc.credential_subject = subject;
        self
    }

    /// Sets the `credentialStatus` property.
    #[must_use]
    pub fn status(mut self, status: CredentialStatus) -> Self {
        self.vc.credential_status = Some(status);
        self
    }

    /// Turns this builder into a [`VerifiableCredential`].
    ///
    /// # Errors
    ///
    /// Fails if a mandatory field is not set or the validity window is
    /// inverted.
    pub fn build(self) -> anyhow::Result<VerifiableCredential> {
        if self.vc.id.is_empty() {
            bail!("no id set");
        }
        if self.vc.type_.len() < 2 {
            bail!("no concrete type set");
        }
        if self.vc.issuer.is_empty() {
            bail!("no issuer set");
        }
        if self.vc.expiration_date <= self.vc.issuance_date {
            bail!("expirationDate must be later than issuanceDate");
        }
        Ok(self.vc)
    }
}

/// `VpBuilder` is used to build a [`VerifiablePresentation`].
#[derive(Clone, Debug, Default)]
pub struct VpBuilder {
    vp: VerifiablePresentation,
}

impl VpBuilder {
    /// Returns a new `VpBuilder` with the base context and type set.
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self::default();
        builder.vp.context.push(BASE_CONTEXT.into());
        builder.vp.type_.push(VP_TYPE.into());
        builder
    }

    /// Sets the `id` property.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.vp.id = id.into();
        self
    }

    /// Sets the `holder` property.
    #[must_use]
    pub fn holder(mut self, holder: impl Into<String>) -> Self {
        self.vp.holder = holder.into();
        self
    }

    /// Appends a credential in compact JWS form.
    #[must_use]
    pub fn add_credential(mut self, vc_jws: impl Into<String>) -> Self {
        self.vp.verifiable_credential.push(vc_jws.into());
        self
    }

    /// Turns this builder into a [`VerifiablePresentation`].
    ///
    /// # Errors
    ///
    /// Fails if a mandatory field is not set.
    pub fn build(self) -> anyhow::Result<VerifiablePresentation> {
        if self.vp.id.is_empty() {
            bail!("no id set");
        }
        if self.vp.holder.is_empty() {
            bail!("no holder set");
        }
        Ok(self.vp)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn build_vc() -> VerifiableCredential {
        VerifiableCredential::builder()
            .id("urn:uuid:1dd81b70-a6b1-4eb3-9b0a-66e6f7f4b7e1")
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
            .expect("should build vc")
    }

    #[test]
    fn vc_serialization() {
        let vc = build_vc();
        let vc_json = serde_json::to_value(&vc).expect("should serialize");

        assert_eq!(
            *vc_json.get("type").expect("type should be set"),
            json!(["VerifiableCredential", "AtomicAttribute2023"])
        );
        assert_eq!(
            *vc_json.get("credentialSubject").expect("credentialSubject should be set"),
            json!({"id": "did:example:holder", "name": "given-name", "value": "Susanne"})
        );

        let vc_de: VerifiableCredential =
            serde_json::from_value(vc_json).expect("should deserialize");
        assert_eq!(vc_de, vc);
    }

    #[test]
    fn subject_variants_deserialize() {
        let atomic: CredentialSubject = serde_json::from_value(json!({
            "id": "did:example:holder", "name": "n", "value": "v"
        }))
        .expect("should deserialize");
        assert!(matches!(atomic, CredentialSubject::Atomic(_)));

        let list: CredentialSubject = serde_json::from_value(json!({
            "id": "https://example.com/status/2024#list",
            "type": "RevocationList2020",
            "encodedList": "H4sIAAAA"
        }))
        .expect("should deserialize");
        assert!(matches!(list, CredentialSubject::RevocationList(_)));

        let extension: CredentialSubject = serde_json::from_value(json!({
            "id": "did:example:holder", "degree": {"type": "BachelorDegree"}
        }))
        .expect("should deserialize");
        assert!(matches!(extension, CredentialSubject::Extension(_)));
    }

    #[test]
    fn inverted_validity_rejected() {
        let result = VerifiableCredential::builder()
            .id("urn:uuid:x")
            .add_type("AtomicAttribute2023")
            .issuer("did:key:z6Mk")
            .valid_between(
                Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            )
            .build();
        assert!(result.is_err());
    }
}
