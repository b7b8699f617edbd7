//! # Credential Stores
//!
//! The issuer-side record of issued credentials and the holder-side record of
//! stored, verified credentials. Both are defined as traits with in-memory
//! implementations; persistence is the embedding application's concern.

use std::collections::HashMap;

use anyhow::bail;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::w3c_vc::proof::VcClaims;

/// An opaque byte blob delivered to the holder alongside a credential, named
/// by the issuer's data provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attachment {
    /// The attachment's name, matching the attribute it substantiates.
    pub name: String,

    /// Media type of the data, e.g. "`image/png`".
    pub media_type: String,

    /// The attachment bytes.
    pub data: Vec<u8>,

    /// Base64url-encoded SHA-256 digest of the data, computed at issue time
    /// so the bytes can be bound to the credential that references them.
    pub digest: String,
}

impl Attachment {
    /// Creates an attachment, computing its digest.
    #[must_use]
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        let digest = Base64UrlUnpadded::encode_string(&Sha256::digest(&data));
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data,
            digest,
        }
    }
}

/// The issuer's record of one issued credential: enough to locate its
/// revocation bit and account for its validity window. Created at issue;
/// only [`IssuerStore::mark_revoked`] mutates it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedCredentialRecord {
    /// The credential's `id` (the JWT `jti`).
    pub vc_id: String,

    /// The index assigned to the credential in the period's revocation list.
    /// Unique within the period.
    pub status_list_index: u32,

    /// The credential's concrete type tag.
    pub credential_type: String,

    /// The credential's `issuanceDate`.
    pub issuance_date: DateTime<Utc>,

    /// The credential's `expirationDate`.
    pub expiration_date: DateTime<Utc>,

    /// Whether the credential has been revoked.
    pub revoked: bool,

    /// The revocation list period the credential was issued in.
    pub time_period: i32,
}

/// Issuer-side persistent record of issued credentials.
pub trait IssuerStore: Send + Sync {
    /// Inserts a record for a newly issued credential.
    ///
    /// # Errors
    ///
    /// Returns an error if a record already exists for the credential id.
    fn insert(&mut self, record: IssuedCredentialRecord) -> anyhow::Result<()>;

    /// Looks up the record for a credential id.
    fn get(&self, vc_id: &str) -> Option<&IssuedCredentialRecord>;

    /// Marks the credential revoked. Returns `false` if no record exists.
    fn mark_revoked(&mut self, vc_id: &str) -> bool;

    /// Returns `true` if any credential was issued in the given period.
    fn issued_in_period(&self, time_period: i32) -> bool;
}

/// In-memory [`IssuerStore`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryIssuerStore {
    records: HashMap<String, IssuedCredentialRecord>,
}

impl IssuerStore for InMemoryIssuerStore {
    fn insert(&mut self, record: IssuedCredentialRecord) -> anyhow::Result<()> {
        if self.records.contains_key(&record.vc_id) {
            bail!("credential '{}' already recorded", record.vc_id);
        }
        self.records.insert(record.vc_id.clone(), record);
        Ok(())
    }

    fn get(&self, vc_id: &str) -> Option<&IssuedCredentialRecord> {
        self.records.get(vc_id)
    }

    fn mark_revoked(&mut self, vc_id: &str) -> bool {
        let Some(record) = self.records.get_mut(vc_id) else {
            return false;
        };
        record.revoked = true;
        true
    }

    fn issued_in_period(&self, time_period: i32) -> bool {
        self.records.values().any(|r| r.time_period == time_period)
    }
}

/// A credential held by a subject: the serialized envelope, its parsed
/// claims, and any attachments received with it. Never mutated once stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredCredential {
    /// The credential in compact JWS form, exactly as received.
    pub vc_jws: String,

    /// The parsed claims of the envelope.
    pub claims: VcClaims,

    /// Attachments received alongside the credential.
    pub attachments: Vec<Attachment>,
}

/// Holder-side record of stored, verified credentials.
pub trait SubjectStore: Send + Sync {
    /// Appends a credential. Insertion is atomic per credential.
    fn insert(&mut self, credential: StoredCredential);

    /// All stored credentials, in storage order.
    fn all(&self) -> &[StoredCredential];
}

/// In-memory [`SubjectStore`].
#[derive(Clone, Debug, Default)]
pub struct InMemorySubjectStore {
    credentials: Vec<StoredCredential>,
}

impl SubjectStore for InMemorySubjectStore {
    fn insert(&mut self, credential: StoredCredential) {
        self.credentials.push(credential);
    }

    fn all(&self) -> &[StoredCredential] {
        &self.credentials
    }
}
