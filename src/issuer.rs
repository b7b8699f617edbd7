//! # Issuer
//!
//! The issuer agent: issues credentials per credential type and subject,
//! revokes issued credentials, and publishes the revocation list as a signed
//! credential.

use std::collections::HashMap;

use chrono::{Datelike, TimeDelta};
use tracing::instrument;

use crate::core::generate;
use crate::jose::jws::KeyBinding;
use crate::provider::{Clock, DataProvider, Signer, SystemClock};
use crate::status::{self, RevocationList};
use crate::store::{
    Attachment, InMemoryIssuerStore, IssuedCredentialRecord, IssuerStore,
};
use crate::w3c_vc::model::{CredentialStatus, StatusPurpose, VerifiableCredential, STATUS_TYPE};
use crate::w3c_vc::proof::{self, VcClaims};
use crate::w3c_vc::registry;

/// How long an issued credential remains valid.
const CREDENTIAL_VALIDITY_DAYS: i64 = 365;

/// How long a published revocation list credential remains valid.
const LIST_VALIDITY_DAYS: i64 = 2;

/// A successfully issued credential, as handed to the holder.
#[derive(Clone, Debug)]
pub struct IssuedCredential {
    /// The signed credential in compact JWS form.
    pub vc_jws: String,

    /// The credential as issued.
    pub vc: VerifiableCredential,

    /// Attachments supplied by the data provider, to travel with the
    /// credential.
    pub attachments: Vec<Attachment>,
}

/// Why issuance failed for one credential type. Each requested type succeeds
/// or fails independently; partial success is normal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuanceFailure {
    /// The credential type has not been registered with this process.
    UnknownCredentialType(String),

    /// The data provider could not supply claims for the subject and type.
    NoData {
        /// The requested credential type.
        credential_type: String,
        /// The provider's failure description.
        reason: String,
    },

    /// The revocation list for the current period has no free indices.
    ListExhausted(String),

    /// The credential could not be signed or recorded.
    Issuance {
        /// The requested credential type.
        credential_type: String,
        /// The failure description.
        reason: String,
    },
}

/// The per-type partitioned outcome of an issuance request.
#[derive(Clone, Debug, Default)]
pub struct IssuedCredentialResult {
    /// Credentials issued, one per successful type.
    pub successful: Vec<IssuedCredential>,

    /// Types that could not be issued, with the reason.
    pub failed: Vec<IssuanceFailure>,
}

/// The issuer agent. Owns its signer, data provider, credential store, and
/// the revocation lists for each time period.
///
/// Mutating operations take `&mut self`, serializing them per issuer
/// instance.
pub struct IssuerAgent<S: Signer, D: DataProvider, T: IssuerStore = InMemoryIssuerStore> {
    signer: S,
    data: D,
    store: T,
    lists: HashMap<i32, RevocationList>,
    status_base_url: String,
    clock: Box<dyn Clock>,
}

impl<S: Signer, D: DataProvider> IssuerAgent<S, D, InMemoryIssuerStore> {
    /// Creates an issuer agent with an in-memory credential store.
    ///
    /// `status_base_url` is the URL prefix revocation list credentials are
    /// published under; the list for period `p` lives at
    /// `{status_base_url}/{p}`.
    pub fn new(signer: S, data: D, status_base_url: impl Into<String>) -> Self {
        Self {
            signer,
            data,
            store: InMemoryIssuerStore::default(),
            lists: HashMap::new(),
            status_base_url: status_base_url.into(),
            clock: Box::new(SystemClock),
        }
    }
}

impl<S: Signer, D: DataProvider, T: IssuerStore> IssuerAgent<S, D, T> {
    /// Replaces the credential store.
    #[must_use]
    pub fn with_store<U: IssuerStore>(self, store: U) -> IssuerAgent<S, D, U> {
        IssuerAgent {
            signer: self.signer,
            data: self.data,
            store,
            lists: self.lists,
            status_base_url: self.status_base_url,
            clock: self.clock,
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The issuer's key identifier.
    pub fn identifier(&self) -> String {
        self.signer.verification_method()
    }

    /// Issues one credential per requested type to the given subject,
    /// obtaining claims from the data provider. Each type is processed
    /// independently; the result partitions successes and failures.
    ///
    /// A revocation index is reserved for each credential and committed only
    /// when the credential is signed and recorded; a failed or cancelled
    /// issuance does not leak its index.
    #[instrument(level = "debug", skip_all, fields(subject = subject_id))]
    pub async fn issue_credential_with_types(
        &mut self, subject_id: &str, types: &[String],
    ) -> IssuedCredentialResult {
        tracing::debug!("issuer::issue_credential_with_types");

        let mut result = IssuedCredentialResult::default();
        for credential_type in types {
            match self.issue_one(subject_id, credential_type).await {
                Ok(issued) => result.successful.push(issued),
                Err(failure) => result.failed.push(failure),
            }
        }
        result
    }

    async fn issue_one(
        &mut self, subject_id: &str, credential_type: &str,
    ) -> Result<IssuedCredential, IssuanceFailure> {
        if !registry::is_registered(credential_type) {
            return Err(IssuanceFailure::UnknownCredentialType(credential_type.into()));
        }

        let data = self
            .data
            .get_credential(subject_id, credential_type)
            .await
            .map_err(|e| IssuanceFailure::NoData {
                credential_type: credential_type.into(),
                reason: e.to_string(),
            })?;

        let now = self.clock.now();
        let time_period = now.year();
        let list =
            self.lists.entry(time_period).or_insert_with(|| RevocationList::new(time_period));
        let Some(index) = list.allocate_index() else {
            return Err(IssuanceFailure::ListExhausted(credential_type.into()));
        };
        // the index is committed with the store record; until then the guard
        // returns it to the pool, also when the issuing future is dropped
        let mut reservation = IndexReservation {
            list,
            index,
            committed: false,
        };
        let list_url = format!("{}/{time_period}", self.status_base_url.trim_end_matches('/'));

        let mut subject = data.subject;
        subject.set_id(subject_id);

        let vc = VerifiableCredential::builder()
            .id(generate::urn())
            .add_type(credential_type)
            .issuer(self.signer.verification_method())
            .valid_between(now, now + TimeDelta::days(CREDENTIAL_VALIDITY_DAYS))
            .subject(subject)
            .status(CredentialStatus {
                id: format!("{list_url}#{index}"),
                type_: STATUS_TYPE.into(),
                status_purpose: StatusPurpose::Revocation,
                status_list_index: index,
                status_list_credential: list_url,
            })
            .build()
            .map_err(|e| IssuanceFailure::Issuance {
                credential_type: credential_type.into(),
                reason: e.to_string(),
            })?;

        let vc_jws = proof::sign_credential(vc.clone(), &self.signer, KeyBinding::KeyIdAndJwk)
            .await
            .map_err(|e| IssuanceFailure::Issuance {
                credential_type: credential_type.into(),
                reason: e.to_string(),
            })?;

        let record = IssuedCredentialRecord {
            vc_id: vc.id.clone(),
            status_list_index: index,
            credential_type: credential_type.into(),
            issuance_date: vc.issuance_date,
            expiration_date: vc.expiration_date,
            revoked: false,
            time_period,
        };
        self.store.insert(record).map_err(|e| IssuanceFailure::Issuance {
            credential_type: credential_type.into(),
            reason: e.to_string(),
        })?;
        reservation.committed = true;

        Ok(IssuedCredential {
            vc_jws,
            vc,
            attachments: data.attachments,
        })
    }

    /// Revokes the listed credentials: locates each by its `jti` in the
    /// issuer's store, marks it revoked, and sets its bit in the period's
    /// revocation list.
    ///
    /// Returns `true` iff every listed credential was found and revoked.
    /// The published list credential reflects the change only after the next
    /// [`Self::issue_revocation_list_credential`].
    #[instrument(level = "debug", skip_all)]
    pub fn revoke_credentials(&mut self, vc_jws_list: &[String]) -> bool {
        tracing::debug!("issuer::revoke_credentials");

        let mut all_revoked = true;

        for token in vc_jws_list {
            let claims: VcClaims = match crate::jose::jws::parse(token)
                .and_then(|jws| jws.to_claims())
            {
                Ok(claims) => claims,
                Err(_) => {
                    all_revoked = false;
                    continue;
                }
            };

            let Some(record) = self.store.get(&claims.jti) else {
                all_revoked = false;
                continue;
            };
            let (time_period, index) = (record.time_period, record.status_list_index);

            self.store.mark_revoked(&claims.jti);
            self.lists
                .entry(time_period)
                .or_insert_with(|| RevocationList::new(time_period))
                .revoke(index);
        }

        all_revoked
    }

    /// Builds and signs the revocation list credential for the given period,
    /// reflecting all revocations to date. Returns `None` for a period in
    /// which no credential was ever issued.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or signing fails.
    #[instrument(level = "debug", skip_all)]
    pub async fn issue_revocation_list_credential(
        &mut self, time_period: i32,
    ) -> anyhow::Result<Option<String>> {
        tracing::debug!("issuer::issue_revocation_list_credential");

        if !self.store.issued_in_period(time_period) {
            return Ok(None);
        }

        let now = self.clock.now();
        let list =
            self.lists.entry(time_period).or_insert_with(|| RevocationList::new(time_period));

        let list_jws = status::list_credential(
            list,
            &self.status_base_url,
            now,
            TimeDelta::days(LIST_VALIDITY_DAYS),
            &self.signer,
        )
        .await?;

        Ok(Some(list_jws))
    }
}

// Returns a drawn index to the pool unless the issuance it belongs to
// committed, including when the issuing future is dropped mid-flight.
struct IndexReservation<'a> {
    list: &'a mut RevocationList,
    index: u32,
    committed: bool,
}

impl Drop for IndexReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.list.release_index(self.index);
        }
    }
}
