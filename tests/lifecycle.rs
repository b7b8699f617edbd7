//! End-to-end tests for the credential lifecycle: issuance, storage,
//! revocation, presentation, and verification.

mod provider;

use chrono::{Datelike, Utc};
use credenza::holder::{CredentialInput, HolderAgent};
use credenza::issuer::{IssuanceFailure, IssuerAgent};
use credenza::validator::{
    CredentialVerification, PresentationVerification, RevocationStatus,
};
use credenza::verifier::VerifierAgent;

use crate::provider::{holder_keystore, issuer_keystore, verifier_keystore, FixedDataProvider};

const STATUS_URL: &str = "https://issuer.example.com/status";
const ATTRIBUTE_TYPE: &str = "AtomicAttribute2023";

fn issuer() -> IssuerAgent<provider::Ed25519Keystore, FixedDataProvider> {
    IssuerAgent::new(issuer_keystore(), FixedDataProvider, STATUS_URL)
}

fn holder() -> HolderAgent<provider::Es256Keystore> {
    HolderAgent::new(holder_keystore())
}

fn verifier() -> VerifierAgent<provider::Es256Keystore> {
    VerifierAgent::new(verifier_keystore())
}

async fn issue_to(
    issuer: &mut IssuerAgent<provider::Ed25519Keystore, FixedDataProvider>, subject: &str,
) -> Vec<CredentialInput> {
    let result =
        issuer.issue_credential_with_types(subject, &[ATTRIBUTE_TYPE.to_string()]).await;
    assert!(result.failed.is_empty(), "issuance should succeed: {:?}", result.failed);

    result
        .successful
        .into_iter()
        .map(|issued| CredentialInput {
            vc_jws: issued.vc_jws,
            attachments: issued.attachments,
        })
        .collect()
}

#[tokio::test]
async fn happy_path() {
    let mut issuer = issuer();
    let mut holder = holder();
    let verifier = verifier();

    let issued = issue_to(&mut issuer, &holder.identifier()).await;
    let stored = holder.store_credentials(issued).await;
    assert_eq!(stored.accepted.len(), 1);
    assert!(stored.rejected.is_empty());
    assert!(stored.not_verified.is_empty());

    let vp_jws = holder
        .create_presentation("c1", &verifier.identifier(), None)
        .await
        .expect("should sign")
        .expect("should select a credential");

    let PresentationVerification::Success(verified) = verifier.verify_presentation(&vp_jws, "c1")
    else {
        panic!("presentation should verify");
    };
    assert_eq!(verified.verifiable_credentials.len(), 1);
    assert!(verified.revoked_verifiable_credentials.is_empty());
    assert!(verified.not_verified_credentials.is_empty());
    assert_eq!(verified.presentation.iss, holder.identifier());

    assert!(
        verifier.verify_presentation_contains_attributes(&verified, &["given-name".to_string()])
    );
    assert!(!verifier.verify_presentation_contains_attributes(&verified, &[]));
}

#[tokio::test]
async fn wrong_audience_rejected() {
    let mut issuer = issuer();
    let mut holder = holder();
    let verifier = verifier();

    let issued = issue_to(&mut issuer, &holder.identifier()).await;
    holder.store_credentials(issued).await;

    // scoped to the issuer, not the verifier
    let vp_jws = holder
        .create_presentation("c1", &issuer.identifier(), None)
        .await
        .expect("should sign")
        .expect("should select a credential");

    assert!(matches!(
        verifier.verify_presentation(&vp_jws, "c1"),
        PresentationVerification::InvalidStructure
    ));
}

#[tokio::test]
async fn wrong_challenge_rejected() {
    let mut issuer = issuer();
    let mut holder = holder();
    let verifier = verifier();

    let issued = issue_to(&mut issuer, &holder.identifier()).await;
    holder.store_credentials(issued).await;

    let vp_jws = holder
        .create_presentation("c1", &verifier.identifier(), None)
        .await
        .expect("should sign")
        .expect("should select a credential");

    assert!(matches!(
        verifier.verify_presentation(&vp_jws, "c2"),
        PresentationVerification::InvalidStructure
    ));
}

#[tokio::test]
async fn revocation_visible_to_verifier() {
    let mut issuer = issuer();
    let holder = holder();
    let mut verifier = verifier();

    let issued = issue_to(&mut issuer, &holder.identifier()).await;
    let vc_jws = issued[0].vc_jws.clone();

    assert!(issuer.revoke_credentials(&[vc_jws.clone()]));
    let list_jws = issuer
        .issue_revocation_list_credential(Utc::now().year())
        .await
        .expect("should issue list")
        .expect("the period should have issued credentials");

    assert!(verifier.set_revocation_list(&list_jws));
    assert!(matches!(
        verifier.verify_vc_jws(&vc_jws, None),
        CredentialVerification::Revoked(_)
    ));
}

#[tokio::test]
async fn revoke_before_store() {
    let mut issuer = issuer();
    let mut holder = holder();
    let verifier = verifier();

    let issued = issue_to(&mut issuer, &holder.identifier()).await;
    let issued_count = issued.len();

    let jws_list: Vec<String> = issued.iter().map(|input| input.vc_jws.clone()).collect();
    assert!(issuer.revoke_credentials(&jws_list));
    let list_jws = issuer
        .issue_revocation_list_credential(Utc::now().year())
        .await
        .expect("should issue list")
        .expect("the period should have issued credentials");

    // the freshly set list governs the store that follows
    assert!(holder.set_revocation_list(&list_jws));
    let stored = holder.store_credentials(issued).await;
    assert!(stored.accepted.is_empty());
    assert_eq!(stored.rejected.len(), issued_count);

    let presentation = holder
        .create_presentation("c1", &verifier.identifier(), None)
        .await
        .expect("should not error");
    assert!(presentation.is_none());
}

#[tokio::test]
async fn revoke_after_store() {
    let mut issuer = issuer();
    let mut holder = holder();
    let verifier = verifier();

    let issued = issue_to(&mut issuer, &holder.identifier()).await;
    let vc_jws = issued[0].vc_jws.clone();

    let stored = holder.store_credentials(issued).await;
    assert_eq!(stored.accepted.len(), 1);

    assert!(issuer.revoke_credentials(&[vc_jws]));
    let list_jws = issuer
        .issue_revocation_list_credential(Utc::now().year())
        .await
        .expect("should issue list")
        .expect("the period should have issued credentials");
    assert!(holder.set_revocation_list(&list_jws));

    let presentation = holder
        .create_presentation("c1", &verifier.identifier(), None)
        .await
        .expect("should not error");
    assert!(presentation.is_none());

    // status is derived at call time, not cached at store time
    let credentials = holder.get_credentials(None);
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].status, RevocationStatus::Revoked);
}

#[tokio::test]
async fn unrelated_revocation_does_not_taint() {
    let mut issuer = issuer();
    let mut holder = holder();
    let mut verifier = verifier();

    let first = issue_to(&mut issuer, &holder.identifier()).await;
    let second = issue_to(&mut issuer, &holder.identifier()).await;
    let revoked_jws = first[0].vc_jws.clone();
    let presented_jws = second[0].vc_jws.clone();

    holder.store_credentials(second).await;

    assert!(issuer.revoke_credentials(&[revoked_jws]));
    let list_jws = issuer
        .issue_revocation_list_credential(Utc::now().year())
        .await
        .expect("should issue list")
        .expect("the period should have issued credentials");
    assert!(holder.set_revocation_list(&list_jws));
    assert!(verifier.set_revocation_list(&list_jws));

    let vp_jws = holder
        .create_presentation("c1", &verifier.identifier(), None)
        .await
        .expect("should sign")
        .expect("the unrevoked credential should be selectable");

    let PresentationVerification::Success(verified) = verifier.verify_presentation(&vp_jws, "c1")
    else {
        panic!("presentation should verify");
    };
    assert_eq!(verified.verifiable_credentials.len(), 1);
    assert_eq!(verified.verifiable_credentials[0].vc.id, presented_jws_id(&presented_jws));
    assert!(verified.revoked_verifiable_credentials.is_empty());
}

// A holder unaware of a revocation presents a revoked credential: the
// presentation still verifies, with the credential in the revoked partition.
#[tokio::test]
async fn verifier_partitions_revoked_credentials() {
    let mut issuer = issuer();
    let mut holder = holder();
    let mut verifier = verifier();

    let first = issue_to(&mut issuer, &holder.identifier()).await;
    let second = issue_to(&mut issuer, &holder.identifier()).await;
    let revoked_jws = first[0].vc_jws.clone();

    holder.store_credentials(first).await;
    holder.store_credentials(second).await;

    assert!(issuer.revoke_credentials(&[revoked_jws]));
    let list_jws = issuer
        .issue_revocation_list_credential(Utc::now().year())
        .await
        .expect("should issue list")
        .expect("the period should have issued credentials");

    // only the verifier learns of the revocation
    assert!(verifier.set_revocation_list(&list_jws));

    let vp_jws = holder
        .create_presentation("c1", &verifier.identifier(), None)
        .await
        .expect("should sign")
        .expect("should select credentials");

    let PresentationVerification::Success(verified) = verifier.verify_presentation(&vp_jws, "c1")
    else {
        panic!("presentation should verify");
    };
    assert_eq!(verified.verifiable_credentials.len(), 1);
    assert_eq!(verified.revoked_verifiable_credentials.len(), 1);
}

// A period in which nothing was ever issued has no list credential to
// publish.
#[tokio::test]
async fn no_list_credential_for_untouched_period() {
    let mut issuer = issuer();
    let list = issuer
        .issue_revocation_list_credential(1999)
        .await
        .expect("should not error");
    assert!(list.is_none());
}

#[tokio::test]
async fn misdirected_credential_not_stored() {
    let mut issuer = issuer();
    let mut holder = holder();

    // issued to some other subject
    let issued = issue_to(&mut issuer, "did:example:somebody-else").await;
    let stored = holder.store_credentials(issued).await;

    assert!(stored.accepted.is_empty());
    assert_eq!(stored.not_verified.len(), 1);
    assert!(holder.get_credentials(None).is_empty());
}

#[tokio::test]
async fn attachments_travel_with_credentials() {
    let mut issuer = issuer();

    let result = issuer
        .issue_credential_with_types(
            "urn:example:subject:with-attachment",
            &[ATTRIBUTE_TYPE.to_string()],
        )
        .await;
    assert_eq!(result.successful.len(), 1);

    let attachments = &result.successful[0].attachments;
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].name, "portrait");
    assert!(!attachments[0].digest.is_empty());
}

#[tokio::test]
async fn unknown_credential_type_fails_issuance() {
    let mut issuer = issuer();
    let holder = holder();

    let result = issuer
        .issue_credential_with_types(
            &holder.identifier(),
            &["DriversLicence2024".to_string(), ATTRIBUTE_TYPE.to_string()],
        )
        .await;

    assert_eq!(result.successful.len(), 1);
    assert_eq!(
        result.failed,
        vec![IssuanceFailure::UnknownCredentialType("DriversLicence2024".into())]
    );
}

#[tokio::test]
async fn type_filter_selects_credentials() {
    let mut issuer = issuer();
    let mut holder = holder();

    let issued = issue_to(&mut issuer, &holder.identifier()).await;
    holder.store_credentials(issued).await;

    assert_eq!(holder.get_credentials(Some(&[ATTRIBUTE_TYPE.to_string()])).len(), 1);
    assert!(holder.get_credentials(Some(&["DriversLicence2024".to_string()])).is_empty());

    let presentation = holder
        .create_presentation("c1", "did:example:verifier", Some(&["DriversLicence2024".into()]))
        .await
        .expect("should not error");
    assert!(presentation.is_none());
}

// A credential issued in the past, already beyond its validity window, is
// classified as not verified rather than stored.
#[tokio::test]
async fn expired_credential_not_stored() {
    use chrono::TimeDelta;

    use crate::provider::FixedClock;

    let two_years_ago = Utc::now() - TimeDelta::days(730);
    let mut issuer = issuer().with_clock(FixedClock(two_years_ago));
    let mut holder = holder();

    let issued = issue_to(&mut issuer, &holder.identifier()).await;
    let stored = holder.store_credentials(issued).await;

    assert!(stored.accepted.is_empty());
    assert_eq!(stored.not_verified.len(), 1);
}

#[tokio::test]
async fn revocation_of_unknown_credential_reports_failure() {
    let mut issuer = issuer();
    let holder = holder();

    let issued = issue_to(&mut issuer, &holder.identifier()).await;
    assert!(!issuer.revoke_credentials(&[issued[0].vc_jws.clone(), "garbage".to_string()]));
}

fn presented_jws_id(vc_jws: &str) -> String {
    use credenza::jose::jws;
    use credenza::w3c_vc::proof::VcClaims;

    let claims: VcClaims =
        jws::parse(vc_jws).and_then(|jws| jws.to_claims()).expect("should parse");
    claims.jti
}
