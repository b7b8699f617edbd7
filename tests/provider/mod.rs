//! Shared test providers: fixed-key keystores for each role, a claims data
//! provider, and a fixed clock.

use anyhow::anyhow;
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use credenza::jose::jwk::{Curve, KeyType, PublicKeyJwk};
use credenza::jose::Algorithm;
use credenza::provider::{Clock, CredentialData, DataProvider, Signer};
use credenza::store::Attachment;
use credenza::w3c_vc::model::{AtomicAttribute, CredentialSubject};

const ISSUER_SECRET: [u8; 32] = [
    0x39, 0x0a, 0xb0, 0x1e, 0x51, 0x0c, 0x2f, 0x3a, 0x62, 0x81, 0x9d, 0x6f, 0x54, 0x24, 0x9e,
    0x7b, 0x12, 0xc5, 0x88, 0x41, 0x0e, 0x33, 0x72, 0xaf, 0x09, 0x64, 0x5b, 0xd0, 0x2c, 0x17,
    0xe8, 0x93,
];
const HOLDER_SECRET: [u8; 32] = [
    0x6d, 0x12, 0x44, 0x9f, 0x73, 0x28, 0xe0, 0x55, 0x07, 0x9a, 0xc1, 0x3e, 0x82, 0x5f, 0x61,
    0xd4, 0x3b, 0x96, 0x20, 0x8d, 0x4a, 0xe7, 0x15, 0xc8, 0x50, 0x2b, 0xf4, 0x69, 0x9e, 0x03,
    0xb7, 0x2a,
];
const VERIFIER_SECRET: [u8; 32] = [
    0x11, 0xe6, 0x52, 0x78, 0x9b, 0x30, 0x0f, 0xc4, 0x58, 0xa3, 0x77, 0x1c, 0xe9, 0x42, 0x86,
    0x25, 0xd0, 0x5e, 0xbb, 0x63, 0x0a, 0x91, 0x48, 0xf2, 0x3c, 0x85, 0x16, 0xda, 0x60, 0x4d,
    0x2e, 0xc1,
];

/// An Ed25519 keystore whose identifier is a `did:key` DID.
#[derive(Clone, Debug)]
pub struct Ed25519Keystore {
    signing_key: ed25519_dalek::SigningKey,
    method: String,
}

impl Ed25519Keystore {
    pub fn new(secret: &[u8; 32]) -> Self {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(secret);
        let jwk = PublicKeyJwk {
            kid: None,
            kty: KeyType::Okp,
            crv: Curve::Ed25519,
            x: Base64UrlUnpadded::encode_string(signing_key.verifying_key().as_bytes()),
            y: None,
        };
        let method = jwk.to_did_key().expect("should encode did:key");
        Self { signing_key, method }
    }
}

impl Signer for Ed25519Keystore {
    async fn try_sign(&self, msg: &[u8]) -> anyhow::Result<Vec<u8>> {
        use ed25519_dalek::Signer as _;
        Ok(self.signing_key.sign(msg).to_bytes().to_vec())
    }

    async fn public_jwk(&self) -> anyhow::Result<PublicKeyJwk> {
        Ok(PublicKeyJwk {
            kid: None,
            kty: KeyType::Okp,
            crv: Curve::Ed25519,
            x: Base64UrlUnpadded::encode_string(self.signing_key.verifying_key().as_bytes()),
            y: None,
        })
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDSA
    }

    fn verification_method(&self) -> String {
        self.method.clone()
    }
}

/// Which identifier flavour an ES256 keystore presents.
#[derive(Clone, Copy, Debug)]
pub enum IdentifierKind {
    DidKey,
    JwkThumbprint,
}

/// A P-256 keystore for ES256 signing.
#[derive(Clone, Debug)]
pub struct Es256Keystore {
    signing_key: p256::ecdsa::SigningKey,
    method: String,
}

impl Es256Keystore {
    pub fn new(secret: &[u8; 32], kind: IdentifierKind) -> Self {
        let signing_key =
            p256::ecdsa::SigningKey::from_slice(secret).expect("should build signing key");
        let jwk = Self::jwk_of(&signing_key);
        let method = match kind {
            IdentifierKind::DidKey => jwk.to_did_key().expect("should encode did:key"),
            IdentifierKind::JwkThumbprint => {
                jwk.thumbprint_urn().expect("should compute thumbprint")
            }
        };
        Self { signing_key, method }
    }

    fn jwk_of(signing_key: &p256::ecdsa::SigningKey) -> PublicKeyJwk {
        use p256::elliptic_curve::sec1::ToEncodedPoint;

        let point = signing_key.verifying_key().to_encoded_point(false);
        PublicKeyJwk {
            kid: None,
            kty: KeyType::Ec,
            crv: Curve::P256,
            x: Base64UrlUnpadded::encode_string(point.x().expect("should have x")),
            y: Some(Base64UrlUnpadded::encode_string(point.y().expect("should have y"))),
        }
    }
}

impl Signer for Es256Keystore {
    async fn try_sign(&self, msg: &[u8]) -> anyhow::Result<Vec<u8>> {
        use p256::ecdsa::signature::Signer as _;
        let signature: p256::ecdsa::Signature = self.signing_key.sign(msg);
        Ok(signature.to_bytes().to_vec())
    }

    async fn public_jwk(&self) -> anyhow::Result<PublicKeyJwk> {
        Ok(Self::jwk_of(&self.signing_key))
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::ES256
    }

    fn verification_method(&self) -> String {
        self.method.clone()
    }
}

pub fn issuer_keystore() -> Ed25519Keystore {
    Ed25519Keystore::new(&ISSUER_SECRET)
}

pub fn holder_keystore() -> Es256Keystore {
    Es256Keystore::new(&HOLDER_SECRET, IdentifierKind::JwkThumbprint)
}

pub fn verifier_keystore() -> Es256Keystore {
    Es256Keystore::new(&VERIFIER_SECRET, IdentifierKind::DidKey)
}

/// Supplies a fixed attribute claim for `AtomicAttribute2023`, with an
/// attachment when the subject id ends in `with-attachment`.
#[derive(Clone, Debug, Default)]
pub struct FixedDataProvider;

impl DataProvider for FixedDataProvider {
    async fn get_credential(
        &self, subject_id: &str, credential_type: &str,
    ) -> anyhow::Result<CredentialData> {
        if credential_type != "AtomicAttribute2023" {
            return Err(anyhow!("no data for credential type '{credential_type}'"));
        }

        let attachments = if subject_id.ends_with("with-attachment") {
            vec![Attachment::new("portrait", "image/png", vec![0x89, 0x50, 0x4e, 0x47])]
        } else {
            vec![]
        };

        Ok(CredentialData {
            subject: CredentialSubject::Atomic(AtomicAttribute {
                id: None,
                name: "given-name".into(),
                value: "Susanne".into(),
                mime_type: None,
            }),
            attachments,
        })
    }
}

/// A clock pinned to a fixed instant.
#[derive(Clone, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
