//! # JSON Web Key (JWK)
//!
//! Public key representation ([RFC7517]), the [RFC7638] thumbprint used as a
//! stable key identifier, and conversion to and from `did:key` identifiers.
//!
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
//! [RFC7638]: https://www.rfc-editor.org/rfc/rfc7638

use anyhow::{anyhow, bail};
use base64ct::{Base64UrlUnpadded, Encoding};
use multibase::Base;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// URN namespace for JWK thumbprint key identifiers.
pub const THUMBPRINT_URN: &str = "urn:ietf:params:oauth:jwk-thumbprint:sha-256:";

// Multicodec prefixes registered for did:key.
const ED25519_CODEC: [u8; 2] = [0xed, 0x01];
const P256_CODEC: [u8; 2] = [0x80, 0x24];

/// Cryptographic key type, as per RFC 7518.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum KeyType {
    /// Octet key pair (Edwards curve).
    #[serde(rename = "OKP")]
    Okp,

    /// Elliptic curve key pair.
    #[default]
    #[serde(rename = "EC")]
    Ec,
}

/// Cryptographic curve type.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum Curve {
    /// NIST P-256 (used with ES256).
    #[default]
    #[serde(rename = "P-256")]
    P256,

    /// Ed25519 (used with EdDSA).
    #[serde(rename = "Ed25519")]
    Ed25519,
}

/// A public key in JWK format.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PublicKeyJwk {
    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Key type.
    pub kty: KeyType,

    /// Cryptographic curve.
    pub crv: Curve,

    /// Base64url-encoded x-coordinate (or Edwards public key).
    pub x: String,

    /// Base64url-encoded y-coordinate. Unset for Edwards keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

/// A set of JWKs, as published in client metadata.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwks {
    /// The keys in the set.
    pub keys: Vec<PublicKeyJwk>,
}

impl PublicKeyJwk {
    /// Computes the RFC 7638 thumbprint of the key: the SHA-256 digest of the
    /// canonical JSON containing only the required members, in lexicographic
    /// order, base64url-encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is structurally incomplete (an EC key
    /// without a y-coordinate).
    pub fn thumbprint(&self) -> anyhow::Result<String> {
        let canonical = match self.kty {
            KeyType::Okp => {
                let crv = serde_json::to_string(&self.crv)?;
                format!(r#"{{"crv":{crv},"kty":"OKP","x":"{}"}}"#, self.x)
            }
            KeyType::Ec => {
                let Some(y) = &self.y else {
                    bail!("EC key is missing 'y'");
                };
                let crv = serde_json::to_string(&self.crv)?;
                format!(r#"{{"crv":{crv},"kty":"EC","x":"{}","y":"{y}"}}"#, self.x)
            }
        };

        let digest = Sha256::digest(canonical.as_bytes());
        Ok(Base64UrlUnpadded::encode_string(&digest))
    }

    /// The key's thumbprint as a `urn:ietf:params:oauth:jwk-thumbprint` URN.
    ///
    /// # Errors
    ///
    /// Returns an error if the thumbprint cannot be computed.
    pub fn thumbprint_urn(&self) -> anyhow::Result<String> {
        Ok(format!("{THUMBPRINT_URN}{}", self.thumbprint()?))
    }

    /// Encodes the key as a `did:key` identifier: the multicodec-prefixed raw
    /// key bytes, multibase-encoded with base58-btc.
    ///
    /// # Errors
    ///
    /// Returns an error if the key coordinates cannot be decoded.
    pub fn to_did_key(&self) -> anyhow::Result<String> {
        let mut multi_bytes = vec![];
        match self.crv {
            Curve::Ed25519 => {
                multi_bytes.extend_from_slice(&ED25519_CODEC);
                multi_bytes.extend_from_slice(&Base64UrlUnpadded::decode_vec(&self.x)?);
            }
            Curve::P256 => {
                let Some(y) = &self.y else {
                    bail!("EC key is missing 'y'");
                };
                let mut sec1 = vec![0x04];
                sec1.append(&mut Base64UrlUnpadded::decode_vec(&self.x)?);
                sec1.append(&mut Base64UrlUnpadded::decode_vec(y)?);

                let point = p256::EncodedPoint::from_bytes(&sec1)
                    .map_err(|e| anyhow!("invalid P-256 point: {e}"))?;
                multi_bytes.extend_from_slice(&P256_CODEC);
                multi_bytes.extend_from_slice(point.compress().as_bytes());
            }
        }

        Ok(format!("did:key:{}", multibase::encode(Base::Base58Btc, &multi_bytes)))
    }

    /// Decodes a `did:key` identifier (or `did:key` DID URL) into the public
    /// key it carries.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is not a `did:key`, the multibase
    /// encoding is invalid, or the multicodec prefix is unsupported.
    pub fn from_did_key(did: &str) -> anyhow::Result<Self> {
        let Some(multi_key) = did.strip_prefix("did:key:") else {
            bail!("not a did:key identifier");
        };
        // strip any fragment (did:key:z…#z…)
        let multi_key = multi_key.split('#').next().unwrap_or(multi_key);

        let (_, key_bytes) =
            multibase::decode(multi_key).map_err(|e| anyhow!("issue decoding key: {e}"))?;

        if key_bytes.len() > 2 && key_bytes[0..2] == ED25519_CODEC {
            if key_bytes.len() - 2 != 32 {
                bail!("invalid Ed25519 key length");
            }
            return Ok(Self {
                kid: Some(did.to_string()),
                kty: KeyType::Okp,
                crv: Curve::Ed25519,
                x: Base64UrlUnpadded::encode_string(&key_bytes[2..]),
                y: None,
            });
        }

        if key_bytes.len() > 2 && key_bytes[0..2] == P256_CODEC {
            let point = p256::EncodedPoint::from_bytes(&key_bytes[2..])
                .map_err(|e| anyhow!("invalid P-256 point: {e}"))?;
            let public_key = Option::<p256::PublicKey>::from(p256::PublicKey::from_encoded_point(
                &point,
            ))
            .ok_or_else(|| anyhow!("P-256 point is not on the curve"))?;
            let decompressed = public_key.to_encoded_point(false);
            let x = decompressed.x().ok_or_else(|| anyhow!("missing x-coordinate"))?;
            let y = decompressed.y().ok_or_else(|| anyhow!("missing y-coordinate"))?;

            return Ok(Self {
                kid: Some(did.to_string()),
                kty: KeyType::Ec,
                crv: Curve::P256,
                x: Base64UrlUnpadded::encode_string(x),
                y: Some(Base64UrlUnpadded::encode_string(y)),
            });
        }

        bail!("unsupported did:key multicodec");
    }
}
