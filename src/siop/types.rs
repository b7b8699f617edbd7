//! # SIOP Wire Types
//!
//! The authentication request and response payloads exchanged between
//! verifier and wallet, and their URL query / form encodings. Nested JSON
//! parameters (`client_metadata`, `presentation_definition`,
//! `presentation_submission`) travel as URL-encoded JSON strings.

use std::collections::HashMap;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::dif_exch::{ClaimFormat, PresentationDefinition, PresentationSubmission};
use crate::jose::jwk::{Jwks, PublicKeyJwk};

/// The subject syntax type for JWK-thumbprint subject identifiers.
pub const SUBJECT_SYNTAX_JWK_THUMBPRINT: &str = "urn:ietf:params:oauth:jwk-thumbprint";

/// The `response_type` requesting both a self-issued ID Token and a VP
/// Token.
pub const RESPONSE_TYPE_ID_TOKEN_VP_TOKEN: &str = "id_token vp_token";

/// The claim format key for JWT-secured Verifiable Presentations.
pub const FORMAT_JWT_VP: &str = "jwt_vp";

/// The claim format key for JWT-secured Verifiable Credentials.
pub const FORMAT_JWT_VC: &str = "jwt_vc";

/// Scope tokens with standard OpenID meaning; all other tokens name
/// requested credential types.
const WELL_KNOWN_SCOPES: [&str; 5] = ["openid", "profile", "email", "address", "phone"];

/// How the wallet returns the authentication response.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Response parameters in the fragment of the redirect URI (default).
    #[default]
    Fragment,

    /// Response parameters in the query of the redirect URI.
    Query,

    /// Response parameters as an HTML form post to the redirect URI.
    Post,

    /// Response parameters posted directly to the verifier's response
    /// endpoint.
    DirectPost,
}

/// The Authorization Request parameters, sent by value in the request URL or
/// enveloped in a signed `request` object ([RFC9101]).
///
/// [RFC9101]: https://www.rfc-editor.org/rfc/rfc9101
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequestObject {
    /// The response types the relying party expects, space-separated.
    pub response_type: String,

    /// The relying party's identifier: its URL.
    pub client_id: String,

    /// Where the wallet sends the authentication response. Must equal
    /// `client_id`.
    pub redirect_uri: String,

    /// How the wallet returns the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,

    /// Requested scope. Tokens beyond the standard OpenID set name
    /// requested credential types.
    pub scope: String,

    /// Opaque value binding the response to this request; the verifier
    /// stores the nonce under it.
    pub state: String,

    /// The challenge the holder must echo in the presentation to prevent
    /// replay.
    pub nonce: String,

    /// The relying party's metadata: keys, supported formats and
    /// algorithms, supported subject syntax types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_metadata: Option<ClientMetadata>,

    /// The credentials the relying party requires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_definition: Option<PresentationDefinition>,
}

impl RequestObject {
    /// The credential types the request asks for: scope tokens beyond the
    /// standard OpenID set. Returns `None` when the scope names no types.
    #[must_use]
    pub fn credential_types_from_scope(&self) -> Option<Vec<String>> {
        let types: Vec<String> = self
            .scope
            .split_whitespace()
            .filter(|token| !WELL_KNOWN_SCOPES.contains(token))
            .map(ToString::to_string)
            .collect();
        if types.is_empty() { None } else { Some(types) }
    }

    /// Encodes the request as a URL query string, with nested objects as
    /// URL-encoded JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested object cannot be serialized.
    pub fn to_query_string(&self) -> anyhow::Result<String> {
        let mut params = vec![
            format!("response_type={}", urlencoding::encode(&self.response_type)),
            format!("client_id={}", urlencoding::encode(&self.client_id)),
            format!("redirect_uri={}", urlencoding::encode(&self.redirect_uri)),
            format!("scope={}", urlencoding::encode(&self.scope)),
            format!("state={}", urlencoding::encode(&self.state)),
            format!("nonce={}", urlencoding::encode(&self.nonce)),
        ];
        if let Some(mode) = &self.response_mode {
            let as_json = serde_json::to_string(mode)?;
            params.push(format!("response_mode={}", as_json.trim_matches('"')));
        }
        if let Some(metadata) = &self.client_metadata {
            let as_json = serde_json::to_string(metadata)?;
            params.push(format!("client_metadata={}", urlencoding::encode(&as_json)));
        }
        if let Some(definition) = &self.presentation_definition {
            let as_json = serde_json::to_string(definition)?;
            params.push(format!("presentation_definition={}", urlencoding::encode(&as_json)));
        }
        Ok(params.join("&"))
    }

    /// Decodes a request from parsed query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested JSON parameter does not deserialize.
    pub fn from_params(params: &HashMap<String, String>) -> anyhow::Result<Self> {
        let get = |key: &str| params.get(key).cloned().unwrap_or_default();

        let mut request = Self {
            response_type: get("response_type"),
            client_id: get("client_id"),
            redirect_uri: get("redirect_uri"),
            response_mode: None,
            scope: get("scope"),
            state: get("state"),
            nonce: get("nonce"),
            client_metadata: None,
            presentation_definition: None,
        };
        if let Some(mode) = params.get("response_mode") {
            request.response_mode = Some(
                serde_json::from_value(serde_json::Value::String(mode.clone()))
                    .map_err(|e| anyhow!("issue parsing response_mode: {e}"))?,
            );
        }
        if let Some(metadata) = params.get("client_metadata") {
            request.client_metadata = Some(
                serde_json::from_str(metadata)
                    .map_err(|e| anyhow!("issue parsing client_metadata: {e}"))?,
            );
        }
        if let Some(definition) = params.get("presentation_definition") {
            request.presentation_definition = Some(
                serde_json::from_str(definition)
                    .map_err(|e| anyhow!("issue parsing presentation_definition: {e}"))?,
            );
        }
        Ok(request)
    }
}

/// The relying party's client metadata, declaring its keys and what it can
/// process.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClientMetadata {
    /// The relying party's public keys. The first key's identifier is the
    /// audience holders scope their presentations to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<Jwks>,

    /// The presentation and credential formats the relying party supports,
    /// with their algorithms.
    pub vp_formats: HashMap<String, ClaimFormat>,

    /// The subject identifier syntaxes the relying party supports.
    pub subject_syntax_types_supported: Vec<String>,
}

impl ClientMetadata {
    /// The audience for presentations: the first key's `kid`, or its
    /// thumbprint URN when no `kid` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata carries no keys.
    pub fn audience(&self) -> anyhow::Result<String> {
        let key = self
            .jwks
            .as_ref()
            .and_then(|jwks| jwks.keys.first())
            .ok_or_else(|| anyhow!("client_metadata has no keys"))?;
        match &key.kid {
            Some(kid) => Ok(kid.clone()),
            None => key.thumbprint_urn(),
        }
    }
}

/// The self-issued ID Token claims ([SIOPv2]).
///
/// [SIOPv2]: https://openid.net/specs/openid-connect-self-issued-v2-1_0.html
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IdToken {
    /// The wallet's JWK-thumbprint URN. Self-issued, so `iss` equals `sub`.
    pub iss: String,

    /// The wallet's JWK-thumbprint URN.
    pub sub: String,

    /// The relying party's redirect URI.
    pub aud: String,

    /// Issue time, as a UNIX timestamp.
    pub iat: i64,

    /// Expiry time, as a UNIX timestamp.
    pub exp: i64,

    /// The challenge from the authentication request.
    pub nonce: String,

    /// The key the `sub` thumbprint commits to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_jwk: Option<PublicKeyJwk>,
}

/// The authentication response parameters the wallet returns.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ResponseParams {
    /// The signed self-issued ID Token.
    pub id_token: String,

    /// The signed Verifiable Presentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vp_token: Option<String>,

    /// The `state` from the authentication request, echoed back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// How the submitted presentation fulfils the request's presentation
    /// definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_submission: Option<PresentationSubmission>,
}

impl ResponseParams {
    /// Encodes the response as URL query/fragment parameters, with the
    /// submission as URL-encoded JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission cannot be serialized.
    pub fn to_query_string(&self) -> anyhow::Result<String> {
        let mut params = vec![format!("id_token={}", urlencoding::encode(&self.id_token))];
        if let Some(vp_token) = &self.vp_token {
            params.push(format!("vp_token={}", urlencoding::encode(vp_token)));
        }
        if let Some(state) = &self.state {
            params.push(format!("state={}", urlencoding::encode(state)));
        }
        if let Some(submission) = &self.presentation_submission {
            let as_json = serde_json::to_string(submission)?;
            params.push(format!("presentation_submission={}", urlencoding::encode(&as_json)));
        }
        Ok(params.join("&"))
    }

    /// Decodes a response from parsed query/fragment/form parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the `id_token` is missing or the submission does
    /// not deserialize.
    pub fn from_params(params: &HashMap<String, String>) -> anyhow::Result<Self> {
        let id_token =
            params.get("id_token").cloned().ok_or_else(|| anyhow!("id_token is missing"))?;

        let mut response = Self {
            id_token,
            vp_token: params.get("vp_token").cloned(),
            state: params.get("state").cloned(),
            presentation_submission: None,
        };
        if let Some(submission) = params.get("presentation_submission") {
            response.presentation_submission = Some(
                serde_json::from_str(submission)
                    .map_err(|e| anyhow!("issue parsing presentation_submission: {e}"))?,
            );
        }
        Ok(response)
    }
}

/// How the wallet delivers its authentication response, per the request's
/// response mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthenticationResponse {
    /// Send the user agent to the given URL (fragment or query mode).
    Redirect(String),

    /// Post the given form to the given URL (post / `direct_post` mode).
    Post {
        /// The URL to post to.
        url: String,

        /// The form body parameters.
        form: HashMap<String, String>,
    },
}

/// Parses a URL query or fragment string into decoded key/value pairs.
#[must_use]
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let Ok(decoded) = urlencoding::decode(value) else {
            continue;
        };
        params.insert(key.to_string(), decoded.into_owned());
    }
    params
}

/// Extracts the parameter portion of a response or request URL: the fragment
/// when present, the query otherwise.
#[must_use]
pub fn url_params(url: &str) -> &str {
    if let Some((_, fragment)) = url.split_once('#') {
        return fragment;
    }
    if let Some((_, query)) = url.split_once('?') {
        return query;
    }
    url
}
