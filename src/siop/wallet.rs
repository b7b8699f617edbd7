//! # SIOP Wallet
//!
//! The wallet side of the SIOPv2 / `OpenID4VP` exchange: parses and
//! validates an authentication request, asks its holder agent for a matching
//! presentation, and assembles the `id_token` + `vp_token` response in the
//! requested response mode.

use std::collections::HashSet;

use tracing::instrument;

use crate::core::generate;
use crate::dif_exch::{DescriptorMap, FilterValue, PathNested, PresentationSubmission};
use crate::holder::HolderAgent;
use crate::jose::jws::{self, KeyBinding};
use crate::jose::jwt::Type;
use crate::jose::Algorithm;
use crate::provider::{Clock, LocalKeyResolver, Signer, SystemClock};
use crate::siop::types::{
    parse_query, url_params, AuthenticationResponse, IdToken, RequestObject, ResponseMode,
    ResponseParams, FORMAT_JWT_VC, FORMAT_JWT_VP, SUBJECT_SYNTAX_JWK_THUMBPRINT,
};
use crate::siop::{Error, Result};
use crate::store::SubjectStore;

/// How long a self-issued ID Token remains valid.
const ID_TOKEN_VALIDITY_SECS: i64 = 60;

/// The wallet: a self-issued OpenID provider wrapping a holder agent.
pub struct OidcSiopWallet<S: Signer, T: SubjectStore> {
    signer: S,
    holder: HolderAgent<S, T>,
    clock: Box<dyn Clock>,
}

impl<S: Signer, T: SubjectStore> OidcSiopWallet<S, T> {
    /// Creates a wallet around the given holder agent. The signer holds the
    /// same key the holder presents with.
    pub fn new(signer: S, holder: HolderAgent<S, T>) -> Self {
        Self {
            signer,
            holder,
            clock: Box::new(SystemClock),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The wrapped holder agent.
    pub const fn holder(&self) -> &HolderAgent<S, T> {
        &self.holder
    }

    /// The wrapped holder agent, mutably, for storing credentials and
    /// loading revocation lists.
    pub fn holder_mut(&mut self) -> &mut HolderAgent<S, T> {
        &mut self.holder
    }

    /// Parses an authentication request URL, extracting and verifying a
    /// signed `request` object when present, and builds the authentication
    /// response.
    ///
    /// # Errors
    ///
    /// Returns a typed SIOP error when a request check fails or no
    /// credential can satisfy the request.
    #[instrument(level = "debug", skip_all)]
    pub async fn create_authn_response(
        &mut self, request_url: &str,
    ) -> Result<AuthenticationResponse> {
        tracing::debug!("siop::create_authn_response");

        let params = parse_query(url_params(request_url));

        let request = if let Some(request_jwt) = params.get("request") {
            let jws = jws::parse(request_jwt)
                .map_err(|e| Error::InvalidRequest(format!("request object: {e}")))?;
            jws::verify(&jws, None, &LocalKeyResolver)
                .map_err(|e| Error::InvalidRequest(format!("request object: {e}")))?;
            jws.to_claims::<RequestObject>()
                .map_err(|e| Error::InvalidRequest(format!("request object: {e}")))?
        } else {
            RequestObject::from_params(&params).map_err(|e| Error::InvalidRequest(e.to_string()))?
        };

        self.create_authn_response_from(&request).await
    }

    /// Validates a parsed authentication request and builds the response.
    ///
    /// # Errors
    ///
    /// Returns a typed SIOP error when a request check fails or no
    /// credential can satisfy the request.
    pub async fn create_authn_response_from(
        &mut self, request: &RequestObject,
    ) -> Result<AuthenticationResponse> {
        let audience = validate_request(request)?;

        let requested_types = requested_credential_types(request);
        let vp_token = self
            .holder
            .create_presentation(&request.nonce, &audience, requested_types.as_deref())
            .await
            .map_err(|e| Error::ServerError(format!("issue building presentation: {e}")))?
            .ok_or_else(|| {
                Error::UserCancelled("no stored credential satisfies the request".into())
            })?;

        let id_token = self.sign_id_token(request).await?;

        let response = ResponseParams {
            id_token,
            vp_token: Some(vp_token),
            state: Some(request.state.clone()),
            presentation_submission: request
                .presentation_definition
                .as_ref()
                .map(build_submission),
        };

        match request.response_mode.unwrap_or_default() {
            ResponseMode::Fragment => {
                let params = response
                    .to_query_string()
                    .map_err(|e| Error::ServerError(e.to_string()))?;
                Ok(AuthenticationResponse::Redirect(format!("{}#{params}", request.redirect_uri)))
            }
            ResponseMode::Query => {
                let params = response
                    .to_query_string()
                    .map_err(|e| Error::ServerError(e.to_string()))?;
                Ok(AuthenticationResponse::Redirect(format!("{}?{params}", request.redirect_uri)))
            }
            ResponseMode::Post | ResponseMode::DirectPost => {
                let mut form = std::collections::HashMap::new();
                form.insert("id_token".to_string(), response.id_token.clone());
                if let Some(vp_token) = &response.vp_token {
                    form.insert("vp_token".to_string(), vp_token.clone());
                }
                if let Some(state) = &response.state {
                    form.insert("state".to_string(), state.clone());
                }
                if let Some(submission) = &response.presentation_submission {
                    let as_json = serde_json::to_string(submission)
                        .map_err(|e| Error::ServerError(e.to_string()))?;
                    form.insert("presentation_submission".to_string(), as_json);
                }
                Ok(AuthenticationResponse::Post {
                    url: request.redirect_uri.clone(),
                    form,
                })
            }
        }
    }

    // Build and sign the self-issued ID Token: iss == sub == the wallet
    // key's thumbprint URN, with the key itself embedded as sub_jwk.
    async fn sign_id_token(&self, request: &RequestObject) -> Result<String> {
        let jwk = self
            .signer
            .public_jwk()
            .await
            .map_err(|e| Error::ServerError(format!("issue fetching wallet key: {e}")))?;
        let thumbprint_urn = jwk
            .thumbprint_urn()
            .map_err(|e| Error::ServerError(format!("issue computing thumbprint: {e}")))?;

        let iat = self.clock.now().timestamp();
        let id_token = IdToken {
            iss: thumbprint_urn.clone(),
            sub: thumbprint_urn,
            aud: request.redirect_uri.clone(),
            iat,
            exp: iat + ID_TOKEN_VALIDITY_SECS,
            nonce: request.nonce.clone(),
            sub_jwk: Some(jwk),
        };

        jws::encode(Type::Jwt, &id_token, &self.signer, KeyBinding::Jwk)
            .await
            .map_err(|e| Error::ServerError(format!("issue signing id_token: {e}")))
    }
}

// The request checks the wallet applies before answering. Returns the
// audience for the presentation, taken from the relying party's keys.
fn validate_request(request: &RequestObject) -> Result<String> {
    if request.state.is_empty() {
        return Err(Error::InvalidRequest("state is missing".into()));
    }
    if request.client_id != request.redirect_uri {
        return Err(Error::InvalidRequest("client_id does not match redirect_uri".into()));
    }
    if !request.response_type.split_whitespace().any(|t| t == "id_token") {
        return Err(Error::InvalidRequest("response_type does not include id_token".into()));
    }
    let wants_vp = request.response_type.split_whitespace().any(|t| t == "vp_token");
    if !wants_vp && request.presentation_definition.is_none() {
        return Err(Error::InvalidRequest(
            "neither vp_token nor presentation_definition requested".into(),
        ));
    }
    if request.nonce.is_empty() {
        return Err(Error::InvalidRequest("nonce is missing".into()));
    }

    let Some(metadata) = &request.client_metadata else {
        return Err(Error::InvalidRequest("client_metadata is missing".into()));
    };
    let es256_supported = metadata
        .vp_formats
        .get(FORMAT_JWT_VP)
        .and_then(|format| format.alg.as_ref())
        .is_some_and(|algs| algs.iter().any(|a| a == &Algorithm::ES256.to_string()));
    if !es256_supported {
        return Err(Error::RegistrationValueNotSupported(
            "relying party does not accept ES256 jwt_vp presentations".into(),
        ));
    }
    if !metadata
        .subject_syntax_types_supported
        .iter()
        .any(|t| t == SUBJECT_SYNTAX_JWK_THUMBPRINT)
    {
        return Err(Error::SubjectSyntaxTypesNotSupported(
            "relying party does not accept jwk-thumbprint subjects".into(),
        ));
    }

    metadata.audience().map_err(|e| Error::InvalidRequest(e.to_string()))
}

// The credential types the request asks for: named in the scope, or
// constrained on `$.type` by the presentation definition.
fn requested_credential_types(request: &RequestObject) -> Option<Vec<String>> {
    let mut types: HashSet<String> =
        request.credential_types_from_scope().unwrap_or_default().into_iter().collect();

    if let Some(definition) = &request.presentation_definition {
        for descriptor in &definition.input_descriptors {
            for field in descriptor.constraints.fields.as_deref().unwrap_or_default() {
                if !field.path.iter().any(|p| p == "$.type") {
                    continue;
                }
                if let Some(filter) = &field.filter {
                    if let FilterValue::Const(value) = &filter.value {
                        types.insert(value.clone());
                    }
                }
            }
        }
    }

    if types.is_empty() {
        None
    } else {
        Some(types.into_iter().collect())
    }
}

// One descriptor per input descriptor: the presentation at `$`, its first
// credential nested at `$.verifiableCredential[0]`.
fn build_submission(definition: &crate::dif_exch::PresentationDefinition) -> PresentationSubmission {
    PresentationSubmission {
        id: generate::urn(),
        definition_id: definition.id.clone(),
        descriptor_map: definition
            .input_descriptors
            .iter()
            .map(|descriptor| DescriptorMap {
                id: descriptor.id.clone(),
                format: FORMAT_JWT_VP.into(),
                path: "$".into(),
                path_nested: PathNested {
                    format: FORMAT_JWT_VC.into(),
                    path: "$.verifiableCredential[0]".into(),
                },
            })
            .collect(),
    }
}
