//! # SIOP Verifier
//!
//! The relying-party side of the SIOPv2 / `OpenID4VP` exchange: prepares
//! authentication request URLs (plain or as signed request objects) and
//! validates the wallet's `id_token` + `vp_token` response.

use std::collections::HashMap;

use serde_json_path::JsonPath;
use tracing::instrument;

use crate::core::generate;
use crate::dif_exch::{
    ClaimFormat, Constraints, Field, Filter, FilterValue, InputDescriptor, PresentationDefinition,
};
use crate::jose::jwk::Jwks;
use crate::jose::jws::{self, KeyBinding};
use crate::jose::jwt::Type;
use crate::jose::Algorithm;
use crate::provider::{Clock, LocalKeyResolver, Signer, SystemClock};
use crate::siop::types::{
    parse_query, url_params, ClientMetadata, IdToken, RequestObject, ResponseMode, ResponseParams,
    FORMAT_JWT_VC, FORMAT_JWT_VP, RESPONSE_TYPE_ID_TOKEN_VP_TOKEN, SUBJECT_SYNTAX_JWK_THUMBPRINT,
};
use crate::siop::{Error, Result};
use crate::validator::{self, PresentationVerification, Validator, VerifiedPresentation};

/// Options for building an authentication request.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// How the wallet should return the response.
    pub response_mode: ResponseMode,

    /// A credential type to request, carried in both the scope and a
    /// presentation definition. When unset, any credential satisfies the
    /// request.
    pub credential_type: Option<String>,
}

/// The validated outcome of an authentication response: the wallet's
/// identity token and the verified presentation.
#[derive(Clone, Debug)]
pub struct AuthenticatedPresentation {
    /// The wallet's self-issued identity claims.
    pub id_token: IdToken,

    /// The verified presentation, with contained credentials partitioned by
    /// revocation state.
    pub presentation: VerifiedPresentation,
}

// What the verifier remembers about an outstanding request, keyed by its
// `state` value.
struct PendingRequest {
    nonce: String,
    presentation_definition: Option<PresentationDefinition>,
}

/// The relying party. Owns its signer, validator, and the store of pending
/// requests that binds responses to the request they answer.
pub struct OidcSiopVerifier<S: Signer> {
    signer: S,
    validator: Validator,
    relying_party_url: String,
    clock: Box<dyn Clock>,
    states: HashMap<String, PendingRequest>,
}

impl<S: Signer> OidcSiopVerifier<S> {
    /// Creates a relying party identified by its URL.
    pub fn new(signer: S, relying_party_url: impl Into<String>) -> Self {
        Self {
            signer,
            validator: Validator::new(),
            relying_party_url: relying_party_url.into(),
            clock: Box::new(SystemClock),
            states: HashMap::new(),
        }
    }

    /// Replaces the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// The verifier's key identifier: the audience wallets scope their
    /// presentations to.
    pub fn identifier(&self) -> String {
        self.signer.verification_method()
    }

    /// Verifies and loads a revocation list credential, governing the
    /// revocation partition of subsequently validated presentations.
    pub fn set_revocation_list(&mut self, token: &str) -> bool {
        self.validator.set_revocation_list(token)
    }

    /// Builds an authentication request URL for the wallet, with the request
    /// parameters in the query string. A fresh nonce is stored under the
    /// request's `state` for response validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the signer cannot provide its public key or the
    /// request cannot be encoded.
    #[instrument(level = "debug", skip_all)]
    pub async fn create_authn_request_url(
        &mut self, wallet_url: &str, options: &RequestOptions,
    ) -> anyhow::Result<String> {
        tracing::debug!("siop::create_authn_request_url");

        let request = self.build_request(options).await?;
        Ok(format!("{wallet_url}?{}", request.to_query_string()?))
    }

    /// Builds an authentication request URL carrying the request as a signed
    /// JWT (`request=` parameter, [RFC9101]), instead of individual query
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the signer cannot provide its public key or
    /// signing fails.
    ///
    /// [RFC9101]: https://www.rfc-editor.org/rfc/rfc9101
    #[instrument(level = "debug", skip_all)]
    pub async fn create_signed_request_url(
        &mut self, wallet_url: &str, options: &RequestOptions,
    ) -> anyhow::Result<String> {
        tracing::debug!("siop::create_signed_request_url");

        let request = self.build_request(options).await?;
        let request_jwt =
            jws::encode(Type::Request, &request, &self.signer, KeyBinding::KeyIdAndJwk).await?;

        Ok(format!(
            "{wallet_url}?client_id={}&request={request_jwt}",
            urlencoding::encode(&self.relying_party_url)
        ))
    }

    async fn build_request(&mut self, options: &RequestOptions) -> anyhow::Result<RequestObject> {
        let nonce = generate::nonce();
        let state = generate::state_key();

        let mut verifier_jwk = self.signer.public_jwk().await?;
        verifier_jwk.kid = Some(self.signer.verification_method());

        let accepted_algs = ClaimFormat {
            alg: Some(vec![Algorithm::ES256.to_string(), Algorithm::EdDSA.to_string()]),
            proof_type: None,
        };
        let client_metadata = ClientMetadata {
            jwks: Some(Jwks {
                keys: vec![verifier_jwk],
            }),
            vp_formats: HashMap::from([
                (FORMAT_JWT_VP.to_string(), accepted_algs.clone()),
                (FORMAT_JWT_VC.to_string(), accepted_algs),
            ]),
            subject_syntax_types_supported: vec![SUBJECT_SYNTAX_JWK_THUMBPRINT.into()],
        };

        let mut scope = "openid profile".to_string();
        let mut presentation_definition = None;
        if let Some(credential_type) = &options.credential_type {
            scope.push(' ');
            scope.push_str(credential_type);

            presentation_definition = Some(PresentationDefinition {
                id: generate::urn(),
                input_descriptors: vec![InputDescriptor {
                    id: credential_type.clone(),
                    constraints: Constraints {
                        fields: Some(vec![Field {
                            path: vec!["$.type".into()],
                            filter: Some(Filter {
                                type_: "string".into(),
                                value: FilterValue::Const(credential_type.clone()),
                            }),
                            ..Field::default()
                        }]),
                    },
                    ..InputDescriptor::default()
                }],
                ..PresentationDefinition::default()
            });
        }

        self.states.insert(
            state.clone(),
            PendingRequest {
                nonce: nonce.clone(),
                presentation_definition: presentation_definition.clone(),
            },
        );

        Ok(RequestObject {
            response_type: RESPONSE_TYPE_ID_TOKEN_VP_TOKEN.into(),
            client_id: self.relying_party_url.clone(),
            redirect_uri: self.relying_party_url.clone(),
            response_mode: Some(options.response_mode),
            scope,
            state,
            nonce,
            client_metadata: Some(client_metadata),
            presentation_definition,
        })
    }

    /// Validates an authentication response delivered as a redirect URL
    /// (fragment or query mode).
    ///
    /// # Errors
    ///
    /// Returns a typed SIOP error when any response check fails.
    pub fn validate_authn_response_url(&mut self, url: &str) -> Result<AuthenticatedPresentation> {
        let params = parse_query(url_params(url));
        self.validate_authn_response(&params)
    }

    /// Validates an authentication response delivered as decoded parameters
    /// (post / `direct_post` mode, or pre-parsed redirect parameters):
    /// verifies the `id_token`, matches its nonce against the nonce stored
    /// for `state`, and verifies the `vp_token` with that nonce as
    /// challenge and this verifier as audience.
    ///
    /// The nonce stored under `state` is consumed; a response can only be
    /// validated once.
    ///
    /// # Errors
    ///
    /// Returns a typed SIOP error when any response check fails.
    #[instrument(level = "debug", skip_all)]
    pub fn validate_authn_response(
        &mut self, params: &HashMap<String, String>,
    ) -> Result<AuthenticatedPresentation> {
        tracing::debug!("siop::validate_authn_response");

        let response = ResponseParams::from_params(params)
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;

        let Some(state) = &response.state else {
            return Err(Error::InvalidRequest("state is missing".into()));
        };
        let Some(pending) = self.states.remove(state) else {
            return Err(Error::InvalidRequest("state does not match a pending request".into()));
        };

        let id_token = self.validate_id_token(&response.id_token, &pending.nonce)?;

        let Some(vp_token) = &response.vp_token else {
            return Err(Error::InvalidRequest("vp_token is missing".into()));
        };
        let PresentationVerification::Success(verified) =
            self.validator.verify_vp_jws(vp_token, &pending.nonce, &self.identifier())
        else {
            return Err(Error::InvalidRequest("vp_token did not verify".into()));
        };

        if let Some(submission) = &response.presentation_submission {
            verify_submission_paths(&verified, submission)?;
        }
        if let Some(definition) = &pending.presentation_definition {
            verify_constraints(&verified, definition)?;
        }

        Ok(AuthenticatedPresentation {
            id_token,
            presentation: *verified,
        })
    }

    // Verify the id_token's signature and claims: self-issued (iss == sub),
    // key bound to the subject identifier, audience and nonce matching this
    // request, and within its validity window.
    fn validate_id_token(&self, token: &str, nonce: &str) -> Result<IdToken> {
        let jws =
            jws::parse(token).map_err(|e| Error::InvalidRequest(format!("id_token: {e}")))?;
        let id_token: IdToken =
            jws.to_claims().map_err(|e| Error::InvalidRequest(format!("id_token: {e}")))?;

        let key = jws::verify(&jws, None, &LocalKeyResolver)
            .map_err(|e| Error::InvalidRequest(format!("id_token: {e}")))?;

        if id_token.iss != id_token.sub {
            return Err(Error::InvalidRequest("id_token is not self-issued".into()));
        }
        if !validator::key_matches_identifier(&key, &id_token.sub) {
            return Err(Error::InvalidRequest(
                "id_token key does not match subject identifier".into(),
            ));
        }
        if id_token.aud != self.relying_party_url {
            return Err(Error::InvalidRequest("id_token audience does not match".into()));
        }
        if id_token.nonce != nonce {
            return Err(Error::InvalidRequest("id_token nonce does not match".into()));
        }

        let now = self.clock.now().timestamp();
        if now < id_token.iat {
            return Err(Error::InvalidRequest("id_token is not yet valid".into()));
        }
        if now > id_token.exp {
            return Err(Error::InvalidRequest("id_token has expired".into()));
        }

        Ok(id_token)
    }
}

// Each input descriptor's constraints must be satisfied by at least one
// verified credential in the presentation.
fn verify_constraints(
    verified: &VerifiedPresentation, definition: &PresentationDefinition,
) -> Result<()> {
    let credentials: Vec<serde_json::Value> = verified
        .verifiable_credentials
        .iter()
        .map(|claims| serde_json::to_value(&claims.vc))
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::ServerError(format!("issue serializing credentials: {e}")))?;

    for descriptor in &definition.input_descriptors {
        let satisfied = credentials.iter().any(|vc| {
            descriptor.constraints.satisfied(vc).unwrap_or(false)
        });
        if !satisfied {
            return Err(Error::InvalidRequest(format!(
                "input descriptor '{}' is not satisfied",
                descriptor.id
            )));
        }
    }
    Ok(())
}

// Each descriptor's nested path must locate a credential within the
// submitted presentation.
fn verify_submission_paths(
    verified: &VerifiedPresentation, submission: &crate::dif_exch::PresentationSubmission,
) -> Result<()> {
    let vp_json = serde_json::to_value(&verified.presentation.vp)
        .map_err(|e| Error::ServerError(format!("issue serializing presentation: {e}")))?;

    for descriptor in &submission.descriptor_map {
        if descriptor.path != "$" {
            return Err(Error::InvalidRequest(format!(
                "unsupported descriptor path '{}'",
                descriptor.path
            )));
        }
        let jpath = JsonPath::parse(&descriptor.path_nested.path)
            .map_err(|e| Error::InvalidRequest(format!("issue parsing descriptor path: {e}")))?;
        if jpath.query(&vp_json).exactly_one().is_err() {
            return Err(Error::InvalidRequest(format!(
                "no credential at descriptor path '{}'",
                descriptor.path_nested.path
            )));
        }
    }
    Ok(())
}
