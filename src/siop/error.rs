//! # SIOP Errors
//!
//! Typed error codes surfaced at the SIOP boundary. These are the only
//! errors in the crate that propagate as exceptional control flow; the
//! `Display` form renders the OAuth2-style JSON error body.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// OAuth2-style error codes for SIOPv2 / `OpenID4VP` request and response
/// processing.
#[derive(Error, Debug, Deserialize)]
pub enum Error {
    /// The request is missing a required parameter, includes an unsupported
    /// parameter value, repeats a parameter, or is otherwise malformed.
    #[error(r#"{{"error": "invalid_request", "error_description": "{0}"}}"#)]
    InvalidRequest(String),

    /// The wallet holds nothing it is willing to present for the request.
    #[error(r#"{{"error": "user_cancelled", "error_description": "{0}"}}"#)]
    UserCancelled(String),

    /// A value in the relying party's client metadata is not supported by
    /// the wallet: e.g. no mutually supported presentation format or
    /// algorithm.
    #[error(r#"{{"error": "registration_value_not_supported", "error_description": "{0}"}}"#)]
    RegistrationValueNotSupported(String),

    /// None of the relying party's supported subject syntax types is
    /// supported by the wallet.
    #[error(r#"{{"error": "subject_syntax_types_not_supported", "error_description": "{0}"}}"#)]
    SubjectSyntaxTypesNotSupported(String),

    /// Processing failed for a reason unrelated to the request's contents.
    #[error(r#"{{"error": "server_error", "error_description": "{0}"}}"#)]
    ServerError(String),
}

/// Error response body for SIOPv2 / `OpenID4VP`.
#[derive(Deserialize, Serialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Error description.
    pub error_description: String,
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as SerdeError;

        let Ok(response) = serde_json::from_str::<ErrorResponse>(&self.to_string()) else {
            return Err(SerdeError::custom("issue serializing error"));
        };
        response.serialize(serializer)
    }
}

impl Error {
    /// Transforms the error to its `OpenID`-compatible JSON format.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.to_string()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn err_json() {
        let err = Error::InvalidRequest("client_id does not match redirect_uri".into());
        let ser: Value = serde_json::from_str(&err.to_string()).unwrap();
        assert_eq!(
            ser,
            json!({
                "error": "invalid_request",
                "error_description": "client_id does not match redirect_uri"
            })
        );
    }

    #[test]
    fn err_serialize() {
        let err = Error::SubjectSyntaxTypesNotSupported("jwk-thumbprint unsupported".into());
        let ser = serde_json::to_value(&err).unwrap();
        assert_eq!(
            ser,
            json!({
                "error": "subject_syntax_types_not_supported",
                "error_description": "jwk-thumbprint unsupported"
            })
        );
    }
}
