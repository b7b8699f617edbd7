//! # DIF Presentation Exchange
//!
//! Types describing the credentials a verifier requires
//! (`presentation_definition`) and how a wallet's response fulfils them
//! (`presentation_submission`).
//!
//! Specifications:
//! - <https://identity.foundation/presentation-exchange/spec/v2.0.0>
//! - <https://identity.foundation/jwt-vc-presentation-profile>

use std::collections::HashMap;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json_path::JsonPath;

/// A Presentation Definition is used by a Verifier to articulate proofs
/// required. The proofs help the Verifier decide how to interact with the
/// Holder providing the proofs.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PresentationDefinition {
    /// A unique ID for the desired context. For example, a UUID is unique in
    /// a global context, while a simple string could be suitably unique in a
    /// local context.
    pub id: String,

    /// Input Descriptors describe the information a Verifier requires from
    /// the Holder.
    pub input_descriptors: Vec<InputDescriptor>,

    /// If present, a human-friendly, distinctive designation for the
    /// Presentation Definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// If present, it MUST describe the purpose for which the Presentation
    /// Definition is being used for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// One or more registered Claim Format Designation objects (e.g., `jwt`,
    /// `jwt_vc`, `jwt_vp`). Used to inform the Holder of the claim formats
    /// the Verifier can process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<HashMap<String, ClaimFormat>>,
}

/// Input Descriptors describe the information a Verifier requires from the
/// Holder. All Input Descriptors MUST be satisfied, unless otherwise
/// specified.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InputDescriptor {
    /// An identifier that does not conflict with the id of any other Input
    /// Descriptor in the same Presentation Definition.
    pub id: String,

    /// If set, it SHOULD be a human-friendly name that describes what the
    /// target schema represents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// If present, its value MUST describe the purpose for which the Claim's
    /// data is being requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// If present, it MUST be an object with one or more properties matching
    /// registered Claim Format Designations. Constrains this input to a
    /// subset of the formats or algorithms of the Presentation Definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<HashMap<String, ClaimFormat>>,

    /// Constraints specify constraints on data values, and an explanation
    /// why a certain item or set of data is being requested.
    pub constraints: Constraints,
}

/// A registered Claim Format Designation object used to inform the Holder of
/// a claim format the Verifier can process. MUST include one of the
/// format-specific properties (`alg`, `proof_type`).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClaimFormat {
    /// An array of one or more algorithmic identifiers, e.g. `["ES256"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<Vec<String>>,

    /// An array of one or more proof type identifiers,
    /// e.g. `["JsonWebSignature2020"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_type: Option<Vec<String>>,
}

/// Constraints specify constraints on data values, and an explanation why a
/// certain item or set of data is being requested.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Constraints {
    /// Fields are used to specify attributes of credential data the Verifier
    /// requires. They are processed in order, so field checks SHOULD be
    /// ordered for earliest termination of evaluation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
}

impl Constraints {
    /// Returns `true` if the given credential (as JSON) satisfies every
    /// field constraint.
    ///
    /// # Errors
    ///
    /// Returns an error if a field's JSONPath expression does not parse.
    pub fn satisfied(&self, credential: &Value) -> anyhow::Result<bool> {
        let Some(fields) = &self.fields else {
            return Ok(true);
        };
        for field in fields {
            if !field.matched(credential)? && !field.optional.unwrap_or_default() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Fields are used to specify attributes of credential data the Verifier
/// requires.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Field {
    /// If present, it MUST be unique from every other field object's id
    /// property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// One or more JSONPath expressions that select a target value from the
    /// input, evaluated in order, breaking as soon as a result is found.
    pub path: Vec<String>,

    /// If present, a descriptor used to filter against the values returned
    /// from evaluation of the JSONPath expressions in the path array.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,

    /// If present, it MUST indicate whether the field is optional. Defaults
    /// to false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    /// If present, its MUST describe the purpose for which the field is
    /// being requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// If present, it SHOULD be a human-friendly name that describes what
    /// the target field represents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Field {
    // Evaluates the field's paths in order against the credential, applying
    // the filter to the first match.
    fn matched(&self, credential: &Value) -> anyhow::Result<bool> {
        for path in &self.path {
            let jpath = JsonPath::parse(path)
                .map_err(|e| anyhow!("issue parsing JSONPath '{path}': {e}"))?;
            for node in jpath.query(credential).all() {
                match &self.filter {
                    Some(filter) => {
                        if filter.matched(node)? {
                            return Ok(true);
                        }
                    }
                    None => return Ok(true),
                }
            }
        }
        Ok(false)
    }
}

/// A descriptor used to filter against the values returned from evaluation
/// of the JSONPath expressions in the path array.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Filter {
    /// The JSON type of the filtered value.
    #[serde(rename = "type")]
    pub type_: String,

    /// The predicate to apply.
    #[serde(flatten)]
    pub value: FilterValue,
}

impl Filter {
    fn matched(&self, node: &Value) -> anyhow::Result<bool> {
        // string predicates also apply to each element of an array value
        let candidates: Vec<&Value> = match node {
            Value::Array(values) => values.iter().collect(),
            _ => vec![node],
        };

        for candidate in candidates {
            let Some(s) = candidate.as_str() else {
                continue;
            };
            match &self.value {
                FilterValue::Const(want) => {
                    if s == want {
                        return Ok(true);
                    }
                }
                FilterValue::Pattern(pattern) => {
                    let re = regex::Regex::new(pattern)
                        .map_err(|e| anyhow!("issue parsing filter pattern: {e}"))?;
                    if re.is_match(s) {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }
}

/// The predicate of a [`Filter`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterValue {
    /// The value must equal the given constant.
    Const(String),

    /// The value must match the given regular expression.
    Pattern(String),
}

impl Default for FilterValue {
    fn default() -> Self {
        Self::Const(String::new())
    }
}

/// A Presentation Submission expresses how proofs presented to the Verifier
/// are provided in accordance with the requirements specified in a
/// Presentation Definition.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PresentationSubmission {
    /// The `id` MUST be a unique identifier, such as a UUID.
    pub id: String,

    /// The value of this property MUST be the id value of the Presentation
    /// Definition this submission fulfills.
    pub definition_id: String,

    /// An array of Input Descriptor Mapping Objects.
    pub descriptor_map: Vec<DescriptorMap>,
}

/// An Input Descriptor Mapping Object maps an Input Descriptor to the proof
/// fulfilling it within the submitted token.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DescriptorMap {
    /// MUST match the Input Descriptor id in the Presentation Definition
    /// this Presentation Submission is related to.
    pub id: String,

    /// The data format of the claim, e.g. `jwt_vp`.
    pub format: String,

    /// A JSONPath expression locating the presentation fulfilling the Input
    /// Descriptor: `$` for a single Verifiable Presentation.
    pub path: String,

    /// Describes how to find the credential within the located
    /// presentation.
    pub path_nested: PathNested,
}

/// A nested path object describing how to find a returned credential within
/// a Verifiable Presentation.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PathNested {
    /// Format of the credential, e.g. `jwt_vc`.
    pub format: String,

    /// A JSONPath expression locating the credential, relative to the
    /// presentation.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn type_constraint(credential_type: &str) -> Constraints {
        Constraints {
            fields: Some(vec![Field {
                path: vec!["$.type".into()],
                filter: Some(Filter {
                    type_: "string".into(),
                    value: FilterValue::Const(credential_type.into()),
                }),
                ..Field::default()
            }]),
        }
    }

    #[test]
    fn type_filter_matches_array_element() {
        let constraints = type_constraint("AtomicAttribute2023");
        let credential = json!({
            "type": ["VerifiableCredential", "AtomicAttribute2023"],
            "credentialSubject": {"name": "given-name", "value": "Susanne"}
        });
        assert!(constraints.satisfied(&credential).expect("should evaluate"));
    }

    #[test]
    fn type_filter_rejects_other_types() {
        let constraints = type_constraint("DriversLicence2024");
        let credential = json!({"type": ["VerifiableCredential", "AtomicAttribute2023"]});
        assert!(!constraints.satisfied(&credential).expect("should evaluate"));
    }

    #[test]
    fn pattern_filter() {
        let constraints = Constraints {
            fields: Some(vec![Field {
                path: vec!["$.credentialSubject.name".into()],
                filter: Some(Filter {
                    type_: "string".into(),
                    value: FilterValue::Pattern("^given-".into()),
                }),
                ..Field::default()
            }]),
        };
        let credential = json!({"credentialSubject": {"name": "given-name"}});
        assert!(constraints.satisfied(&credential).expect("should evaluate"));
    }
}
