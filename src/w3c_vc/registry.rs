//! # Credential Type Registry
//!
//! The process-wide registry of credential types an issuer will produce and a
//! holder will accept. The built-in types are always present; the embedding
//! application may add its own type tags once, at startup, before any agent
//! is constructed. After initialization the registry is immutable and freely
//! shared for read.

use std::collections::BTreeSet;
use std::sync::OnceLock;

/// The built-in credential type for single-attribute claims.
pub const ATOMIC_ATTRIBUTE: &str = "AtomicAttribute2023";

/// The credential type of a published revocation list.
pub const REVOCATION_LIST: &str = "RevocationList2020Credential";

static REGISTRY: OnceLock<BTreeSet<String>> = OnceLock::new();

fn built_in() -> BTreeSet<String> {
    BTreeSet::from([ATOMIC_ATTRIBUTE.to_string(), REVOCATION_LIST.to_string()])
}

/// Registers additional credential type tags. May be called at most once,
/// before any lookup; returns `false` if the registry was already frozen.
pub fn initialize<I, S>(extension_types: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut types = built_in();
    types.extend(extension_types.into_iter().map(Into::into));
    REGISTRY.set(types).is_ok()
}

/// Returns `true` if the credential type tag is known to this process.
#[must_use]
pub fn is_registered(credential_type: &str) -> bool {
    REGISTRY.get_or_init(built_in).contains(credential_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_types_always_registered() {
        assert!(is_registered(ATOMIC_ATTRIBUTE));
        assert!(is_registered(REVOCATION_LIST));
        assert!(!is_registered("DriversLicence2024"));
    }
}
