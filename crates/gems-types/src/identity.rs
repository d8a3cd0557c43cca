//! Identity keys
//!
//! Every mapping in the ledger is keyed by a normalized identity, never by
//! a raw display name. Normalization strips spaces and "@" and lowercases,
//! so aliases of the same account collapse to one key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized lookup key derived from a display name.
///
/// Serializes as a bare string so it can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Normalize a display name into a lookup key.
    ///
    /// Idempotent: normalizing an already-normalized key is a no-op.
    pub fn new(raw: &str) -> Self {
        let key = raw
            .chars()
            .filter(|c| *c != ' ' && *c != '@')
            .flat_map(|c| c.to_lowercase())
            .collect();
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_spaces_and_at_signs_and_lowercases() {
        assert_eq!(Identity::new("Foo @Bar").as_str(), "foobar");
        assert_eq!(Identity::new("Alice Smith").as_str(), "alicesmith");
        assert_eq!(Identity::new("@@ @").as_str(), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = Identity::new("Foo @Bar");
        let twice = Identity::new(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn serializes_as_bare_string() {
        let id = Identity::new("Foo Bar");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"foobar\"");

        let back: Identity = serde_json::from_str("\"foobar\"").unwrap();
        assert_eq!(back, id);
    }
}
