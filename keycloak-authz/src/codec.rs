//! Codec for id lists embedded as JSON strings
//!
//! Keycloak stores policy and permission configuration as a flat map of
//! strings, so a list of ids travels as a JSON array serialized into a string
//! inside the outer document:
//!
//! ```json
//! {"config": {"users": "[\"id1\",\"id2\"]"}}
//! ```
//!
//! The rest of the crate works with plain `Vec<String>`; only this module
//! knows about the nested encoding.

use crate::error::AuthzError;

/// Encode ids as a JSON array string
pub fn encode(ids: &[String]) -> String {
    // Serializing a slice of strings cannot fail.
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a JSON array string into ids
///
/// An empty or blank string decodes to an empty list.
pub fn decode(encoded: &str) -> Result<Vec<String>, AuthzError> {
    if encoded.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(encoded).map_err(|e| {
        AuthzError::InvalidResponse(format!("Invalid encoded id list {:?}: {}", encoded, e))
    })
}

/// `#[serde(with = ...)]` adapter for double-encoded id lists
///
/// Serializes as the string form. Deserializes from the string form, and
/// also from a bare array; a missing or null field yields an empty list
/// when combined with `#[serde(default)]`.
pub mod json_string_list {
    use serde::de::{self, Deserialize, Deserializer};
    use serde::Serializer;

    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Encoded(String),
        Plain(Vec<String>),
    }

    pub fn serialize<S>(ids: &[String], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::encode(ids))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Wire>::deserialize(deserializer)? {
            None => Ok(Vec::new()),
            Some(Wire::Plain(ids)) => Ok(ids),
            Some(Wire::Encoded(encoded)) => {
                super::decode(&encoded).map_err(|e| de::Error::custom(e.to_string()))
            }
        }
    }
}
