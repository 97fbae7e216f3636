//! Canonical JSON for flat string objects
//!
//! `CanonicalBytes` is the only way this crate produces signing input. Its
//! inner buffer is private and its constructors always run the object
//! through `serde_jcs` (RFC 8785): keys sorted, compact separators, standard
//! string escaping. Null values are filtered before serialization and never
//! appear in the output.

use std::collections::BTreeMap;

use audiobook_errors::{ParseError, SigningError};
use serde_json::{Map, Value};

/// Bytes produced exclusively by JCS canonicalization of a flat object.
///
/// # Invariants
///
/// - Equal logical objects produce byte-identical output.
/// - Re-canonicalizing the parsed output yields the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize a flat string-to-string object
    ///
    /// # Errors
    ///
    /// Returns `SigningError::Canonicalization` if JCS serialization fails.
    pub fn new(object: &BTreeMap<String, String>) -> Result<Self, SigningError> {
        let map: Map<String, Value> = object
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        serialize(&Value::Object(map))
    }

    /// Canonicalize an object whose values may be absent; absent values are
    /// dropped rather than written as `null`
    ///
    /// # Errors
    ///
    /// Returns `SigningError::Canonicalization` if JCS serialization fails.
    pub fn from_nullable<K, V, I>(entries: I) -> Result<Self, SigningError>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let object: BTreeMap<String, String> = entries
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k.into(), v.into())))
            .collect();
        Self::new(&object)
    }

    /// Access the canonical bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn serialize(value: &Value) -> Result<CanonicalBytes, SigningError> {
    serde_jcs::to_vec(value)
        .map(CanonicalBytes)
        .map_err(|e| SigningError::Canonicalization(e.to_string()))
}

/// Parse UTF-8 JSON text holding a single flat object into a string map.
///
/// `null` members are dropped. Numbers and booleans are kept as their JSON
/// text. Nested objects and arrays are rejected.
///
/// # Errors
///
/// Returns a `ParseError` tagged with `source_id` for invalid UTF-8, invalid
/// JSON, a non-object top level, or a nested member.
pub fn parse_flat_object(
    source_id: &str,
    bytes: &[u8],
) -> Result<BTreeMap<String, String>, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        ParseError::new(source_id, "document is not valid UTF-8").with_cause(e)
    })?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| ParseError::from_json(source_id, &e))?;

    let Value::Object(members) = value else {
        return Err(ParseError::new(
            source_id,
            format!("expected a JSON object, found {}", kind_of(&value)),
        ));
    };

    let mut object = BTreeMap::new();
    for (key, member) in members {
        match member {
            Value::Null => {}
            Value::String(s) => {
                object.insert(key, s);
            }
            Value::Bool(_) | Value::Number(_) => {
                object.insert(key, member.to_string());
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(ParseError::new(
                    source_id,
                    format!(
                        "member \"{key}\" is {}; only scalar values are supported",
                        kind_of(&member)
                    ),
                ));
            }
        }
    }
    Ok(object)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
