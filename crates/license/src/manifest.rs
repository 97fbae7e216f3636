//! The slice of a book manifest that license checks read

use audiobook_errors::ParseError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Identifier and top-level scalar members of a book manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseManifest {
    uri: String,
    scalars: BTreeMap<String, String>,
}

impl LicenseManifest {
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            scalars: BTreeMap::new(),
        }
    }

    /// Builder-style insert of a scalar member
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.scalars.insert(key.into(), value.into());
        self
    }

    /// Collect the top-level scalars of a JSON manifest.
    ///
    /// Strings are kept as-is, numbers and booleans as their JSON text.
    /// Nulls, arrays and nested objects are skipped.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the document is not a JSON object.
    pub fn from_json(uri: impl Into<String>, bytes: &[u8]) -> Result<Self, ParseError> {
        let uri = uri.into();
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ParseError::from_json(&uri, &e))?;
        let Value::Object(members) = value else {
            return Err(ParseError::new(&uri, "manifest must be a JSON object"));
        };

        let scalars = members
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                Value::Number(n) => Some((key, n.to_string())),
                Value::Bool(b) => Some((key, b.to_string())),
                Value::Null | Value::Array(_) | Value::Object(_) => None,
            })
            .collect();

        Ok(Self { uri, scalars })
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.scalars.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn scalars(&self) -> &BTreeMap<String, String> {
        &self.scalars
    }
}
