//! Shared encode/decode for the flat JOSE objects

use std::collections::BTreeMap;

use audiobook_errors::{ParseError, SigningError};

use crate::base64url::Base64UrlString;
use crate::canonical::{parse_flat_object, CanonicalBytes};

/// A flat `string -> string` object carried as Base64URL(canonical JSON).
///
/// Unknown members are preserved verbatim so objects round-trip through
/// `decode` and `encode` unchanged.
pub trait JoseObject: Sized {
    /// Wrap an already-parsed map
    fn from_map(map: BTreeMap<String, String>) -> Self;

    /// Borrow every member, recognized or not
    fn as_map(&self) -> &BTreeMap<String, String>;

    /// Look up a member by name
    fn get(&self, key: &str) -> Option<&str> {
        self.as_map().get(key).map(String::as_str)
    }

    /// Canonical JSON serialization of this object
    ///
    /// # Errors
    ///
    /// Returns `SigningError::Canonicalization` if serialization fails.
    fn canonical_bytes(&self) -> Result<CanonicalBytes, SigningError> {
        CanonicalBytes::new(self.as_map())
    }

    /// Base64URL of the canonical JSON
    ///
    /// # Errors
    ///
    /// Returns `SigningError::Canonicalization` if serialization fails.
    fn encode(&self) -> Result<Base64UrlString, SigningError> {
        Ok(Base64UrlString::encode(self.canonical_bytes()?.as_bytes()))
    }

    /// Reverse of [`JoseObject::encode`]; `source_id` names the origin of
    /// `text` in any parse error
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the text is not Base64URL, not UTF-8, or not
    /// a flat JSON object.
    fn decode(source_id: &str, text: &str) -> Result<Self, ParseError> {
        let encoded = Base64UrlString::parse(text)
            .map_err(|e| ParseError::new(source_id, "invalid base64url encoding").with_cause(e))?;
        Self::decode_bytes(source_id, encoded.decode())
    }

    /// Parse already-decoded JSON bytes
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the bytes are not a flat JSON object.
    fn decode_bytes(source_id: &str, bytes: &[u8]) -> Result<Self, ParseError> {
        parse_flat_object(source_id, bytes).map(Self::from_map)
    }
}
