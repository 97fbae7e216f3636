//! URL-safe Base64 without padding ambiguity
//!
//! Encoding never emits `=`; decoding accepts canonical padding or none.
//! A [`Base64UrlString`] can only be obtained by encoding bytes or by
//! successfully decoding text, so holding one proves it decodes.

use std::fmt;

use audiobook_errors::{Error, SigningError};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use thiserror::Error as ThisError;

const URL_SAFE_LENIENT_PAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    NO_PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Text rejected by the URL-safe Base64 decoder
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("invalid base64url text: {reason}")]
pub struct DecodeError {
    pub reason: String,
}

impl From<DecodeError> for SigningError {
    fn from(err: DecodeError) -> Self {
        SigningError::Decode(err.reason)
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        SigningError::from(err).into()
    }
}

/// Encode bytes as unpadded URL-safe Base64 text
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_LENIENT_PAD.encode(bytes)
}

/// Decode URL-safe Base64 text, padded or not
///
/// # Errors
///
/// Returns `DecodeError` for characters outside the URL-safe alphabet,
/// malformed padding or a truncated final quantum.
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    URL_SAFE_LENIENT_PAD.decode(text).map_err(|e| DecodeError {
        reason: e.to_string(),
    })
}

/// Validated URL-safe Base64 text together with the bytes it encodes
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Base64UrlString {
    text: String,
    bytes: Vec<u8>,
}

impl Base64UrlString {
    /// Encode raw bytes
    #[must_use]
    pub fn encode(bytes: &[u8]) -> Self {
        Self {
            text: encode(bytes),
            bytes: bytes.to_vec(),
        }
    }

    /// Validate existing text, failing immediately if it does not decode.
    /// Padded input is stored in its unpadded form.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` if `text` is not valid URL-safe Base64.
    pub fn parse(text: impl AsRef<str>) -> Result<Self, DecodeError> {
        let bytes = decode(text.as_ref())?;
        Ok(Self {
            text: encode(&bytes),
            bytes,
        })
    }

    /// The decoded bytes
    #[must_use]
    pub fn decode(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Base64UrlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Base64UrlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Base64UrlString").field(&self.text).finish()
    }
}

impl AsRef<str> for Base64UrlString {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl TryFrom<&str> for Base64UrlString {
    type Error = DecodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
