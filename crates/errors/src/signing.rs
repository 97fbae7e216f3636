//! Signing error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SigningError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    #[error("base64url decode failed: {0}")]
    Decode(String),
}

impl UserFacingError for SigningError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidKey(_) => "signing.invalid_key",
            Self::Canonicalization(_) => "signing.canonicalization",
            Self::Decode(_) => "signing.decode",
        };
        Some(code)
    }
}
