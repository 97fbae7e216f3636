//! License check error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LicenseError {
    #[error("license check {check} could not be created: {message}")]
    CheckCreationFailed { check: String, message: String },

    #[error("license check {check} failed to run: {message}")]
    CheckExecutionFault { check: String, message: String },

    #[error("license check {check} panicked: {message}")]
    CheckPanicked { check: String, message: String },

    #[error("invalid manifest field {field}: {message}")]
    InvalidManifestField { field: String, message: String },
}

impl UserFacingError for LicenseError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidManifestField { .. } => {
                Some("The book manifest is malformed; contact the content provider.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::CheckCreationFailed { .. } => "license.check_creation_failed",
            Self::CheckExecutionFault { .. } => "license.check_fault",
            Self::CheckPanicked { .. } => "license.check_panicked",
            Self::InvalidManifestField { .. } => "license.invalid_manifest_field",
        };
        Some(code)
    }
}
