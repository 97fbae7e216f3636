//! Single license check abstraction

use crate::manifest::LicenseManifest;
use async_trait::async_trait;
use audiobook_errors::Error;
use audiobook_events::{CheckOutcome, EventSender};
use audiobook_net::DownloadProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Verdict of one check
#[derive(Debug, Clone)]
pub enum SingleLicenseCheckResult {
    Succeeded { message: String },
    NotApplicable { message: String },
    Failed { message: String, cause: Option<Error> },
}

impl SingleLicenseCheckResult {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self::Succeeded {
            message: message.into(),
        }
    }

    pub fn not_applicable(message: impl Into<String>) -> Self {
        Self::NotApplicable {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            cause: None,
        }
    }

    pub fn failed_with(message: impl Into<String>, cause: impl Into<Error>) -> Self {
        Self::Failed {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Succeeded { message }
            | Self::NotApplicable { message }
            | Self::Failed { message, .. } => message,
        }
    }

    #[must_use]
    pub fn cause(&self) -> Option<&Error> {
        match self {
            Self::Failed { cause, .. } => cause.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn outcome(&self) -> CheckOutcome {
        match self {
            Self::Succeeded { .. } => CheckOutcome::Succeeded,
            Self::NotApplicable { .. } => CheckOutcome::NotApplicable,
            Self::Failed { .. } => CheckOutcome::Failed,
        }
    }
}

/// Progress message from a running check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckStatus {
    pub source: String,
    pub message: String,
}

impl CheckStatus {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

/// Listener for [`CheckStatus`] reports
pub type StatusCallback = Arc<dyn Fn(CheckStatus) + Send + Sync>;

/// Everything a check may use while it runs
#[derive(Clone)]
pub struct SingleLicenseCheckParameters {
    pub manifest: Arc<LicenseManifest>,
    /// Present until the owning orchestrator is closed
    pub events: Option<EventSender>,
    pub downloads: Arc<dyn DownloadProvider>,
    pub scratch_dir: PathBuf,
}

impl fmt::Debug for SingleLicenseCheckParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleLicenseCheckParameters")
            .field("manifest", &self.manifest)
            .field("events", &self.events.is_some())
            .field("scratch_dir", &self.scratch_dir)
            .finish_non_exhaustive()
    }
}

/// Factory for one kind of check
pub trait SingleLicenseCheckProvider: Send + Sync {
    /// Stable name, used as the event source
    fn name(&self) -> &str;

    /// Build a check for one run.
    ///
    /// # Errors
    ///
    /// Any error is reported as a failed check at this provider's position.
    fn create(
        &self,
        parameters: SingleLicenseCheckParameters,
        on_status_changed: StatusCallback,
    ) -> Result<Box<dyn SingleLicenseCheck>, Error>;
}

#[async_trait]
pub trait SingleLicenseCheck: Send + Sync {
    /// Run the check once
    async fn execute(&self) -> Result<SingleLicenseCheckResult, Error>;
}
