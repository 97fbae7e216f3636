use serde::{Deserialize, Serialize};

use crate::EventSource;

// Declare all domain modules
pub mod download;
pub mod general;
pub mod license;

// Re-export all domain events
pub use download::*;
pub use general::*;
pub use license::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Download provider lifecycle events
    Download(DownloadEvent),

    /// License check orchestration events
    LicenseCheck(LicenseCheckEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Download(_) => EventSource::DOWNLOAD,
            Self::LicenseCheck(_) => EventSource::LICENSE_CHECK,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::General(GeneralEvent::Error { .. })
            | Self::Download(DownloadEvent::Failed { .. }) => Level::ERROR,

            Self::LicenseCheck(LicenseCheckEvent::CheckCompleted {
                outcome: CheckOutcome::Failed,
                ..
            })
            | Self::LicenseCheck(LicenseCheckEvent::Finished { succeeded: false })
            | Self::General(GeneralEvent::Warning { .. }) => Level::WARN,

            // Debug-level events (progress updates, internal state)
            Self::General(GeneralEvent::DebugLog { .. })
            | Self::Download(DownloadEvent::Progress { .. })
            | Self::LicenseCheck(LicenseCheckEvent::StatusChanged { .. }) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "audiobook::events::general",
            Self::Download(_) => "audiobook::events::download",
            Self::LicenseCheck(_) => "audiobook::events::license_check",
        }
    }

    /// Get structured fields for logging
    #[must_use]
    pub fn log_fields(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
