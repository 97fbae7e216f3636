use serde::{Deserialize, Serialize};

/// Outcome classification of a single license check, as reported in events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Succeeded,
    NotApplicable,
    Failed,
}

/// Events streamed by the license check orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LicenseCheckEvent {
    /// A run over `checks` providers has begun
    Started { checks: usize },

    /// Progress message reported by a running check
    StatusChanged { source: String, message: String },

    /// A check finished (including checks that faulted)
    CheckCompleted {
        source: String,
        outcome: CheckOutcome,
        message: String,
    },

    /// All checks have run
    Finished { succeeded: bool },
}

impl LicenseCheckEvent {
    /// Create a status message event for the named check
    pub fn status(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StatusChanged {
            source: source.into(),
            message: message.into(),
        }
    }
}
