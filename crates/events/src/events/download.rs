use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Download lifecycle events emitted by the download provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Response headers received, body transfer about to begin
    Started {
        url: String,
        total_size: Option<u64>,
    },

    /// Throttled progress update
    Progress { url: String, percent: u8 },

    /// Download completed and size verified
    Completed {
        url: String,
        final_size: u64,
        total_time: Duration,
    },

    /// Download failed; any partial file has been removed
    Failed {
        url: String,
        error: String,
        retryable: bool,
    },

    /// Download cancelled by the caller; any partial file has been removed
    Cancelled { url: String, bytes_downloaded: u64 },
}
