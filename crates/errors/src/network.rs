//! Network-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    #[error("HTTP error {status}: {message}")]
    HttpError {
        status: u16,
        message: String,
        content_type: Option<String>,
        body: Option<String>,
    },

    #[error("size mismatch for {url}: expected {expected} bytes, received {actual}")]
    SizeMismatch {
        url: String,
        expected: u64,
        actual: u64,
    },

    #[error("concurrency error: {message}")]
    ConcurrencyError { message: String },
}

impl NetworkError {
    /// Build an HTTP error from a status code and reason without body details
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::HttpError {
            status,
            message: message.into(),
            content_type: None,
            body: None,
        }
    }
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) => {
                Some("Check your network connection and retry.")
            }
            Self::HttpError { status, .. } if *status == 401 || *status == 403 => {
                Some("Sign in again; the server rejected the supplied credentials.")
            }
            Self::SizeMismatch { .. } => {
                Some("The transfer was truncated. Retry the download.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::ConnectionRefused(_)
            | Self::DownloadFailed(_)
            | Self::SizeMismatch { .. } => true,
            Self::HttpError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "network.timeout",
            Self::DownloadFailed(_) => "network.download_failed",
            Self::ConnectionRefused(_) => "network.connection_refused",
            Self::UnsupportedProtocol { .. } => "network.unsupported_protocol",
            Self::HttpError { .. } => "network.http_error",
            Self::SizeMismatch { .. } => "network.size_mismatch",
            Self::ConcurrencyError { .. } => "network.concurrency",
        };
        Some(code)
    }
}
