//! License status documents
//!
//! A status document is a JSON object whose optional `status` member names
//! one of six states. Matching is case-insensitive; output is lowercase.

use audiobook_errors::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of a license as reported by the license server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Ready,
    Active,
    Revoked,
    Returned,
    Cancelled,
    Expired,
}

impl LicenseStatus {
    pub const ALL: [Self; 6] = [
        Self::Ready,
        Self::Active,
        Self::Revoked,
        Self::Returned,
        Self::Cancelled,
        Self::Expired,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Only a ready or active license allows the book to be played
    #[must_use]
    pub fn permits_playback(self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ParseError::new("license status", format!("unknown license status \"{s}\""))
            })
    }
}

/// Parsed license status document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LicenseStatusDocument {
    pub status: LicenseStatus,
}

#[derive(Deserialize)]
struct RawStatusDocument {
    status: Option<String>,
}

impl LicenseStatusDocument {
    /// Status assumed when the server omits the `status` member
    pub const DEFAULT_STATUS: LicenseStatus = LicenseStatus::Ready;

    #[must_use]
    pub fn new(status: LicenseStatus) -> Self {
        Self { status }
    }

    /// Parse a status document.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` tagged with `source` for malformed JSON (with
    /// the parser's line and column) or for a status outside the six known
    /// values.
    pub fn parse(source: &str, bytes: &[u8]) -> Result<Self, ParseError> {
        let raw: RawStatusDocument =
            serde_json::from_slice(bytes).map_err(|e| ParseError::from_json(source, &e))?;

        let status = match raw.status {
            Some(text) => text.parse::<LicenseStatus>().map_err(|e| ParseError {
                source_id: source.to_string(),
                ..e
            })?,
            None => Self::DEFAULT_STATUS,
        };
        Ok(Self { status })
    }

    /// Serialize with the lowercase status name
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::json!({ "status": self.status.as_str() }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        for (text, expected) in [
            ("ready", LicenseStatus::Ready),
            ("ACTIVE", LicenseStatus::Active),
            ("Revoked", LicenseStatus::Revoked),
            ("reTURNed", LicenseStatus::Returned),
            ("cancelled", LicenseStatus::Cancelled),
            ("EXPIRED", LicenseStatus::Expired),
        ] {
            let json = format!(r#"{{"status":"{text}"}}"#);
            let document = LicenseStatusDocument::parse("test", json.as_bytes()).unwrap();
            assert_eq!(document.status, expected);
        }
    }

    #[test]
    fn test_missing_status_defaults_to_ready() {
        let document = LicenseStatusDocument::parse("test", br#"{"updated":"2024-01-01"}"#).unwrap();
        assert_eq!(document.status, LicenseStatus::Ready);

        let document = LicenseStatusDocument::parse("test", br#"{"status":null}"#).unwrap();
        assert_eq!(document.status, LicenseStatus::Ready);
    }

    #[test]
    fn test_unknown_status_is_named() {
        let err = LicenseStatusDocument::parse("lsd", br#"{"status":"bogus"}"#).unwrap_err();
        assert_eq!(err.source_id, "lsd");
        assert!(err.message.contains("bogus"));
    }

    #[test]
    fn test_malformed_json_reports_position() {
        let err = LicenseStatusDocument::parse("lsd", b"{\n  \"status\": ").unwrap_err();
        assert_eq!(err.source_id, "lsd");
        assert_eq!(err.line, 2);
        assert!(err.column > 0);
    }

    #[test]
    fn test_serializes_lowercase() {
        let document = LicenseStatusDocument::new(LicenseStatus::Cancelled);
        assert_eq!(document.to_json(), r#"{"status":"cancelled"}"#);
        assert_eq!(
            serde_json::to_string(&document).unwrap(),
            r#"{"status":"cancelled"}"#
        );
    }

    #[test]
    fn test_playback_permission() {
        let permitted: Vec<_> = LicenseStatus::ALL
            .into_iter()
            .filter(|s| s.permits_playback())
            .collect();
        assert_eq!(permitted, vec![LicenseStatus::Ready, LicenseStatus::Active]);
    }
}
