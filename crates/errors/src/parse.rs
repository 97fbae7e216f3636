//! Structured parse failures for JOSE, claims and status documents

use std::borrow::Cow;
use std::fmt;

use crate::UserFacingError;
use thiserror::Error;

/// A parse failure carrying the source it came from and, where the
/// underlying parser knows it, a 1-based line and column. Unknown positions
/// are reported as 0.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{source_id}:{line}:{column}: {message}")]
pub struct ParseError {
    pub source_id: String,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub cause: Option<String>,
}

impl ParseError {
    /// Create a parse error with no position information
    #[must_use]
    pub fn new(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            message: message.into(),
            line: 0,
            column: 0,
            cause: None,
        }
    }

    #[must_use]
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    /// Convert a `serde_json` failure, keeping its line and column
    #[must_use]
    pub fn from_json(source_id: impl Into<String>, err: &serde_json::Error) -> Self {
        Self::new(source_id, err.to_string())
            .at(err.line(), err.column())
            .with_cause(category_name(err))
    }
}

fn category_name(err: &serde_json::Error) -> &'static str {
    match err.classify() {
        serde_json::error::Category::Io => "io",
        serde_json::error::Category::Syntax => "syntax",
        serde_json::error::Category::Data => "data",
        serde_json::error::Category::Eof => "eof",
    }
}

impl UserFacingError for ParseError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("The document is malformed; contact the content provider.")
    }

    fn user_code(&self) -> Option<&'static str> {
        Some("parse.invalid_document")
    }
}
