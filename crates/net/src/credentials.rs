//! Credentials injected into download requests

use reqwest::RequestBuilder;
use std::fmt;

/// Credentials for a download. At most one `Authorization` header results.
#[derive(Clone, PartialEq, Eq)]
pub enum DownloadCredentials {
    /// RFC 2617 Basic authentication
    Basic { user: String, password: String },
    /// `Authorization: Bearer <token>`
    BearerToken { token: String },
}

impl DownloadCredentials {
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::BearerToken {
            token: token.into(),
        }
    }

    /// Add the `Authorization` header to a request
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Basic { user, password } => request.basic_auth(user, Some(password)),
            Self::BearerToken { token } => request.bearer_auth(token),
        }
    }
}

/// Apply optional credentials; `None` adds no header
pub(crate) fn apply_credentials(
    request: RequestBuilder,
    credentials: Option<&DownloadCredentials>,
) -> RequestBuilder {
    match credentials {
        Some(credentials) => credentials.apply(request),
        None => request,
    }
}

impl fmt::Debug for DownloadCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            Self::BearerToken { .. } => f
                .debug_struct("BearerToken")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}
