//! JWT claims

use std::collections::BTreeMap;

use audiobook_errors::ParseError;
use chrono::{DateTime, Utc};

use crate::object::JoseObject;

/// String-valued JWT claims. All recognized claims are optional and any
/// other members are preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JwtClaims {
    members: BTreeMap<String, String>,
}

macro_rules! claim_accessors {
    ($($(#[$doc:meta])* $getter:ident, $setter:ident => $key:literal;)*) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub fn $getter(&self) -> Option<&str> {
                self.get($key)
            }

            #[must_use]
            pub fn $setter(self, value: impl Into<String>) -> Self {
                self.with($key, value)
            }
        )*

        /// Names of the recognized claims
        pub const RECOGNIZED: &'static [&'static str] = &[$($key),*];
    };
}

impl JwtClaims {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of an arbitrary member
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.members.insert(key.into(), value.into());
        self
    }

    claim_accessors! {
        /// Issuer
        iss, issuer => "iss";
        /// Subject
        sub, subject => "sub";
        /// Audience
        aud, audience => "aud";
        /// Expiry, seconds since the epoch or RFC 3339
        exp, expires => "exp";
        /// Not-before, seconds since the epoch or RFC 3339
        nbf, not_before => "nbf";
        /// Issued-at
        iat, issued_at => "iat";
        /// Token identifier
        jti, token_id => "jti";
        /// Media type of the complete token
        typ, token_type => "typ";
        /// Media type of the secured content
        cty, content_type => "cty";
    }

    /// Parsed `exp`
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` when `exp` is present but not a timestamp.
    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>, ParseError> {
        self.exp().map(|v| parse_timestamp("exp", v)).transpose()
    }

    /// Parsed `nbf`
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` when `nbf` is present but not a timestamp.
    pub fn not_before_at(&self) -> Result<Option<DateTime<Utc>>, ParseError> {
        self.nbf().map(|v| parse_timestamp("nbf", v)).transpose()
    }

    /// Whether `now` falls inside the `nbf`..`exp` window; absent bounds are open
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` when either bound is malformed.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> Result<bool, ParseError> {
        let started = self.not_before_at()?.is_none_or(|nbf| now >= nbf);
        let unexpired = self.expires_at()?.is_none_or(|exp| now < exp);
        Ok(started && unexpired)
    }
}

fn parse_timestamp(claim: &str, value: &str) -> Result<DateTime<Utc>, ParseError> {
    if let Ok(seconds) = value.parse::<i64>() {
        return DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            ParseError::new(claim, format!("timestamp {seconds} is out of range"))
        });
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            ParseError::new(claim, format!("\"{value}\" is not a timestamp")).with_cause(e)
        })
}

impl JoseObject for JwtClaims {
    fn from_map(map: BTreeMap<String, String>) -> Self {
        Self { members: map }
    }

    fn as_map(&self) -> &BTreeMap<String, String> {
        &self.members
    }
}
