//! JOSE header

use std::collections::BTreeMap;

use crate::object::JoseObject;

/// The JOSE header preceding a signed payload.
///
/// Only `alg` is recognized; everything else is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoseHeader {
    members: BTreeMap<String, String>,
}

impl JoseHeader {
    pub const ALG: &'static str = "alg";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A header declaring only the given algorithm
    #[must_use]
    pub fn with_algorithm(alg: impl Into<String>) -> Self {
        Self::new().with(Self::ALG, alg)
    }

    /// Builder-style insert of an arbitrary member
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.members.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.get(Self::ALG)
    }
}

impl JoseObject for JoseHeader {
    fn from_map(map: BTreeMap<String, String>) -> Self {
        Self { members: map }
    }

    fn as_map(&self) -> &BTreeMap<String, String> {
        &self.members
    }
}
