//! Pluggable signature algorithms

use std::fmt;

use audiobook_errors::SigningError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256Mac = Hmac<Sha256>;

/// Produces a signature over arbitrary input bytes.
///
/// `sign` must be deterministic for a fixed key. The trait says nothing
/// about key material, so MAC and asymmetric schemes fit equally.
pub trait SignatureAlgorithm: Send + Sync {
    /// JOSE `alg` identifier, e.g. `HS256`
    fn name(&self) -> &str;

    /// Sign the input
    fn sign(&self, input: &[u8]) -> Vec<u8>;
}

/// HMAC-SHA256 keyed with a UTF-8 shared secret (`HS256`)
#[derive(Clone)]
pub struct HmacSha256 {
    mac: HmacSha256Mac,
}

impl HmacSha256 {
    pub const NAME: &'static str = "HS256";

    /// Key the algorithm with the UTF-8 bytes of `secret`
    ///
    /// # Errors
    ///
    /// Returns `SigningError::InvalidKey` for an empty secret.
    pub fn new(secret: &str) -> Result<Self, SigningError> {
        if secret.is_empty() {
            return Err(SigningError::InvalidKey(
                "HMAC secret must not be empty".to_string(),
            ));
        }
        let mac = HmacSha256Mac::new_from_slice(secret.as_bytes())
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        Ok(Self { mac })
    }
}

impl SignatureAlgorithm for HmacSha256 {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

impl fmt::Debug for HmacSha256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSha256").finish_non_exhaustive()
    }
}
