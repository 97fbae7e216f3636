//! JSON Web Signature
//!
//! The signing input is `base64url(canonical(header)) "." base64url(payload)`.
//! A parsed JWS keeps the two segments exactly as received, so verification
//! runs over the bytes the signer signed even when the header holds members
//! the canonical form would rewrite. The signature is compared in constant
//! time; a mismatch is `false`, never an error.

use audiobook_errors::{ParseError, SigningError};
use subtle::ConstantTimeEq;

use crate::algorithm::SignatureAlgorithm;
use crate::base64url::Base64UrlString;
use crate::claims::JwtClaims;
use crate::header::JoseHeader;
use crate::object::JoseObject;

/// A signed header/payload pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jws {
    header: JoseHeader,
    payload: Vec<u8>,
    signature: Base64UrlString,
    signing_input: String,
}

impl Jws {
    /// Sign `payload` under `header` with `algorithm`
    ///
    /// # Errors
    ///
    /// Returns `SigningError::Canonicalization` if the header cannot be
    /// serialized.
    pub fn create(
        algorithm: &dyn SignatureAlgorithm,
        header: JoseHeader,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Self, SigningError> {
        let payload = payload.into();
        let signing_input = signing_input(&header, &payload)?;
        let signature = Base64UrlString::encode(&algorithm.sign(signing_input.as_bytes()));
        Ok(Self {
            header,
            payload,
            signature,
            signing_input,
        })
    }

    /// Sign canonical-JSON claims as the payload
    ///
    /// # Errors
    ///
    /// Returns `SigningError::Canonicalization` if either object cannot be
    /// serialized.
    pub fn create_with_claims(
        algorithm: &dyn SignatureAlgorithm,
        header: JoseHeader,
        claims: &JwtClaims,
    ) -> Result<Self, SigningError> {
        let payload = claims.canonical_bytes()?.into_vec();
        Self::create(algorithm, header, payload)
    }

    /// Assemble a JWS from parts without checking the signature
    ///
    /// # Errors
    ///
    /// Returns `SigningError::Canonicalization` if the header cannot be
    /// serialized.
    pub fn from_parts(
        header: JoseHeader,
        payload: Vec<u8>,
        signature: Base64UrlString,
    ) -> Result<Self, SigningError> {
        let signing_input = signing_input(&header, &payload)?;
        Ok(Self {
            header,
            payload,
            signature,
            signing_input,
        })
    }

    /// Recompute the signature with `algorithm` and compare.
    ///
    /// A header `alg` that names a different algorithm never verifies.
    #[must_use]
    pub fn verify(&self, algorithm: &dyn SignatureAlgorithm) -> bool {
        if self.header.alg().is_some_and(|alg| alg != algorithm.name()) {
            return false;
        }
        let expected = algorithm.sign(self.signing_input.as_bytes());
        expected.as_slice().ct_eq(self.signature.decode()).into()
    }

    #[must_use]
    pub fn header(&self) -> &JoseHeader {
        &self.header
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn signature(&self) -> &Base64UrlString {
        &self.signature
    }

    /// Interpret the payload as JWT claims
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the payload is not a flat JSON object.
    pub fn claims(&self) -> Result<JwtClaims, ParseError> {
        JwtClaims::decode_bytes("jws payload", &self.payload)
    }

    /// The `header.payload` text the signature covers
    #[must_use]
    pub fn signing_input(&self) -> &str {
        &self.signing_input
    }

    /// Compact serialization: three dot-separated Base64URL segments
    #[must_use]
    pub fn to_compact(&self) -> String {
        format!("{}.{}", self.signing_input, self.signature)
    }

    /// Parse the compact serialization
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` tagged with `source_id` when the text does not
    /// have exactly three segments, a segment is not Base64URL, or the header
    /// is not a flat JSON object.
    pub fn parse_compact(source_id: &str, text: &str) -> Result<Self, ParseError> {
        let segments: Vec<&str> = text.trim().split('.').collect();
        let [header, payload, signature] = segments.as_slice() else {
            return Err(ParseError::new(
                source_id,
                format!(
                    "compact JWS must have 3 segments, found {}",
                    segments.len()
                ),
            ));
        };

        let signing_input = format!("{header}.{payload}");
        let header = JoseHeader::decode(source_id, header)?;
        let payload = Base64UrlString::parse(*payload).map_err(|e| {
            ParseError::new(source_id, "payload segment is not base64url").with_cause(e)
        })?;
        let signature = Base64UrlString::parse(*signature).map_err(|e| {
            ParseError::new(source_id, "signature segment is not base64url").with_cause(e)
        })?;

        Ok(Self {
            header,
            payload: payload.decode().to_vec(),
            signature,
            signing_input,
        })
    }
}

/// `encode(header) + "." + encode(payload)`
///
/// # Errors
///
/// Returns `SigningError::Canonicalization` if the header cannot be
/// serialized.
pub fn signing_input(header: &JoseHeader, payload: &[u8]) -> Result<String, SigningError> {
    let header = header.encode()?;
    let payload = Base64UrlString::encode(payload);
    Ok(format!("{header}.{payload}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::HmacSha256;

    fn alg(secret: &str) -> HmacSha256 {
        HmacSha256::new(secret).unwrap()
    }

    #[test]
    fn test_signing_input_layout() {
        let header = JoseHeader::with_algorithm("HS256");
        let input = signing_input(&header, b"hello").unwrap();
        // {"alg":"HS256"} and "hello"
        assert_eq!(input, "eyJhbGciOiJIUzI1NiJ9.aGVsbG8");
    }

    #[test]
    fn test_round_trip() {
        let alg = alg("secret");
        let jws = Jws::create(&alg, JoseHeader::with_algorithm("HS256"), b"payload".to_vec()).unwrap();
        assert!(jws.verify(&alg));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let jws = Jws::create(&alg("one"), JoseHeader::new(), b"payload".to_vec()).unwrap();
        assert!(!jws.verify(&alg("two")));
    }

    #[test]
    fn test_alg_mismatch_fails() {
        let alg = alg("secret");
        let jws = Jws::create(&alg, JoseHeader::with_algorithm("RS256"), b"p".to_vec()).unwrap();
        assert!(!jws.verify(&alg));
    }

    #[test]
    fn test_truncated_signature_is_false_not_error() {
        let alg = alg("secret");
        let jws = Jws::create(&alg, JoseHeader::new(), b"payload".to_vec()).unwrap();
        let short = Base64UrlString::encode(&jws.signature().decode()[..8]);
        let tampered =
            Jws::from_parts(jws.header().clone(), jws.payload().to_vec(), short).unwrap();
        assert!(!tampered.verify(&alg));
    }

    #[test]
    fn test_compact_round_trip() {
        let alg = alg("secret");
        let claims = JwtClaims::new().issuer("me").subject("book");
        let jws =
            Jws::create_with_claims(&alg, JoseHeader::with_algorithm("HS256"), &claims).unwrap();
        let compact = jws.to_compact();
        assert_eq!(compact.matches('.').count(), 2);

        let parsed = Jws::parse_compact("manifest", &compact).unwrap();
        assert_eq!(parsed, jws);
        assert!(parsed.verify(&alg));
        assert_eq!(parsed.claims().unwrap(), claims);
    }

    #[test]
    fn test_verifies_header_with_non_string_members() {
        // {"alg":"HS256","ver":2} decodes with "ver" as the text "2"; the
        // received segment is what was signed
        let header_segment = crate::base64url::encode(br#"{"alg":"HS256","ver":2}"#);
        let payload_segment = crate::base64url::encode(b"hello");
        let input = format!("{header_segment}.{payload_segment}");
        let secret = alg("secret");
        let signature = crate::base64url::encode(&secret.sign(input.as_bytes()));

        let parsed = Jws::parse_compact("manifest", &format!("{input}.{signature}")).unwrap();

        assert_eq!(parsed.header().get("ver"), Some("2"));
        assert_eq!(parsed.signing_input(), input);
        assert!(parsed.verify(&secret));
        assert!(!parsed.verify(&alg("other")));
        assert_eq!(parsed.to_compact(), format!("{input}.{signature}"));

        let rebuilt = Jws::from_parts(
            parsed.header().clone(),
            parsed.payload().to_vec(),
            parsed.signature().clone(),
        )
        .unwrap();
        assert!(!rebuilt.verify(&secret));
    }

    #[test]
    fn test_compact_segment_count() {
        let err = Jws::parse_compact("manifest", "a.b").unwrap_err();
        assert!(err.message.contains("found 2"));
    }
}
