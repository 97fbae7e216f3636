//! Manifest signature check

use crate::check::{
    CheckStatus, SingleLicenseCheck, SingleLicenseCheckParameters, SingleLicenseCheckProvider,
    SingleLicenseCheckResult, StatusCallback,
};
use async_trait::async_trait;
use audiobook_config::LicenseConfig;
use audiobook_errors::{ConfigError, Error};
use audiobook_jose::{HmacSha256, Jws};
use chrono::Utc;

/// Manifest scalar holding a compact JWS over the manifest's claims
pub const SIGNATURE_FIELD: &str = "signature";

const NAME: &str = "signature";

/// Verifies the manifest's HMAC-SHA256 signature
#[derive(Debug, Clone, Default)]
pub struct SignatureCheckProvider {
    secret: Option<String>,
    expected_issuer: Option<String>,
}

impl SignatureCheckProvider {
    #[must_use]
    pub fn new(secret: Option<String>, expected_issuer: Option<String>) -> Self {
        Self {
            secret,
            expected_issuer,
        }
    }

    #[must_use]
    pub fn from_config(config: &LicenseConfig) -> Self {
        Self::new(config.hmac_secret.clone(), config.expected_issuer.clone())
    }
}

impl SingleLicenseCheckProvider for SignatureCheckProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn create(
        &self,
        parameters: SingleLicenseCheckParameters,
        on_status_changed: StatusCallback,
    ) -> Result<Box<dyn SingleLicenseCheck>, Error> {
        let Some(token) = parameters.manifest.scalar(SIGNATURE_FIELD) else {
            return Ok(Box::new(SignatureCheck {
                signed: None,
                expected_issuer: None,
                on_status_changed,
            }));
        };

        let secret = self.secret.as_deref().ok_or_else(|| ConfigError::MissingField {
            field: "license.hmac_secret".to_string(),
        })?;
        let algorithm = HmacSha256::new(secret)?;

        Ok(Box::new(SignatureCheck {
            signed: Some((token.to_string(), algorithm)),
            expected_issuer: self.expected_issuer.clone(),
            on_status_changed,
        }))
    }
}

struct SignatureCheck {
    signed: Option<(String, HmacSha256)>,
    expected_issuer: Option<String>,
    on_status_changed: StatusCallback,
}

#[async_trait]
impl SingleLicenseCheck for SignatureCheck {
    async fn execute(&self) -> Result<SingleLicenseCheckResult, Error> {
        let Some((token, algorithm)) = &self.signed else {
            return Ok(SingleLicenseCheckResult::not_applicable(
                "manifest is not signed",
            ));
        };
        (self.on_status_changed)(CheckStatus::new(NAME, "verifying manifest signature"));

        let jws = match Jws::parse_compact(SIGNATURE_FIELD, token) {
            Ok(jws) => jws,
            Err(e) => {
                return Ok(SingleLicenseCheckResult::failed_with(
                    "manifest signature is malformed",
                    e,
                ))
            }
        };
        if !jws.verify(algorithm) {
            return Ok(SingleLicenseCheckResult::failed(
                "manifest signature does not match",
            ));
        }

        let claims = match jws.claims() {
            Ok(claims) => claims,
            Err(e) => {
                return Ok(SingleLicenseCheckResult::failed_with(
                    "signed claims are malformed",
                    e,
                ))
            }
        };

        if let Some(expected) = &self.expected_issuer {
            if claims.iss() != Some(expected.as_str()) {
                return Ok(SingleLicenseCheckResult::failed(format!(
                    "signature issuer {} is not {expected}",
                    claims.iss().unwrap_or("<none>")
                )));
            }
        }

        match claims.is_valid_at(Utc::now()) {
            Ok(true) => Ok(SingleLicenseCheckResult::succeeded(
                "manifest signature verified",
            )),
            Ok(false) => Ok(SingleLicenseCheckResult::failed(
                "signature is outside its validity window",
            )),
            Err(e) => Ok(SingleLicenseCheckResult::failed_with(
                "signature validity window is malformed",
                e,
            )),
        }
    }
}
