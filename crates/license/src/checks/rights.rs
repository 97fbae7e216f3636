//! Rights window check

use crate::check::{
    CheckStatus, SingleLicenseCheck, SingleLicenseCheckParameters, SingleLicenseCheckProvider,
    SingleLicenseCheckResult, StatusCallback,
};
use async_trait::async_trait;
use audiobook_errors::{Error, LicenseError};
use chrono::{DateTime, Utc};

/// RFC 3339 instant from which playback is permitted
pub const RIGHTS_START_FIELD: &str = "rights_start";
/// RFC 3339 instant at which playback stops being permitted
pub const RIGHTS_END_FIELD: &str = "rights_end";

const NAME: &str = "rights";

/// Checks that now lies inside the manifest's `[rights_start, rights_end)`
/// window. A missing bound is open.
#[derive(Debug, Clone, Copy, Default)]
pub struct RightsCheckProvider;

impl SingleLicenseCheckProvider for RightsCheckProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn create(
        &self,
        parameters: SingleLicenseCheckParameters,
        on_status_changed: StatusCallback,
    ) -> Result<Box<dyn SingleLicenseCheck>, Error> {
        let manifest = &parameters.manifest;
        Ok(Box::new(RightsCheck {
            start: parse_bound(RIGHTS_START_FIELD, manifest.scalar(RIGHTS_START_FIELD))?,
            end: parse_bound(RIGHTS_END_FIELD, manifest.scalar(RIGHTS_END_FIELD))?,
            on_status_changed,
        }))
    }
}

fn parse_bound(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, LicenseError> {
    value
        .map(|text| {
            DateTime::parse_from_rfc3339(text)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| LicenseError::InvalidManifestField {
                    field: field.to_string(),
                    message: format!("\"{text}\" is not an RFC 3339 timestamp: {e}"),
                })
        })
        .transpose()
}

struct RightsCheck {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    on_status_changed: StatusCallback,
}

#[async_trait]
impl SingleLicenseCheck for RightsCheck {
    async fn execute(&self) -> Result<SingleLicenseCheckResult, Error> {
        if self.start.is_none() && self.end.is_none() {
            return Ok(SingleLicenseCheckResult::not_applicable(
                "manifest declares no rights window",
            ));
        }
        (self.on_status_changed)(CheckStatus::new(NAME, "checking rights window"));

        let now = Utc::now();
        if let Some(start) = self.start {
            if now < start {
                return Ok(SingleLicenseCheckResult::failed(format!(
                    "rights begin at {}",
                    start.to_rfc3339()
                )));
            }
        }
        if let Some(end) = self.end {
            if now >= end {
                return Ok(SingleLicenseCheckResult::failed(format!(
                    "rights ended at {}",
                    end.to_rfc3339()
                )));
            }
        }
        Ok(SingleLicenseCheckResult::succeeded("within rights window"))
    }
}
