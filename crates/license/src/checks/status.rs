//! License status document check

use crate::check::{
    CheckStatus, SingleLicenseCheck, SingleLicenseCheckParameters, SingleLicenseCheckProvider,
    SingleLicenseCheckResult, StatusCallback,
};
use crate::status::LicenseStatusDocument;
use async_trait::async_trait;
use audiobook_errors::{Error, LicenseError};
use audiobook_events::{EventEmitter, EventSender};
use audiobook_net::{CancellationToken, DownloadOutcome, DownloadProvider, DownloadRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Manifest scalar holding the status document URI
pub const STATUS_DOCUMENT_FIELD: &str = "status_document";

const NAME: &str = "status";

/// Fetches the license status document and requires a playable status
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCheckProvider;

impl SingleLicenseCheckProvider for StatusCheckProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn create(
        &self,
        parameters: SingleLicenseCheckParameters,
        on_status_changed: StatusCallback,
    ) -> Result<Box<dyn SingleLicenseCheck>, Error> {
        let uri = parameters
            .manifest
            .scalar(STATUS_DOCUMENT_FIELD)
            .map(|text| {
                Url::parse(text).map_err(|e| LicenseError::InvalidManifestField {
                    field: STATUS_DOCUMENT_FIELD.to_string(),
                    message: format!("\"{text}\" is not a URI: {e}"),
                })
            })
            .transpose()?;

        Ok(Box::new(StatusCheck {
            uri,
            downloads: parameters.downloads,
            scratch_dir: parameters.scratch_dir,
            events: parameters.events,
            on_status_changed,
        }))
    }
}

struct StatusCheck {
    uri: Option<Url>,
    downloads: Arc<dyn DownloadProvider>,
    scratch_dir: PathBuf,
    events: Option<EventSender>,
    on_status_changed: StatusCallback,
}

impl StatusCheck {
    async fn fetch(&self, uri: &Url) -> Result<LicenseStatusDocument, SingleLicenseCheckResult> {
        let scratch = self.scratch_dir.join(format!("status-{}.json", Uuid::new_v4()));
        let request = DownloadRequest::new(uri.clone(), &scratch);

        match self
            .downloads
            .download(request, CancellationToken::new())
            .await
        {
            DownloadOutcome::Succeeded { bytes } => {
                debug!(uri = %uri, bytes, "fetched license status document");
            }
            DownloadOutcome::Cancelled => {
                return Err(SingleLicenseCheckResult::failed(
                    "status document download was cancelled",
                ))
            }
            DownloadOutcome::Failed(error) => {
                return Err(SingleLicenseCheckResult::failed_with(
                    "could not fetch license status document",
                    error,
                ))
            }
        }

        let contents = fs::read(&scratch).await;
        if let Err(e) = fs::remove_file(&scratch).await {
            warn!(path = %scratch.display(), error = %e, "failed to remove status scratch file");
        }
        let contents = contents.map_err(|e| {
            SingleLicenseCheckResult::failed_with(
                "could not read license status document",
                Error::io_with_path(&e, &scratch),
            )
        })?;

        LicenseStatusDocument::parse(uri.as_str(), &contents).map_err(|e| {
            SingleLicenseCheckResult::failed_with("license status document is malformed", e)
        })
    }
}

#[async_trait]
impl SingleLicenseCheck for StatusCheck {
    async fn execute(&self) -> Result<SingleLicenseCheckResult, Error> {
        let Some(uri) = &self.uri else {
            return Ok(SingleLicenseCheckResult::not_applicable(
                "manifest has no status document",
            ));
        };
        (self.on_status_changed)(CheckStatus::new(NAME, "fetching license status"));
        self.events
            .emit_debug(format!("fetching license status document from {uri}"));

        let document = match self.fetch(uri).await {
            Ok(document) => document,
            Err(result) => return Ok(result),
        };

        let status = document.status;
        if status.permits_playback() {
            Ok(SingleLicenseCheckResult::succeeded(format!(
                "license is {status}"
            )))
        } else {
            Ok(SingleLicenseCheckResult::failed(format!(
                "license is {status}"
            )))
        }
    }
}
