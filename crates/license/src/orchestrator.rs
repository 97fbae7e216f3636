//! License check orchestrator
//!
//! Runs every configured check against a manifest, one after another, and
//! folds the verdicts into a [`LicenseCheckResult`]. A check that errors or
//! panics while being created or executed becomes a `Failed` result at its
//! own position; the remaining checks still run.

use crate::check::{
    CheckStatus, SingleLicenseCheckParameters, SingleLicenseCheckProvider,
    SingleLicenseCheckResult, StatusCallback,
};
use crate::checks::standard_providers;
use crate::manifest::LicenseManifest;
use audiobook_config::LicenseConfig;
use audiobook_errors::{Error, LicenseError};
use audiobook_events::{AppEvent, EventSender, LicenseCheckEvent};
use audiobook_net::DownloadProvider;
use futures::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Verdicts of one run, in provider order
#[derive(Debug, Clone)]
pub struct LicenseCheckResult {
    results: Vec<SingleLicenseCheckResult>,
}

impl LicenseCheckResult {
    #[must_use]
    pub fn new(results: Vec<SingleLicenseCheckResult>) -> Self {
        Self { results }
    }

    /// True when no check failed. `NotApplicable` does not count against.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.results.iter().any(SingleLicenseCheckResult::is_failed)
    }

    #[must_use]
    pub fn results(&self) -> &[SingleLicenseCheckResult] {
        &self.results
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn into_results(self) -> Vec<SingleLicenseCheckResult> {
        self.results
    }
}

/// Event stream whose sender can be dropped exactly once
struct EventStream {
    sender: Mutex<Option<EventSender>>,
}

impl EventStream {
    fn sender(&self) -> Option<EventSender> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn emit(&self, event: LicenseCheckEvent) {
        if let Some(sender) = self.sender() {
            let _ = sender.send(AppEvent::LicenseCheck(event));
        }
    }

    fn close(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Sequential, fault-isolating runner over a fixed list of check providers
pub struct LicenseCheck {
    providers: Vec<Arc<dyn SingleLicenseCheckProvider>>,
    downloads: Arc<dyn DownloadProvider>,
    scratch_dir: PathBuf,
    events: Arc<EventStream>,
}

impl LicenseCheck {
    pub fn new(
        providers: Vec<Arc<dyn SingleLicenseCheckProvider>>,
        downloads: Arc<dyn DownloadProvider>,
        scratch_dir: impl Into<PathBuf>,
        events: EventSender,
    ) -> Self {
        Self {
            providers,
            downloads,
            scratch_dir: scratch_dir.into(),
            events: Arc::new(EventStream {
                sender: Mutex::new(Some(events)),
            }),
        }
    }

    /// Orchestrator over the signature, rights and status checks
    pub fn with_standard_checks(
        config: &LicenseConfig,
        downloads: Arc<dyn DownloadProvider>,
        events: EventSender,
    ) -> Self {
        Self::new(
            standard_providers(config),
            downloads,
            config.scratch_dir(),
            events,
        )
    }

    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Run every check against `manifest`
    pub async fn run(&self, manifest: &LicenseManifest) -> LicenseCheckResult {
        let manifest = Arc::new(manifest.clone());
        info!(
            manifest = %manifest.uri(),
            checks = self.providers.len(),
            "running license checks"
        );
        self.events.emit(LicenseCheckEvent::Started {
            checks: self.providers.len(),
        });

        let mut results = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let result = self.run_one(provider.as_ref(), &manifest).await;
            debug!(
                check = provider.name(),
                outcome = ?result.outcome(),
                message = result.message(),
                "license check finished"
            );
            self.events.emit(LicenseCheckEvent::CheckCompleted {
                source: provider.name().to_string(),
                outcome: result.outcome(),
                message: result.message().to_string(),
            });
            results.push(result);
        }

        let result = LicenseCheckResult::new(results);
        info!(
            manifest = %manifest.uri(),
            succeeded = result.succeeded(),
            "license checks complete"
        );
        self.events.emit(LicenseCheckEvent::Finished {
            succeeded: result.succeeded(),
        });
        result
    }

    /// Complete the event stream. Events already sent stay readable; later
    /// calls do nothing.
    pub fn close(&self) {
        if self.events.close() {
            debug!("license check event stream closed");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    async fn run_one(
        &self,
        provider: &dyn SingleLicenseCheckProvider,
        manifest: &Arc<LicenseManifest>,
    ) -> SingleLicenseCheckResult {
        let name = provider.name().to_string();
        let parameters = SingleLicenseCheckParameters {
            manifest: Arc::clone(manifest),
            events: self.events.sender(),
            downloads: Arc::clone(&self.downloads),
            scratch_dir: self.scratch_dir.clone(),
        };

        let created = panic::catch_unwind(AssertUnwindSafe(|| {
            provider.create(parameters, self.status_callback())
        }));
        let check = match created {
            Ok(Ok(check)) => check,
            Ok(Err(error)) => {
                return fault(LicenseError::CheckCreationFailed {
                    check: name,
                    message: error.to_string(),
                })
            }
            Err(payload) => {
                return fault(LicenseError::CheckPanicked {
                    check: name,
                    message: panic_message(payload.as_ref()),
                })
            }
        };

        match AssertUnwindSafe(check.execute()).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => fault(LicenseError::CheckExecutionFault {
                check: name,
                message: error.to_string(),
            }),
            Err(payload) => fault(LicenseError::CheckPanicked {
                check: name,
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn status_callback(&self) -> StatusCallback {
        let events = Arc::clone(&self.events);
        Arc::new(move |status: CheckStatus| {
            debug!(check = %status.source, message = %status.message, "license check status");
            events.emit(LicenseCheckEvent::StatusChanged {
                source: status.source,
                message: status.message,
            });
        })
    }
}

fn fault(error: LicenseError) -> SingleLicenseCheckResult {
    warn!(error = %error, "license check faulted");
    SingleLicenseCheckResult::failed_with(error.to_string(), Error::from(error))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
