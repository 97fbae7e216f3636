//! HTTP download provider
//!
//! Streams one resource to one file. Progress is reported as throttled whole
//! percentages, cancellation is cooperative through a [`CancellationToken`],
//! and the output file never survives a failed or cancelled transfer.

use crate::client::{classify_reqwest_error, NetClient, NetConfig};
use crate::credentials::apply_credentials;
use crate::progress::{deliver, percent_of, ProgressThrottle};
use crate::request::DownloadRequest;
use async_trait::async_trait;
use audiobook_config::{acquire_semaphore_permit, create_semaphore, NetworkConfig};
use audiobook_errors::{Error, NetworkError, UserFacingError};
use audiobook_events::{EventEmitter, EventSender};
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Response;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Error bodies longer than this are cut before being attached to the error
const MAX_ERROR_BODY_BYTES: usize = 512;

/// How a transfer ended. Cancellation is not a failure.
#[derive(Debug, Clone)]
pub enum DownloadOutcome {
    Succeeded { bytes: u64 },
    Cancelled,
    Failed(Error),
}

impl DownloadOutcome {
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Something that can put a remote resource into a local file
#[async_trait]
pub trait DownloadProvider: Send + Sync {
    async fn download(&self, request: DownloadRequest, cancel: CancellationToken)
        -> DownloadOutcome;
}

/// Why a transfer stopped before completing
enum Interrupted {
    Cancelled { bytes: u64 },
    Failed(Error),
}

impl From<Error> for Interrupted {
    fn from(error: Error) -> Self {
        Self::Failed(error)
    }
}

impl From<NetworkError> for Interrupted {
    fn from(error: NetworkError) -> Self {
        Self::Failed(error.into())
    }
}

/// reqwest-backed provider bounded by a transfer semaphore
pub struct HttpDownloadProvider {
    client: NetClient,
    permits: Arc<Semaphore>,
    chunk_size: usize,
    progress_step: u8,
    tx: Option<EventSender>,
}

impl EventEmitter for HttpDownloadProvider {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl HttpDownloadProvider {
    /// Create a provider from the network configuration section
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &NetworkConfig) -> Result<Self, Error> {
        let client = NetClient::new(&NetConfig::from(config))?;
        Ok(Self::with_client(client, config))
    }

    /// Create a provider around an existing client
    #[must_use]
    pub fn with_client(client: NetClient, config: &NetworkConfig) -> Self {
        Self {
            client,
            permits: create_semaphore(config.max_concurrent_downloads),
            chunk_size: config.chunk_size.max(1),
            progress_step: config.progress_step,
            tx: None,
        }
    }

    /// Attach an event sender for download lifecycle events
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    async fn transfer(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
        throttle: &mut ProgressThrottle,
    ) -> Result<u64, Interrupted> {
        let url = request.uri.as_str();
        let path = request.output_path.as_path();
        validate_scheme(&request.uri)?;

        let _permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Interrupted::Cancelled { bytes: 0 }),
            permit = acquire_semaphore_permit(Arc::clone(&self.permits), "download") => permit?,
        };

        let mut builder = self.client.get(url);
        if let Some(user_agent) = &request.user_agent {
            builder = builder.header(USER_AGENT, user_agent);
        }
        let builder = apply_credentials(builder, request.credentials.as_ref());

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Interrupted::Cancelled { bytes: 0 }),
            response = builder.send() => response.map_err(|e| classify_reqwest_error(url, &e))?,
        };
        let response = check_status(response, cancel).await?;
        let expected = response.content_length();
        self.emit_download_started(url, expected);

        if cancel.is_cancelled() {
            return Err(Interrupted::Cancelled { bytes: 0 });
        }

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                debug!(dir = %parent.display(), error = %e, "could not create download directory");
            }
        }

        let mut file = File::create(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let mut reader = StreamReader::new(Box::pin(stream));
        let mut buffer = vec![0u8; self.chunk_size];
        let mut received = 0u64;

        loop {
            if cancel.is_cancelled() {
                return Err(Interrupted::Cancelled { bytes: received });
            }
            let read = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Interrupted::Cancelled { bytes: received }),
                read = reader.read(&mut buffer) => {
                    read.map_err(|e| NetworkError::DownloadFailed(e.to_string()))?
                }
            };
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .await
                .map_err(|e| Error::io_with_path(&e, path))?;
            received += read as u64;

            // 100 is held back until the size check passes
            if let Some(total) = expected {
                if let Some(percent) = throttle.observe(percent_of(received, total).min(99)) {
                    deliver(&request.on_progress, percent);
                    self.emit_download_progress(url, percent);
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| Error::io_with_path(&e, path))?;
        drop(file);

        let actual = fs::metadata(path)
            .await
            .map_err(|e| Error::io_with_path(&e, path))?
            .len();
        if let Some(expected) = expected {
            if actual != expected {
                return Err(NetworkError::SizeMismatch {
                    url: url.to_string(),
                    expected,
                    actual,
                }
                .into());
            }
        }

        Ok(actual)
    }
}

#[async_trait]
impl DownloadProvider for HttpDownloadProvider {
    async fn download(
        &self,
        request: DownloadRequest,
        cancel: CancellationToken,
    ) -> DownloadOutcome {
        let started = Instant::now();
        let url = request.uri.to_string();
        let mut throttle = ProgressThrottle::new(self.progress_step);

        deliver(&request.on_progress, 0);
        throttle.mark(0);

        match self.transfer(&request, &cancel, &mut throttle).await {
            Ok(bytes) => {
                deliver(&request.on_progress, 100);
                self.emit_download_progress(&url, 100);
                self.emit_download_completed(&url, bytes, started.elapsed());
                debug!(url = %url, bytes, "download completed");
                DownloadOutcome::Succeeded { bytes }
            }
            Err(Interrupted::Cancelled { bytes }) => {
                remove_output(&request.output_path).await;
                self.emit_download_cancelled(&url, bytes);
                debug!(url = %url, bytes, "download cancelled");
                DownloadOutcome::Cancelled
            }
            Err(Interrupted::Failed(error)) => {
                remove_output(&request.output_path).await;
                self.emit_download_failed(&url, error.to_string(), error.is_retryable());
                warn!(url = %url, error = %error, "download failed");
                DownloadOutcome::Failed(error)
            }
        }
    }
}

fn validate_scheme(uri: &Url) -> Result<(), NetworkError> {
    match uri.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(NetworkError::UnsupportedProtocol {
            protocol: scheme.to_string(),
        }),
    }
}

/// Turn a non-2xx response into an error carrying the server's explanation.
/// Only the head of the body is read.
async fn check_status(
    response: Response,
    cancel: &CancellationToken,
) -> Result<Response, Interrupted> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let mut head = Vec::new();
    let mut stream = Box::pin(response.bytes_stream());
    while head.len() < MAX_ERROR_BODY_BYTES {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Interrupted::Cancelled { bytes: 0 }),
            chunk = stream.next() => chunk,
        };
        match chunk {
            Some(Ok(bytes)) => head.extend_from_slice(&bytes),
            Some(Err(e)) => {
                debug!(status = status.as_u16(), error = %e, "error body unreadable");
                break;
            }
            None => break,
        }
    }
    head.truncate(MAX_ERROR_BODY_BYTES);
    let body = (!head.is_empty()).then(|| String::from_utf8_lossy(&head).into_owned());

    Err(NetworkError::HttpError {
        status: status.as_u16(),
        message: status
            .canonical_reason()
            .unwrap_or("unrecognized status")
            .to_string(),
        content_type,
        body,
    }
    .into())
}

/// Remove a download's output file. A missing file is not an error.
pub(crate) async fn remove_output(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed download output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove download output"),
    }
}
