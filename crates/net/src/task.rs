//! Download task state machine
//!
//! A [`DownloadTask`] owns one output path and moves between `Initial`,
//! `Downloading` and `Downloaded` in response to `fetch`, `cancel` and
//! `delete`. Every transition is announced on a broadcast channel.
//!
//! Two locks are involved. The state cell is a short-lived `std` mutex that
//! is never held across an await or a listener call. Every status is sent
//! while it is held, so subscribers see transitions in the order they were
//! applied and the last status received always matches [`DownloadTask::state`].
//! The operation gate is an async mutex that serializes the public
//! operations so that a `cancel` running to completion cannot interleave with
//! a `fetch`.

use crate::progress::deliver;
use crate::provider::{remove_output, DownloadOutcome, DownloadProvider};
use crate::request::DownloadRequest;
use audiobook_errors::{Error, UserFacingError};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const STATUS_CHANNEL_CAPACITY: usize = 256;

/// Status broadcast to task subscribers
#[derive(Debug, Clone)]
pub enum DownloadStatus {
    Initial,
    Downloading { percent: u8 },
    Downloaded,
    /// Sent after the `Initial` that follows a failed fetch
    DownloadFailed { error: Error, message: String },
}

/// An in-flight fetch
struct DownloadHandle {
    generation: u64,
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
    percent: u8,
}

enum DownloadTaskState {
    Initial,
    Downloading(DownloadHandle),
    Downloaded,
}

impl DownloadTaskState {
    fn status(&self) -> DownloadStatus {
        match self {
            Self::Initial => DownloadStatus::Initial,
            Self::Downloading(handle) => DownloadStatus::Downloading {
                percent: handle.percent,
            },
            Self::Downloaded => DownloadStatus::Downloaded,
        }
    }
}

struct TaskInner {
    id: String,
    provider: Arc<dyn DownloadProvider>,
    request: DownloadRequest,
    state: Mutex<DownloadTaskState>,
    generations: AtomicU64,
    operations: tokio::sync::Mutex<()>,
    statuses: broadcast::Sender<DownloadStatus>,
}

/// Cloneable handle to a single downloadable artifact
#[derive(Clone)]
pub struct DownloadTask {
    inner: Arc<TaskInner>,
}

impl DownloadTask {
    /// Create a task in the `Initial` state.
    ///
    /// The request's own progress listener keeps receiving every value the
    /// provider reports.
    pub fn new(
        id: impl Into<String>,
        provider: Arc<dyn DownloadProvider>,
        request: DownloadRequest,
    ) -> Self {
        let (statuses, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(TaskInner {
                id: id.into(),
                provider,
                request,
                state: Mutex::new(DownloadTaskState::Initial),
                generations: AtomicU64::new(0),
                operations: tokio::sync::Mutex::new(()),
                statuses,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.inner.request.output_path
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> DownloadStatus {
        self.inner.lock_state().status()
    }

    /// Receive every status broadcast from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DownloadStatus> {
        self.inner.statuses.subscribe()
    }

    /// Start downloading if nothing is downloaded yet, otherwise rebroadcast
    /// the current status.
    pub async fn fetch(&self) {
        let _gate = self.inner.operations.lock().await;

        let started = {
            let mut state = self.inner.lock_state();
            let started = if matches!(*state, DownloadTaskState::Initial) {
                let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;
                let token = CancellationToken::new();
                *state = DownloadTaskState::Downloading(DownloadHandle {
                    generation,
                    token: token.clone(),
                    worker: None,
                    percent: 0,
                });
                Some((generation, token))
            } else {
                None
            };
            let status = state.status();
            self.inner.broadcast(&state, status);
            started
        };

        if let Some((generation, token)) = started {
            debug!(task = %self.inner.id, generation, "starting download");
            let worker = tokio::spawn(Arc::clone(&self.inner).run(generation, token));
            let mut state = self.inner.lock_state();
            if let DownloadTaskState::Downloading(handle) = &mut *state {
                if handle.generation == generation {
                    handle.worker = Some(worker);
                }
            }
        }
    }

    /// Abort an in-flight download and discard its partial file. Does
    /// nothing to a downloaded artifact.
    pub async fn cancel(&self) {
        let _gate = self.inner.operations.lock().await;

        let previous = {
            let mut state = self.inner.lock_state();
            if matches!(*state, DownloadTaskState::Downloaded) {
                return;
            }
            match std::mem::replace(&mut *state, DownloadTaskState::Initial) {
                DownloadTaskState::Downloading(handle) => Some(handle),
                _ => None,
            }
        };

        if let Some(handle) = previous {
            self.inner.stop(handle).await;
            remove_output(self.output_path()).await;
        }
        self.inner.announce_reset();
    }

    /// Remove whatever is on disk, cancelling an in-flight download first
    pub async fn delete(&self) {
        let _gate = self.inner.operations.lock().await;

        let previous =
            std::mem::replace(&mut *self.inner.lock_state(), DownloadTaskState::Initial);
        match previous {
            DownloadTaskState::Downloading(handle) => {
                self.inner.stop(handle).await;
                remove_output(self.output_path()).await;
            }
            DownloadTaskState::Downloaded => remove_output(self.output_path()).await,
            DownloadTaskState::Initial => {}
        }
        self.inner.announce_reset();
    }
}

impl TaskInner {
    fn lock_state(&self) -> MutexGuard<'_, DownloadTaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a status. Taking the guard ties every send to the state lock.
    fn broadcast(&self, _state: &MutexGuard<'_, DownloadTaskState>, status: DownloadStatus) {
        debug!(task = %self.id, ?status, "download status");
        // No subscribers is fine
        let _ = self.statuses.send(status);
    }

    /// Announce the `Initial` state left behind by `cancel` or `delete`
    fn announce_reset(&self) {
        let state = self.lock_state();
        if matches!(*state, DownloadTaskState::Initial) {
            self.broadcast(&state, DownloadStatus::Initial);
        }
    }

    async fn run(self: Arc<Self>, generation: u64, token: CancellationToken) {
        let mut request = self.request.clone();
        let listener = Arc::clone(&request.on_progress);
        let inner = Arc::clone(&self);
        request.on_progress = Arc::new(move |percent| {
            inner.record_progress(generation, percent);
            deliver(&listener, percent);
        });

        let outcome = AssertUnwindSafe(self.provider.download(request, token))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                DownloadOutcome::Failed(Error::internal("download provider panicked"))
            });
        self.complete(generation, outcome);
    }

    fn record_progress(&self, generation: u64, percent: u8) {
        let mut state = self.lock_state();
        let advanced = match &mut *state {
            DownloadTaskState::Downloading(handle)
                if handle.generation == generation && percent > handle.percent =>
            {
                handle.percent = percent;
                true
            }
            _ => false,
        };
        if advanced {
            self.broadcast(&state, DownloadStatus::Downloading { percent });
        }
    }

    fn complete(&self, generation: u64, outcome: DownloadOutcome) {
        let mut state = self.lock_state();
        match &*state {
            DownloadTaskState::Downloading(handle) if handle.generation == generation => {}
            _ => {
                debug!(task = %self.id, generation, "ignoring stale download completion");
                return;
            }
        }
        match outcome {
            DownloadOutcome::Succeeded { .. } => {
                *state = DownloadTaskState::Downloaded;
                self.broadcast(&state, DownloadStatus::Downloaded);
            }
            DownloadOutcome::Cancelled => {
                *state = DownloadTaskState::Initial;
                self.broadcast(&state, DownloadStatus::Initial);
            }
            DownloadOutcome::Failed(error) => {
                *state = DownloadTaskState::Initial;
                let message = error.user_message().into_owned();
                self.broadcast(&state, DownloadStatus::Initial);
                self.broadcast(&state, DownloadStatus::DownloadFailed { error, message });
            }
        }
    }

    /// Cancel a fetch and wait for its worker to wind down
    async fn stop(&self, handle: DownloadHandle) {
        handle.token.cancel();
        if let Some(worker) = handle.worker {
            if let Err(e) = worker.await {
                warn!(task = %self.id, error = %e, "download worker ended abnormally");
            }
        }
    }
}
