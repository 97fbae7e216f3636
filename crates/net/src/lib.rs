#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Download engine for the audiobook core
//!
//! This crate streams remote resources into local files. It provides the
//! [`DownloadProvider`] abstraction with an HTTP implementation, and the
//! [`DownloadTask`] state machine that UI layers drive with `fetch`,
//! `cancel` and `delete`.

mod client;
mod credentials;
mod progress;
mod provider;
mod request;
mod task;

pub use client::{NetClient, NetConfig};
pub use credentials::DownloadCredentials;
pub use progress::{percent_of, ProgressThrottle};
pub use provider::{DownloadOutcome, DownloadProvider, HttpDownloadProvider};
pub use request::{DownloadRequest, ProgressCallback};
pub use task::{DownloadStatus, DownloadTask};

pub use tokio_util::sync::CancellationToken;
