#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in the audiobook core
//!
//! Download and license-check progress is reported through events rather
//! than direct logging. A host drains the receiver and renders or logs the
//! events (see [`logging::log_event`]).
//!
//! ## Architecture
//!
//! - **Domain-driven events**: General, Download and `LicenseCheck` domains
//! - **Unified `EventEmitter` trait**: Single, consistent API for all event emissions
//! - **Tracing integration**: every event knows its log level and target

pub mod meta;
pub use meta::EventSource;

pub mod logging;
pub use logging::log_event;

pub mod events;
pub use events::{
    AppEvent, CheckOutcome, DownloadEvent, GeneralEvent, LicenseCheckEvent,
};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel with the `AppEvent` system
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout the audiobook core
///
/// This trait provides a single, consistent API for emitting events regardless of
/// whether you have a raw `EventSender` or a struct that contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    /// Emit a download started event
    fn emit_download_started(&self, url: impl Into<String>, total_size: Option<u64>) {
        self.emit(AppEvent::Download(DownloadEvent::Started {
            url: url.into(),
            total_size,
        }));
    }

    /// Emit a throttled download progress event
    fn emit_download_progress(&self, url: impl Into<String>, percent: u8) {
        self.emit(AppEvent::Download(DownloadEvent::Progress {
            url: url.into(),
            percent,
        }));
    }

    /// Emit a download completed event
    fn emit_download_completed(
        &self,
        url: impl Into<String>,
        final_size: u64,
        total_time: std::time::Duration,
    ) {
        self.emit(AppEvent::Download(DownloadEvent::Completed {
            url: url.into(),
            final_size,
            total_time,
        }));
    }

    /// Emit a download failed event
    fn emit_download_failed(&self, url: impl Into<String>, error: impl Into<String>, retryable: bool) {
        self.emit(AppEvent::Download(DownloadEvent::Failed {
            url: url.into(),
            error: error.into(),
            retryable,
        }));
    }

    /// Emit a download cancelled event
    fn emit_download_cancelled(&self, url: impl Into<String>, bytes_downloaded: u64) {
        self.emit(AppEvent::Download(DownloadEvent::Cancelled {
            url: url.into(),
            bytes_downloaded,
        }));
    }

    /// Emit a license check status message
    fn emit_license_status(&self, source: impl Into<String>, message: impl Into<String>) {
        self.emit(AppEvent::LicenseCheck(LicenseCheckEvent::status(
            source, message,
        )));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

/// An optional sender is an emitter that drops events when absent
impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
