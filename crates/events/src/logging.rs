//! Forwarding of domain events into `tracing`
//!
//! Libraries never install a subscriber; a host that wants the event stream
//! in its logs drains the receiver and calls [`log_event`].

use tracing::{debug, error, info, trace, warn, Level};

use crate::AppEvent;

/// Log an `AppEvent` at its own level with structured fields
pub fn log_event(event: &AppEvent) {
    let source = event.event_source();
    let target = event.log_target();
    let fields = event.log_fields();

    match event.log_level() {
        Level::ERROR => error!(source = source.as_str(), log_target = target, event = %fields, "application event"),
        Level::WARN => warn!(source = source.as_str(), log_target = target, event = %fields, "application event"),
        Level::INFO => info!(source = source.as_str(), log_target = target, event = %fields, "application event"),
        Level::DEBUG => debug!(source = source.as_str(), log_target = target, event = %fields, "application event"),
        Level::TRACE => trace!(source = source.as_str(), log_target = target, event = %fields, "application event"),
    }
}
