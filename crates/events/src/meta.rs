/// Component/feature that originated the event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventSource(&'static str);

impl EventSource {
    pub const GENERAL: Self = Self("general");
    pub const DOWNLOAD: Self = Self("download");
    pub const LICENSE_CHECK: Self = Self("license_check");

    /// Borrow the underlying identifier used for logging/telemetry.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0
    }
}
