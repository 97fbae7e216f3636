//! Fixed defaults shared by the configuration sections

/// Connect timeout applied to every download request, in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Size of a single body read while streaming a download to disk
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Transfers allowed to run at once across a provider
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// Minimum percentage-point change before a progress callback fires again
pub const DEFAULT_PROGRESS_STEP: u8 = 5;

/// Directory name under the system temp dir for transient license documents
pub const SCRATCH_DIR_NAME: &str = "audiobook-license";
