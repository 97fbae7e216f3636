//! Download request description

use crate::credentials::DownloadCredentials;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Progress listener receiving whole percentages in `0..=100`
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// A single transfer: where from, where to, and who to tell
#[derive(Clone)]
pub struct DownloadRequest {
    pub uri: Url,
    pub output_path: PathBuf,
    pub credentials: Option<DownloadCredentials>,
    pub user_agent: Option<String>,
    pub on_progress: ProgressCallback,
}

impl DownloadRequest {
    #[must_use]
    pub fn new(uri: Url, output_path: impl Into<PathBuf>) -> Self {
        Self {
            uri,
            output_path: output_path.into(),
            credentials: None,
            user_agent: None,
            on_progress: Arc::new(|_| {}),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<DownloadCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Override the client's default `User-Agent` for this request
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Arc::new(callback);
        self
    }
}

impl fmt::Debug for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("uri", &self.uri.as_str())
            .field("output_path", &self.output_path)
            .field("credentials", &self.credentials)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}
