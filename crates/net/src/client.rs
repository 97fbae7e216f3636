//! HTTP client shared by every download

use audiobook_config::NetworkConfig;
use audiobook_errors::{Error, NetworkError};
use reqwest::{redirect, Client, RequestBuilder};
use std::time::Duration;

/// Redirect hops followed before a request is abandoned
const MAX_REDIRECTS: usize = 10;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl From<&NetworkConfig> for NetConfig {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: config.max_concurrent_downloads,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// HTTP client wrapper with a fixed connect timeout and redirects enabled.
///
/// No overall request timeout is set; audiobook parts can take minutes to
/// stream, and cancellation is cooperative instead.
#[derive(Clone)]
pub struct NetClient {
    client: Client,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: &NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::ConnectionRefused(e.to_string()))?;

        Ok(Self { client })
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }
}

/// Map a transport failure onto the network error taxonomy
pub(crate) fn classify_reqwest_error(url: &str, err: &reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_connect() {
        NetworkError::ConnectionRefused(err.to_string())
    } else {
        NetworkError::DownloadFailed(err.to_string())
    }
}
