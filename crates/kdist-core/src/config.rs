// ── Runtime client configuration ──
//
// Describes how to reach the backend. Never touches disk: the CLI resolves
// files and environment, builds a `ClientConfig` and hands it in.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use url::Url;

use kdist_api::{ApiClient, DEFAULT_TIMEOUT, TlsMode, TransportConfig};

use crate::error::CoreError;

/// Backend used when nothing else is configured, and after logout.
pub const DEFAULT_BASE_URL: &str = "https://k2.52j.me";

static DEFAULT_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid absolute URL")
});

/// Parsed form of [`DEFAULT_BASE_URL`].
pub fn default_base_url() -> Url {
    DEFAULT_URL.clone()
}

/// Connection settings for one backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend address used until a session says otherwise.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    pub tls: TlsMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: DEFAULT_TIMEOUT,
            tls: TlsMode::System,
        }
    }
}

impl ClientConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            ..TransportConfig::default()
        }
        .with_timeout(self.timeout)
    }

    /// Build the shared, unauthenticated API client.
    pub fn build_api(&self) -> Result<Arc<ApiClient>, CoreError> {
        let api = ApiClient::new(self.base_url.clone(), &self.transport())?;
        Ok(Arc::new(api))
    }
}
