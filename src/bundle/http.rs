//! reqwest-backed [`BundleClient`] for the support bundle REST API.
//!
//! Endpoints, relative to the configured base URL:
//!
//! - status: `GET api/system/support/bundle/{id}` returning `{"status": "..."}`
//! - archive: `GET api/system/support/bundle/{id}/archive`
//!
//! The bundle id is percent-encoded as a single path segment.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, instrument};
use url::Url;

use super::BundleId;
use super::client::{BundleClient, BundleResponse, StatusResponse};
use super::constants::{
    ARCHIVE_SEGMENT, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, SUPPORT_BUNDLE_PATH,
};
use super::error::{BoxError, BundleError, RequestKind};
use crate::user_agent;

/// Credentials attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>` (access token).
    Bearer(String),
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password; may be absent for token-as-password setups.
        password: Option<String>,
    },
}

// Secrets never reach log output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Basic { username, password } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &password.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// Connection settings for [`HttpBundleClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Maximum idle time between two reads in seconds.
    pub read_timeout_secs: u64,
    /// Optional credentials.
    pub credentials: Option<Credentials>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            credentials: None,
        }
    }
}

/// HTTP client for one support bundle service.
///
/// Create once and reuse; the inner reqwest client pools connections.
#[derive(Debug, Clone)]
pub struct HttpBundleClient {
    client: Client,
    base_url: Url,
    base_url_display: String,
    credentials: Option<Credentials>,
}

impl HttpBundleClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::InvalidBaseUrl`] if `base_url` is not an
    /// absolute http(s) URL, or [`BundleError::ClientBuild`] if the reqwest
    /// client cannot be built.
    pub fn new(base_url: &str, settings: ClientSettings) -> Result<Self, BundleError> {
        let parsed = Url::parse(base_url).map_err(|_| BundleError::invalid_base_url(base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(BundleError::invalid_base_url(base_url));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .read_timeout(Duration::from_secs(settings.read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| BundleError::ClientBuild { source })?;

        debug!(base_url = %parsed, "support bundle client ready");

        Ok(Self {
            client,
            base_url_display: base_url.trim_end_matches('/').to_string(),
            base_url: parsed,
            credentials: settings.credentials,
        })
    }

    /// Returns the status endpoint URL for a bundle.
    #[must_use]
    pub fn status_url(&self, bundle_id: &BundleId) -> Url {
        self.endpoint(bundle_id, None)
    }

    /// Returns the archive endpoint URL for a bundle.
    #[must_use]
    pub fn archive_url(&self, bundle_id: &BundleId) -> Url {
        self.endpoint(bundle_id, Some(ARCHIVE_SEGMENT))
    }

    fn endpoint(&self, bundle_id: &BundleId, suffix: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejected cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(SUPPORT_BUNDLE_PATH)
                .push(bundle_id.as_str());
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        url
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.credentials {
            Some(Credentials::Bearer(token)) => request.bearer_auth(token),
            Some(Credentials::Basic { username, password }) => {
                request.basic_auth(username, password.as_ref())
            }
            None => request,
        }
    }
}

#[async_trait]
impl BundleClient for HttpBundleClient {
    fn base_url(&self) -> &str {
        &self.base_url_display
    }

    #[instrument(level = "debug", skip(self), fields(bundle_id = %bundle_id))]
    async fn fetch_status(&self, bundle_id: &BundleId) -> Result<StatusResponse, BundleError> {
        let url = self.status_url(bundle_id);
        debug!(url = %url, "requesting bundle status");

        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| BundleError::transport(bundle_id.as_str(), RequestKind::Status, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| BundleError::transport(bundle_id.as_str(), RequestKind::Status, e))?;

        Ok(StatusResponse {
            status,
            body: body.to_vec(),
        })
    }

    #[instrument(level = "debug", skip(self), fields(bundle_id = %bundle_id))]
    async fn fetch_bundle(&self, bundle_id: &BundleId) -> Result<BundleResponse, BundleError> {
        let url = self.archive_url(bundle_id);
        debug!(url = %url, "requesting bundle archive");

        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| BundleError::transport(bundle_id.as_str(), RequestKind::Download, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(BoxError::from))
            .boxed();

        Ok(BundleResponse { status, body })
    }
}
