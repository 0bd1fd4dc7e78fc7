//! Client capability the poller and the orchestrator depend on.
//!
//! The core never talks HTTP directly; it only needs a status query returning
//! a code and a raw body, and a download returning a code and a byte stream.
//! [`HttpBundleClient`](super::HttpBundleClient) is the reqwest-backed
//! implementation; tests substitute scripted clients.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use super::BundleId;
use super::error::{BoxError, BundleError};

/// The only status code the service uses for a usable answer.
const HTTP_OK: u16 = 200;

/// Stream of archive chunks returned by [`BundleClient::fetch_bundle`].
pub type BodyStream = BoxStream<'static, Result<Bytes, BoxError>>;

/// Raw answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    /// HTTP status code.
    pub status: u16,
    /// Undecoded response body, expected to be a JSON object.
    pub body: Vec<u8>,
}

/// Answer to a download request. Dropping it releases the connection.
pub struct BundleResponse {
    /// HTTP status code.
    pub status: u16,
    /// Archive bytes, streamed.
    pub body: BodyStream,
}

impl StatusResponse {
    /// Returns true if the service answered with 200.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == HTTP_OK
    }
}

impl BundleResponse {
    /// Returns true if the service answered with 200.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == HTTP_OK
    }
}

impl std::fmt::Debug for BundleResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Remote support bundle service.
///
/// This trait uses `async_trait` so the orchestrator can be handed a
/// `&dyn BundleClient`; Rust 2024 native async traits are not object-safe.
#[async_trait]
pub trait BundleClient: Send + Sync {
    /// Base URL of the service, used only in log output.
    fn base_url(&self) -> &str;

    /// Queries the generation status of a bundle.
    ///
    /// Non-success HTTP codes are returned as a normal [`StatusResponse`];
    /// only connection-level failures are errors.
    async fn fetch_status(&self, bundle_id: &BundleId) -> Result<StatusResponse, BundleError>;

    /// Starts downloading a bundle archive.
    ///
    /// Same error contract as [`fetch_status`](Self::fetch_status).
    async fn fetch_bundle(&self, bundle_id: &BundleId) -> Result<BundleResponse, BundleError>;
}
