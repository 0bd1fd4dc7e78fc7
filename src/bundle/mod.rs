//! Support bundle retrieval: wait for generation, then download the archive.
//!
//! A support bundle is produced in the background by the remote service. This
//! module polls its status endpoint until generation is no longer
//! "in progress" and then streams the archive into a fresh temporary
//! directory.
//!
//! # Example
//!
//! ```no_run
//! use bundle_fetch_core::bundle::{
//!     BundleId, ClientSettings, HttpBundleClient, PollSettings, download_bundle,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpBundleClient::new("https://example.jfrog.io/artifactory", ClientSettings::default())?;
//! let path = download_bundle(
//!     &client,
//!     &BundleId::from("abc123"),
//!     &PollSettings::default(),
//!     &CancellationToken::new(),
//! )
//! .await?;
//! println!("Downloaded: {}", path.display());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod download;
mod error;
mod http;
mod id;
mod poller;
mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{BodyStream, BundleClient, BundleResponse, StatusResponse};
pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, READ_TIMEOUT_SECS,
};
pub use download::{download_bundle, download_bundle_in};
pub use error::{BoxError, BundleError, ErrorCategory, RequestKind, reason_phrase};
pub use http::{ClientSettings, Credentials, HttpBundleClient};
pub use id::BundleId;
pub use poller::{FirstPoll, PollSettings, wait_until_ready};
pub use status::{BundleStatus, IN_PROGRESS, parse_status};
