//! Constants for the bundle module (timeouts, poll cadence).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (10 minutes; bundles can be large).
pub const READ_TIMEOUT_SECS: u64 = 600;

/// Default time between two status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default total time budget for the bundle to become ready.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// Smallest poll period the ticker is driven with.
pub(crate) const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Stand-in for durations too large to add to an [`Instant`](tokio::time::Instant) (about 30 years).
pub(crate) const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// REST path of the support bundle collection, relative to the base URL.
pub(crate) const SUPPORT_BUNDLE_PATH: [&str; 4] = ["api", "system", "support", "bundle"];

/// Trailing path segment of the archive download endpoint.
pub(crate) const ARCHIVE_SEGMENT: &str = "archive";
