//! Error types for the bundle module.
//!
//! Every failure of a fetch is terminal for that call. The variants carry the
//! bundle id (or the local path) they failed on so a single error message is
//! enough to diagnose the run.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Boxed error used for transport failures reported by any [`BundleClient`].
///
/// [`BundleClient`]: super::BundleClient
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which remote request an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// The lightweight status query issued on every poll tick.
    Status,
    /// The archive download issued once the bundle is ready.
    Download,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status => f.write_str("status query"),
            Self::Download => f.write_str("download"),
        }
    }
}

/// Coarse classification of a [`BundleError`], used by callers to decide
/// whether to retry the whole operation and by the CLI to pick an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The bundle stayed "in progress" until the deadline.
    Timeout,
    /// The caller cancelled the wait.
    Cancellation,
    /// The service answered with a non-success code or an unreadable status body.
    Protocol,
    /// The request never produced an HTTP response, or the body stream broke.
    Transport,
    /// Local filesystem failure.
    Io,
    /// The client itself was misconfigured.
    Config,
}

/// Errors that can occur while waiting for or downloading a support bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Deadline elapsed while the bundle was still being generated.
    #[error("timeout after {waited:?} waiting for support bundle {bundle_id} to be ready")]
    Timeout {
        /// The bundle that never became ready.
        bundle_id: String,
        /// Total time spent waiting.
        waited: Duration,
    },

    /// The caller cancelled the wait before the bundle became ready.
    #[error("cancelled while waiting for support bundle {bundle_id}")]
    Cancelled {
        /// The bundle being waited on.
        bundle_id: String,
    },

    /// The service answered a request with a non-success HTTP status.
    #[error("{request} for support bundle {bundle_id} failed with: {status} {reason}")]
    HttpStatus {
        /// The bundle the request was about.
        bundle_id: String,
        /// Which request failed.
        request: RequestKind,
        /// The HTTP status code.
        status: u16,
        /// Canonical reason phrase for `status` (empty when unknown).
        reason: &'static str,
    },

    /// The status response body was not a JSON object with a string `status`.
    #[error("malformed status response for support bundle {bundle_id}: {detail}")]
    MalformedStatus {
        /// The bundle whose status could not be read.
        bundle_id: String,
        /// What was wrong with the body.
        detail: String,
    },

    /// Connection-level failure (DNS, refused connection, broken body stream).
    #[error("network error during {request} for support bundle {bundle_id}: {source}")]
    Transport {
        /// The bundle the request was about.
        bundle_id: String,
        /// Which request failed.
        request: RequestKind,
        /// The underlying client error.
        #[source]
        source: BoxError,
    },

    /// Local file system error while allocating or writing the archive.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The service base URL could not be parsed.
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl {
        /// The rejected URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl BundleError {
    /// Creates a timeout error.
    pub fn timeout(bundle_id: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            bundle_id: bundle_id.into(),
            waited,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(bundle_id: impl Into<String>) -> Self {
        Self::Cancelled {
            bundle_id: bundle_id.into(),
        }
    }

    /// Creates an HTTP status error, filling in the canonical reason phrase.
    pub fn http_status(bundle_id: impl Into<String>, request: RequestKind, status: u16) -> Self {
        Self::HttpStatus {
            bundle_id: bundle_id.into(),
            request,
            status,
            reason: reason_phrase(status),
        }
    }

    /// Creates a malformed status body error.
    pub fn malformed_status(bundle_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedStatus {
            bundle_id: bundle_id.into(),
            detail: detail.into(),
        }
    }

    /// Creates a transport error from any client error.
    pub fn transport(
        bundle_id: impl Into<String>,
        request: RequestKind,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Transport {
            bundle_id: bundle_id.into(),
            request,
            source: source.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid base URL error.
    pub fn invalid_base_url(url: impl Into<String>) -> Self {
        Self::InvalidBaseUrl { url: url.into() }
    }

    /// Returns the coarse category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Cancelled { .. } => ErrorCategory::Cancellation,
            Self::HttpStatus { .. } | Self::MalformedStatus { .. } => ErrorCategory::Protocol,
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::Io { .. } => ErrorCategory::Io,
            Self::InvalidBaseUrl { .. } | Self::ClientBuild { .. } => ErrorCategory::Config,
        }
    }
}

/// Returns the canonical reason phrase for an HTTP status code.
///
/// Unknown or out-of-range codes yield an empty string.
#[must_use]
pub fn reason_phrase(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}

// No `From<reqwest::Error>` or `From<std::io::Error>`: every variant needs the
// bundle id (or path) that the source error does not carry, so callers go
// through the constructors above.
