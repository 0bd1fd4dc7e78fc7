//! Status response parsing and readiness classification.
//!
//! The service's status vocabulary is not enumerated client-side: only the
//! literal `"in progress"` means "keep waiting", anything else lets the
//! download proceed. [`BundleStatus::classify`] is the single place that rule
//! lives.

use serde_json::Value;

use super::BundleId;
use super::error::BundleError;

/// Status string the service reports while it is still generating a bundle.
pub const IN_PROGRESS: &str = "in progress";

/// Readiness of a bundle as seen by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleStatus {
    /// Generation is still running.
    Pending,
    /// Any other status; carries the raw string for logging.
    Terminal(String),
}

impl BundleStatus {
    /// Classifies a raw status string.
    #[must_use]
    pub fn classify(status: &str) -> Self {
        if status == IN_PROGRESS {
            Self::Pending
        } else {
            Self::Terminal(status.to_string())
        }
    }

    /// Returns true while the bundle is still being generated.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Extracts the `status` string field from a status response body.
///
/// # Errors
///
/// Returns [`BundleError::MalformedStatus`] when the body is not valid JSON,
/// is not an object, or has no string `status` field.
pub fn parse_status(bundle_id: &BundleId, body: &[u8]) -> Result<String, BundleError> {
    let parsed: Value = serde_json::from_slice(body)
        .map_err(|e| BundleError::malformed_status(bundle_id.as_str(), e.to_string()))?;

    let Value::Object(mut fields) = parsed else {
        return Err(BundleError::malformed_status(
            bundle_id.as_str(),
            "expected a JSON object",
        ));
    };

    match fields.remove("status") {
        Some(Value::String(status)) => Ok(status),
        Some(other) => Err(BundleError::malformed_status(
            bundle_id.as_str(),
            format!("field `status` is not a string: {other}"),
        )),
        None => Err(BundleError::malformed_status(
            bundle_id.as_str(),
            "missing field `status`",
        )),
    }
}
