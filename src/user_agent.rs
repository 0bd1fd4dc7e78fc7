//! User-Agent string sent with every support bundle request.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/bundle-fetch";

/// Default User-Agent for status and download requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("bundle-fetch/{version} (support-bundle-client; +{PROJECT_UA_URL})")
}
