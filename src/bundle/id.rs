//! Bundle identifier and the archive file name derived from it.

use std::fmt;

/// Opaque identifier of a support bundle on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleId(String);

impl BundleId {
    /// Wraps an identifier as handed out by the service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as sent to the service.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the archive file name (`<id>.zip`) for this bundle.
    ///
    /// The id is sanitized so it always names a single file inside the
    /// download directory, and the mapping is deterministic.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", sanitize_file_stem(&self.0))
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BundleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BundleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for BundleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn sanitize_file_stem(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    // "." and ".." would resolve outside the file name slot.
    if sanitized.chars().all(|c| c == '.') {
        return sanitized.replace('.', "_");
    }

    sanitized
}
