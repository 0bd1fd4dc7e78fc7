//! Bundle Fetch Core Library
//!
//! Retrieves support bundles that a remote service generates asynchronously:
//! the bundle's status endpoint is polled until generation finishes, then the
//! archive is streamed into a temporary directory and its path returned.
//!
//! # Architecture
//!
//! - [`bundle`] - status poller, download orchestrator, and the HTTP client
//!   they talk through
//!
//! Argument parsing, logging setup and signal handling live in the
//! `bundle-fetch` binary.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bundle;
mod user_agent;

// Re-export commonly used types
pub use bundle::{
    BundleClient, BundleError, BundleId, BundleStatus, ClientSettings, Credentials,
    ErrorCategory, FirstPoll, HttpBundleClient, PollSettings, download_bundle,
    download_bundle_in, wait_until_ready,
};
