//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use bundle_fetch_core::bundle::{
    CONNECT_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, READ_TIMEOUT_SECS,
};

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0    bundle downloaded, path printed on stdout
  1    unexpected failure
  2    invalid arguments or configuration
  3    timed out waiting for the bundle
  4    service answered with an error status or an unreadable body
  5    network failure
  6    local file system failure
  130  interrupted (Ctrl-C)";

/// Wait for a support bundle to be generated, then download it.
///
/// Polls the bundle's status until the service stops reporting
/// "in progress", downloads the archive into a fresh temporary directory,
/// and prints the path of the resulting `<BUNDLE_ID>.zip`.
#[derive(Parser, Debug)]
#[command(name = "bundle-fetch")]
#[command(author, version, about, after_help = EXIT_CODES_HELP)]
pub struct Args {
    /// Identifier of the support bundle to download
    pub bundle_id: String,

    /// Base URL of the service (e.g. https://example.jfrog.io/artifactory)
    #[arg(short = 'u', long, env = "BUNDLE_FETCH_URL")]
    pub url: String,

    /// Access token sent as a bearer token
    #[arg(long, env = "BUNDLE_FETCH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// User name for basic authentication
    #[arg(long, env = "BUNDLE_FETCH_USER")]
    pub user: Option<String>,

    /// Password for basic authentication
    #[arg(long, env = "BUNDLE_FETCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Seconds between two status queries (1-3600)
    #[arg(short = 'i', long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs(), value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub interval: u64,

    /// Seconds to wait for the bundle to become ready (1-86400)
    #[arg(short = 't', long, default_value_t = DEFAULT_POLL_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..=86400))]
    pub timeout: u64,

    /// Query the status right away instead of after the first interval
    #[arg(long)]
    pub poll_immediately: bool,

    /// Consecutive failed status queries to tolerate before giving up (0-10)
    #[arg(short = 'r', long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub transport_retries: u32,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: u64,

    /// HTTP read timeout in seconds (1-3600)
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: u64,

    /// Directory in which the per-download temporary directory is created
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
