//! Exit code logic for the bundle-fetch process.
//!
//! Single responsibility: map a run's failure to the process exit code listed
//! in `--help`.

use std::process::ExitCode;

use bundle_fetch_core::{BundleError, ErrorCategory};

pub(crate) const EXIT_FAILURE: u8 = 1;
pub(crate) const EXIT_CONFIG: u8 = 2;
pub(crate) const EXIT_TIMEOUT: u8 = 3;
pub(crate) const EXIT_PROTOCOL: u8 = 4;
pub(crate) const EXIT_TRANSPORT: u8 = 5;
pub(crate) const EXIT_IO: u8 = 6;
pub(crate) const EXIT_INTERRUPTED: u8 = 130;

/// Picks the exit code for a failed run.
pub(crate) fn exit_code_for(error: &anyhow::Error) -> u8 {
    let Some(bundle_error) = error.downcast_ref::<BundleError>() else {
        return EXIT_FAILURE;
    };
    match bundle_error.category() {
        ErrorCategory::Timeout => EXIT_TIMEOUT,
        ErrorCategory::Cancellation => EXIT_INTERRUPTED,
        ErrorCategory::Protocol => EXIT_PROTOCOL,
        ErrorCategory::Transport => EXIT_TRANSPORT,
        ErrorCategory::Io => EXIT_IO,
        ErrorCategory::Config => EXIT_CONFIG,
    }
}

/// Converts a run result into the process exit code.
pub(crate) fn determine_exit_code(result: &anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => ExitCode::from(exit_code_for(error)),
    }
}
