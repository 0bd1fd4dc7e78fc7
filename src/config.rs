//! Turns parsed CLI arguments into client and poll settings.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use bundle_fetch_core::{BundleId, ClientSettings, Credentials, FirstPoll, PollSettings};
use tracing::warn;

use crate::cli::Args;

/// Everything a run needs, validated.
#[derive(Debug)]
pub(crate) struct ResolvedConfig {
    pub(crate) base_url: String,
    pub(crate) bundle_id: BundleId,
    pub(crate) client: ClientSettings,
    pub(crate) poll: PollSettings,
    pub(crate) temp_dir: Option<PathBuf>,
}

/// Validates cross-field constraints clap cannot express and builds the settings.
pub(crate) fn resolve(args: &Args) -> Result<ResolvedConfig> {
    let bundle_id = args.bundle_id.trim();
    if bundle_id.is_empty() {
        bail!("Invalid value for `bundle_id`: must not be empty");
    }

    let base_url = args.url.trim();
    if base_url.is_empty() {
        bail!("Invalid value for `url`: must not be empty");
    }

    let credentials = resolve_credentials(args)?;

    if args.interval >= args.timeout {
        warn!(
            interval = args.interval,
            timeout = args.timeout,
            "poll interval is not shorter than the timeout; at most one status query will be made"
        );
    }

    let first_poll = if args.poll_immediately {
        FirstPoll::Immediately
    } else {
        FirstPoll::AfterInterval
    };
    let poll = PollSettings::new(
        Duration::from_secs(args.interval),
        Duration::from_secs(args.timeout),
    )
    .with_first_poll(first_poll)
    .with_max_transport_retries(args.transport_retries);

    let client = ClientSettings {
        connect_timeout_secs: args.connect_timeout,
        read_timeout_secs: args.read_timeout,
        credentials,
    };

    if let Some(dir) = &args.temp_dir
        && !dir.is_dir()
    {
        bail!(
            "Invalid value for `temp_dir`: '{}' is not an existing directory",
            dir.display()
        );
    }

    Ok(ResolvedConfig {
        base_url: base_url.to_string(),
        bundle_id: BundleId::from(bundle_id),
        client,
        poll,
        temp_dir: args.temp_dir.clone(),
    })
}

fn resolve_credentials(args: &Args) -> Result<Option<Credentials>> {
    let token = non_empty(args.access_token.as_deref());
    let user = non_empty(args.user.as_deref());
    let password = non_empty(args.password.as_deref());

    match (token, user, password) {
        (Some(_), Some(_), _) | (Some(_), None, Some(_)) => {
            bail!("`access_token` cannot be combined with `user`/`password`; pick one")
        }
        (Some(token), None, None) => Ok(Some(Credentials::Bearer(token.to_string()))),
        (None, Some(user), password) => Ok(Some(Credentials::Basic {
            username: user.to_string(),
            password: password.map(str::to_string),
        })),
        (None, None, Some(_)) => bail!("`password` requires `user`"),
        (None, None, None) => Ok(None),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
