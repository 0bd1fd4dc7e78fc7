//! Status poller: waits until a bundle is no longer "in progress".
//!
//! The poller queries the status endpoint on a fixed cadence until the service
//! reports anything other than [`IN_PROGRESS`](super::status::IN_PROGRESS),
//! the deadline passes, or the caller cancels.
//!
//! # Poll order
//!
//! By default the first query is issued one interval *after* the wait starts
//! ([`FirstPoll::AfterInterval`]), so even a bundle that is already finished
//! costs at least one interval. [`FirstPoll::Immediately`] queries at once and
//! then on every interval.
//!
//! # Failure policy
//!
//! A non-success status code or an unreadable status body ends the wait
//! immediately. Transport failures end it too unless
//! [`PollSettings::max_transport_retries`] allows a few consecutive ones to be
//! skipped; the deadline still bounds the whole wait.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::BundleId;
use super::client::BundleClient;
use super::constants::{
    DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, FAR_FUTURE, MIN_POLL_INTERVAL,
};
use super::error::{BundleError, RequestKind};
use super::status::{BundleStatus, parse_status};

/// When the first status query is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstPoll {
    /// Wait one interval before the first query.
    #[default]
    AfterInterval,
    /// Query as soon as the wait starts.
    Immediately,
}

/// Cadence and budget of a wait.
///
/// `interval` is expected to be shorter than `timeout` but this is not
/// enforced: a longer interval simply leaves room for zero or one query.
/// Durations past the far future (e.g. `Duration::MAX`) mean "unbounded".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Time between two status queries.
    pub interval: Duration,
    /// Total time budget, counted from the start of the wait.
    pub timeout: Duration,
    /// Whether the first query waits one interval.
    pub first_poll: FirstPoll,
    /// Consecutive transport failures tolerated before giving up (0 = none).
    pub max_transport_retries: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT)
    }
}

impl PollSettings {
    /// Creates settings with the default first-poll order and no transport retries.
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            first_poll: FirstPoll::default(),
            max_transport_retries: 0,
        }
    }

    /// Sets when the first query is issued.
    #[must_use]
    pub fn with_first_poll(mut self, first_poll: FirstPoll) -> Self {
        self.first_poll = first_poll;
        self
    }

    /// Sets how many consecutive transport failures are tolerated.
    #[must_use]
    pub fn with_max_transport_retries(mut self, retries: u32) -> Self {
        self.max_transport_retries = retries;
        self
    }
}

/// Polls the status endpoint until the bundle is ready.
///
/// Returns the terminal status the service reported.
///
/// # Errors
///
/// - [`BundleError::Timeout`] if the deadline passes while the bundle is pending
/// - [`BundleError::Cancelled`] if `cancel` fires first
/// - [`BundleError::HttpStatus`] / [`BundleError::MalformedStatus`] on a bad status response
/// - [`BundleError::Transport`] if the status query cannot be sent
#[instrument(skip(client, settings, cancel), fields(bundle_id = %bundle_id))]
pub async fn wait_until_ready(
    client: &dyn BundleClient,
    bundle_id: &BundleId,
    settings: &PollSettings,
    cancel: &CancellationToken,
) -> Result<BundleStatus, BundleError> {
    let started = Instant::now();
    let deadline = instant_after(started, settings.timeout);

    if settings.interval < MIN_POLL_INTERVAL {
        debug!(interval = ?settings.interval, "poll interval below floor, clamping");
    }
    let period = settings.interval.clamp(MIN_POLL_INTERVAL, FAR_FUTURE);
    let first_tick = match settings.first_poll {
        FirstPoll::AfterInterval => instant_after(started, period),
        FirstPoll::Immediately => started,
    };
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let expired = sleep_until(deadline);
    tokio::pin!(expired);

    let mut attempt: u64 = 0;
    let mut transport_failures: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled(bundle_id, started)),
            () = &mut expired => return Err(timed_out(bundle_id, started)),
            _ = ticker.tick() => {}
        }

        attempt += 1;
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(cancelled(bundle_id, started)),
            () = &mut expired => return Err(timed_out(bundle_id, started)),
            outcome = query_status(client, bundle_id) => outcome,
        };

        match outcome {
            Ok(BundleStatus::Pending) => {
                transport_failures = 0;
                debug!(attempt, "support bundle still in progress");
            }
            Ok(status) => {
                info!(attempt, elapsed = ?started.elapsed(), "support bundle ready");
                return Ok(status);
            }
            Err(err @ BundleError::Transport { .. })
                if transport_failures < settings.max_transport_retries =>
            {
                transport_failures += 1;
                warn!(
                    attempt,
                    transport_failures,
                    max = settings.max_transport_retries,
                    error = %err,
                    "status query failed, waiting for next tick"
                );
            }
            Err(err) => {
                debug!(attempt, error = %err, "status query failed");
                return Err(err);
            }
        }
    }
}

/// `start + delay`, saturating at a far-future instant instead of overflowing.
fn instant_after(start: Instant, delay: Duration) -> Instant {
    start
        .checked_add(delay)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Issues one status query and classifies the answer.
async fn query_status(
    client: &dyn BundleClient,
    bundle_id: &BundleId,
) -> Result<BundleStatus, BundleError> {
    debug!("attempting to get support bundle status");
    let response = client.fetch_status(bundle_id).await?;
    debug!(http_status = response.status, "got status response");

    if !response.is_ok() {
        return Err(BundleError::http_status(
            bundle_id.as_str(),
            RequestKind::Status,
            response.status,
        ));
    }

    let raw = parse_status(bundle_id, &response.body)?;
    debug!(status = %raw, "support bundle status");
    Ok(BundleStatus::classify(&raw))
}

fn cancelled(bundle_id: &BundleId, started: Instant) -> BundleError {
    info!(elapsed = ?started.elapsed(), "wait for support bundle cancelled");
    BundleError::cancelled(bundle_id.as_str())
}

fn timed_out(bundle_id: &BundleId, started: Instant) -> BundleError {
    let waited = started.elapsed();
    warn!(waited = ?waited, "timeout waiting for support bundle to be ready");
    BundleError::timeout(bundle_id.as_str(), waited)
}
