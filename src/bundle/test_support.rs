//! Scripted [`BundleClient`] for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::time::Instant;

use super::BundleId;
use super::client::{BundleClient, BundleResponse, StatusResponse};
use super::error::{BoxError, BundleError, RequestKind};

/// One scripted answer to a status query.
#[derive(Debug, Clone)]
pub(crate) enum ScriptedStatus {
    Reply { status: u16, body: String },
    TransportFailure,
    Hang,
}

impl ScriptedStatus {
    pub(crate) fn ok(body: &str) -> Self {
        Self::reply(200, body)
    }

    pub(crate) fn reply(status: u16, body: &str) -> Self {
        Self::Reply {
            status,
            body: body.to_string(),
        }
    }
}

/// One scripted chunk of a download body.
#[derive(Debug, Clone)]
pub(crate) enum ScriptedChunk {
    Data(Vec<u8>),
    Broken(&'static str),
}

/// Client answering status queries from a script.
///
/// Status answers are consumed in order; the last one repeats forever.
pub(crate) struct ScriptedClient {
    statuses: Mutex<VecDeque<ScriptedStatus>>,
    download_status: u16,
    download_chunks: Vec<ScriptedChunk>,
    download_stalls: bool,
    status_calls: AtomicUsize,
    bundle_calls: AtomicUsize,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            download_status: 200,
            download_chunks: Vec::new(),
            download_stalls: false,
            status_calls: AtomicUsize::new(0),
            bundle_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_status(self, status: ScriptedStatus) -> Self {
        self.statuses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(status);
        self
    }

    pub(crate) fn with_download(mut self, status: u16, chunks: Vec<ScriptedChunk>) -> Self {
        self.download_status = status;
        self.download_chunks = chunks;
        self
    }

    /// Makes the download body hang after its scripted chunks.
    pub(crate) fn with_stalled_download(mut self) -> Self {
        self.download_stalls = true;
        self
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn bundle_calls(&self) -> usize {
        self.bundle_calls.load(Ordering::SeqCst)
    }

    fn next_status(&self) -> ScriptedStatus {
        let mut statuses = self
            .statuses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or(ScriptedStatus::Hang)
        } else {
            statuses.front().cloned().unwrap_or(ScriptedStatus::Hang)
        }
    }
}

#[async_trait]
impl BundleClient for ScriptedClient {
    fn base_url(&self) -> &str {
        "http://scripted.invalid"
    }

    async fn fetch_status(&self, bundle_id: &BundleId) -> Result<StatusResponse, BundleError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_status() {
            ScriptedStatus::Reply { status, body } => Ok(StatusResponse {
                status,
                body: body.into_bytes(),
            }),
            ScriptedStatus::TransportFailure => Err(BundleError::transport(
                bundle_id.as_str(),
                RequestKind::Status,
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
            ScriptedStatus::Hang => std::future::pending().await,
        }
    }

    async fn fetch_bundle(&self, _bundle_id: &BundleId) -> Result<BundleResponse, BundleError> {
        self.bundle_calls.fetch_add(1, Ordering::SeqCst);
        let chunks: Vec<Result<Bytes, BoxError>> = self
            .download_chunks
            .iter()
            .map(|chunk| match chunk {
                ScriptedChunk::Data(data) => Ok(Bytes::from(data.clone())),
                ScriptedChunk::Broken(reason) => Err(BoxError::from(*reason)),
            })
            .collect();
        let chunks = futures_util::stream::iter(chunks);
        let body = if self.download_stalls {
            chunks.chain(futures_util::stream::pending()).boxed()
        } else {
            chunks.boxed()
        };
        Ok(BundleResponse {
            status: self.download_status,
            body,
        })
    }
}

/// Asserts that (paused) time advanced by `expected`, allowing timer-wheel rounding.
pub(crate) fn assert_elapsed(start: Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(50),
        "expected ~{expected:?} elapsed, got {elapsed:?}"
    );
}
