//! Download orchestrator: wait for readiness, then stream the archive to disk.
//!
//! The archive lands in a fresh temporary directory as `<bundle id>.zip`. The
//! directory is owned by a [`tempfile::TempDir`] guard until the copy has
//! fully succeeded, so any failure after allocation (non-success response,
//! broken body stream, disk error) removes the directory together with the
//! partial file. On success the directory is detached and becomes the
//! caller's to clean up.
//!
//! The cancellation token only applies to the wait. To abort a copy in
//! progress, drop the returned future: the guard then removes the directory
//! and the partial file.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::BundleId;
use super::client::{BodyStream, BundleClient};
use super::error::{BundleError, RequestKind};
use super::poller::{PollSettings, wait_until_ready};

/// Prefix of the per-call temporary directory.
const TEMP_DIR_PREFIX: &str = "support-bundle-";

/// Waits for a bundle and downloads it below the system temporary directory.
///
/// Returns the absolute path of the downloaded `<bundle id>.zip`.
///
/// # Errors
///
/// Propagates every [`wait_until_ready`] error unchanged, and additionally
/// returns [`BundleError::Io`] when the destination cannot be created or
/// written, [`BundleError::HttpStatus`] when the download is refused, and
/// [`BundleError::Transport`] when the request or the body stream fails.
pub async fn download_bundle(
    client: &dyn BundleClient,
    bundle_id: &BundleId,
    settings: &PollSettings,
    cancel: &CancellationToken,
) -> Result<PathBuf, BundleError> {
    download_bundle_in(client, bundle_id, settings, cancel, &std::env::temp_dir()).await
}

/// Same as [`download_bundle`] but allocates the temporary directory inside `parent`.
///
/// # Errors
///
/// See [`download_bundle`].
#[instrument(skip(client, settings, cancel), fields(bundle_id = %bundle_id))]
pub async fn download_bundle_in(
    client: &dyn BundleClient,
    bundle_id: &BundleId,
    settings: &PollSettings,
    cancel: &CancellationToken,
    parent: &Path,
) -> Result<PathBuf, BundleError> {
    debug!(base_url = client.base_url(), "downloading support bundle");

    wait_until_ready(client, bundle_id, settings, cancel).await?;

    let dir = tempfile::Builder::new()
        .prefix(TEMP_DIR_PREFIX)
        .tempdir_in(parent)
        .map_err(|e| BundleError::io(parent, e))?;
    let file_path = dir.path().join(bundle_id.archive_file_name());
    let mut file = File::create(&file_path)
        .await
        .map_err(|e| BundleError::io(file_path.clone(), e))?;

    let bytes = fetch_to_file(client, bundle_id, &mut file, &file_path).await?;
    release_file(file, &file_path).await;

    let kept_dir = dir.keep();
    debug!(dir = %kept_dir.display(), "keeping download directory");
    let file_path =
        std::path::absolute(&file_path).map_err(|e| BundleError::io(file_path.clone(), e))?;

    info!(path = %file_path.display(), bytes, "downloaded support bundle");
    Ok(file_path)
}

/// Requests the archive and copies its body into `file`.
async fn fetch_to_file(
    client: &dyn BundleClient,
    bundle_id: &BundleId,
    file: &mut File,
    file_path: &Path,
) -> Result<u64, BundleError> {
    let response = client.fetch_bundle(bundle_id).await?;
    debug!(http_status = response.status, "got download response");

    if !response.is_ok() {
        // The body stream is dropped with `response`, releasing the connection.
        return Err(BundleError::http_status(
            bundle_id.as_str(),
            RequestKind::Download,
            response.status,
        ));
    }

    stream_to_file(file, response.body, bundle_id, file_path).await
}

/// Streams the response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    mut body: BodyStream,
    bundle_id: &BundleId,
    file_path: &Path,
) -> Result<u64, BundleError> {
    let mut writer = BufWriter::new(file);
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = body.next().await {
        let chunk = chunk_result
            .map_err(|e| BundleError::transport(bundle_id.as_str(), RequestKind::Download, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| BundleError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| BundleError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

/// Syncs and closes the archive file; failures are logged, never returned.
async fn release_file(file: File, file_path: &Path) {
    if let Err(e) = file.sync_all().await {
        warn!(path = %file_path.display(), error = %e, "error occurred while closing bundle file");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use tempfile::TempDir;
    use tokio::time::Instant;

    use super::*;
    use crate::bundle::BoxError;
    use crate::bundle::test_support::{
        ScriptedChunk, ScriptedClient, ScriptedStatus, assert_elapsed,
    };

    const READY_BODY: &str = r#"{"status":"ready"}"#;
    const IN_PROGRESS_BODY: &str = r#"{"status":"in progress"}"#;

    fn settings() -> PollSettings {
        PollSettings::new(Duration::from_secs(1), Duration::from_secs(5))
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_download_writes_body_verbatim() {
        tokio::time::pause();
        let parent = TempDir::new().unwrap();
        let client = ScriptedClient::new()
            .with_status(ScriptedStatus::ok(READY_BODY))
            .with_download(
                200,
                vec![
                    ScriptedChunk::Data(b"PK\x03\x04".to_vec()),
                    ScriptedChunk::Data(vec![0u8; 4096]),
                    ScriptedChunk::Data(b"tail".to_vec()),
                ],
            );
        let id = BundleId::from("abc123");

        let path = download_bundle_in(
            &client,
            &id,
            &settings(),
            &CancellationToken::new(),
            parent.path(),
        )
        .await
        .unwrap();

        assert!(path.is_absolute(), "path should be absolute: {}", path.display());
        assert_eq!(path.file_name().unwrap(), "abc123.zip");
        assert!(path.starts_with(std::path::absolute(parent.path()).unwrap()));
        let dir_name = path
            .parent()
            .and_then(Path::file_name)
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert!(dir_name.starts_with(TEMP_DIR_PREFIX), "unexpected dir: {dir_name}");

        let mut expected = b"PK\x03\x04".to_vec();
        expected.extend(vec![0u8; 4096]);
        expected.extend(b"tail");
        assert_eq!(std::fs::read(&path).unwrap(), expected);
        assert_eq!(client.bundle_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_body_yields_empty_file() {
        tokio::time::pause();
        let parent = TempDir::new().unwrap();
        let client = ScriptedClient::new()
            .with_status(ScriptedStatus::ok(READY_BODY))
            .with_download(200, Vec::new());

        let path = download_bundle_in(
            &client,
            &BundleId::from("empty"),
            &settings(),
            &CancellationToken::new(),
            parent.path(),
        )
        .await
        .unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_ten_megabyte_bundle_after_two_pending_polls() {
        tokio::time::pause();
        let parent = TempDir::new().unwrap();
        let chunk = vec![0xA5u8; 64 * 1024];
        let chunks = (0..160).map(|_| ScriptedChunk::Data(chunk.clone())).collect();
        let client = ScriptedClient::new()
            .with_status(ScriptedStatus::ok(IN_PROGRESS_BODY))
            .with_status(ScriptedStatus::ok(IN_PROGRESS_BODY))
            .with_status(ScriptedStatus::ok(READY_BODY))
            .with_download(200, chunks);
        let start = Instant::now();

        let path = download_bundle_in(
            &client,
            &BundleId::from("abc123"),
            &settings(),
            &CancellationToken::new(),
            parent.path(),
        )
        .await
        .unwrap();

        assert_elapsed(start, Duration::from_secs(3));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 10 * 1024 * 1024);
        assert_eq!(client.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_non_200_download_leaves_no_file() {
        tokio::time::pause();
        let parent = TempDir::new().unwrap();
        let client = ScriptedClient::new()
            .with_status(ScriptedStatus::ok(READY_BODY))
            .with_download(404, vec![ScriptedChunk::Data(b"<html>nope</html>".to_vec())]);

        let err = download_bundle_in(
            &client,
            &BundleId::from("abc123"),
            &settings(),
            &CancellationToken::new(),
            parent.path(),
        )
        .await
        .unwrap_err();

        match err {
            BundleError::HttpStatus {
                status,
                request,
                reason,
                ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(request, RequestKind::Download);
                assert_eq!(reason, "Not Found");
            }
            other => panic!("Expected HttpStatus(404), got: {other:?}"),
        }
        assert_eq!(entries(parent.path()), 0, "temporary directory should be removed");
    }

    #[tokio::test]
    async fn test_broken_stream_removes_partial_file() {
        tokio::time::pause();
        let parent = TempDir::new().unwrap();
        let client = ScriptedClient::new()
            .with_status(ScriptedStatus::ok(READY_BODY))
            .with_download(
                200,
                vec![
                    ScriptedChunk::Data(vec![1u8; 1024]),
                    ScriptedChunk::Broken("connection reset by peer"),
                ],
            );

        let err = download_bundle_in(
            &client,
            &BundleId::from("abc123"),
            &settings(),
            &CancellationToken::new(),
            parent.path(),
        )
        .await
        .unwrap_err();

        assert!(
            matches!(err, BundleError::Transport { request: RequestKind::Download, .. }),
            "got: {err:?}"
        );
        assert!(err.to_string().contains("connection reset by peer"));
        assert_eq!(entries(parent.path()), 0, "partial file should be removed");
    }

    #[tokio::test]
    async fn test_poller_error_is_propagated_without_download() {
        tokio::time::pause();
        let parent = TempDir::new().unwrap();
        let client = ScriptedClient::new()
            .with_status(ScriptedStatus::ok("not-json"))
            .with_download(200, vec![ScriptedChunk::Data(b"zip".to_vec())]);

        let err = download_bundle_in(
            &client,
            &BundleId::from("abc123"),
            &settings(),
            &CancellationToken::new(),
            parent.path(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BundleError::MalformedStatus { .. }), "got: {err:?}");
        assert_eq!(client.bundle_calls(), 0);
        assert_eq!(entries(parent.path()), 0, "nothing should be allocated");
    }

    #[tokio::test]
    async fn test_cancelled_wait_never_downloads() {
        tokio::time::pause();
        let parent = TempDir::new().unwrap();
        let client = ScriptedClient::new().with_status(ScriptedStatus::ok(IN_PROGRESS_BODY));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = download_bundle_in(
            &client,
            &BundleId::from("abc123"),
            &settings(),
            &cancel,
            parent.path(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BundleError::Cancelled { .. }), "got: {err:?}");
        assert_eq!(client.bundle_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_parent_directory_is_io_error() {
        tokio::time::pause();
        let parent = TempDir::new().unwrap();
        let missing = parent.path().join("does-not-exist");
        let client = ScriptedClient::new()
            .with_status(ScriptedStatus::ok(READY_BODY))
            .with_download(200, vec![ScriptedChunk::Data(b"zip".to_vec())]);

        let err = download_bundle_in(
            &client,
            &BundleId::from("abc123"),
            &settings(),
            &CancellationToken::new(),
            &missing,
        )
        .await
        .unwrap_err();

        match err {
            BundleError::Io { path, .. } => assert_eq!(path, missing),
            other => panic!("Expected Io, got: {other:?}"),
        }
        assert_eq!(client.bundle_calls(), 0);
    }

    #[tokio::test]
    async fn test_dropping_download_mid_copy_removes_partial_file() {
        tokio::time::pause();
        let parent = TempDir::new().unwrap();
        let client = ScriptedClient::new()
            .with_status(ScriptedStatus::ok(READY_BODY))
            .with_download(200, vec![ScriptedChunk::Data(vec![1u8; 1024])])
            .with_stalled_download();

        let result = tokio::time::timeout(
            Duration::from_secs(30),
            download_bundle_in(
                &client,
                &BundleId::from("abc123"),
                &settings(),
                &CancellationToken::new(),
                parent.path(),
            ),
        )
        .await;

        assert!(result.is_err(), "copy should still be running when abandoned");
        assert_eq!(client.bundle_calls(), 1);
        assert_eq!(entries(parent.path()), 0, "abandoned copy should leave nothing behind");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_disk_full_during_copy_is_io_error() {
        let full = Path::new("/dev/full");
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(full)
            .await
            .unwrap();
        let body: BodyStream = futures_util::stream::iter(vec![
            Ok::<_, BoxError>(Bytes::from(vec![0u8; 64 * 1024])),
            Ok(Bytes::from_static(b"tail")),
        ])
        .boxed();

        let err = stream_to_file(&mut file, body, &BundleId::from("abc123"), full)
            .await
            .unwrap_err();

        match err {
            BundleError::Io { path, source } => {
                assert_eq!(path, full);
                assert_eq!(source.kind(), std::io::ErrorKind::StorageFull);
            }
            other => panic!("Expected Io, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsafe_bundle_id_stays_inside_temp_dir() {
        tokio::time::pause();
        let parent = TempDir::new().unwrap();
        let client = ScriptedClient::new()
            .with_status(ScriptedStatus::ok(READY_BODY))
            .with_download(200, vec![ScriptedChunk::Data(b"zip".to_vec())]);

        let path = download_bundle_in(
            &client,
            &BundleId::from("../escape"),
            &settings(),
            &CancellationToken::new(),
            parent.path(),
        )
        .await
        .unwrap();

        assert_eq!(path.file_name().unwrap(), ".._escape.zip");
        assert!(path.starts_with(std::path::absolute(parent.path()).unwrap()));
    }
}
