//! Streaming media download with progress reporting
//!
//! [`Downloader::download`] transfers one [`StreamDescriptor`] into a `.part` file next to its
//! final name and renames it once every byte has arrived. Progress is reported through a
//! caller-supplied sink, throttled by [`ProgressTracker`]. Each transfer is a single attempt:
//! failures are classified and returned, never retried.

pub mod progress;

use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::config::{Config, TransferConfig};
use crate::error::{Error, Result};
use crate::types::{DownloadProgress, StreamDescriptor};
use crate::utils::{ensure_free_space, remove_file_quietly};

pub use progress::{ProgressThrottle, ProgressTracker};

/// Write buffer size for the `.part` file
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Build the HTTP client shared by the catalog and the downloader
pub fn http_client(config: &Config) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(config.catalog.user_agent.clone())
        .connect_timeout(config.transfer.connect_timeout)
        .build()?)
}

/// Name of the in-progress file for `file_name`
pub fn part_file_name(file_name: &str) -> String {
    format!(".{file_name}.part")
}

/// Single-attempt HTTP downloader
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    config: TransferConfig,
}

impl Downloader {
    /// Create a downloader using `client` for requests
    pub fn new(client: reqwest::Client, config: TransferConfig) -> Self {
        Self { client, config }
    }

    /// Download `stream` to `dest_dir/file_name`
    ///
    /// Bytes are written to `dest_dir/.{file_name}.part` and renamed on completion; the
    /// `.part` file is removed on every failure. `on_progress` is called at most once per
    /// `progress_interval` and a final time with `ratio == 1.0`.
    ///
    /// # Errors
    ///
    /// - `TransferFailed`: HTTP error status, stream error, stall or overall timeout, or the
    ///   body ended before the announced length
    /// - `StorageFailed`: not enough free space, or the file could not be created/written
    pub async fn download(
        &self,
        stream: &StreamDescriptor,
        dest_dir: &Path,
        file_name: &str,
        on_progress: &mut (dyn FnMut(DownloadProgress) + Send),
    ) -> Result<PathBuf> {
        let part_path = dest_dir.join(part_file_name(file_name));
        let final_path = dest_dir.join(file_name);

        let transfer = self.transfer(stream, dest_dir, &part_path, on_progress);
        let result = match self.config.overall_timeout {
            Some(limit) => tokio::time::timeout(limit, transfer)
                .await
                .unwrap_or_else(|_| {
                    Err(Error::TransferFailed(format!(
                        "download did not complete within {}s",
                        limit.as_secs_f64()
                    )))
                }),
            None => transfer.await,
        };

        if let Err(e) = result {
            remove_file_quietly(&part_path).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&part_path, &final_path).await {
            remove_file_quietly(&part_path).await;
            return Err(Error::storage(&final_path, e));
        }

        Ok(final_path)
    }

    async fn transfer(
        &self,
        stream: &StreamDescriptor,
        dest_dir: &Path,
        part_path: &Path,
        on_progress: &mut (dyn FnMut(DownloadProgress) + Send),
    ) -> Result<()> {
        let response = self
            .client
            .get(&stream.url)
            .send()
            .await
            .map_err(|e| Error::TransferFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::TransferFailed(format!(
                "media server returned HTTP {status}"
            )));
        }

        // The catalog's size may be an estimate; only Content-Length is binding
        let announced = response.content_length();
        let expected = announced.or(stream.content_length);
        if self.config.check_disk_space
            && let Some(expected) = expected
        {
            ensure_free_space(dest_dir, expected, self.config.min_free_space)?;
        }

        let file = tokio::fs::File::create(part_path)
            .await
            .map_err(|e| Error::storage(part_path, e))?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

        let mut tracker = ProgressTracker::new(expected, self.config.progress_interval);
        if let Some(progress) = tracker.advance(0) {
            on_progress(progress);
        }

        let mut body = response.bytes_stream();
        loop {
            let next = tokio::time::timeout(self.config.stall_timeout, body.next())
                .await
                .map_err(|_| {
                    Error::TransferFailed(format!(
                        "no data received for {}s after {} bytes",
                        self.config.stall_timeout.as_secs(),
                        tracker.received()
                    ))
                })?;

            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    return Err(Error::TransferFailed(format!(
                        "stream interrupted after {} bytes: {e}",
                        tracker.received()
                    )));
                }
                None => break,
            };

            writer
                .write_all(&chunk)
                .await
                .map_err(|e| Error::storage(part_path, e))?;

            if let Some(progress) = tracker.advance(chunk.len() as u64) {
                on_progress(progress);
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| Error::storage(part_path, e))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| Error::storage(part_path, e))?;

        if let Some(total) = announced
            && tracker.received() < total
        {
            return Err(Error::TransferFailed(format!(
                "stream ended early: received {} of {total} bytes",
                tracker.received()
            )));
        }

        on_progress(tracker.finish());
        Ok(())
    }
}
