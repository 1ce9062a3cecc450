//! Audio extraction into the library
//!
//! The [`Transcoder`] trait converts a downloaded container into an MP3 file. Two
//! implementations exist:
//!
//! - [`FfmpegTranscoder`]: runs the external `ffmpeg` binary
//! - [`NoOpTranscoder`]: fails every conversion, used when ffmpeg is unavailable
//!
//! [`transcode_into_library`] wraps a transcoder with the library's file discipline: output goes
//! to a hidden temporary file that is renamed over `{identity}.mp3` only on success, and the
//! downloaded source is deleted only after that rename.

mod ffmpeg;
mod noop;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::error::{Error, Result};
use crate::types::RunId;
use crate::utils::remove_file_quietly;

pub use ffmpeg::FfmpegTranscoder;
pub use noop::NoOpTranscoder;

/// Extension of every track in the library
pub const AUDIO_EXTENSION: &str = "mp3";

/// Trait for audio extraction
///
/// Implementations write a complete MP3 file to `output` or fail. They do not need to clean up
/// a partially written `output`; [`transcode_into_library`] does that.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Extract the first audio track of `input` and encode it as MP3 into `output`
    async fn convert(&self, input: &Path, output: &Path) -> Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Pick ffmpeg when it can be found, otherwise fall back to [`NoOpTranscoder`]
pub fn from_config(tools: &ToolsConfig) -> Arc<dyn Transcoder> {
    match tools.resolve_ffmpeg() {
        Some(path) => Arc::new(FfmpegTranscoder::new(path, tools.mp3_quality)),
        None => {
            tracing::warn!("ffmpeg not found, conversions will fail until it is installed");
            Arc::new(NoOpTranscoder)
        }
    }
}

/// One conversion of a downloaded container into the library
#[derive(Clone, Debug)]
pub struct TranscodeRequest {
    /// The downloaded intermediate container
    pub source: PathBuf,
    /// Library directory receiving the final file
    pub library_dir: PathBuf,
    /// Sanitized title, base name of the final file
    pub identity: String,
    /// Run that owns the temporary output
    pub run_id: RunId,
}

impl TranscodeRequest {
    /// `{library_dir}/{identity}.mp3`
    pub fn final_path(&self) -> PathBuf {
        self.library_dir
            .join(format!("{}.{AUDIO_EXTENSION}", self.identity))
    }

    /// `{library_dir}/.{identity}.{run_id}.mp3.part`
    pub fn temp_path(&self) -> PathBuf {
        self.library_dir.join(format!(
            ".{}.{}.{AUDIO_EXTENSION}.part",
            self.identity, self.run_id
        ))
    }
}

/// Outcome of a committed conversion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscodeOutput {
    /// Final file in the library
    pub path: PathBuf,
    /// A file of the same name existed and was replaced
    pub overwritten: bool,
}

/// Serializes the exists-check and rename of every commit in this process, so that of two runs
/// committing the same name the later one always sees the earlier one's file
static COMMIT_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Removes the temporary output unless the conversion was committed
struct TempOutput {
    path: PathBuf,
    committed: bool,
}

impl TempOutput {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }
}

impl Drop for TempOutput {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial output")
            }
        }
    }
}

/// Convert `request.source` into `{identity}.mp3` under the library directory
///
/// On failure the temporary output is gone, the source container is left in place and the
/// error is a `TranscodeFailed`. On success the source is deleted and `overwritten` tells
/// whether an earlier file of the same name was replaced (last writer wins).
pub async fn transcode_into_library(
    transcoder: &dyn Transcoder,
    request: &TranscodeRequest,
) -> Result<TranscodeOutput> {
    let mut temp = TempOutput::new(request.temp_path());
    let final_path = request.final_path();

    tracing::debug!(
        transcoder = transcoder.name(),
        source = %request.source.display(),
        output = %temp.path.display(),
        "Converting"
    );

    transcoder
        .convert(&request.source, &temp.path)
        .await
        .map_err(|e| as_transcode_failure(e, &request.source))?;

    let overwritten = {
        let _commit = COMMIT_LOCK.lock().await;
        let overwritten = tokio::fs::try_exists(&final_path).await.unwrap_or(false);
        if overwritten {
            tracing::warn!(path = %final_path.display(), "Replacing existing track");
        }

        tokio::fs::rename(&temp.path, &final_path)
            .await
            .map_err(|e| Error::TranscodeFailed {
                source_path: request.source.clone(),
                reason: format!("could not move output to {}: {e}", final_path.display()),
            })?;
        temp.committed = true;
        overwritten
    };

    remove_file_quietly(&request.source).await;

    Ok(TranscodeOutput {
        path: final_path,
        overwritten,
    })
}

fn as_transcode_failure(err: Error, source: &Path) -> Error {
    match err {
        Error::TranscodeFailed { .. } => err,
        other => Error::TranscodeFailed {
            source_path: source.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
