//! No-op transcoder for graceful degradation

use async_trait::async_trait;
use std::path::Path;

use super::Transcoder;

/// Transcoder used when ffmpeg is unavailable
///
/// Every conversion fails with `Error::NotSupported`, which the pipeline reports as a
/// `TranscodeFailed` run. Downloads still complete, so the source container stays in the
/// library directory and can be converted later.
///
/// # Examples
///
/// ```
/// use tunefetch::transcode::{NoOpTranscoder, Transcoder};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let result = NoOpTranscoder.convert(Path::new("a.mp4"), Path::new("a.mp3")).await;
/// assert!(result.is_err());
/// # }
/// ```
pub struct NoOpTranscoder;

#[async_trait]
impl Transcoder for NoOpTranscoder {
    async fn convert(&self, _input: &Path, _output: &Path) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "ffmpeg not available. \
             Configure ffmpeg_path in settings or ensure ffmpeg is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
