//! MP3 extraction using the external ffmpeg binary

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::Transcoder;
use crate::error::{Error, Result};

/// Number of stderr lines kept in a failure reason
const STDERR_TAIL_LINES: usize = 3;

/// Transcoder that runs `ffmpeg`
///
/// The command is `ffmpeg -nostdin -y -i SRC -vn -map 0:a:0 -c:a libmp3lame -q:a Q -f mp3 OUT`:
/// video is dropped, the first audio track is encoded with LAME VBR quality `Q`. The child is
/// killed if the conversion future is dropped.
///
/// # Examples
///
/// ```no_run
/// use tunefetch::transcode::{FfmpegTranscoder, Transcoder};
/// use std::path::{Path, PathBuf};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit path
/// let ffmpeg = FfmpegTranscoder::new(PathBuf::from("/usr/bin/ffmpeg"), 2);
///
/// // Or auto-discover from PATH
/// let ffmpeg = FfmpegTranscoder::from_path().expect("ffmpeg not found in PATH");
///
/// ffmpeg.convert(Path::new("clip.mp4"), Path::new("clip.mp3")).await?;
/// # Ok(())
/// # }
/// ```
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
    quality: u8,
}

impl FfmpegTranscoder {
    /// Create a transcoder with an explicit binary path and VBR quality (0 best, 9 smallest)
    pub fn new(binary_path: PathBuf, quality: u8) -> Self {
        Self {
            binary_path,
            quality: quality.min(9),
        }
    }

    /// Attempt to find ffmpeg in PATH, using the default quality
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(|p| Self::new(p, 2))
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-nostdin")
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .args(["-map", "0:a:0"])
            .args(["-c:a", "libmp3lame"])
            .arg("-q:a")
            .arg(self.quality.to_string())
            .args(["-f", "mp3"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let result = self
            .command(input, output)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)))?;

        if result.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&result.stderr);
        let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("; ");

        Err(Error::TranscodeFailed {
            source_path: input.to_path_buf(),
            reason: format!("ffmpeg exited with {}: {tail}", result.status),
        })
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn command_line_extracts_first_audio_track() {
        let ffmpeg = FfmpegTranscoder::new(PathBuf::from("ffmpeg"), 4);
        let cmd = ffmpeg.command(Path::new("in.mp4"), Path::new("out.mp3.part"));
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        let joined = args.join(" ");
        assert!(joined.starts_with("-nostdin"));
        assert!(joined.contains("-i in.mp4 -vn -map 0:a:0 -c:a libmp3lame -q:a 4 -f mp3"));
        assert_eq!(args.last().unwrap(), "out.mp3.part");
    }

    #[test]
    fn quality_is_clamped() {
        let ffmpeg = FfmpegTranscoder::new(PathBuf::from("ffmpeg"), 42);
        assert_eq!(ffmpeg.quality, 9);
    }

    #[tokio::test]
    async fn invalid_binary_path_is_external_tool_error() {
        let ffmpeg = FfmpegTranscoder::new(PathBuf::from("/nonexistent/path/to/ffmpeg"), 2);
        match ffmpeg.convert(Path::new("in.mp4"), Path::new("out.mp3")).await {
            Err(Error::ExternalTool(msg)) => assert!(msg.contains("Failed to execute ffmpeg")),
            other => panic!("Expected ExternalTool error, got: {:?}", other),
        }
    }

    #[tokio::test]
    #[ignore] // Requires ffmpeg binary in PATH
    async fn integration_rejects_non_media_input() {
        let Some(ffmpeg) = FfmpegTranscoder::from_path() else {
            println!("Skipping test: ffmpeg binary not found in PATH");
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("garbage.mp4");
        std::fs::write(&input, b"definitely not a media file").unwrap();

        let err = ffmpeg
            .convert(&input, &dir.path().join("out.mp3"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::TranscodeFailed));
    }

    #[tokio::test]
    #[ignore] // Requires ffmpeg binary in PATH
    async fn integration_extracts_audio_from_generated_clip() {
        let Some(ffmpeg_path) = which::which("ffmpeg").ok() else {
            println!("Skipping test: ffmpeg binary not found in PATH");
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");

        let status = Command::new(&ffmpeg_path)
            .args(["-nostdin", "-y", "-loglevel", "error"])
            .args(["-f", "lavfi", "-i", "sine=frequency=440:duration=1"])
            .args(["-f", "lavfi", "-i", "color=c=black:s=64x64:d=1"])
            .args(["-shortest"])
            .arg(&clip)
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let out = dir.path().join("clip.mp3");
        FfmpegTranscoder::new(ffmpeg_path, 2)
            .convert(&clip, &out)
            .await
            .unwrap();
        assert!(std::fs::metadata(&out).unwrap().len() > 0);
    }
}
