//! Catalog backed by the external yt-dlp binary

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;

use super::link::VideoRef;
use super::select::StreamCandidate;
use super::{Catalog, describe};
use crate::error::{Error, Result};
use crate::types::{SourceReference, StreamDescriptor};

/// Catalog that shells out to `yt-dlp`
///
/// Search uses the `ytsearch1:` pseudo-URL with `--flat-playlist`, stream resolution uses the
/// single-JSON dump (`-J`).
///
/// # Examples
///
/// ```no_run
/// use tunefetch::catalog::{Catalog, YtDlpCatalog};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = YtDlpCatalog::from_path().expect("yt-dlp not found in PATH");
/// let hit = catalog.search_top("Imagine Dragons Believer").await?;
/// # Ok(())
/// # }
/// ```
pub struct YtDlpCatalog {
    binary_path: PathBuf,
}

impl YtDlpCatalog {
    /// Create a catalog with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        tracing::debug!(binary = %self.binary_path.display(), ?args, "Running yt-dlp");
        Command::new(&self.binary_path)
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoDump {
    title: String,
    #[serde(default)]
    formats: Vec<Format>,
}

#[derive(Debug, Deserialize)]
struct Format {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    tbr: Option<f64>,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    filesize_approx: Option<u64>,
    #[serde(default)]
    format_note: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
}

fn has_codec(codec: &Option<String>) -> bool {
    codec.as_deref().is_some_and(|c| c != "none")
}

impl Format {
    /// Only plain HTTP(S) downloads can be streamed by the downloader
    fn is_direct(&self) -> bool {
        self.protocol
            .as_deref()
            .is_none_or(|p| p == "https" || p == "http")
    }

    fn into_candidate(self) -> StreamCandidate {
        let direct = self.is_direct();
        StreamCandidate {
            has_audio: direct && has_codec(&self.acodec),
            has_video: direct && has_codec(&self.vcodec),
            url: self.url.unwrap_or_default(),
            container: self.ext.unwrap_or_else(|| "mp4".to_string()),
            quality_label: self
                .format_note
                .or_else(|| self.height.map(|h| format!("{h}p"))),
            height: self.height,
            bitrate: self.tbr.map(|kbps| (kbps * 1000.0) as u64),
            content_length: self.filesize,
        }
    }
}

/// Parse `--flat-playlist --dump-json` output: one JSON object per line
fn parse_search_output(stdout: &[u8]) -> Result<Option<SourceReference>> {
    let text = String::from_utf8_lossy(stdout);
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry: FlatEntry = serde_json::from_str(line)?;
        if let (Ok(video), Some(title)) = (VideoRef::parse(&entry.id), entry.title) {
            return Ok(Some(SourceReference {
                url: video.canonical_url(),
                title,
            }));
        }
    }
    Ok(None)
}

/// Parse `-J` output into a stream descriptor
fn parse_info_output(video: &VideoRef, stdout: &[u8]) -> Result<StreamDescriptor> {
    let info: InfoDump = serde_json::from_slice(stdout).map_err(|e| {
        Error::InvalidSource(format!("unexpected yt-dlp output for {video}: {e}"))
    })?;
    let candidates = info
        .formats
        .into_iter()
        .map(|f| {
            let approx = f.filesize_approx;
            let mut candidate = f.into_candidate();
            candidate.content_length = candidate.content_length.or(approx);
            candidate
        })
        .collect();
    describe(video, info.title, candidates)
}

/// Classify a non-zero yt-dlp exit from its stderr
fn classify_failure(what: &str, stderr: &[u8]) -> Error {
    let stderr = String::from_utf8_lossy(stderr);
    let message = stderr
        .lines()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .unwrap_or_else(|| stderr.trim())
        .to_string();

    const UNAVAILABLE: &[&str] = &[
        "Video unavailable",
        "Private video",
        "This video is not available",
        "has been removed",
        "Incomplete YouTube ID",
    ];
    if UNAVAILABLE.iter().any(|p| message.contains(p)) {
        Error::NotFound(format!("{what}: {message}"))
    } else {
        Error::TransferFailed(format!("{what}: yt-dlp failed: {message}"))
    }
}

#[async_trait]
impl Catalog for YtDlpCatalog {
    async fn search_top(&self, query: &str) -> Result<Option<SourceReference>> {
        let target = format!("ytsearch1:{query}");
        let output = self
            .run(&[
                "--dump-json",
                "--flat-playlist",
                "--no-warnings",
                "--playlist-items",
                "1",
                &target,
            ])
            .await?;

        if !output.status.success() {
            return Err(classify_failure(&format!("search {query:?}"), &output.stderr));
        }
        parse_search_output(&output.stdout)
    }

    async fn fetch(&self, video: &VideoRef) -> Result<StreamDescriptor> {
        let url = video.canonical_url();
        let output = self
            .run(&["-J", "--no-playlist", "--no-warnings", &url])
            .await?;

        if !output.status.success() {
            return Err(classify_failure(&format!("video {video}"), &output.stderr));
        }
        parse_info_output(video, &output.stdout)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
