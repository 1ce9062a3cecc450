//! Catalog backends: name search and stream resolution
//!
//! The external video service is reached through the [`Catalog`] trait. Two implementations
//! are provided:
//!
//! - [`InvidiousCatalog`]: talks to an Invidious instance's JSON API over HTTP
//! - [`YtDlpCatalog`]: runs the external `yt-dlp` binary
//!
//! Link validation ([`VideoRef`]) and stream selection ([`select_best`]) are shared by both, so
//! a backend only has to list what the service offers.
//!
//! ## Usage
//!
//! ```no_run
//! use tunefetch::catalog::{Catalog, InvidiousCatalog, VideoRef};
//!
//! # async fn example() -> tunefetch::Result<()> {
//! let catalog = InvidiousCatalog::new("https://yewtu.be", reqwest::Client::new());
//!
//! if let Some(hit) = catalog.search_top("Imagine Dragons Believer").await? {
//!     println!("{} -> {}", hit.title, hit.url);
//! }
//!
//! let stream = catalog.fetch(&VideoRef::parse("7wtfhZwyrcc")?).await?;
//! println!("best stream: {} ({:?})", stream.container, stream.quality_label);
//! # Ok(())
//! # }
//! ```

mod invidious;
mod link;
mod select;
mod ytdlp;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{CatalogBackend, Config};
use crate::error::{Error, Result};
use crate::types::{SourceReference, StreamDescriptor};

pub use invidious::InvidiousCatalog;
pub use link::{VIDEO_ID_LEN, VideoRef, is_video_id};
pub use select::{StreamCandidate, parse_height, select_best};
pub use ytdlp::YtDlpCatalog;

/// Trait for the external video catalog
///
/// Implementations classify their own failures: `NotFound` for unknown videos, `InvalidSource`
/// for responses that cannot be understood, `TransferFailed` for network faults.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Search by free text and return the first hit, or `None` when nothing matched
    async fn search_top(&self, query: &str) -> Result<Option<SourceReference>>;

    /// Resolve a validated video reference to its best combined audio/video stream
    async fn fetch(&self, video: &VideoRef) -> Result<StreamDescriptor>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Build the catalog selected by `config.catalog.backend`
pub fn from_config(config: &Config, client: reqwest::Client) -> Result<Arc<dyn Catalog>> {
    match config.catalog.backend {
        CatalogBackend::Invidious => Ok(Arc::new(InvidiousCatalog::new(
            &config.catalog.invidious_url,
            client,
        ))),
        CatalogBackend::YtDlp => {
            let binary = config.tools.resolve_ytdlp().ok_or_else(|| Error::Config {
                message: "yt-dlp backend selected but yt-dlp was not found. \
                          Configure ytdlp_path or ensure yt-dlp is in PATH."
                    .into(),
                key: Some("ytdlp_path".into()),
            })?;
            Ok(Arc::new(YtDlpCatalog::new(binary)))
        }
    }
}

/// Turn a selected candidate into the descriptor handed to the downloader
pub(crate) fn describe(
    video: &VideoRef,
    title: String,
    candidates: Vec<StreamCandidate>,
) -> Result<StreamDescriptor> {
    let best = select_best(candidates).ok_or_else(|| {
        Error::NotFound(format!(
            "\"{title}\" ({video}) has no downloadable audio/video stream"
        ))
    })?;

    Ok(StreamDescriptor {
        url: best.url,
        container: best.container,
        quality_label: best.quality_label,
        height: best.height,
        bitrate: best.bitrate,
        content_length: best.content_length,
        source: SourceReference {
            url: video.canonical_url(),
            title,
        },
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn describe_reports_missing_streams_as_not_found() {
        let video = VideoRef::parse("7wtfhZwyrcc").unwrap();
        let err = describe(&video, "Believer".into(), vec![]).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[test]
    fn describe_carries_canonical_source() {
        let video = VideoRef::parse("https://youtu.be/7wtfhZwyrcc").unwrap();
        let stream = describe(
            &video,
            "Believer".into(),
            vec![StreamCandidate {
                url: "https://cdn.example/v.mp4".into(),
                container: "mp4".into(),
                quality_label: Some("360p".into()),
                has_audio: true,
                has_video: true,
                height: Some(360),
                bitrate: None,
                content_length: Some(1024),
            }],
        )
        .unwrap();

        assert_eq!(stream.source.url, "https://www.youtube.com/watch?v=7wtfhZwyrcc");
        assert_eq!(stream.source.title, "Believer");
        assert_eq!(stream.content_length, Some(1024));
    }

    #[test]
    fn ytdlp_backend_without_binary_is_a_config_error() {
        let mut config = Config::default();
        config.catalog.backend = CatalogBackend::YtDlp;
        config.tools.search_path = false;

        match from_config(&config, reqwest::Client::new()) {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("ytdlp_path")),
            Err(e) => panic!("expected Config error, got {e:?}"),
            Ok(_) => panic!("expected Config error, got a catalog"),
        }
    }
}
