//! Mock video service and fake transcoders

use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tunefetch::{Error, Result, Transcoder};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A well-formed video id used across tests
pub const VIDEO_ID: &str = "7wtfhZwyrcc";

/// A second well-formed video id
pub const OTHER_VIDEO_ID: &str = "kJQP7kiw5Fk";

/// Generate `len` bytes of deterministic "media"
pub fn media_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Invidious-compatible API plus a media host, backed by wiremock
pub struct MockService {
    pub server: MockServer,
}

impl MockService {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to put in `catalog.invidious_url`
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Answer a search for `query` with the given `(video_id, title)` hits
    pub async fn search(&self, query: &str, hits: &[(&str, &str)]) {
        let body: Vec<_> = hits
            .iter()
            .map(|(id, title)| json!({ "type": "video", "videoId": id, "title": title }))
            .collect();

        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .and(query_param("q", query))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Publish a video whose single combined stream serves `body`
    pub async fn video(&self, id: &str, title: &str, body: Vec<u8>) {
        self.video_with_delay(id, title, body, Duration::ZERO).await;
    }

    /// Like [`video`](Self::video), holding the media response back for `delay`
    pub async fn video_with_delay(&self, id: &str, title: &str, body: Vec<u8>, delay: Duration) {
        self.video_info(id, title).await;

        Mock::given(method("GET"))
            .and(path(format!("/media/{id}.mp4")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Publish a video whose media host answers with `status`
    pub async fn broken_video(&self, id: &str, title: &str, status: u16) {
        self.video_info(id, title).await;

        Mock::given(method("GET"))
            .and(path(format!("/media/{id}.mp4")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Report `id` as unavailable
    pub async fn unavailable(&self, id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/videos/{id}")))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": "This video is unavailable" })),
            )
            .mount(&self.server)
            .await;
    }

    async fn video_info(&self, id: &str, title: &str) {
        let media_url = format!("{}/media/{id}.mp4", self.server.uri());
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/videos/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": title,
                "videoId": id,
                "formatStreams": [{
                    "url": media_url,
                    "type": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                    "container": "mp4",
                    "qualityLabel": "360p",
                    "resolution": "360p"
                }],
                "adaptiveFormats": [{
                    "url": format!("{}/media/{id}.webm", self.server.uri()),
                    "type": "audio/webm; codecs=\"opus\"",
                    "bitrate": "160000"
                }]
            })))
            .mount(&self.server)
            .await;
    }

    /// Number of requests that reached the media host
    pub async fn media_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().starts_with("/media/"))
            .count()
    }
}

/// Transcoder that "encodes" by prefixing the input with an ID3 tag marker
#[derive(Default)]
pub struct FakeTranscoder {
    pub calls: AtomicUsize,
}

pub const FAKE_ID3: &[u8] = b"ID3";

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut data = FAKE_ID3.to_vec();
        data.extend(tokio::fs::read(input).await?);
        tokio::fs::write(output, data).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Transcoder that writes half a file and then fails
pub struct FailingTranscoder;

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        tokio::fs::write(output, FAKE_ID3).await?;
        Err(Error::TranscodeFailed {
            source_path: input.to_path_buf(),
            reason: "no audio stream found".into(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
