//! Catalog backed by an Invidious instance's JSON API

use async_trait::async_trait;
use serde::Deserialize;

use super::link::VideoRef;
use super::select::{StreamCandidate, parse_height};
use super::{Catalog, describe};
use crate::error::{Error, Result};
use crate::types::{SourceReference, StreamDescriptor};

/// Catalog that queries `/api/v1/search` and `/api/v1/videos/{id}` on an Invidious instance
///
/// `formatStreams` entries are combined audio/video streams and are the only ones eligible for
/// download; `adaptiveFormats` are listed as single-track candidates so selection can skip them.
pub struct InvidiousCatalog {
    base_url: String,
    client: reqwest::Client,
}

impl InvidiousCatalog {
    /// Create a catalog for the instance at `base_url` (e.g. "https://yewtu.be")
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Catalog request");

        self.client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::TransferFailed(format!("request to {url} failed: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    title: String,
    #[serde(rename = "formatStreams", default)]
    format_streams: Vec<FormatStream>,
    #[serde(rename = "adaptiveFormats", default)]
    adaptive_formats: Vec<FormatStream>,
}

#[derive(Debug, Deserialize)]
struct FormatStream {
    #[serde(default)]
    url: String,
    #[serde(rename = "type", default)]
    mime: String,
    #[serde(default)]
    container: Option<String>,
    #[serde(rename = "qualityLabel", default)]
    quality_label: Option<String>,
    #[serde(default)]
    resolution: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    bitrate: Option<serde_json::Value>,
    #[serde(default)]
    clen: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

impl FormatStream {
    fn into_candidate(self, combined: bool) -> StreamCandidate {
        let height = self
            .quality_label
            .as_deref()
            .or(self.resolution.as_deref())
            .and_then(parse_height)
            .or_else(|| self.size.as_deref().and_then(parse_height));

        let (has_audio, has_video) = if combined {
            (true, true)
        } else {
            (self.mime.starts_with("audio/"), self.mime.starts_with("video/"))
        };

        let container = self
            .container
            .clone()
            .unwrap_or_else(|| container_from_mime(&self.mime));

        StreamCandidate {
            url: self.url,
            container,
            quality_label: self.quality_label.or(self.resolution),
            has_audio,
            has_video,
            height,
            bitrate: self.bitrate.as_ref().and_then(as_u64),
            content_length: self.clen.as_ref().and_then(as_u64),
        }
    }
}

/// "video/mp4; codecs=..." -> "mp4"
fn container_from_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .and_then(|m| m.split('/').nth(1))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("mp4")
        .to_string()
}

/// Invidious reports some numbers as strings
fn as_u64(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl Catalog for InvidiousCatalog {
    async fn search_top(&self, query: &str) -> Result<Option<SourceReference>> {
        let response = self
            .get("/api/v1/search", &[("q", query), ("type", "video")])
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::TransferFailed(format!(
                "search for {query:?} failed with HTTP {status}"
            )));
        }

        let items: Vec<SearchItem> = response.json().await.map_err(|e| {
            Error::InvalidSource(format!("unexpected search response for {query:?}: {e}"))
        })?;

        let hit = items
            .into_iter()
            .filter(|item| item.kind.as_deref().is_none_or(|k| k == "video"))
            .find_map(|item| match (item.video_id, item.title) {
                (Some(id), Some(title)) => VideoRef::parse(&id).ok().map(|v| (v, title)),
                _ => None,
            });

        Ok(hit.map(|(video, title)| SourceReference {
            url: video.canonical_url(),
            title,
        }))
    }

    async fn fetch(&self, video: &VideoRef) -> Result<StreamDescriptor> {
        let response = self
            .get(&format!("/api/v1/videos/{}", video.id()), &[])
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(Error::NotFound(format!("{video}: {}", api_error.error)));
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(Error::NotFound(format!("video {video} does not exist")));
            }
            return Err(Error::TransferFailed(format!(
                "fetching video {video} failed with HTTP {status}"
            )));
        }

        let info: VideoInfo = response.json().await.map_err(|e| {
            Error::InvalidSource(format!("unexpected response for video {video}: {e}"))
        })?;

        let candidates = info
            .format_streams
            .into_iter()
            .map(|f| f.into_candidate(true))
            .chain(
                info.adaptive_formats
                    .into_iter()
                    .map(|f| f.into_candidate(false)),
            )
            .collect();

        describe(video, info.title, candidates)
    }

    fn name(&self) -> &'static str {
        "invidious"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ID: &str = "7wtfhZwyrcc";

    async fn catalog_for(server: &MockServer) -> InvidiousCatalog {
        InvidiousCatalog::new(&format!("{}/", server.uri()), reqwest::Client::new())
    }

    #[tokio::test]
    async fn search_returns_first_video_hit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .and(query_param("q", "Imagine Dragons Believer"))
            .and(query_param("type", "video"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "type": "channel", "author": "ImagineDragons" },
                { "type": "video", "title": "Imagine Dragons - Believer", "videoId": ID },
                { "type": "video", "title": "Believer (Live)", "videoId": "aaaaaaaaaaa" }
            ])))
            .mount(&server)
            .await;

        let hit = catalog_for(&server)
            .await
            .search_top("Imagine Dragons Believer")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hit.title, "Imagine Dragons - Believer");
        assert_eq!(hit.url, format!("https://www.youtube.com/watch?v={ID}"));
    }

    #[tokio::test]
    async fn search_with_no_results_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let hit = catalog_for(&server).await.search_top("zzzz").await.unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn search_server_error_is_transfer_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = catalog_for(&server).await.search_top("x").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::TransferFailed));
    }

    #[tokio::test]
    async fn fetch_selects_best_combined_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/videos/{ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Imagine Dragons - Believer",
                "videoId": ID,
                "formatStreams": [
                    { "url": "https://cdn/360.mp4", "type": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                      "container": "mp4", "qualityLabel": "360p", "resolution": "360p" },
                    { "url": "https://cdn/720.mp4", "type": "video/mp4; codecs=\"avc1.64001F, mp4a.40.2\"",
                      "container": "mp4", "qualityLabel": "720p", "resolution": "720p" }
                ],
                "adaptiveFormats": [
                    { "url": "https://cdn/1080.webm", "type": "video/webm; codecs=\"vp9\"",
                      "qualityLabel": "1080p", "bitrate": "2500000", "clen": "50000000" },
                    { "url": "https://cdn/audio.webm", "type": "audio/webm; codecs=\"opus\"",
                      "bitrate": "160000", "clen": "3000000" }
                ]
            })))
            .mount(&server)
            .await;

        let stream = catalog_for(&server)
            .await
            .fetch(&VideoRef::parse(ID).unwrap())
            .await
            .unwrap();

        assert_eq!(stream.url, "https://cdn/720.mp4");
        assert_eq!(stream.container, "mp4");
        assert_eq!(stream.height, Some(720));
        assert_eq!(stream.source.title, "Imagine Dragons - Believer");
    }

    #[tokio::test]
    async fn fetch_unknown_video_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/videos/{ID}")))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({ "error": "This video is unavailable" })),
            )
            .mount(&server)
            .await;

        let err = catalog_for(&server)
            .await
            .fetch(&VideoRef::parse(ID).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
        assert!(err.to_string().contains("unavailable"));
    }

    #[tokio::test]
    async fn fetch_garbage_body_is_invalid_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/videos/{ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let err = catalog_for(&server)
            .await
            .fetch(&VideoRef::parse(ID).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidSource));
    }

    #[tokio::test]
    async fn unreachable_instance_is_transfer_failed() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let catalog = InvidiousCatalog::new("http://127.0.0.1:9", reqwest::Client::new());
        let err = catalog.search_top("x").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::TransferFailed));
    }

    #[test]
    fn container_falls_back_to_mime_subtype() {
        assert_eq!(container_from_mime("video/webm; codecs=\"vp9\""), "webm");
        assert_eq!(container_from_mime(""), "mp4");
    }
}
