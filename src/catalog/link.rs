//! Validation of user-supplied links and video ids

use url::Url;

use crate::error::{Error, Result};

/// Length of a video id
pub const VIDEO_ID_LEN: usize = 11;

const INVALID_LINK_HINT: &str =
    "Please provide the 11 character video id or the URL to the video.";

/// Hosts that serve the long `watch?v=` / path-style URLs
const LONG_FORM_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// Path prefixes that are followed directly by a video id
const ID_PATH_PREFIXES: &[&str] = &["shorts", "embed", "live", "v"];

/// A validated reference to one video on the external service
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VideoRef {
    id: String,
}

impl VideoRef {
    /// Parse a raw link: a full URL or a bare 11-character id
    ///
    /// # Examples
    ///
    /// ```
    /// use tunefetch::catalog::VideoRef;
    ///
    /// let v = VideoRef::parse("https://www.youtube.com/watch?v=7wtfhZwyrcc&t=42").unwrap();
    /// assert_eq!(v.id(), "7wtfhZwyrcc");
    /// assert_eq!(VideoRef::parse("https://youtu.be/7wtfhZwyrcc").unwrap(), v);
    /// assert_eq!(VideoRef::parse("7wtfhZwyrcc").unwrap(), v);
    /// assert!(VideoRef::parse("not a url").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();

        if is_video_id(raw) {
            return Ok(Self { id: raw.to_string() });
        }

        // Scheme-less links ("youtu.be/abc", "www.youtube.com/watch?v=abc") are common in pastes
        let url = Url::parse(raw)
            .or_else(|_| Url::parse(&format!("https://{raw}")))
            .map_err(|_| invalid(raw))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(raw));
        }

        let host = url.host_str().ok_or_else(|| invalid(raw))?.to_ascii_lowercase();
        let segments = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default();

        let candidate = if host == "youtu.be" {
            segments.first().map(|s| s.to_string())
        } else if LONG_FORM_HOSTS.contains(&host.as_str()) {
            match segments.as_slice() {
                ["watch"] => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                [prefix, id, ..] if ID_PATH_PREFIXES.contains(prefix) => Some(id.to_string()),
                _ => None,
            }
        } else {
            None
        };

        match candidate {
            Some(id) if is_video_id(&id) => Ok(Self { id }),
            _ => Err(invalid(raw)),
        }
    }

    /// The 11-character id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The canonical watch URL for this video
    pub fn canonical_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

impl std::fmt::Display for VideoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Whether `s` has the shape of a video id
pub fn is_video_id(s: &str) -> bool {
    s.len() == VIDEO_ID_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn invalid(raw: &str) -> Error {
    Error::InvalidSource(format!(
        "the URL provided is invalid: {raw:?}. {INVALID_LINK_HINT}"
    ))
}
