//! Choosing the best downloadable stream among what the service offers

/// One stream offered by the service, normalized across backends
#[derive(Clone, Debug, PartialEq)]
pub struct StreamCandidate {
    /// Direct media URL
    pub url: String,
    /// Container extension
    pub container: String,
    /// Quality label ("720p"), if any
    pub quality_label: Option<String>,
    /// Stream carries audio
    pub has_audio: bool,
    /// Stream carries video
    pub has_video: bool,
    /// Vertical resolution in pixels
    pub height: Option<u32>,
    /// Bitrate in bits per second
    pub bitrate: Option<u64>,
    /// Size in bytes
    pub content_length: Option<u64>,
}

impl StreamCandidate {
    fn rank(&self) -> (u32, u64, u64) {
        (
            self.height.unwrap_or(0),
            self.bitrate.unwrap_or(0),
            self.content_length.unwrap_or(0),
        )
    }
}

/// Pick the highest-quality combined audio+video stream
///
/// Ranks by resolution, then bitrate, then size. Audio-only and video-only streams are never
/// chosen. Among equal ranks the first offered stream wins.
pub fn select_best(candidates: Vec<StreamCandidate>) -> Option<StreamCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.has_audio && c.has_video && !c.url.is_empty())
        .fold(None, |best: Option<StreamCandidate>, c| match best {
            Some(b) if b.rank() >= c.rank() => Some(b),
            _ => Some(c),
        })
}

/// Parse a "720p", "1080p60" or "640x360" style label into a height
pub fn parse_height(label: &str) -> Option<u32> {
    let label = label.trim();
    if let Some((_, h)) = label.split_once('x') {
        return h.trim().parse().ok();
    }
    let digits: String = label.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() || !label[digits.len()..].starts_with('p') {
        return None;
    }
    digits.parse().ok()
}
