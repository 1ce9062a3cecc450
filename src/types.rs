//! Core types for tunefetch

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, ErrorKind, Result};

/// Unique identifier for one run of the pipeline
///
/// Rendered as 16 lowercase hex digits and embedded in every temporary file name of the run,
/// so two runs acquiring the same title never write to the same intermediate file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl RunId {
    /// Generate a fresh random run id
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(u64::from_str_radix(s, 16)?))
    }
}

/// A user request to acquire one track
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Query {
    /// Free-text search ("Imagine Dragons Believer")
    Name(String),
    /// Direct link or bare video id
    Link(String),
}

impl Query {
    /// Build a query from the two optional fields of a submission form
    ///
    /// Exactly one field must carry text. `None` and blank strings count as absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use tunefetch::types::Query;
    ///
    /// let q = Query::from_fields(Some("Believer"), None).unwrap();
    /// assert_eq!(q, Query::Name("Believer".to_string()));
    ///
    /// assert!(Query::from_fields(None, None).is_err());
    /// assert!(Query::from_fields(Some("a"), Some("b")).is_err());
    /// ```
    pub fn from_fields(name: Option<&str>, link: Option<&str>) -> Result<Self> {
        let name = name.map(str::trim).filter(|s| !s.is_empty());
        let link = link.map(str::trim).filter(|s| !s.is_empty());

        match (name, link) {
            (Some(name), None) => Ok(Query::Name(name.to_string())),
            (None, Some(link)) => Ok(Query::Link(link.to_string())),
            (None, None) => Err(Error::InvalidQuery(
                "provide either a song name or a link".into(),
            )),
            (Some(_), Some(_)) => Err(Error::InvalidQuery(
                "provide a song name or a link, not both".into(),
            )),
        }
    }

    /// The raw text of the query
    pub fn text(&self) -> &str {
        match self {
            Query::Name(s) | Query::Link(s) => s,
        }
    }
}

/// Resolved identity of a track to fetch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    /// Canonical watch URL
    pub url: String,
    /// Title as reported by the catalog
    pub title: String,
}

/// A specific downloadable encoding of a source, selected by quality
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Direct media URL
    pub url: String,
    /// Container extension (e.g. "mp4", "webm")
    pub container: String,
    /// Human-readable quality label (e.g. "720p")
    pub quality_label: Option<String>,
    /// Vertical resolution in pixels, when known
    pub height: Option<u32>,
    /// Bitrate in bits per second, when known
    pub bitrate: Option<u64>,
    /// Size in bytes as the catalog reports it, possibly an estimate
    pub content_length: Option<u64>,
    /// The track this stream belongs to (title + canonical URL)
    pub source: SourceReference,
}

/// Progress of one download
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Total size in bytes (0 while unknown)
    pub total: u64,
    /// Bytes received so far
    pub received: u64,
    /// Completed fraction in `[0, 1]`
    pub ratio: f64,
    /// Average transfer rate in bytes per second
    pub rate: f64,
    /// Estimated seconds remaining
    pub eta: u64,
}

impl DownloadProgress {
    /// Completion as a whole percentage
    pub fn percent(&self) -> u8 {
        (self.ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Terminal outcome of a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcquisitionResult {
    /// Track is in the library
    Success {
        /// Sanitized title, the final file's base name
        final_title: String,
        /// Path of the final audio file
        path: PathBuf,
        /// A file with the same name existed and was replaced
        overwritten: bool,
    },
    /// Run failed
    Failure {
        /// Failure category
        reason: ErrorKind,
        /// Human-readable detail
        detail: String,
    },
}

impl AcquisitionResult {
    /// Whether the run succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, AcquisitionResult::Success { .. })
    }

    /// The failure kind, if the run failed
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            AcquisitionResult::Failure { reason, .. } => Some(*reason),
            AcquisitionResult::Success { .. } => None,
        }
    }
}

/// Pipeline stage, used to attribute errors and in log fields
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Name search
    Resolve,
    /// Link validation and stream selection
    Fetch,
    /// Media transfer
    Download,
    /// Audio extraction
    Convert,
}

/// State of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum RunState {
    /// Created, not started
    Idle,
    /// Searching the catalog by name
    Resolving,
    /// Resolving the stream descriptor
    Fetching,
    /// Transferring media
    Downloading,
    /// Extracting audio
    Converting,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed(ErrorKind),
}

/// Event emitted by a run, in order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Run moved to a new state
    StateChanged {
        /// The new state
        state: RunState,
    },
    /// Download progress update
    Progress {
        /// Current progress
        progress: DownloadProgress,
    },
    /// The final file already existed and is being replaced
    OverwriteWarning {
        /// Path of the replaced file
        path: PathBuf,
    },
    /// Terminal outcome, always the last event of a run
    Finished {
        /// The outcome
        result: AcquisitionResult,
    },
}
