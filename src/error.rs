//! Error types for tunefetch
//!
//! Every stage of the acquisition pipeline reports failures through [`Error`]. Before an error
//! leaves a run it is reduced to one of the six [`ErrorKind`]s plus a human-readable detail
//! string, which is what the caller receives in an
//! [`AcquisitionResult::Failure`](crate::types::AcquisitionResult::Failure).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::types::Stage;

/// Result type alias for tunefetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tunefetch
#[derive(Debug, Error)]
pub enum Error {
    /// Query had neither or both of name/link set
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Search yielded nothing, or the referenced track does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed link or video id, or a service response that cannot be understood
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// Network failure while talking to the catalog or downloading media
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// Local storage could not hold or accept the data
    #[error("storage failed at {path}: {reason}")]
    StorageFailed {
        /// The path being written when the failure happened
        path: PathBuf,
        /// The reason the write failed
        reason: String,
    },

    /// Audio extraction/encoding failed
    #[error("transcode failed for {source_path}: {reason}")]
    TranscodeFailed {
        /// The downloaded container that was being converted (left on disk)
        source_path: PathBuf,
        /// The reason conversion failed
        reason: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "invidious_url")
        key: Option<String>,
    },

    /// External tool execution failed (ffmpeg, yt-dlp)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The closed set of failure reasons a run can end with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller supplied neither or both query fields
    InvalidQuery,
    /// Search returned no result / track unavailable
    NotFound,
    /// Link or id could not be understood
    InvalidSource,
    /// Network failure during search, resolution or download
    TransferFailed,
    /// Disk full, permission denied or similar local write failure
    StorageFailed,
    /// Audio could not be extracted or encoded
    TranscodeFailed,
}

impl ErrorKind {
    /// Short title suitable for a dialog heading
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::InvalidQuery => "Invalid request",
            ErrorKind::NotFound => "Song not found",
            ErrorKind::InvalidSource => "Invalid URL",
            ErrorKind::TransferFailed => "Download failed",
            ErrorKind::StorageFailed => "Could not save song",
            ErrorKind::TranscodeFailed => "Conversion failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidQuery => "invalid_query",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidSource => "invalid_source",
            ErrorKind::TransferFailed => "transfer_failed",
            ErrorKind::StorageFailed => "storage_failed",
            ErrorKind::TranscodeFailed => "transcode_failed",
        };
        f.write_str(s)
    }
}

impl Error {
    /// Kind of an already-classified error, `None` for low-level variants
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::InvalidQuery(_) => Some(ErrorKind::InvalidQuery),
            Error::NotFound(_) => Some(ErrorKind::NotFound),
            Error::InvalidSource(_) => Some(ErrorKind::InvalidSource),
            Error::TransferFailed(_) => Some(ErrorKind::TransferFailed),
            Error::StorageFailed { .. } => Some(ErrorKind::StorageFailed),
            Error::TranscodeFailed { .. } => Some(ErrorKind::TranscodeFailed),
            Error::Config { .. }
            | Error::ExternalTool(_)
            | Error::NotSupported(_)
            | Error::Io(_)
            | Error::Network(_)
            | Error::Serialization(_) => None,
        }
    }

    /// Reduce any error to a taxonomy kind and detail string
    ///
    /// Classified variants keep their own kind when `stage` can fail that way; otherwise they
    /// take the stage's fallback kind and the detail drops the original kind's prefix. Low-level
    /// variants are attributed to the stage they surfaced in, so a raw I/O or HTTP fault never
    /// reaches the caller as-is.
    pub fn classify(&self, stage: Stage) -> (ErrorKind, String) {
        match self.kind() {
            Some(kind) if stage.allows(kind) => return (kind, self.to_string()),
            Some(_) => return (stage.fallback_failure(), self.reason()),
            None => {}
        }

        let kind = match (self, stage) {
            (_, Stage::Convert) => ErrorKind::TranscodeFailed,
            (Error::Io(_), Stage::Download) => ErrorKind::StorageFailed,
            (Error::Serialization(_) | Error::Config { .. }, Stage::Fetch) => {
                ErrorKind::InvalidSource
            }
            _ => ErrorKind::TransferFailed,
        };
        (kind, self.to_string())
    }

    /// Message of a classified variant without its kind prefix
    fn reason(&self) -> String {
        match self {
            Error::InvalidQuery(msg)
            | Error::NotFound(msg)
            | Error::InvalidSource(msg)
            | Error::TransferFailed(msg) => msg.clone(),
            Error::StorageFailed { path, reason } => format!("{reason} ({})", path.display()),
            Error::TranscodeFailed {
                source_path,
                reason,
            } => format!("{reason} ({})", source_path.display()),
            other => other.to_string(),
        }
    }

    /// Map a local write failure to [`Error::StorageFailed`]
    pub(crate) fn storage(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let reason = match err.kind() {
            std::io::ErrorKind::StorageFull => format!("disk is full ({err})"),
            std::io::ErrorKind::PermissionDenied => format!("permission denied ({err})"),
            std::io::ErrorKind::ReadOnlyFilesystem => format!("read-only filesystem ({err})"),
            _ => err.to_string(),
        };
        Error::StorageFailed {
            path: path.into(),
            reason,
        }
    }
}
