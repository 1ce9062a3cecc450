//! # tunefetch
//!
//! Backend library that acquires audio tracks for a local music library.
//!
//! ## Design Philosophy
//!
//! tunefetch is designed to be:
//! - **Library-first** - No UI, purely a Rust crate that a player front end embeds
//! - **Off the interactive thread** - Searches, downloads and conversions run as tokio tasks
//! - **Event-driven** - Each run reports state changes, progress and exactly one result
//! - **Sensible defaults** - Works out of the box with ffmpeg on PATH
//!
//! A run takes a song name or a video link, resolves it to the best downloadable stream,
//! downloads it into the library directory, extracts the audio as MP3 and reports the final
//! file. Titles are sanitized into filesystem-safe names before anything touches the disk.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tunefetch::{AcquisitionPipeline, AcquisitionResult, Config, RunObserver, RunState};
//!
//! struct Printer;
//!
//! impl RunObserver for Printer {
//!     fn on_state(&mut self, state: RunState) {
//!         println!("state: {state:?}");
//!     }
//!     fn on_song_list_changed(&mut self) {
//!         println!("library updated");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_or_default("settings.json".as_ref()).await?;
//!     let pipeline = AcquisitionPipeline::new(config)?;
//!
//!     let run = pipeline.submit(None, Some("https://youtu.be/7wtfhZwyrcc"))?;
//!     match run.drive(&mut Printer).await {
//!         AcquisitionResult::Success { path, .. } => println!("saved {}", path.display()),
//!         AcquisitionResult::Failure { reason, detail } => {
//!             eprintln!("{}: {detail}", reason.title())
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Catalog backends (search and stream resolution)
pub mod catalog;
/// Configuration types
pub mod config;
/// HTTP media download with progress
pub mod download;
/// Error types
pub mod error;
/// Local track library
pub mod library;
/// Acquisition pipeline and run handles
pub mod pipeline;
/// Name search and stream fetching
pub mod resolver;
/// Filesystem-safe track names
pub mod sanitize;
/// Audio extraction
pub mod transcode;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use catalog::{Catalog, InvidiousCatalog, VideoRef, YtDlpCatalog};
pub use config::{CatalogBackend, Config};
pub use download::Downloader;
pub use error::{Error, ErrorKind, Result};
pub use library::Track;
pub use pipeline::{AcquisitionPipeline, RunHandle, RunObserver};
pub use resolver::{NameResolver, SourceFetcher};
pub use sanitize::sanitize;
pub use transcode::{FfmpegTranscoder, NoOpTranscoder, Transcoder};
pub use types::{
    AcquisitionResult, DownloadProgress, Query, RunEvent, RunId, RunState, SourceReference,
    Stage, StreamDescriptor,
};
