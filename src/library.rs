//! The local track library: importing files and listing what is available

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::transcode::AUDIO_EXTENSION;
use crate::utils::remove_file_quietly;

/// One playable track in the library
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// File stem, as shown in the song list
    pub title: String,
    /// Absolute or library-relative path of the file
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
}

/// Copy an existing audio file into the library unchanged
///
/// The file keeps its own name (no sanitization, no conversion) and replaces any library file
/// of the same name. The copy goes through a hidden `.part` file so a failed import leaves
/// nothing behind.
///
/// # Errors
///
/// `NotFound` if `src` is not a readable file, `StorageFailed` if the copy fails.
pub async fn import_local(src: &Path, library_dir: &Path) -> Result<Track> {
    let metadata = tokio::fs::metadata(src)
        .await
        .map_err(|e| Error::NotFound(format!("{}: {e}", src.display())))?;
    if !metadata.is_file() {
        return Err(Error::NotFound(format!("{} is not a file", src.display())));
    }

    let file_name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::NotFound(format!("{} has no file name", src.display())))?;

    let dest = library_dir.join(&file_name);
    let part = library_dir.join(format!(".{file_name}.part"));

    if let Err(e) = tokio::fs::copy(src, &part).await {
        remove_file_quietly(&part).await;
        return Err(Error::storage(&dest, e));
    }
    if let Err(e) = tokio::fs::rename(&part, &dest).await {
        remove_file_quietly(&part).await;
        return Err(Error::storage(&dest, e));
    }

    tracing::info!(src = %src.display(), dest = %dest.display(), "Imported local file");
    track_at(dest).await
}

/// List the `.mp3` tracks in `library_dir`, sorted by title (case-insensitive)
///
/// In-progress temporary files end in `.part` and are therefore never listed.
pub async fn list_tracks(library_dir: &Path) -> Result<Vec<Track>> {
    let mut entries = tokio::fs::read_dir(library_dir).await?;
    let mut tracks = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !is_audio_file(&path) {
            continue;
        }
        match track_at(path.clone()).await {
            Ok(track) => tracks.push(track),
            // Vanished between read_dir and metadata, e.g. replaced by a concurrent run
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping library entry"),
        }
    }

    tracks.sort_by(|a, b| {
        a.title
            .to_lowercase()
            .cmp(&b.title.to_lowercase())
            .then_with(|| a.title.cmp(&b.title))
    });
    Ok(tracks)
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(AUDIO_EXTENSION))
}

async fn track_at(path: PathBuf) -> Result<Track> {
    let metadata = tokio::fs::metadata(&path).await?;
    if !metadata.is_file() {
        return Err(Error::NotFound(format!("{} is not a file", path.display())));
    }
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Track {
        title,
        path,
        size_bytes: metadata.len(),
        modified,
    })
}
