//! Configuration types for tunefetch

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Library location settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directory holding final audio files and run intermediates (default: "./data/audio")
    ///
    /// The pipeline does not create this directory; [`crate::AcquisitionPipeline::new`]
    /// checks that it exists.
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            library_dir: default_library_dir(),
        }
    }
}

/// Which catalog implementation resolves names and links
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogBackend {
    /// Invidious HTTP API
    #[default]
    Invidious,
    /// External yt-dlp binary
    YtDlp,
}

/// Catalog (search + stream resolution) settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Backend used for search and stream resolution (default: invidious)
    #[serde(default)]
    pub backend: CatalogBackend,

    /// Base URL of the Invidious instance (default: "https://yewtu.be")
    #[serde(default = "default_invidious_url")]
    pub invidious_url: String,

    /// User-Agent sent with catalog and media requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: CatalogBackend::default(),
            invidious_url: default_invidious_url(),
            user_agent: default_user_agent(),
        }
    }
}

/// Download behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Minimum time between two progress callbacks (default: 250ms)
    #[serde(default = "default_progress_interval", with = "millis_serde")]
    pub progress_interval: Duration,

    /// TCP connect timeout (default: 15s)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Abort when no bytes arrive for this long (default: 30s)
    #[serde(default = "default_stall_timeout", with = "duration_serde")]
    pub stall_timeout: Duration,

    /// Upper bound for a whole download (None = unlimited)
    #[serde(default, with = "optional_duration_serde")]
    pub overall_timeout: Option<Duration>,

    /// Check free disk space before downloading (default: true)
    #[serde(default = "default_true")]
    pub check_disk_space: bool,

    /// Free space that must remain after the download, in bytes (default: 50 MiB)
    #[serde(default = "default_min_free_space")]
    pub min_free_space: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
            connect_timeout: default_connect_timeout(),
            stall_timeout: default_stall_timeout(),
            overall_timeout: None,
            check_disk_space: true,
            min_free_space: default_min_free_space(),
        }
    }
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// LAME VBR quality passed as `-q:a`, 0 (best) to 9 (smallest) (default: 2)
    #[serde(default = "default_mp3_quality")]
    pub mp3_quality: u8,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ytdlp_path: None,
            search_path: true,
            mp3_quality: default_mp3_quality(),
        }
    }
}

impl ToolsConfig {
    /// Resolve the ffmpeg binary: explicit path first, then PATH if allowed
    pub fn resolve_ffmpeg(&self) -> Option<PathBuf> {
        resolve_binary(self.ffmpeg_path.as_deref(), "ffmpeg", self.search_path)
    }

    /// Resolve the yt-dlp binary: explicit path first, then PATH if allowed
    pub fn resolve_ytdlp(&self) -> Option<PathBuf> {
        resolve_binary(self.ytdlp_path.as_deref(), "yt-dlp", self.search_path)
    }
}

fn resolve_binary(explicit: Option<&Path>, name: &str, search_path: bool) -> Option<PathBuf> {
    if let Some(path) = explicit
        && !path.as_os_str().is_empty()
    {
        return Some(path.to_path_buf());
    }
    if search_path {
        return which::which(name).ok();
    }
    None
}

/// Main configuration for tunefetch
///
/// Fields are organized into sub-configs:
/// - [`library`](LibraryConfig): where tracks live
/// - [`catalog`](CatalogConfig): search and stream resolution backend
/// - [`transfer`](TransferConfig): progress cadence, timeouts, disk space
/// - [`tools`](ToolsConfig): external binaries
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Library location
    #[serde(default)]
    pub library: LibraryConfig,

    /// Catalog backend settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Download behavior
    #[serde(default)]
    pub transfer: TransferConfig,

    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Library directory
    pub fn library_dir(&self) -> &PathBuf {
        &self.library.library_dir
    }

    /// Check values that serde cannot reject on its own
    pub fn validate(&self) -> Result<()> {
        if self.catalog.backend == CatalogBackend::Invidious {
            let url = self.catalog.invidious_url.trim();
            if url.is_empty() {
                return Err(Error::Config {
                    message: "invidious_url must not be empty".into(),
                    key: Some("invidious_url".into()),
                });
            }
            url::Url::parse(url).map_err(|e| Error::Config {
                message: format!("invidious_url is not a valid URL: {e}"),
                key: Some("invidious_url".into()),
            })?;
        }

        if self.transfer.progress_interval.is_zero() {
            return Err(Error::Config {
                message: "progress_interval must be greater than zero".into(),
                key: Some("progress_interval".into()),
            });
        }

        if self.tools.mp3_quality > 9 {
            return Err(Error::Config {
                message: format!("mp3_quality must be 0..=9, got {}", self.tools.mp3_quality),
                key: Some("mp3_quality".into()),
            });
        }

        Ok(())
    }

    /// Load settings from a JSON file; missing fields take their defaults
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Error opening settings file");
            Error::Io(e)
        })?;

        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Error parsing settings file");
            Error::Config {
                message: format!("invalid settings file {}: {e}", path.display()),
                key: None,
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Write settings as pretty JSON, creating parent directories as needed
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, data).await.map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Error creating settings file");
            Error::Io(e)
        })
    }

    /// Load settings, or write and return the defaults if the file does not exist yet
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Self::load(path).await;
        }
        let config = Self::default();
        config.save(path).await?;
        tracing::info!(path = %path.display(), "Created default settings file");
        Ok(config)
    }
}

fn default_library_dir() -> PathBuf {
    PathBuf::from("./data/audio")
}

fn default_invidious_url() -> String {
    "https://yewtu.be".to_string()
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_progress_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_stall_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_min_free_space() -> u64 {
    50 * 1024 * 1024
}

fn default_mp3_quality() -> u8 {
    2
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
