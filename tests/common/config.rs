//! Test configuration helpers for building pipelines against mocks or a live instance

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tunefetch::{AcquisitionPipeline, Config, Transcoder, catalog};

/// Configuration pointing at `invidious_url`, storing into `library_dir`
pub fn test_config(library_dir: &std::path::Path, invidious_url: &str) -> Config {
    let mut config = Config::default();
    config.library.library_dir = library_dir.to_path_buf();
    config.catalog.invidious_url = invidious_url.to_string();
    config.transfer.progress_interval = Duration::from_millis(1);
    config.transfer.stall_timeout = Duration::from_secs(5);
    config.tools.search_path = false;
    config
}

/// Build a pipeline with the configured catalog and the given transcoder
pub fn pipeline_with(config: Config, transcoder: Arc<dyn Transcoder>) -> AcquisitionPipeline {
    let catalog = catalog::from_config(&config, reqwest::Client::new()).expect("catalog");
    AcquisitionPipeline::with_components(config, catalog, transcoder).expect("pipeline")
}

/// Pipeline over a fresh temporary library
///
/// Returns the pipeline and temp directory (keep temp_dir alive for test duration)
pub fn temp_pipeline(
    invidious_url: &str,
    transcoder: Arc<dyn Transcoder>,
) -> (AcquisitionPipeline, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let pipeline = pipeline_with(test_config(temp_dir.path(), invidious_url), transcoder);
    (pipeline, temp_dir)
}

/// Settings for tests against a real Invidious instance
///
/// Environment variables (loaded from `.env` when present):
/// - `LIVE_INVIDIOUS_URL` - Instance base URL (required)
/// - `LIVE_SEARCH_QUERY` - Song name to search (default: "Imagine Dragons Believer")
pub struct LiveSettings {
    pub invidious_url: String,
    pub query: String,
}

pub fn load_live_settings() -> Option<LiveSettings> {
    dotenvy::dotenv().ok();

    let invidious_url = std::env::var("LIVE_INVIDIOUS_URL").ok()?;
    let query = std::env::var("LIVE_SEARCH_QUERY")
        .unwrap_or_else(|_| "Imagine Dragons Believer".to_string());

    Some(LiveSettings {
        invidious_url,
        query,
    })
}
