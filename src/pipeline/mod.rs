//! The acquisition pipeline
//!
//! [`AcquisitionPipeline::submit`] validates a query and spawns one task per run on the tokio
//! runtime the pipeline was built on. The run walks the state machine in [`state`]
//! (resolve, fetch, download, convert) and reports through its [`RunHandle`].
//!
//! ## Example
//!
//! ```no_run
//! use tunefetch::{AcquisitionPipeline, Config, RunEvent};
//!
//! # #[tokio::main]
//! # async fn main() -> tunefetch::Result<()> {
//! let pipeline = AcquisitionPipeline::new(Config::default())?;
//!
//! let mut run = pipeline.submit(Some("Imagine Dragons Believer"), None)?;
//! while let Some(event) = run.next_event().await {
//!     match event {
//!         RunEvent::Progress { progress } => println!("{}%", progress.percent()),
//!         RunEvent::Finished { result } => println!("{result:?}"),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod handle;
mod run;
pub mod state;

use std::path::Path;
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;

use crate::catalog::{self, Catalog};
use crate::config::Config;
use crate::download::{Downloader, http_client};
use crate::error::{Error, Result};
use crate::library::{self, Track};
use crate::resolver::{NameResolver, SourceFetcher};
use crate::transcode::{self, Transcoder};
use crate::types::{Query, RunId};

pub use handle::{RunHandle, RunObserver};
pub use state::StageEvent;

use run::{Reporter, Worker};

/// Entry point for acquiring tracks
///
/// Cheap to clone; clones share the runtime and the configured components.
#[derive(Clone)]
pub struct AcquisitionPipeline {
    config: Arc<Config>,
    worker: Worker,
    runtime: Handle,
}

impl AcquisitionPipeline {
    /// Build a pipeline from configuration
    ///
    /// The catalog backend follows `config.catalog.backend`; ffmpeg is looked up per
    /// `config.tools`, falling back to a transcoder that fails every conversion. Must be
    /// called from within a tokio runtime, whose handle runs every submitted run.
    ///
    /// # Errors
    ///
    /// `Config` if the settings are invalid, the library directory does not exist, or the
    /// yt-dlp backend is selected without a yt-dlp binary. `NotSupported` outside a
    /// multi-threaded tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = http_client(&config)?;
        let catalog = catalog::from_config(&config, client.clone())?;
        let transcoder = transcode::from_config(&config.tools);
        Self::assemble(config, client, catalog, transcoder)
    }

    /// Build a pipeline around caller-supplied catalog and transcoder implementations
    pub fn with_components(
        config: Config,
        catalog: Arc<dyn Catalog>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self> {
        config.validate()?;
        let client = http_client(&config)?;
        Self::assemble(config, client, catalog, transcoder)
    }

    fn assemble(
        config: Config,
        client: reqwest::Client,
        catalog: Arc<dyn Catalog>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| {
            Error::NotSupported("AcquisitionPipeline must be created inside a tokio runtime".into())
        })?;
        let runtime = multi_threaded(runtime)?;

        let library_dir = config.library_dir().clone();
        if !library_dir.is_dir() {
            return Err(Error::Config {
                message: format!(
                    "library directory {} does not exist",
                    library_dir.display()
                ),
                key: Some("library_dir".into()),
            });
        }

        tracing::info!(
            library_dir = %library_dir.display(),
            catalog = catalog.name(),
            transcoder = transcoder.name(),
            "Acquisition pipeline ready"
        );

        let worker = Worker {
            library_dir,
            resolver: NameResolver::new(catalog.clone()),
            fetcher: SourceFetcher::new(catalog),
            downloader: Downloader::new(client, config.transfer.clone()),
            transcoder,
        };

        Ok(Self {
            config: Arc::new(config),
            worker,
            runtime,
        })
    }

    /// Run every future submission on `runtime` instead of the one captured at construction
    ///
    /// # Errors
    ///
    /// `NotSupported` if `runtime` is a current-thread runtime.
    pub fn with_runtime(mut self, runtime: Handle) -> Result<Self> {
        self.runtime = multi_threaded(runtime)?;
        Ok(self)
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Submit a query from its two optional form fields
    ///
    /// Exactly one of `name` and `link` must be non-blank; otherwise `InvalidQuery` is returned
    /// and no run is started. Callable from any thread.
    pub fn submit(&self, name: Option<&str>, link: Option<&str>) -> Result<RunHandle> {
        let query = Query::from_fields(name, link).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected submission");
        })?;
        Ok(self.submit_query(query))
    }

    /// Start a run for an already-built query
    pub fn submit_query(&self, query: Query) -> RunHandle {
        let run_id = RunId::random();
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Reporter::new(run_id, tx);

        let worker = self.worker.clone();
        let task_query = query.clone();
        self.runtime
            .spawn(async move { worker.execute(run_id, task_query, reporter).await });

        RunHandle::new(run_id, query, rx)
    }

    /// Copy a local audio file into the library unchanged
    pub async fn import_local(&self, src: &Path) -> Result<Track> {
        library::import_local(src, &self.worker.library_dir).await
    }

    /// Tracks currently in the library, sorted by title
    pub async fn tracks(&self) -> Result<Vec<Track>> {
        library::list_tracks(&self.worker.library_dir).await
    }
}

// Spawned runs on a current-thread runtime only progress while its owner polls it
fn multi_threaded(runtime: Handle) -> Result<Handle> {
    match runtime.runtime_flavor() {
        RuntimeFlavor::CurrentThread => Err(Error::NotSupported(
            "AcquisitionPipeline needs a multi-threaded tokio runtime".into(),
        )),
        _ => Ok(runtime),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transcode::NoOpTranscoder;
    use crate::types::{SourceReference, StreamDescriptor};
    use async_trait::async_trait;
    use catalog::VideoRef;
    use tempfile::TempDir;

    struct EmptyCatalog;

    #[async_trait]
    impl Catalog for EmptyCatalog {
        async fn search_top(&self, _query: &str) -> Result<Option<SourceReference>> {
            Ok(None)
        }

        async fn fetch(&self, video: &VideoRef) -> Result<StreamDescriptor> {
            Err(Error::NotFound(format!("video {video} does not exist")))
        }

        fn name(&self) -> &'static str {
            "empty"
        }
    }

    fn pipeline(dir: &Path) -> AcquisitionPipeline {
        let mut config = Config::default();
        config.library.library_dir = dir.to_path_buf();
        AcquisitionPipeline::with_components(config, Arc::new(EmptyCatalog), Arc::new(NoOpTranscoder))
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_query_is_rejected_synchronously() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path());

        for (name, link) in [(None, None), (Some("a"), Some("b")), (Some(" "), Some(""))] {
            let err = pipeline.submit(name, link).unwrap_err();
            assert_eq!(err.kind(), Some(ErrorKind::InvalidQuery));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_library_dir_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.library.library_dir = dir.path().join("missing");

        match AcquisitionPipeline::with_components(
            config,
            Arc::new(EmptyCatalog),
            Arc::new(NoOpTranscoder),
        ) {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("library_dir")),
            Err(e) => panic!("expected Config error, got {e:?}"),
            Ok(_) => panic!("expected Config error, got a pipeline"),
        }
    }

    #[test]
    fn construction_outside_a_runtime_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.library.library_dir = dir.path().to_path_buf();

        let result = AcquisitionPipeline::with_components(
            config,
            Arc::new(EmptyCatalog),
            Arc::new(NoOpTranscoder),
        );
        assert!(matches!(result, Err(Error::NotSupported(_))));
    }

    #[test]
    fn current_thread_runtime_is_rejected() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.library.library_dir = dir.path().to_path_buf();

        let result = runtime.block_on(async {
            AcquisitionPipeline::with_components(
                config,
                Arc::new(EmptyCatalog),
                Arc::new(NoOpTranscoder),
            )
        });
        assert!(matches!(result, Err(Error::NotSupported(_))));
    }

    #[test]
    fn with_runtime_rejects_current_thread_handle() {
        let multi = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let current = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let dir = TempDir::new().unwrap();
        let pipeline = multi.block_on(async { pipeline(dir.path()) });

        assert!(matches!(
            pipeline.clone().with_runtime(current.handle().clone()),
            Err(Error::NotSupported(_))
        ));
        assert!(pipeline.with_runtime(multi.handle().clone()).is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn name_without_results_fails_not_found() {
        let dir = TempDir::new().unwrap();
        let handle = pipeline(dir.path()).submit(Some("nothing"), None).unwrap();
        let result = handle.wait().await;
        assert_eq!(result.failure_kind(), Some(ErrorKind::NotFound));
    }

    #[test]
    fn submit_works_from_a_plain_thread() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let dir = TempDir::new().unwrap();
        let pipeline = runtime.block_on(async { pipeline(dir.path()) });

        let ui_thread = std::thread::spawn(move || {
            let mut handle = pipeline.submit(None, Some("not a url")).unwrap();
            let mut last = None;
            while let Some(event) = handle.blocking_next_event() {
                last = Some(event);
            }
            last
        });

        match ui_thread.join().unwrap() {
            Some(crate::types::RunEvent::Finished { result }) => {
                assert_eq!(result.failure_kind(), Some(ErrorKind::InvalidSource));
            }
            other => panic!("expected Finished, got {other:?}"),
        }
    }
}
