//! Body of one run and its event reporter

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use super::state::StageEvent;
use crate::download::Downloader;
use crate::error::{Error, ErrorKind};
use crate::resolver::{NameResolver, SourceFetcher};
use crate::sanitize::sanitize;
use crate::transcode::{TranscodeOutput, TranscodeRequest, Transcoder, transcode_into_library};
use crate::types::{AcquisitionResult, DownloadProgress, Query, RunEvent, RunId, RunState, Stage};

/// Container extension used when the service reports an unusable one
const DEFAULT_CONTAINER: &str = "mp4";

/// Sends a run's events and guarantees exactly one `Finished`
///
/// If the reporter is dropped before [`finish`](Self::finish), for instance because the run
/// task panicked, it reports a failure classified by the state the run was in.
pub(crate) struct Reporter {
    run_id: RunId,
    state: RunState,
    finished: bool,
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl Reporter {
    pub(crate) fn new(run_id: RunId, tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self {
            run_id,
            state: RunState::Idle,
            finished: false,
            tx,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> RunState {
        self.state
    }

    fn send(&self, event: RunEvent) {
        // The handle may have been dropped; the run still completes
        self.tx.send(event).ok();
    }

    /// Apply `event`, emitting `StateChanged` when the state actually changes
    pub(crate) fn advance(&mut self, event: StageEvent) {
        match self.state.on(event) {
            Some(next) if next != self.state => {
                tracing::debug!(run_id = %self.run_id, from = ?self.state, to = ?next, "State changed");
                self.state = next;
                self.send(RunEvent::StateChanged { state: next });
            }
            Some(_) => {}
            None => {
                tracing::error!(
                    run_id = %self.run_id,
                    state = ?self.state,
                    event = ?event,
                    "Illegal state transition ignored"
                );
            }
        }
    }

    pub(crate) fn progress(&mut self, progress: DownloadProgress) {
        if self.state.on(StageEvent::Progress).is_some() {
            self.send(RunEvent::Progress { progress });
        }
    }

    pub(crate) fn overwrite(&self, path: PathBuf) {
        self.send(RunEvent::OverwriteWarning { path });
    }

    /// Move to `Failed(kind)`, coercing `kind` to one the current stage allows
    pub(crate) fn fail(&mut self, kind: ErrorKind) -> ErrorKind {
        let kind = match self.state.stage() {
            Some(stage) => stage.coerce(kind),
            None => kind,
        };
        self.advance(StageEvent::Fail(kind));
        kind
    }

    /// Emit the terminal event
    pub(crate) fn finish(mut self, result: AcquisitionResult) {
        self.finished = true;
        self.send(RunEvent::Finished { result });
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let detail = format!("run ended unexpectedly while {:?}", self.state).to_lowercase();
        tracing::error!(run_id = %self.run_id, state = ?self.state, "Run ended without reporting");

        let kind = match (self.state, self.state.stage()) {
            (RunState::Failed(kind), _) => kind,
            (_, Some(stage)) => self.fail(stage.fallback_failure()),
            (_, None) => ErrorKind::TransferFailed,
        };
        self.send(RunEvent::Finished {
            result: AcquisitionResult::Failure { reason: kind, detail },
        });
    }
}

/// Everything a run needs, cloned out of the pipeline for each task
#[derive(Clone)]
pub(crate) struct Worker {
    pub(crate) library_dir: PathBuf,
    pub(crate) resolver: NameResolver,
    pub(crate) fetcher: SourceFetcher,
    pub(crate) downloader: Downloader,
    pub(crate) transcoder: Arc<dyn Transcoder>,
}

/// Final identity and library file of a successful run
struct Acquired {
    identity: String,
    output: TranscodeOutput,
}

impl Worker {
    /// Run `query` to completion, reporting through `reporter`
    pub(crate) async fn execute(self, run_id: RunId, query: Query, mut reporter: Reporter) {
        let started = Instant::now();
        tracing::info!(run_id = %run_id, query = ?query, "Run started");

        let result = match self.stages(run_id, &query, &mut reporter).await {
            Ok(Acquired { identity, output }) => {
                tracing::info!(
                    run_id = %run_id,
                    path = %output.path.display(),
                    overwritten = output.overwritten,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Run finished"
                );
                AcquisitionResult::Success {
                    final_title: identity,
                    path: output.path,
                    overwritten: output.overwritten,
                }
            }
            Err((stage, err)) => {
                let (kind, detail) = err.classify(stage);
                let kind = reporter.fail(kind);
                tracing::warn!(
                    run_id = %run_id,
                    stage = ?stage,
                    kind = %kind,
                    error = %detail,
                    "Run failed"
                );
                AcquisitionResult::Failure {
                    reason: kind,
                    detail,
                }
            }
        };

        reporter.finish(result);
    }

    async fn stages(
        &self,
        run_id: RunId,
        query: &Query,
        reporter: &mut Reporter,
    ) -> std::result::Result<Acquired, (Stage, Error)> {
        let at = |stage: Stage| move |e: Error| (stage, e);

        let stream = match query {
            Query::Name(name) => {
                reporter.advance(StageEvent::SubmitName);
                let source = self
                    .resolver
                    .resolve(name)
                    .await
                    .map_err(at(Stage::Resolve))?;
                tracing::info!(run_id = %run_id, title = %source.title, url = %source.url, "Resolved");

                reporter.advance(StageEvent::Resolved);
                self.fetcher
                    .fetch_reference(&source)
                    .await
                    .map_err(at(Stage::Fetch))?
            }
            Query::Link(link) => {
                reporter.advance(StageEvent::SubmitLink);
                self.fetcher
                    .fetch_link(link)
                    .await
                    .map_err(at(Stage::Fetch))?
            }
        };

        let identity = sanitize(&stream.source.title);
        let container = container_extension(&stream.container);
        let file_name = format!("{identity}.{run_id}.{container}");
        tracing::info!(
            run_id = %run_id,
            identity = %identity,
            quality = ?stream.quality_label,
            "Downloading"
        );

        reporter.advance(StageEvent::DescriptorReady);
        let source = self
            .downloader
            .download(&stream, &self.library_dir, &file_name, &mut |p: DownloadProgress| {
                reporter.progress(p)
            })
            .await
            .map_err(at(Stage::Download))?;

        tracing::info!(run_id = %run_id, source = %source.display(), "Converting");
        reporter.advance(StageEvent::TransferComplete);

        let request = TranscodeRequest {
            source,
            library_dir: self.library_dir.clone(),
            identity: identity.clone(),
            run_id,
        };
        let output = transcode_into_library(self.transcoder.as_ref(), &request)
            .await
            .map_err(at(Stage::Convert))?;

        if output.overwritten {
            reporter.overwrite(output.path.clone());
        }
        reporter.advance(StageEvent::ConvertComplete);

        Ok(Acquired { identity, output })
    }
}

/// Lowercase alphanumeric extension, or the default when the service sent something else
fn container_extension(container: &str) -> String {
    let ext = container.trim().trim_start_matches('.').to_ascii_lowercase();
    if !ext.is_empty() && ext.len() <= 8 && ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        ext
    } else {
        DEFAULT_CONTAINER.to_string()
    }
}
