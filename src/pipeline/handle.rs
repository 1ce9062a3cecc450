//! Caller-side view of a run

use std::path::Path;
use tokio::sync::mpsc;

use crate::error::ErrorKind;
use crate::types::{AcquisitionResult, DownloadProgress, Query, RunEvent, RunId, RunState};

/// Presentation callbacks for one run
///
/// All methods default to no-ops. [`RunHandle::drive`] calls them on the task that drives the
/// handle, never on the worker, so implementations may touch UI state directly.
pub trait RunObserver {
    /// The run entered `state`
    fn on_state(&mut self, _state: RunState) {}

    /// Download progress
    fn on_progress(&mut self, _progress: &DownloadProgress) {}

    /// An existing track at `path` is being replaced
    fn on_overwrite(&mut self, _path: &Path) {}

    /// A new track landed in the library; refresh the song list
    fn on_song_list_changed(&mut self) {}

    /// The run failed
    fn on_error(&mut self, _kind: ErrorKind, _detail: &str) {}
}

/// Handle to one submitted run
///
/// Events arrive in order and end with exactly one [`RunEvent::Finished`]. Dropping the handle
/// does not stop the run.
#[derive(Debug)]
pub struct RunHandle {
    id: RunId,
    query: Query,
    events: mpsc::UnboundedReceiver<RunEvent>,
}

impl RunHandle {
    pub(crate) fn new(id: RunId, query: Query, events: mpsc::UnboundedReceiver<RunEvent>) -> Self {
        Self { id, query, events }
    }

    /// Identifier of this run
    pub fn id(&self) -> RunId {
        self.id
    }

    /// The query being acquired
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Wait for the next event; `None` once the run has finished and every event was read
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Next event if one is already queued, for UI poll loops
    pub fn try_next_event(&mut self) -> Option<RunEvent> {
        self.events.try_recv().ok()
    }

    /// Blocking variant of [`next_event`](Self::next_event) for plain threads
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_next_event(&mut self) -> Option<RunEvent> {
        self.events.blocking_recv()
    }

    /// Skip to the terminal result
    pub async fn wait(mut self) -> AcquisitionResult {
        while let Some(event) = self.events.recv().await {
            if let RunEvent::Finished { result } = event {
                return result;
            }
        }
        lost_result()
    }

    /// Deliver every event to `observer` and return the terminal result
    ///
    /// After a success `on_song_list_changed` fires once; after a failure `on_error` fires
    /// once with the failure kind and detail.
    pub async fn drive(mut self, observer: &mut dyn RunObserver) -> AcquisitionResult {
        while let Some(event) = self.events.recv().await {
            if let Some(result) = dispatch(event, observer) {
                return result;
            }
        }
        let result = lost_result();
        dispatch(
            RunEvent::Finished {
                result: result.clone(),
            },
            observer,
        );
        result
    }
}

fn dispatch(event: RunEvent, observer: &mut dyn RunObserver) -> Option<AcquisitionResult> {
    match event {
        RunEvent::StateChanged { state } => observer.on_state(state),
        RunEvent::Progress { progress } => observer.on_progress(&progress),
        RunEvent::OverwriteWarning { path } => observer.on_overwrite(&path),
        RunEvent::Finished { result } => {
            match &result {
                AcquisitionResult::Success { .. } => observer.on_song_list_changed(),
                AcquisitionResult::Failure { reason, detail } => observer.on_error(*reason, detail),
            }
            return Some(result);
        }
    }
    None
}

// Unreachable while the worker's reporter upholds its guarantee
fn lost_result() -> AcquisitionResult {
    AcquisitionResult::Failure {
        reason: ErrorKind::TransferFailed,
        detail: "run ended without reporting a result".into(),
    }
}
