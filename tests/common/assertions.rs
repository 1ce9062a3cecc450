//! Event collection and library assertions for pipeline tests

use std::path::Path;
use std::time::Duration;
use tunefetch::{AcquisitionResult, RunEvent, RunHandle, RunState};

/// Default upper bound for a mocked run
pub const RUN_TIMEOUT: Duration = Duration::from_secs(20);

/// Collect every event of a run until the channel closes
///
/// Panics if the run does not finish within [`RUN_TIMEOUT`].
pub async fn collect_events(mut handle: RunHandle) -> Vec<RunEvent> {
    tokio::time::timeout(RUN_TIMEOUT, async move {
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }
        events
    })
    .await
    .expect("run did not finish in time")
}

/// The single terminal result among `events`, asserting it is the last event
pub fn terminal(events: &[RunEvent]) -> AcquisitionResult {
    let finished: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Finished { result } => Some(result.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(finished.len(), 1, "expected exactly one Finished: {events:#?}");
    assert!(
        matches!(events.last(), Some(RunEvent::Finished { .. })),
        "Finished must be the last event: {events:#?}"
    );
    finished.into_iter().next().expect("checked above")
}

/// States visited, in order
pub fn states(events: &[RunEvent]) -> Vec<RunState> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::StateChanged { state } => Some(*state),
            _ => None,
        })
        .collect()
}

/// Progress ratios, in order
pub fn ratios(events: &[RunEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Progress { progress } => Some(progress.ratio),
            _ => None,
        })
        .collect()
}

/// Sorted file names in `dir`
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read library dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Assert no in-progress file is left in `dir`
pub fn assert_no_part_files(dir: &Path) {
    let leftovers: Vec<_> = files_in(dir)
        .into_iter()
        .filter(|n| n.ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty(), "temporary files left behind: {leftovers:?}");
}
