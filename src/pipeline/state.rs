//! Run state machine
//!
//! [`RunState::on`] is the only way a run changes state. It returns `None` for any event the
//! current state does not accept, including every event once the run is terminal.

use crate::error::ErrorKind;
use crate::types::{RunState, Stage};

/// Something that happened to a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageEvent {
    /// A name query was submitted
    SubmitName,
    /// A link query was submitted
    SubmitLink,
    /// Name search produced a source
    Resolved,
    /// Stream descriptor selected
    DescriptorReady,
    /// Bytes arrived
    Progress,
    /// Download finished
    TransferComplete,
    /// Audio committed to the library
    ConvertComplete,
    /// The current stage failed
    Fail(ErrorKind),
}

impl RunState {
    /// The state reached by applying `event`, or `None` if the transition is illegal
    pub fn on(self, event: StageEvent) -> Option<RunState> {
        use RunState::*;
        use StageEvent::*;

        match (self, event) {
            (Idle, SubmitName) => Some(Resolving),
            (Idle, SubmitLink) => Some(Fetching),

            (Resolving, Resolved) => Some(Fetching),
            (Fetching, DescriptorReady) => Some(Downloading),
            (Downloading, Progress) => Some(Downloading),
            (Downloading, TransferComplete) => Some(Converting),
            (Converting, ConvertComplete) => Some(Done),

            (state, Fail(kind)) => state
                .stage()
                .filter(|stage| stage.allows(kind))
                .map(|_| Failed(kind)),

            _ => None,
        }
    }

    /// Whether the run has ended
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed(_))
    }

    /// The stage a working state belongs to
    pub fn stage(self) -> Option<Stage> {
        match self {
            RunState::Resolving => Some(Stage::Resolve),
            RunState::Fetching => Some(Stage::Fetch),
            RunState::Downloading => Some(Stage::Download),
            RunState::Converting => Some(Stage::Convert),
            RunState::Idle | RunState::Done | RunState::Failed(_) => None,
        }
    }
}

impl Stage {
    /// Failure kinds a run may end with while in this stage
    pub fn allowed_failures(self) -> &'static [ErrorKind] {
        match self {
            Stage::Resolve => &[ErrorKind::NotFound, ErrorKind::TransferFailed],
            Stage::Fetch => &[
                ErrorKind::InvalidSource,
                ErrorKind::NotFound,
                ErrorKind::TransferFailed,
            ],
            Stage::Download => &[ErrorKind::TransferFailed, ErrorKind::StorageFailed],
            Stage::Convert => &[ErrorKind::TranscodeFailed],
        }
    }

    /// Whether `kind` is a legal failure of this stage
    pub fn allows(self, kind: ErrorKind) -> bool {
        self.allowed_failures().contains(&kind)
    }

    /// Kind used when a failure does not fit this stage, or a run ends without reporting
    pub fn fallback_failure(self) -> ErrorKind {
        match self {
            Stage::Resolve | Stage::Fetch | Stage::Download => ErrorKind::TransferFailed,
            Stage::Convert => ErrorKind::TranscodeFailed,
        }
    }

    /// `kind` if legal here, otherwise the stage's fallback
    pub fn coerce(self, kind: ErrorKind) -> ErrorKind {
        if self.allows(kind) {
            kind
        } else {
            self.fallback_failure()
        }
    }
}
