//! Operation lifecycle phases
//!
//! Every request moves through the same ordered phases. Observers get one
//! notification per transition, which is enough to drive a progress bar or
//! a status line without coupling the pipeline to any UI.

use serde::Serialize;
use tracing::info;

/// Where a request currently is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Analyzing,
    RetrievingContext,
    AwaitingModel,
    Parsing,
    Validating,
    AwaitingConfirmation,
    Executing,
    Reindexing,
    Done,
    Failed,
}

impl Phase {
    /// Rough completion fraction for progress display.
    pub fn progress(&self) -> f32 {
        match self {
            Self::Analyzing => 0.05,
            Self::RetrievingContext => 0.15,
            Self::AwaitingModel => 0.30,
            Self::Parsing => 0.60,
            Self::Validating => 0.70,
            Self::AwaitingConfirmation => 0.75,
            Self::Executing => 0.85,
            Self::Reindexing => 0.95,
            Self::Done | Self::Failed => 1.0,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Analyzing => "Analyzing request",
            Self::RetrievingContext => "Gathering relevant code",
            Self::AwaitingModel => "Waiting for model response",
            Self::Parsing => "Parsing response",
            Self::Validating => "Validating proposed actions",
            Self::AwaitingConfirmation => "Awaiting confirmation",
            Self::Executing => "Applying changes",
            Self::Reindexing => "Updating index",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }
}

/// Receives one call per phase transition. Implementations must be cheap;
/// the pipeline calls them inline.
pub trait ProgressObserver: Send + Sync {
    fn on_phase(&self, phase: Phase);
}

/// Default observer, reports transitions through the log stream.
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_phase(&self, phase: Phase) {
        info!(
            phase = ?phase,
            progress = phase.progress(),
            "{}",
            phase.describe()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let order = [
            Phase::Analyzing,
            Phase::RetrievingContext,
            Phase::AwaitingModel,
            Phase::Parsing,
            Phase::Validating,
            Phase::AwaitingConfirmation,
            Phase::Executing,
            Phase::Reindexing,
            Phase::Done,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].progress() < pair[1].progress() || pair[1] == Phase::Done);
        }
        assert_eq!(Phase::Done.progress(), 1.0);
        assert_eq!(Phase::Failed.progress(), 1.0);
    }
}
