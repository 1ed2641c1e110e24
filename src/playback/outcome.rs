use serde::Serialize;
use std::time::Duration as StdDuration;

use crate::process::ProcessError;

/// Progress notification emitted once per feedback tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackFeedback {
    pub elapsed: StdDuration,
}

impl PlaybackFeedback {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// How a supervised playback ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackOutcome {
    Succeeded { total_time: StdDuration },
    /// The player failed on its own; `reason` carries its captured output.
    Failed { reason: String },
    /// Cancelled by request or superseded by a newer playback.
    Cancelled,
}

impl PlaybackOutcome {
    pub fn spawn_failed(err: &ProcessError) -> Self {
        PlaybackOutcome::Failed {
            reason: err.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlaybackOutcome::Cancelled)
    }
}

/// Terminal result as sent to the requester.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub preempted: bool,
}

impl From<&PlaybackOutcome> for PlaybackResult {
    fn from(outcome: &PlaybackOutcome) -> Self {
        match outcome {
            PlaybackOutcome::Succeeded { total_time } => PlaybackResult {
                success: true,
                total_time: Some(total_time.as_secs_f64()),
                reason: None,
                preempted: false,
            },
            PlaybackOutcome::Failed { reason } => PlaybackResult {
                success: false,
                total_time: None,
                reason: Some(reason.clone()),
                preempted: false,
            },
            PlaybackOutcome::Cancelled => PlaybackResult {
                success: false,
                total_time: None,
                reason: None,
                preempted: true,
            },
        }
    }
}
