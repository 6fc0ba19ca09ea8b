//! Outcome taxonomy and stable exit codes
//!
//! `ExitOutcome` is the only externally observable result of a lifecycle
//! run. Every error type in the crate maps onto exactly one variant, and
//! `map_status` maps a job status onto one.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::job::{
    FinishCode, JobStatus, PROGRESS_CANCELLED, PROGRESS_FAILED, PROGRESS_IN_PROGRESS,
    PROGRESS_PENDING,
};

/// Terminal result of a lifecycle run, with its process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitOutcome {
    /// Job finished successfully
    Success = 0,
    /// Anything not covered below
    UnknownError = 3,
    /// Credentials rejected or session invalid
    AuthenticationFailed = 200,
    /// Resource (or job) could not be uniquely identified
    NotFound = 201,
    /// Wait budget exhausted while the job was still pending
    Incomplete = 210,
    /// Job finished with an error
    FinalError = 211,
    /// Job was cancelled
    Cancelled = 212,
    /// A refresh of the resource is already in flight
    AlreadyRunning = 220,
    /// The server refuses this operation on the resource
    OperationNotAllowed = 221,
}

impl ExitOutcome {
    /// Every outcome, in code order
    pub const ALL: [ExitOutcome; 9] = [
        ExitOutcome::Success,
        ExitOutcome::UnknownError,
        ExitOutcome::AuthenticationFailed,
        ExitOutcome::NotFound,
        ExitOutcome::Incomplete,
        ExitOutcome::FinalError,
        ExitOutcome::Cancelled,
        ExitOutcome::AlreadyRunning,
        ExitOutcome::OperationNotAllowed,
    ];

    /// Get the integer value of the exit code
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Create from integer value
    pub fn from_i32(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|o| o.as_i32() == code)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExitOutcome::Success => "Job completed successfully",
            ExitOutcome::UnknownError => "Unknown error",
            ExitOutcome::AuthenticationFailed => "Authentication failed",
            ExitOutcome::NotFound => "Resource not found",
            ExitOutcome::Incomplete => "Job still incomplete",
            ExitOutcome::FinalError => "Job finished with an error",
            ExitOutcome::Cancelled => "Job was cancelled",
            ExitOutcome::AlreadyRunning => "A refresh is already running",
            ExitOutcome::OperationNotAllowed => "Operation not allowed",
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitOutcome::Success => "Success",
            ExitOutcome::UnknownError => "UnknownError",
            ExitOutcome::AuthenticationFailed => "AuthenticationFailed",
            ExitOutcome::NotFound => "NotFound",
            ExitOutcome::Incomplete => "Incomplete",
            ExitOutcome::FinalError => "FinalError",
            ExitOutcome::Cancelled => "Cancelled",
            ExitOutcome::AlreadyRunning => "AlreadyRunning",
            ExitOutcome::OperationNotAllowed => "OperationNotAllowed",
        };
        f.write_str(name)
    }
}

/// Map a job status to its outcome
///
/// Order matters: the server reports cancellation and failure through the
/// progress text while the finish code still says pending, so those
/// sub-states are checked before the generic incomplete case.
pub fn map_status(status: &JobStatus) -> ExitOutcome {
    let progress = status.progress.as_deref().filter(|p| !p.is_empty());

    match (status.finish_code, progress) {
        (FinishCode::Success, _) => ExitOutcome::Success,
        (FinishCode::Error, _) => ExitOutcome::FinalError,
        (FinishCode::Cancelled, _) | (FinishCode::Pending, Some(PROGRESS_CANCELLED)) => {
            ExitOutcome::Cancelled
        }
        (FinishCode::Pending, Some(PROGRESS_FAILED)) => ExitOutcome::FinalError,
        (FinishCode::Pending, None)
        | (FinishCode::Pending, Some(PROGRESS_PENDING))
        | (FinishCode::Pending, Some(PROGRESS_IN_PROGRESS)) => ExitOutcome::Incomplete,
        _ => ExitOutcome::UnknownError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JobId;

    fn status(finish_code: FinishCode, progress: Option<&str>) -> JobStatus {
        JobStatus {
            job_id: JobId::new("job-1"),
            finish_code,
            progress: progress.map(str::to_string),
            started_at: None,
        }
    }

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitOutcome::Success.as_i32(), 0);
        assert_eq!(ExitOutcome::UnknownError.as_i32(), 3);
        assert_eq!(ExitOutcome::AuthenticationFailed.as_i32(), 200);
        assert_eq!(ExitOutcome::NotFound.as_i32(), 201);
        assert_eq!(ExitOutcome::Incomplete.as_i32(), 210);
        assert_eq!(ExitOutcome::FinalError.as_i32(), 211);
        assert_eq!(ExitOutcome::Cancelled.as_i32(), 212);
        assert_eq!(ExitOutcome::AlreadyRunning.as_i32(), 220);
        assert_eq!(ExitOutcome::OperationNotAllowed.as_i32(), 221);
    }

    #[test]
    fn test_from_i32() {
        for outcome in ExitOutcome::ALL {
            assert_eq!(ExitOutcome::from_i32(outcome.as_i32()), Some(outcome));
        }
        assert_eq!(ExitOutcome::from_i32(1), None);
    }

    #[test]
    fn test_finish_code_wins_over_progress() {
        assert_eq!(
            map_status(&status(FinishCode::Success, Some("Cancelled"))),
            ExitOutcome::Success
        );
        assert_eq!(
            map_status(&status(FinishCode::Error, Some("InProgress"))),
            ExitOutcome::FinalError
        );
        assert_eq!(
            map_status(&status(FinishCode::Cancelled, None)),
            ExitOutcome::Cancelled
        );
    }

    #[test]
    fn test_pending_cancelled_is_cancelled() {
        assert_eq!(
            map_status(&status(FinishCode::Pending, Some("Cancelled"))),
            ExitOutcome::Cancelled
        );
    }

    #[test]
    fn test_pending_failed_is_final() {
        assert_eq!(
            map_status(&status(FinishCode::Pending, Some("Failed"))),
            ExitOutcome::FinalError
        );
    }

    #[test]
    fn test_pending_is_incomplete() {
        for progress in [None, Some(""), Some("Pending"), Some("InProgress")] {
            assert_eq!(
                map_status(&status(FinishCode::Pending, progress)),
                ExitOutcome::Incomplete,
                "progress {:?}",
                progress
            );
        }
    }

    #[test]
    fn test_unrecognized_is_unknown() {
        assert_eq!(
            map_status(&status(FinishCode::Other(7), None)),
            ExitOutcome::UnknownError
        );
        assert_eq!(
            map_status(&status(FinishCode::Pending, Some("Suspended"))),
            ExitOutcome::UnknownError
        );
    }
}
