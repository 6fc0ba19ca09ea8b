//! Jobs: handles, observed status and lifecycle phase
//!
//! A `JobHandle` is created once by the trigger and is the only thing that
//! survives across process invocations. A `JobStatus` is produced fresh by
//! every poll.

pub mod poll;
pub mod trigger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{JobId, ResourceKind};
use crate::server::JobStatusRaw;

pub use poll::{await_completion, poll, PollError};
pub use trigger::{trigger, TriggerError};

/// Progress text of a job waiting in the queue
pub const PROGRESS_PENDING: &str = "Pending";
/// Progress text of a running job
pub const PROGRESS_IN_PROGRESS: &str = "InProgress";
/// Progress text of a job cancelled before a finish code was set
pub const PROGRESS_CANCELLED: &str = "Cancelled";
/// Progress text of a job that failed before a finish code was set
pub const PROGRESS_FAILED: &str = "Failed";

/// Reference to a triggered job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: JobId,
    pub resource_kind: ResourceKind,
    pub triggered_at: DateTime<Utc>,
}

impl JobHandle {
    pub fn new(job_id: JobId, resource_kind: ResourceKind) -> Self {
        Self {
            job_id,
            resource_kind,
            triggered_at: Utc::now(),
        }
    }
}

/// Finish code reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishCode {
    /// No finish code yet
    Pending,
    /// 0
    Success,
    /// 1
    Error,
    /// 2
    Cancelled,
    /// Any other value
    Other(i64),
}

impl FinishCode {
    pub fn from_raw(code: Option<i64>) -> Self {
        match code {
            None => FinishCode::Pending,
            Some(0) => FinishCode::Success,
            Some(1) => FinishCode::Error,
            Some(2) => FinishCode::Cancelled,
            Some(other) => FinishCode::Other(other),
        }
    }

    /// Numeric code as the server reports it
    pub fn code(&self) -> Option<i64> {
        match self {
            FinishCode::Pending => None,
            FinishCode::Success => Some(0),
            FinishCode::Error => Some(1),
            FinishCode::Cancelled => Some(2),
            FinishCode::Other(code) => Some(*code),
        }
    }
}

impl fmt::Display for FinishCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishCode::Pending => write!(f, "pending"),
            FinishCode::Success => write!(f, "success"),
            FinishCode::Error => write!(f, "error"),
            FinishCode::Cancelled => write!(f, "cancelled"),
            FinishCode::Other(code) => write!(f, "unknown({})", code),
        }
    }
}

/// Lifecycle phase derived from finish code, progress and start time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// Queued, no start time yet
    NotStarted,
    /// Started, no finish code yet
    InProgress,
    Succeeded,
    Failed,
    Cancelled,
    /// Finish code the controller does not recognize
    Unknown,
}

impl JobPhase {
    /// Returns true if no further transition is expected
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobPhase::NotStarted | JobPhase::InProgress)
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobPhase::NotStarted => "not_started",
            JobPhase::InProgress => "in_progress",
            JobPhase::Succeeded => "succeeded",
            JobPhase::Failed => "failed",
            JobPhase::Cancelled => "cancelled",
            JobPhase::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One observation of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub job_id: JobId,
    pub finish_code: FinishCode,
    /// Free-text sub-state
    pub progress: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    /// Status of a job nothing is known about yet
    pub fn not_started(job_id: JobId) -> Self {
        Self {
            job_id,
            finish_code: FinishCode::Pending,
            progress: None,
            started_at: None,
        }
    }

    pub fn phase(&self) -> JobPhase {
        match self.finish_code {
            FinishCode::Success => JobPhase::Succeeded,
            FinishCode::Error => JobPhase::Failed,
            FinishCode::Cancelled => JobPhase::Cancelled,
            FinishCode::Other(_) => JobPhase::Unknown,
            FinishCode::Pending => match self.progress.as_deref() {
                Some(PROGRESS_CANCELLED) => JobPhase::Cancelled,
                Some(PROGRESS_FAILED) => JobPhase::Failed,
                _ if self.started_at.is_none() => JobPhase::NotStarted,
                _ => JobPhase::InProgress,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }
}

impl From<JobStatusRaw> for JobStatus {
    fn from(raw: JobStatusRaw) -> Self {
        Self {
            job_id: raw.id,
            finish_code: FinishCode::from_raw(raw.finish_code),
            progress: raw.progress,
            started_at: raw.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: Option<i64>, progress: Option<&str>, started: bool) -> JobStatus {
        JobStatus::from(JobStatusRaw {
            id: JobId::new("job-1"),
            finish_code: code,
            progress: progress.map(str::to_string),
            started_at: started.then(Utc::now),
        })
    }

    #[test]
    fn test_finish_code_from_raw() {
        assert_eq!(FinishCode::from_raw(None), FinishCode::Pending);
        assert_eq!(FinishCode::from_raw(Some(0)), FinishCode::Success);
        assert_eq!(FinishCode::from_raw(Some(1)), FinishCode::Error);
        assert_eq!(FinishCode::from_raw(Some(2)), FinishCode::Cancelled);
        assert_eq!(FinishCode::from_raw(Some(9)), FinishCode::Other(9));
        assert_eq!(FinishCode::Other(9).code(), Some(9));
        assert_eq!(FinishCode::Pending.code(), None);
    }

    #[test]
    fn test_pending_phases() {
        assert_eq!(status(None, None, false).phase(), JobPhase::NotStarted);
        assert_eq!(status(None, Some("InProgress"), true).phase(), JobPhase::InProgress);
        assert_eq!(status(None, Some("Cancelled"), true).phase(), JobPhase::Cancelled);
        assert_eq!(status(None, Some("Failed"), false).phase(), JobPhase::Failed);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(status(Some(0), None, true).is_terminal());
        assert!(status(Some(1), None, true).is_terminal());
        assert!(status(Some(2), None, true).is_terminal());
        assert!(status(Some(42), None, true).is_terminal());
        assert!(status(None, Some("Cancelled"), true).is_terminal());
        assert!(!status(None, Some("InProgress"), true).is_terminal());
        assert!(!status(None, None, false).is_terminal());
    }

    #[test]
    fn test_handle_serializes() {
        let handle = JobHandle::new(JobId::new("job-9"), ResourceKind::Workbook);
        let json = serde_json::to_value(&handle).unwrap();
        assert_eq!(json["job_id"], "job-9");
        assert_eq!(json["resource_kind"], "workbook");
    }
}
