//! Lifecycle orchestration
//!
//! `run_refresh` drives one refresh request end to end:
//! - Sign in
//! - Resolve the target to a resource id
//! - Trigger exactly one refresh
//! - Persist the job handle
//! - Await completion (unless status checking is deferred)
//! - Map the final status onto an `ExitOutcome`
//!
//! `run_status_check` is the decoupled second invocation: it picks up a job
//! id (given, or loaded from the persisted handle) and checks on it with a
//! fresh session. All steps of one invocation share a single session.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::job::{await_completion, poll, trigger, JobStatus, PollError, TriggerError};
use crate::model::{JobId, ResourceMatch, ResourceRef};
use crate::outcome::{map_status, ExitOutcome};
use crate::resolve::{resolve, resolve_match, ResolveError};
use crate::server::{Connection, Credentials, Server, ServerError};
use crate::state::{HandleError, HandleStore};
use crate::timeout::{Clock, PollPolicy};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("server error: {0}")]
    Server(#[from] ServerError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("cannot refresh {target}: {source}")]
    Trigger {
        target: ResourceRef,
        #[source]
        source: TriggerError,
    },

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error("job {job_id} was started but its handle was not saved: {source}")]
    HandleNotSaved {
        job_id: JobId,
        #[source]
        source: HandleError,
    },
}

impl PipelineError {
    pub fn outcome(&self) -> ExitOutcome {
        match self {
            PipelineError::Config(e) => e.outcome(),
            PipelineError::Server(e) if e.is_authentication() => ExitOutcome::AuthenticationFailed,
            PipelineError::Server(_) => ExitOutcome::UnknownError,
            PipelineError::Resolve(e) => e.outcome(),
            PipelineError::Trigger { source, .. } => source.outcome(),
            PipelineError::Poll(e) => e.outcome(),
            PipelineError::Handle(e) => e.outcome(),
            PipelineError::HandleNotSaved { source, .. } => source.outcome(),
        }
    }

    /// Job the failure concerns, if one had been identified
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            PipelineError::Poll(e) => Some(e.job_id()),
            PipelineError::HandleNotSaved { job_id, .. } => Some(job_id),
            _ => None,
        }
    }
}

/// Options for one refresh request
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub target: ResourceRef,
    /// Await completion; when false the run ends after the handle is saved
    pub check_status: bool,
    pub policy: PollPolicy,
}

/// Options for a status check on an earlier job
#[derive(Debug, Clone)]
pub struct StatusOptions {
    /// Explicit job id; the persisted handle is used when absent
    pub job_id: Option<JobId>,
    /// Await completion instead of polling once
    pub wait: bool,
    pub policy: PollPolicy,
}

/// Machine-readable result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcome: ExitOutcome,
    pub exit_code: i32,
    pub job_id: Option<JobId>,
    pub finish_code: Option<i64>,
    pub progress: Option<String>,
}

impl RunReport {
    /// Report for a job observed in `status`
    pub fn from_status(status: &JobStatus) -> Self {
        let outcome = map_status(status);
        Self {
            outcome,
            exit_code: outcome.as_i32(),
            job_id: Some(status.job_id.clone()),
            finish_code: status.finish_code.code(),
            progress: status.progress.clone(),
        }
    }

    /// Report for a job that was triggered but not awaited
    pub fn triggered(job_id: JobId) -> Self {
        Self {
            outcome: ExitOutcome::Success,
            exit_code: ExitOutcome::Success.as_i32(),
            job_id: Some(job_id),
            finish_code: None,
            progress: None,
        }
    }

    /// Report for a failed run
    pub fn from_error(err: &PipelineError) -> Self {
        let outcome = err.outcome();
        let last = match err {
            PipelineError::Poll(PollError::PersistentFailure { last_status, .. }) => {
                last_status.as_ref()
            }
            _ => None,
        };
        Self {
            outcome,
            exit_code: outcome.as_i32(),
            job_id: err.job_id().cloned(),
            finish_code: last.and_then(|s| s.finish_code.code()),
            progress: last.and_then(|s| s.progress.clone()),
        }
    }
}

/// Resolve, trigger, persist and (optionally) await one refresh
pub fn run_refresh(
    server: &dyn Server,
    credentials: &Credentials,
    options: &RefreshOptions,
    store: &HandleStore,
    clock: &dyn Clock,
) -> Result<RunReport, PipelineError> {
    let conn = Connection::open(server, credentials)?;

    let resource_id = resolve(&conn, &options.target)?;
    let handle = trigger(&conn, options.target.kind, &resource_id).map_err(|source| {
        PipelineError::Trigger {
            target: options.target.clone(),
            source,
        }
    })?;

    // The job is already running; a lost handle must not lose the job id
    if let Err(source) = store.save(&handle) {
        tracing::error!(
            job_id = %handle.job_id,
            error = %source,
            "refresh started but the job handle was not saved"
        );
        if !options.check_status {
            release(conn);
            return Err(PipelineError::HandleNotSaved {
                job_id: handle.job_id,
                source,
            });
        }
    }

    let report = if options.check_status {
        let status = await_completion(&conn, &handle.job_id, &options.policy, clock)?;
        RunReport::from_status(&status)
    } else {
        tracing::info!(job_id = %handle.job_id, "status check deferred");
        RunReport::triggered(handle.job_id)
    };

    release(conn);
    log_report(&report);
    Ok(report)
}

/// Check on a previously triggered job
pub fn run_status_check(
    server: &dyn Server,
    credentials: &Credentials,
    options: &StatusOptions,
    store: &HandleStore,
    clock: &dyn Clock,
) -> Result<RunReport, PipelineError> {
    let job_id = match &options.job_id {
        Some(id) => id.clone(),
        None => store.load()?,
    };

    let conn = Connection::open(server, credentials)?;
    let status = if options.wait {
        await_completion(&conn, &job_id, &options.policy, clock)?
    } else {
        poll(&conn, &job_id)?
    };
    release(conn);

    let report = RunReport::from_status(&status);
    log_report(&report);
    Ok(report)
}

/// Resolve `target` without triggering anything
pub fn run_resolve(
    server: &dyn Server,
    credentials: &Credentials,
    target: &ResourceRef,
) -> Result<ResourceMatch, PipelineError> {
    let conn = Connection::open(server, credentials)?;
    let found = resolve_match(&conn, target)?;
    release(conn);
    Ok(found)
}

/// Sign out; a failed sign-out does not change the run's outcome
fn release(conn: Connection<'_>) {
    if let Err(e) = conn.release() {
        tracing::warn!(error = %e, "sign-out failed");
    }
}

fn log_report(report: &RunReport) {
    tracing::info!(
        outcome = %report.outcome,
        exit_code = report.exit_code,
        job_id = report.job_id.as_ref().map(|j| j.as_str()).unwrap_or(""),
        "run finished"
    );
}
