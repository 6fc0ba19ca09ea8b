//! Job status polling
//!
//! `poll` is a single status query. `await_completion` re-polls at a fixed
//! interval until the job reaches a terminal phase or the wait budget is
//! spent. On timeout it returns the last observed status and leaves the
//! verdict to `outcome::map_status`.
//!
//! Transient query failures (transport, 5xx, malformed body) are absorbed
//! and the job is treated as still pending; `failure_streak` consecutive
//! failures abort the wait. Authentication and not-found errors abort
//! immediately since retrying cannot fix them.

use crate::model::JobId;
use crate::outcome::ExitOutcome;
use crate::server::{Connection, ServerError};
use crate::timeout::{Clock, PollPolicy, WaitEnforcer};

use super::JobStatus;

/// Polling errors
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("status query for job {job_id} failed: {source}")]
    Query {
        job_id: JobId,
        #[source]
        source: ServerError,
    },

    #[error(
        "status query for job {job_id} failed {attempts} times in a row (last observed: {}): {last_error}",
        describe_last(.last_status)
    )]
    PersistentFailure {
        job_id: JobId,
        attempts: u32,
        last_error: ServerError,
        last_status: Option<JobStatus>,
    },
}

fn describe_last(status: &Option<JobStatus>) -> String {
    match status {
        Some(s) => format!(
            "{}, progress {}",
            s.finish_code,
            s.progress.as_deref().unwrap_or("unset")
        ),
        None => "nothing".to_string(),
    }
}

impl PollError {
    pub fn outcome(&self) -> ExitOutcome {
        match self {
            PollError::Query { source, .. } => match source {
                ServerError::Authentication(_) => ExitOutcome::AuthenticationFailed,
                ServerError::NotFound(_) => ExitOutcome::NotFound,
                _ => ExitOutcome::UnknownError,
            },
            PollError::PersistentFailure { .. } => ExitOutcome::UnknownError,
        }
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            PollError::Query { job_id, .. } | PollError::PersistentFailure { job_id, .. } => job_id,
        }
    }
}

/// Query the job once
pub fn poll(conn: &Connection<'_>, job_id: &JobId) -> Result<JobStatus, PollError> {
    let raw = conn
        .server()
        .get_job_status(conn.session(), job_id)
        .map_err(|source| PollError::Query {
            job_id: job_id.clone(),
            source,
        })?;
    Ok(JobStatus::from(raw))
}

/// Poll until the job is terminal or `policy.max_wait` elapses
pub fn await_completion(
    conn: &Connection<'_>,
    job_id: &JobId,
    policy: &PollPolicy,
    clock: &dyn Clock,
) -> Result<JobStatus, PollError> {
    let enforcer = WaitEnforcer::start(*policy, clock);
    let mut last_status: Option<JobStatus> = None;
    let mut streak = 0u32;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match poll(conn, job_id) {
            Ok(status) => {
                streak = 0;
                let phase = status.phase();
                tracing::info!(
                    job_id = %job_id,
                    attempt,
                    phase = %phase,
                    finish_code = %status.finish_code,
                    progress = status.progress.as_deref().unwrap_or(""),
                    "job status"
                );
                if phase.is_terminal() {
                    return Ok(status);
                }
                last_status = Some(status);
            }
            Err(PollError::Query { source, .. }) if source.is_transient() => {
                streak += 1;
                tracing::warn!(
                    job_id = %job_id,
                    attempt,
                    streak,
                    error = %source,
                    "status query failed, treating job as pending"
                );
                if streak >= policy.failure_streak {
                    return Err(PollError::PersistentFailure {
                        job_id: job_id.clone(),
                        attempts: streak,
                        last_error: source,
                        last_status,
                    });
                }
            }
            Err(e) => return Err(e),
        }

        // every pause is followed by a poll, the last one at the deadline
        let pause = match enforcer.next_pause() {
            Some(pause) => pause,
            None => break,
        };
        clock.sleep(pause);
    }

    tracing::info!(
        job_id = %job_id,
        polls = attempt,
        elapsed_secs = enforcer.elapsed().as_secs(),
        "wait budget exhausted before the job finished"
    );
    Ok(last_status.unwrap_or_else(|| JobStatus::not_started(job_id.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FinishCode, JobPhase};
    use crate::mock::{FailureConfig, JobStep, MockOp, MockServer};
    use crate::outcome::map_status;
    use crate::server::{Credentials, SignInMethod};
    use crate::timeout::ManualClock;
    use std::time::Duration;

    fn creds() -> Credentials {
        Credentials::new(SignInMethod::UsernamePassword, "u", "p", "")
    }

    fn policy(interval: u64, max_wait: u64) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(interval),
            max_wait: Some(Duration::from_secs(max_wait)),
            failure_streak: 3,
        }
    }

    #[test]
    fn test_single_poll() {
        let server = MockServer::new();
        let job = server.add_job(vec![JobStep::in_progress()]);
        let conn = Connection::open(&server, &creds()).unwrap();

        let status = poll(&conn, &job).unwrap();
        assert_eq!(status.phase(), JobPhase::InProgress);
        assert_eq!(server.calls().status, 1);
    }

    #[test]
    fn test_unknown_job_is_not_found() {
        let server = MockServer::new();
        let conn = Connection::open(&server, &creds()).unwrap();

        let err = poll(&conn, &JobId::new("nope")).unwrap_err();
        assert_eq!(err.outcome(), ExitOutcome::NotFound);
    }

    #[test]
    fn test_await_until_success() {
        let server = MockServer::new();
        let job = server.add_job(vec![
            JobStep::queued(),
            JobStep::in_progress(),
            JobStep::succeeded(),
        ]);
        let conn = Connection::open(&server, &creds()).unwrap();
        let clock = ManualClock::new();

        let status = await_completion(&conn, &job, &policy(5, 60), &clock).unwrap();
        assert_eq!(status.finish_code, FinishCode::Success);
        assert_eq!(server.calls().status, 3);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5); 2]);
    }

    #[test]
    fn test_await_times_out_after_polling_at_deadline() {
        let server = MockServer::new();
        let job = server.add_job(vec![JobStep::in_progress()]);
        let conn = Connection::open(&server, &creds()).unwrap();
        let clock = ManualClock::new();

        let status = await_completion(&conn, &job, &policy(1, 3), &clock).unwrap();
        // t = 0, 1, 2, 3
        assert_eq!(server.calls().status, 4);
        assert_eq!(map_status(&status), ExitOutcome::Incomplete);
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn test_job_finishing_in_last_interval_is_seen() {
        let server = MockServer::new();
        let job = server.add_job(vec![JobStep::in_progress(), JobStep::succeeded()]);
        let conn = Connection::open(&server, &creds()).unwrap();
        let clock = ManualClock::new();

        let status = await_completion(&conn, &job, &policy(60, 60), &clock).unwrap();
        assert_eq!(map_status(&status), ExitOutcome::Success);
        assert_eq!(server.calls().status, 2);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(60)]);
    }

    #[test]
    fn test_last_pause_is_capped_to_deadline() {
        let server = MockServer::new();
        let job = server.add_job(vec![JobStep::in_progress()]);
        let conn = Connection::open(&server, &creds()).unwrap();
        let clock = ManualClock::new();

        await_completion(&conn, &job, &policy(4, 10), &clock).unwrap();
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(4), Duration::from_secs(4), Duration::from_secs(2)]
        );
        assert_eq!(server.calls().status, 4);
    }

    #[test]
    fn test_zero_budget_polls_once() {
        let server = MockServer::new();
        let job = server.add_job(vec![JobStep::queued()]);
        let conn = Connection::open(&server, &creds()).unwrap();
        let clock = ManualClock::new();

        let status = await_completion(&conn, &job, &policy(10, 0), &clock).unwrap();
        assert_eq!(status.phase(), JobPhase::NotStarted);
        assert_eq!(server.calls().status, 1);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_pending_cancelled_stops_polling() {
        let server = MockServer::new();
        let job = server.add_job(vec![JobStep::in_progress(), JobStep::pending("Cancelled")]);
        let conn = Connection::open(&server, &creds()).unwrap();
        let clock = ManualClock::new();

        let status = await_completion(&conn, &job, &policy(1, 600), &clock).unwrap();
        assert_eq!(map_status(&status), ExitOutcome::Cancelled);
        assert_eq!(server.calls().status, 2);
    }

    #[test]
    fn test_unrecognized_finish_code_stops_polling() {
        let server = MockServer::new();
        let job = server.add_job(vec![JobStep::finished(5)]);
        let conn = Connection::open(&server, &creds()).unwrap();
        let clock = ManualClock::new();

        let status = await_completion(&conn, &job, &policy(1, 600), &clock).unwrap();
        assert_eq!(status.finish_code, FinishCode::Other(5));
        assert_eq!(map_status(&status), ExitOutcome::UnknownError);
        assert_eq!(server.calls().status, 1);
    }

    #[test]
    fn test_transient_failure_is_absorbed() {
        let server = MockServer::new();
        let job = server.add_job(vec![JobStep::succeeded()]);
        server.inject_failure(
            MockOp::Status,
            FailureConfig::transport("connection reset").with_fail_count(2),
        );
        let conn = Connection::open(&server, &creds()).unwrap();
        let clock = ManualClock::new();

        let status = await_completion(&conn, &job, &policy(1, 600), &clock).unwrap();
        assert_eq!(status.finish_code, FinishCode::Success);
        assert_eq!(server.calls().status, 3);
    }

    #[test]
    fn test_persistent_failure_escalates() {
        let server = MockServer::new();
        let job = server.add_job(vec![JobStep::in_progress()]);
        let conn = Connection::open(&server, &creds()).unwrap();
        let clock = ManualClock::new();

        // one good observation first, then the server goes away
        let first = poll(&conn, &job).unwrap();
        assert_eq!(first.phase(), JobPhase::InProgress);
        server.inject_failure(MockOp::Status, FailureConfig::http(503, "unavailable"));

        let err = await_completion(&conn, &job, &policy(1, 600), &clock).unwrap_err();
        match &err {
            PollError::PersistentFailure {
                attempts,
                last_status,
                ..
            } => {
                assert_eq!(*attempts, 3);
                assert!(last_status.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(err.outcome(), ExitOutcome::UnknownError);
        assert_eq!(server.calls().status, 4);
    }

    #[test]
    fn test_failure_streak_resets_on_success() {
        let server = MockServer::new();
        let job = server.add_job(vec![
            JobStep::in_progress(),
            JobStep::in_progress(),
            JobStep::succeeded(),
        ]);
        let conn = Connection::open(&server, &creds()).unwrap();
        let clock = ManualClock::new();

        server.inject_failure(MockOp::Status, FailureConfig::transport("reset").with_fail_count(2));
        let mut p = policy(1, 600);
        p.failure_streak = 3;
        let status = await_completion(&conn, &job, &p, &clock).unwrap();
        assert_eq!(status.finish_code, FinishCode::Success);
    }

    #[test]
    fn test_authentication_failure_aborts() {
        let server = MockServer::new();
        let job = server.add_job(vec![JobStep::in_progress()]);
        let conn = Connection::open(&server, &creds()).unwrap();
        server.expire_sessions();
        let clock = ManualClock::new();

        let err = await_completion(&conn, &job, &policy(1, 600), &clock).unwrap_err();
        assert_eq!(err.outcome(), ExitOutcome::AuthenticationFailed);
        assert_eq!(server.calls().status, 1);
    }
}
