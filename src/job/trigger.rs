//! Starting a refresh job
//!
//! Triggering is not idempotent: every successful call starts a new job on
//! the server. Nothing here retries.

use crate::model::{ResourceId, ResourceKind};
use crate::outcome::ExitOutcome;
use crate::server::{Connection, ServerError};

use super::JobHandle;

/// Trigger errors
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("a refresh of {kind} '{resource_id}' is already running: {message}")]
    AlreadyRunning {
        kind: ResourceKind,
        resource_id: ResourceId,
        message: String,
    },

    #[error("refresh of {kind} '{resource_id}' is not allowed: {message}")]
    OperationNotAllowed {
        kind: ResourceKind,
        resource_id: ResourceId,
        message: String,
    },

    #[error("failed to trigger refresh of {kind} '{resource_id}': {source}")]
    Unknown {
        kind: ResourceKind,
        resource_id: ResourceId,
        #[source]
        source: ServerError,
    },
}

impl TriggerError {
    pub fn outcome(&self) -> ExitOutcome {
        match self {
            TriggerError::AlreadyRunning { .. } => ExitOutcome::AlreadyRunning,
            TriggerError::OperationNotAllowed { .. } => ExitOutcome::OperationNotAllowed,
            TriggerError::Unknown { .. } => ExitOutcome::UnknownError,
        }
    }

    fn classify(kind: ResourceKind, resource_id: &ResourceId, err: ServerError) -> Self {
        let resource_id = resource_id.clone();
        match err {
            ServerError::Conflict(message) => TriggerError::AlreadyRunning {
                kind,
                resource_id,
                message,
            },
            ServerError::NotAllowed(message) => TriggerError::OperationNotAllowed {
                kind,
                resource_id,
                message,
            },
            source => TriggerError::Unknown {
                kind,
                resource_id,
                source,
            },
        }
    }
}

/// Issue exactly one refresh request for `resource_id`
pub fn trigger(
    conn: &Connection<'_>,
    kind: ResourceKind,
    resource_id: &ResourceId,
) -> Result<JobHandle, TriggerError> {
    tracing::info!(resource_kind = %kind, resource_id = %resource_id, "triggering refresh");

    let raw = conn
        .server()
        .trigger_refresh(conn.session(), kind, resource_id)
        .map_err(|e| {
            let err = TriggerError::classify(kind, resource_id, e);
            tracing::warn!(error = %err, "trigger rejected");
            err
        })?;

    tracing::info!(job_id = %raw.id, "refresh job started");
    Ok(JobHandle::new(raw.id, kind))
}
