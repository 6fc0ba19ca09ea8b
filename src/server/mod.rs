//! Remote server collaborator
//!
//! The lifecycle controller talks to the analytics server only through the
//! `Server` trait. Two implementations exist:
//! - `RestServer`: the Tableau REST API over blocking HTTP
//! - `MockServer` (in `crate::mock`): in-process double for tests

pub mod rest;
pub mod session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{JobId, ResourceId, ResourceKind, ResourceMatch};

pub use rest::{RestConfig, RestServer};
pub use session::{Connection, Credentials, Session, SignInMethod};

/// Raw trigger response: just the assigned job id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandleRaw {
    pub id: JobId,
}

/// Raw job status as the server reports it
///
/// `finish_code` is `None` while the job is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusRaw {
    pub id: JobId,
    pub finish_code: Option<i64>,
    pub progress: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Server collaborator errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServerError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("resource conflict: {0}")]
    Conflict(String),

    #[error("operation not allowed: {0}")]
    NotAllowed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ServerError {
    /// Whether the error means the session or credentials are unusable
    pub fn is_authentication(&self) -> bool {
        matches!(self, ServerError::Authentication(_))
    }

    /// Whether retrying the same request later might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ServerError::Transport(_) | ServerError::Protocol(_) => true,
            ServerError::Http { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            _ => false,
        }
    }
}

impl From<tableau_protocol::ApiError> for ServerError {
    fn from(err: tableau_protocol::ApiError) -> Self {
        use tableau_protocol::ErrorKind;

        let message = err.describe();
        match err.kind() {
            ErrorKind::Authentication => ServerError::Authentication(message),
            ErrorKind::Conflict => ServerError::Conflict(message),
            ErrorKind::NotAllowed => ServerError::NotAllowed(message),
            ErrorKind::NotFound => ServerError::NotFound(message),
            ErrorKind::Other => ServerError::Http {
                status: err.status,
                message,
            },
        }
    }
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Interface to the remote analytics server
///
/// Every call except `connect` takes the session it runs under; a session
/// is reusable for any number of calls until `disconnect`.
pub trait Server: Send + Sync {
    /// Authenticate and open a session
    fn connect(&self, credentials: &Credentials) -> ServerResult<Session>;

    /// Invalidate a session
    fn disconnect(&self, session: &Session) -> ServerResult<()>;

    /// List resources of `kind` whose name equals `name` (server-side filter)
    fn query(
        &self,
        session: &Session,
        kind: ResourceKind,
        name: &str,
    ) -> ServerResult<Vec<ResourceMatch>>;

    /// Start an asynchronous refresh job
    fn trigger_refresh(
        &self,
        session: &Session,
        kind: ResourceKind,
        id: &ResourceId,
    ) -> ServerResult<JobHandleRaw>;

    /// Fetch the current state of a job
    fn get_job_status(&self, session: &Session, job_id: &JobId) -> ServerResult<JobStatusRaw>;
}
