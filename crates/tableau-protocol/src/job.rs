//! Job payloads returned by refresh triggers and `GET /jobs/{id}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lenient;

/// A background job as reported by the server.
///
/// `finishCode` is absent while the job is pending and is `0` (success),
/// `1` (error) or `2` (cancelled) once it finishes. Servers emit it as a
/// string on some versions and as a number on others.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub id: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, rename = "type")]
    pub job_type: Option<String>,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::opt_i64_or_string")]
    pub finish_code: Option<i64>,
}

/// `{"job": {...}}` wrapper used by every job-returning endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobEnvelope {
    pub job: JobPayload,
}

/// Empty JSON object body sent with refresh requests.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RefreshRequest {}
