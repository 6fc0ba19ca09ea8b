//! Job handle persistence
//!
//! One JSON file under the artifacts root holds the most recently triggered
//! job. Single writer, single reader: last write wins.
//!
//! Path: `<artifacts_root>/tableau-blueprints/variables/job_id.json`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::job::JobHandle;
use crate::model::{JobId, ResourceKind};
use crate::outcome::ExitOutcome;

/// Schema version for job_id.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "tableau-refresh/job_handle@1";

const BLUEPRINTS_DIR: &str = "tableau-blueprints";
const VARIABLES_DIR: &str = "variables";
const HANDLE_FILE: &str = "job_id.json";

/// On-disk form of a job handle (job_id.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandleRecord {
    pub schema_version: u32,
    pub schema_id: String,
    pub job_id: JobId,
    pub resource_kind: ResourceKind,
    pub triggered_at: DateTime<Utc>,
}

impl From<&JobHandle> for HandleRecord {
    fn from(handle: &JobHandle) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            job_id: handle.job_id.clone(),
            resource_kind: handle.resource_kind,
            triggered_at: handle.triggered_at,
        }
    }
}

impl From<HandleRecord> for JobHandle {
    fn from(record: HandleRecord) -> Self {
        Self {
            job_id: record.job_id,
            resource_kind: record.resource_kind,
            triggered_at: record.triggered_at,
        }
    }
}

/// Errors for handle persistence
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("no job handle at {path}; trigger a refresh first or pass --job-id")]
    Missing { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed job handle {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("job handle {path} has schema version {found}, expected {}", SCHEMA_VERSION)]
    UnsupportedSchema { path: PathBuf, found: u32 },
}

impl HandleError {
    pub fn outcome(&self) -> ExitOutcome {
        ExitOutcome::UnknownError
    }
}

/// File-backed handle store rooted at an artifacts directory
#[derive(Debug, Clone)]
pub struct HandleStore {
    root: PathBuf,
}

impl HandleStore {
    pub fn new(artifacts_root: impl Into<PathBuf>) -> Self {
        Self {
            root: artifacts_root.into(),
        }
    }

    /// Location of the handle file
    pub fn path(&self) -> PathBuf {
        self.root
            .join(BLUEPRINTS_DIR)
            .join(VARIABLES_DIR)
            .join(HANDLE_FILE)
    }

    /// Write the handle atomically (write-then-rename), replacing any previous one
    pub fn save(&self, handle: &JobHandle) -> Result<PathBuf, HandleError> {
        let path = self.path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| HandleError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(&HandleRecord::from(handle)).map_err(|source| {
            HandleError::Json {
                path: path.clone(),
                source,
            }
        })?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json).map_err(|source| HandleError::Io {
            path: temp_path.clone(),
            source,
        })?;
        fs::rename(&temp_path, &path).map_err(|source| HandleError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(job_id = %handle.job_id, path = %path.display(), "saved job handle");
        Ok(path)
    }

    /// Read the full handle back
    pub fn load_handle(&self) -> Result<JobHandle, HandleError> {
        let path = self.path();
        let record = read_record(&path)?;
        if record.schema_version != SCHEMA_VERSION {
            return Err(HandleError::UnsupportedSchema {
                path,
                found: record.schema_version,
            });
        }
        tracing::debug!(job_id = %record.job_id, path = %path.display(), "loaded job handle");
        Ok(record.into())
    }

    /// Read back just the job id
    pub fn load(&self) -> Result<JobId, HandleError> {
        self.load_handle().map(|h| h.job_id)
    }
}

fn read_record(path: &Path) -> Result<HandleRecord, HandleError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(HandleError::Missing {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(HandleError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&json).map_err(|source| HandleError::Json {
        path: path.to_path_buf(),
        source,
    })
}
