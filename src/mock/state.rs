//! Mock Server State Management
//!
//! Catalog contents, scripted jobs and live sessions for the mock server.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::model::{JobId, ResourceId, ResourceKind, ResourceMatch};
use crate::server::JobStatusRaw;

/// One scripted observation of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStep {
    pub finish_code: Option<i64>,
    pub progress: Option<String>,
    /// Whether the job reports a start time at this step
    pub started: bool,
}

impl JobStep {
    /// Queued, not yet picked up by a backgrounder
    pub fn queued() -> Self {
        Self {
            finish_code: None,
            progress: None,
            started: false,
        }
    }

    /// Running
    pub fn in_progress() -> Self {
        Self::pending("InProgress")
    }

    /// Still flagged pending, with an arbitrary progress text
    pub fn pending(progress: &str) -> Self {
        Self {
            finish_code: None,
            progress: Some(progress.to_string()),
            started: true,
        }
    }

    pub fn succeeded() -> Self {
        Self::finished(0)
    }

    pub fn failed() -> Self {
        Self::finished(1)
    }

    pub fn cancelled() -> Self {
        Self::finished(2)
    }

    /// Finished with any finish code
    pub fn finished(code: i64) -> Self {
        Self {
            finish_code: Some(code),
            progress: Some("100".to_string()),
            started: true,
        }
    }

    /// Whether the mock regards the job as no longer running
    pub fn is_finished(&self) -> bool {
        self.finish_code.is_some()
            || matches!(self.progress.as_deref(), Some("Cancelled") | Some("Failed"))
    }
}

/// A job held by the mock server
#[derive(Debug, Clone)]
pub struct MockJob {
    pub id: JobId,
    pub resource_id: Option<ResourceId>,
    /// Remaining steps; the last one repeats forever
    pub steps: Vec<JobStep>,
    /// Index of the step the next status call returns
    pub cursor: usize,
    pub created_at: DateTime<Utc>,
}

impl MockJob {
    pub fn new(id: JobId, resource_id: Option<ResourceId>, steps: Vec<JobStep>) -> Self {
        let steps = if steps.is_empty() {
            vec![JobStep::succeeded()]
        } else {
            steps
        };
        Self {
            id,
            resource_id,
            steps,
            cursor: 0,
            created_at: Utc::now(),
        }
    }

    /// Step the next status call will observe
    pub fn current(&self) -> &JobStep {
        let idx = self.cursor.min(self.steps.len() - 1);
        &self.steps[idx]
    }

    /// Observe the current step and advance
    pub fn observe(&mut self) -> JobStatusRaw {
        let step = self.current().clone();
        if self.cursor < self.steps.len() {
            self.cursor += 1;
        }
        JobStatusRaw {
            id: self.id.clone(),
            finish_code: step.finish_code,
            progress: step.progress,
            started_at: step.started.then_some(self.created_at),
        }
    }

    /// Whether the job still occupies its resource
    pub fn is_running(&self) -> bool {
        !self.current().is_finished()
    }
}

/// A catalog entry
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub kind: ResourceKind,
    pub item: ResourceMatch,
}

/// Mock server state container
#[derive(Debug, Default)]
pub struct MockState {
    pub catalog: Vec<CatalogEntry>,
    pub jobs: HashMap<JobId, MockJob>,
    /// Tokens of open sessions
    pub sessions: HashSet<String>,
    /// Resources whose refresh the server refuses
    pub not_refreshable: HashSet<ResourceId>,
    /// Steps given to the next triggered jobs, consumed in order
    pub queued_progressions: Vec<Vec<JobStep>>,
    /// Steps given to triggered jobs when nothing is queued
    pub default_progression: Vec<JobStep>,
    id_counter: u64,
}

impl MockState {
    pub fn new() -> Self {
        Self {
            default_progression: vec![
                JobStep::queued(),
                JobStep::in_progress(),
                JobStep::succeeded(),
            ],
            ..Self::default()
        }
    }

    /// Generate a unique ID
    pub fn next_id(&mut self, prefix: &str) -> String {
        self.id_counter += 1;
        format!("{}-{:08x}", prefix, self.id_counter)
    }

    /// Progression for the next triggered job
    pub fn take_progression(&mut self) -> Vec<JobStep> {
        if self.queued_progressions.is_empty() {
            self.default_progression.clone()
        } else {
            self.queued_progressions.remove(0)
        }
    }

    /// A job still running against `resource`, if any
    pub fn running_job_for(&self, resource: &ResourceId) -> Option<&MockJob> {
        self.jobs
            .values()
            .find(|j| j.resource_id.as_ref() == Some(resource) && j.is_running())
    }

    /// Catalog lookup by id
    pub fn entry(&self, kind: ResourceKind, id: &ResourceId) -> Option<&CatalogEntry> {
        self.catalog
            .iter()
            .find(|e| e.kind == kind && &e.item.id == id)
    }
}
