//! Mock Server Implementation
//!
//! In-process `Server` with a configurable catalog, scripted job
//! progressions, failure injection and per-operation call counters.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::{JobId, ResourceId, ResourceKind, ResourceMatch};
use crate::server::{
    Credentials, JobHandleRaw, JobStatusRaw, Server, ServerError, ServerResult, Session,
};

use super::failure::{FailureConfig, FailureInjector, MockOp};
use super::state::{CatalogEntry, JobStep, MockJob, MockState};

/// Number of calls received per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub connect: u32,
    pub disconnect: u32,
    pub query: u32,
    pub trigger: u32,
    pub status: u32,
}

/// Configurable mock server for testing
pub struct MockServer {
    state: Mutex<MockState>,
    failures: Mutex<FailureInjector>,
    calls: Mutex<CallCounts>,
    /// Required secret; any secret is accepted when unset
    password: Mutex<Option<String>>,
    /// Project name -> project id
    projects: Mutex<HashMap<String, String>>,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::new()),
            failures: Mutex::new(FailureInjector::new()),
            calls: Mutex::new(CallCounts::default()),
            password: Mutex::new(None),
            projects: Mutex::new(HashMap::new()),
        }
    }

    // === Public API for test configuration ===

    /// Only accept `password` as the sign-in secret
    pub fn set_password(&self, password: &str) {
        *self.password.lock().unwrap() = Some(password.to_string());
    }

    /// Id of a project, creating it on first use
    pub fn project_id(&self, project_name: &str) -> String {
        let mut projects = self.projects.lock().unwrap();
        if let Some(id) = projects.get(project_name) {
            return id.clone();
        }
        let id = self.state.lock().unwrap().next_id("project");
        projects.insert(project_name.to_string(), id.clone());
        id
    }

    /// Publish a datasource
    pub fn add_datasource(&self, project_name: &str, name: &str) -> ResourceId {
        self.add_content(ResourceKind::Datasource, project_name, name, None)
    }

    /// Publish a workbook
    pub fn add_workbook(&self, project_name: &str, name: &str) -> ResourceId {
        self.add_content(ResourceKind::Workbook, project_name, name, None)
    }

    /// Add a view to a workbook, publishing the workbook if needed
    pub fn add_view(&self, project_name: &str, workbook_name: &str, name: &str) -> ResourceId {
        let project_id = self.project_id(project_name);
        let existing = {
            let state = self.state.lock().unwrap();
            state
                .catalog
                .iter()
                .find(|e| {
                    e.kind == ResourceKind::Workbook
                        && e.item.name == workbook_name
                        && e.item.project_id == project_id
                })
                .map(|e| e.item.id.clone())
        };
        let workbook_id = match existing {
            Some(id) => id,
            None => self.add_workbook(project_name, workbook_name),
        };
        self.add_content(ResourceKind::View, project_name, name, Some(workbook_id))
    }

    fn add_content(
        &self,
        kind: ResourceKind,
        project_name: &str,
        name: &str,
        workbook_id: Option<ResourceId>,
    ) -> ResourceId {
        let project_id = self.project_id(project_name);
        let mut state = self.state.lock().unwrap();
        let id = ResourceId::new(state.next_id(kind.as_str()));
        state.catalog.push(CatalogEntry {
            kind,
            item: ResourceMatch {
                id: id.clone(),
                name: name.to_string(),
                project_id,
                // the views endpoint does not report project names
                project_name: (kind != ResourceKind::View).then(|| project_name.to_string()),
                workbook_id: workbook_id.map(|w| w.as_str().to_string()),
            },
        });
        id
    }

    /// Refuse refreshes of `id` (live connection, no extract)
    pub fn mark_not_refreshable(&self, id: &ResourceId) {
        self.state.lock().unwrap().not_refreshable.insert(id.clone());
    }

    /// Steps for the next triggered job
    pub fn queue_progression(&self, steps: Vec<JobStep>) {
        self.state.lock().unwrap().queued_progressions.push(steps);
    }

    /// Register a job that was triggered elsewhere (e.g. by an earlier process)
    pub fn add_job(&self, steps: Vec<JobStep>) -> JobId {
        let mut state = self.state.lock().unwrap();
        let id = JobId::new(state.next_id("job"));
        state.jobs.insert(id.clone(), MockJob::new(id.clone(), None, steps));
        id
    }

    /// Mark `id` as having a refresh already in flight
    pub fn start_running_job(&self, id: &ResourceId) -> JobId {
        let mut state = self.state.lock().unwrap();
        let job_id = JobId::new(state.next_id("job"));
        state.jobs.insert(
            job_id.clone(),
            MockJob::new(job_id.clone(), Some(id.clone()), vec![JobStep::in_progress()]),
        );
        job_id
    }

    /// Inject a failure for an operation
    pub fn inject_failure(&self, op: MockOp, config: FailureConfig) {
        self.failures.lock().unwrap().inject(op, config);
    }

    /// Invalidate every open session
    pub fn expire_sessions(&self) {
        self.state.lock().unwrap().sessions.clear();
    }

    /// Call counters
    pub fn calls(&self) -> CallCounts {
        *self.calls.lock().unwrap()
    }

    /// Number of jobs the server knows about
    pub fn job_count(&self) -> usize {
        self.state.lock().unwrap().jobs.len()
    }

    /// Number of sessions currently signed in
    pub fn open_sessions(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    // === Request handling ===

    fn record(&self, op: MockOp) -> ServerResult<()> {
        {
            let mut calls = self.calls.lock().unwrap();
            match op {
                MockOp::Connect => calls.connect += 1,
                MockOp::Disconnect => calls.disconnect += 1,
                MockOp::Query => calls.query += 1,
                MockOp::Trigger => calls.trigger += 1,
                MockOp::Status => calls.status += 1,
            }
        }
        match self.failures.lock().unwrap().check(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_session(state: &MockState, session: &Session) -> ServerResult<()> {
        if state.sessions.contains(&session.token) {
            Ok(())
        } else {
            Err(ServerError::Authentication(
                "Signin Error - invalid authentication credentials were provided".to_string(),
            ))
        }
    }
}

impl Server for MockServer {
    fn connect(&self, credentials: &Credentials) -> ServerResult<Session> {
        self.record(MockOp::Connect)?;

        if let Some(ref expected) = *self.password.lock().unwrap() {
            if &credentials.secret != expected {
                return Err(ServerError::Authentication(format!(
                    "Signin Error - error signing in user '{}'",
                    credentials.name
                )));
            }
        }

        let mut state = self.state.lock().unwrap();
        let token = state.next_id("token");
        state.sessions.insert(token.clone());
        let site = if credentials.site.is_empty() {
            "default"
        } else {
            credentials.site.as_str()
        };
        Ok(Session {
            token,
            site_id: format!("site-{}", site),
            user_id: Some(format!("user-{}", credentials.name)),
        })
    }

    fn disconnect(&self, session: &Session) -> ServerResult<()> {
        self.record(MockOp::Disconnect)?;
        self.state.lock().unwrap().sessions.remove(&session.token);
        Ok(())
    }

    fn query(
        &self,
        session: &Session,
        kind: ResourceKind,
        name: &str,
    ) -> ServerResult<Vec<ResourceMatch>> {
        self.record(MockOp::Query)?;
        let state = self.state.lock().unwrap();
        Self::check_session(&state, session)?;

        // name:eq filters compare case-insensitively on the server
        Ok(state
            .catalog
            .iter()
            .filter(|e| e.kind == kind && e.item.name.eq_ignore_ascii_case(name))
            .map(|e| e.item.clone())
            .collect())
    }

    fn trigger_refresh(
        &self,
        session: &Session,
        kind: ResourceKind,
        id: &ResourceId,
    ) -> ServerResult<JobHandleRaw> {
        self.record(MockOp::Trigger)?;
        let mut state = self.state.lock().unwrap();
        Self::check_session(&state, session)?;

        if !kind.is_refreshable() {
            return Err(ServerError::NotAllowed(format!(
                "extract refresh is not allowed on {}s",
                kind
            )));
        }
        if state.entry(kind, id).is_none() {
            return Err(ServerError::NotFound(format!("{} '{}' could not be found", kind, id)));
        }
        if state.not_refreshable.contains(id) {
            return Err(ServerError::NotAllowed(format!(
                "Refresh extract operation on the {} is not allowed",
                kind
            )));
        }
        if let Some(running) = state.running_job_for(id) {
            return Err(ServerError::Conflict(format!(
                "Resource Conflict - job '{}' for {} '{}' is already queued",
                running.id, kind, id
            )));
        }

        let steps = state.take_progression();
        let job_id = JobId::new(state.next_id("job"));
        state
            .jobs
            .insert(job_id.clone(), MockJob::new(job_id.clone(), Some(id.clone()), steps));
        Ok(JobHandleRaw { id: job_id })
    }

    fn get_job_status(&self, session: &Session, job_id: &JobId) -> ServerResult<JobStatusRaw> {
        self.record(MockOp::Status)?;
        let mut state = self.state.lock().unwrap();
        Self::check_session(&state, session)?;

        match state.jobs.get_mut(job_id) {
            Some(job) => Ok(job.observe()),
            None => Err(ServerError::NotFound(format!("Job '{}' could not be found", job_id))),
        }
    }
}
