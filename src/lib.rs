//! tableau-refresh - Tableau job lifecycle controller
//!
//! This crate starts extract refreshes on a Tableau server and converges on
//! their outcome: it resolves a resource by name, triggers one refresh job,
//! persists the job id for a later invocation, polls until the job settles
//! or the wait budget runs out, and maps the result onto a stable exit code.

pub mod config;
pub mod job;
pub mod mock;
pub mod model;
pub mod outcome;
pub mod pipeline;
pub mod resolve;
pub mod server;
pub mod state;
pub mod timeout;

pub use job::{FinishCode, JobHandle, JobPhase, JobStatus, PollError, TriggerError};
pub use model::{JobId, ResourceId, ResourceKind, ResourceMatch, ResourceRef};
pub use outcome::{map_status, ExitOutcome};
pub use pipeline::{
    run_refresh, run_resolve, run_status_check, PipelineError, RefreshOptions, RunReport,
    StatusOptions,
};
pub use resolve::{resolve, ResolveError};
pub use server::{
    Connection, Credentials, RestConfig, RestServer, Server, ServerError, Session, SignInMethod,
};
pub use state::{HandleError, HandleStore};
pub use timeout::{Clock, ManualClock, PollPolicy, SystemClock};
