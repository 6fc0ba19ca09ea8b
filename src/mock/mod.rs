//! Mock Server Implementation
//!
//! In-process stand-in for the analytics server, used by unit and
//! integration tests of the lifecycle controller.
//!
//! # Capabilities
//!
//! - Catalog of datasources, workbooks and views grouped into projects
//! - Scripted job progressions (`JobStep` sequences, last step repeats)
//! - Conflict and not-allowed responses on trigger
//! - Failure injection per operation with an optional fail count
//! - Call counters for asserting how often each operation ran

mod failure;
mod server;
mod state;

pub use failure::{FailureConfig, FailureInjector, MockOp};
pub use server::{CallCounts, MockServer};
pub use state::{CatalogEntry, JobStep, MockJob, MockState};
