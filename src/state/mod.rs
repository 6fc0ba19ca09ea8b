//! Durable state shared between process invocations
//!
//! The only state that outlives a process is the job handle written by a
//! triggering invocation and read back by a later status check.

mod job_handle;

pub use job_handle::{HandleError, HandleRecord, HandleStore, SCHEMA_ID, SCHEMA_VERSION};

