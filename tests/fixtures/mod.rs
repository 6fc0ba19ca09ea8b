//! Shared fixtures for integration tests
//!
//! - Canned REST payloads under `tests/fixtures/rest/`
//! - A mock server catalog with duplicate names across scopes
//! - Credentials and poll policies for the lifecycle tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use tableau_refresh::mock::MockServer;
use tableau_refresh::{Credentials, PollPolicy, ResourceId, SignInMethod};

/// Directory holding canned REST responses
pub fn rest_fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/rest")
}

/// Load a canned REST response body
pub fn rest_body(name: &str) -> String {
    let path = rest_fixture_dir().join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {}", path.display(), e))
}

pub fn credentials() -> Credentials {
    Credentials::new(SignInMethod::UsernamePassword, "analyst", "hunter2", "marketing")
}

/// One-second interval with a `max_wait_secs` budget
pub fn policy(max_wait_secs: u64) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_secs(1),
        max_wait: Some(Duration::from_secs(max_wait_secs)),
        failure_streak: 3,
    }
}

/// Ids of the interesting entries in `sales_catalog`
pub struct SalesCatalog {
    pub orders: ResourceId,
    pub finance_orders: ResourceId,
    pub q1: ResourceId,
    pub q1_summary: ResourceId,
    pub q2_summary: ResourceId,
    pub marketing_q1_summary: ResourceId,
}

/// A catalog where names repeat across projects and workbooks
///
/// - Sales/Orders and Finance/Orders datasources
/// - Sales/Q1 and Sales/Q2 workbooks, each with a "Summary" view
/// - Marketing/Q1 workbook, also with a "Summary" view
pub fn sales_catalog(server: &MockServer) -> SalesCatalog {
    let orders = server.add_datasource("Sales", "Orders");
    let finance_orders = server.add_datasource("Finance", "Orders");
    let q1 = server.add_workbook("Sales", "Q1");
    server.add_workbook("Sales", "Q2");
    let q1_summary = server.add_view("Sales", "Q1", "Summary");
    let q2_summary = server.add_view("Sales", "Q2", "Summary");
    let marketing_q1_summary = server.add_view("Marketing", "Q1", "Summary");

    SalesCatalog {
        orders,
        finance_orders,
        q1,
        q1_summary,
        q2_summary,
        marketing_q1_summary,
    }
}
