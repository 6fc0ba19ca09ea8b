//! Tableau REST API wire types
//!
//! Serde models for the JSON payloads exchanged with a Tableau Server or
//! Tableau Cloud site, plus classification of the error bodies the server
//! returns.

pub mod auth;
pub mod catalog;
pub mod error;
pub mod job;
mod lenient;

pub use auth::{SignInRequest, SignInResponse, ServerInfoResponse};
pub use catalog::{DatasourceList, Pagination, ViewList, WorkbookList};
pub use error::{ApiError, ErrorBody, ErrorKind};
pub use job::{JobEnvelope, JobPayload};

/// API version used for the unauthenticated server-info probe.
///
/// `serverinfo` exists since 2.4, so it is the floor every server answers.
pub const SERVER_INFO_API_VERSION: &str = "2.4";

/// Header carrying the session token on authenticated requests.
pub const AUTH_HEADER: &str = "X-Tableau-Auth";

/// Largest page size the REST API accepts for list queries.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Build a `name:eq:<value>` filter expression for list endpoints.
pub fn name_filter(name: &str) -> String {
    format!("name:eq:{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_filter() {
        assert_eq!(name_filter("Sales Extract"), "name:eq:Sales Extract");
    }
}
