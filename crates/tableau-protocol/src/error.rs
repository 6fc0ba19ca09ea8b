//! Error bodies returned by the REST API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inner `error` element of a failed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ErrorDetail {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub code: String,
}

/// `{"error": {...}}` body of a failed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Coarse classification of a failed request.
///
/// These are the categories the lifecycle controller reacts to; anything
/// else is reported verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Credentials rejected or session token no longer valid.
    Authentication,
    /// Another operation already holds the resource (e.g. a refresh in flight).
    Conflict,
    /// The operation is not permitted on this resource.
    NotAllowed,
    /// The addressed resource or job does not exist.
    NotFound,
    /// Any other failure.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::NotAllowed => write!(f, "NOT_ALLOWED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// A failed REST call: HTTP status plus whatever error body came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub detail: ErrorDetail,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.describe())
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Build from a status code and raw response body.
    ///
    /// Bodies that are not a JSON error envelope are kept as the detail text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed.error,
            Err(_) => ErrorDetail {
                summary: String::new(),
                detail: body.trim().to_string(),
                code: String::new(),
            },
        };
        Self { status, detail }
    }

    /// Classify the failure.
    ///
    /// Precedence: authentication (401), conflict (409 or a "Resource
    /// Conflict" summary), not-allowed (message text), not-found (404).
    pub fn kind(&self) -> ErrorKind {
        let summary = self.detail.summary.to_ascii_lowercase();
        let detail = self.detail.detail.to_ascii_lowercase();

        if self.status == 401 {
            return ErrorKind::Authentication;
        }
        if self.status == 409 || summary.contains("resource conflict") {
            return ErrorKind::Conflict;
        }
        if summary.contains("not allowed") || detail.contains("not allowed") {
            return ErrorKind::NotAllowed;
        }
        if self.status == 404 {
            return ErrorKind::NotFound;
        }
        ErrorKind::Other
    }

    /// Single-line human description.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.detail.summary.is_empty() {
            parts.push(self.detail.summary.clone());
        }
        if !self.detail.detail.is_empty() {
            parts.push(self.detail.detail.clone());
        }
        let text = if parts.is_empty() {
            "no error details".to_string()
        } else {
            parts.join(" - ")
        };
        if self.detail.code.is_empty() {
            text
        } else {
            format!("{} (code {})", text, self.detail.code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(summary: &str, detail: &str, code: &str) -> String {
        serde_json::json!({
            "error": {"summary": summary, "detail": detail, "code": code}
        })
        .to_string()
    }

    #[test]
    fn test_unauthorized() {
        let err =
            ApiError::from_response(401, &body("Signin Error", "Invalid credentials", "401001"));
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_conflict_by_status() {
        let err = ApiError::from_response(
            409,
            &body("Resource Conflict", "Job for 'Orders' is already queued", "409093"),
        );
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_conflict_by_summary() {
        let err = ApiError::from_response(400, &body("Resource Conflict", "", ""));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_not_allowed() {
        let err = ApiError::from_response(
            403,
            &body(
                "Forbidden",
                "Refresh extract operation on the datasource is not allowed.",
                "403075",
            ),
        );
        assert_eq!(err.kind(), ErrorKind::NotAllowed);
    }

    #[test]
    fn test_not_found() {
        let err = ApiError::from_response(
            404,
            &body("Resource Not Found", "Job 'x' could not be found.", "404031"),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_non_json_body_is_kept() {
        let err = ApiError::from_response(502, "<html>Bad Gateway</html>\n");
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.detail.detail, "<html>Bad Gateway</html>");
        assert_eq!(err.to_string(), "HTTP 502: <html>Bad Gateway</html>");
    }

    #[test]
    fn test_describe_includes_code() {
        let err = ApiError::from_response(500, &body("Internal Error", "boom", "500000"));
        assert_eq!(err.describe(), "Internal Error - boom (code 500000)");
    }
}
