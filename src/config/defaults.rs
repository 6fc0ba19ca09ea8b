//! Built-in defaults (layer 1)
//!
//! Hardcoded defaults for all configuration values.

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Seconds between status queries (default: 10)
    pub interval_seconds: u64,

    /// Wait budget in seconds, 0 = unbounded (default: 3600)
    pub max_wait_seconds: u64,

    /// Consecutive failed status queries tolerated (default: 3)
    pub failure_streak: u32,

    /// Per-request HTTP timeout in seconds (default: 60)
    pub request_timeout_seconds: u64,

    /// Page size for catalog queries (default: 100)
    pub page_size: u32,

    /// Sign-in method (default: "username_password")
    pub sign_in_method: String,

    /// Site content URL (default: "", the default site)
    pub site: String,

    /// Artifacts root (default: "<$USER>-artifacts")
    pub artifacts_root: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        let user = std::env::var("USER").unwrap_or_default();
        Self {
            interval_seconds: 10,
            max_wait_seconds: 3600,
            failure_streak: 3,
            request_timeout_seconds: 60,
            page_size: 100,
            sign_in_method: "username_password".to_string(),
            site: String::new(),
            artifacts_root: format!("{}-artifacts", user),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "server": {
                "site": self.site,
                "request_timeout_seconds": self.request_timeout_seconds,
                "page_size": self.page_size
            },
            "auth": {
                "method": self.sign_in_method
            },
            "poll": {
                "interval_seconds": self.interval_seconds,
                "max_wait_seconds": self.max_wait_seconds,
                "failure_streak": self.failure_streak
            },
            "artifacts": {
                "root": self.artifacts_root
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.interval_seconds, 10);
        assert_eq!(defaults.max_wait_seconds, 3600);
        assert_eq!(defaults.failure_streak, 3);
        assert_eq!(defaults.request_timeout_seconds, 60);
        assert_eq!(defaults.sign_in_method, "username_password");
        assert!(defaults.artifacts_root.ends_with("-artifacts"));
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();
        assert_eq!(value["poll"]["interval_seconds"], 10);
        assert_eq!(value["server"]["site"], "");
        assert_eq!(value["auth"]["method"], "username_password");
        assert!(value["server"].get("url").is_none());
    }
}
