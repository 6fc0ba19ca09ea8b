//! Failure Injection for the Mock Server
//!
//! Supports configurable failure injection for testing error paths.

use std::collections::HashMap;

use crate::server::ServerError;

/// Server operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Connect,
    Disconnect,
    Query,
    Trigger,
    Status,
}

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Error to return
    pub error: ServerError,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Create a config that returns `error`
    pub fn error(error: ServerError) -> Self {
        Self {
            error,
            fail_count: None,
        }
    }

    /// Connection-level failure (timeout, reset, DNS)
    pub fn transport(message: impl Into<String>) -> Self {
        Self::error(ServerError::Transport(message.into()))
    }

    /// HTTP failure with a status code
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::error(ServerError::Http {
            status,
            message: message.into(),
        })
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

/// Failure injector for the mock server
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<MockOp, FailureConfig>,
    call_counts: HashMap<MockOp, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for an operation, resetting its fail counter
    pub fn inject(&mut self, op: MockOp, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    /// Error to return for this call of `op`, if any
    pub fn check(&mut self, op: MockOp) -> Option<ServerError> {
        let config = self.configs.get(&op)?;
        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;

        if let Some(limit) = config.fail_count {
            if *count > limit {
                return None;
            }
        }
        Some(config.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injector_basic() {
        let mut injector = FailureInjector::new();
        assert!(injector.check(MockOp::Status).is_none());

        injector.inject(MockOp::Trigger, FailureConfig::http(500, "boom"));
        let err = injector.check(MockOp::Trigger).unwrap();
        assert!(matches!(err, ServerError::Http { status: 500, .. }));
        // other operations unaffected
        assert!(injector.check(MockOp::Query).is_none());
    }

    #[test]
    fn test_injector_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject(MockOp::Status, FailureConfig::transport("reset").with_fail_count(2));

        assert!(injector.check(MockOp::Status).is_some());
        assert!(injector.check(MockOp::Status).is_some());
        assert!(injector.check(MockOp::Status).is_none());
        assert!(injector.check(MockOp::Status).is_none());
    }
}
