//! Executor error types

use crate::bridge::BridgeError;
use crate::workflow::{LoadError, LocatorError};

/// Errors that fail a single step.
///
/// Every variant except [`StepError::Cancelled`] is an ordinary step failure
/// subject to retry and failure-category handling.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("InvalidCommandException: COMMAND '{0}' not found")]
    CommandNotFound(String),

    #[error("Invalid locator format '{0}'. Expected PageName.LocatorName")]
    InvalidLocatorFormat(String),

    #[error("Page not found for locator: {0}")]
    PageNotFound(String),

    #[error("Locator not found: {0}")]
    LocatorNotFound(String),

    #[error("Timed out after {timeout_ms}ms waiting for {target}")]
    ConditionTimeout { target: String, timeout_ms: u64 },

    #[error("Flow cycle detected: {}", .0.join(" -> "))]
    FlowCycleDetected(Vec<String>),

    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    #[error("Flow call depth exceeded (max {0})")]
    FlowDepthExceeded(usize),

    #[error("Flow '{0}' is a test case; calling test cases from flows is not allowed")]
    FlowToTestCallNotAllowed(String),

    #[error("{action} timed out after {timeout_ms}ms")]
    ActionTimeout { action: String, timeout_ms: u64 },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Status mismatch. Expected={expected}, Actual={actual}")]
    ApiStatusMismatch { expected: u16, actual: u16 },

    #[error("Payload parse error: {0}")]
    PayloadParseError(String),

    #[error("InvalidCommandException: HTTP method '{0}' not supported")]
    UnsupportedHttpMethod(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Step sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Run cancelled")]
    Cancelled,
}

impl From<LocatorError> for StepError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::InvalidFormat(t) => StepError::InvalidLocatorFormat(t),
            LocatorError::PageNotFound(t) => StepError::PageNotFound(t),
            LocatorError::LocatorNotFound(t) => StepError::LocatorNotFound(t),
        }
    }
}

/// Errors that stop a whole run before or outside test case execution
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run cancelled")]
    Cancelled,
}
