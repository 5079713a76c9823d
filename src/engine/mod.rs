//! Step interpretation engine
//!
//! This module contains:
//! - `registry` - Command registry and the `Command` trait
//! - `commands` - Built-in UI, API, and control commands
//! - `condition` - Condition parsing and existence polling
//! - `flow` - Flow resolver and call-stack scoping
//! - `executor` - Per-step state machine and test case orchestration
//! - `result` - Failure entries and test case reports
//! - `error` - Step and executor error types
//! - `cancel` - Cooperative cancellation flag

pub mod cancel;
pub mod commands;
pub mod condition;
pub mod error;
pub mod executor;
pub mod flow;
pub mod registry;
pub mod result;

pub use cancel::CancellationFlag;
pub use commands::{ApiCommand, ControlCommand, UiCommand};
pub use condition::{Condition, ConditionEvaluator, ConditionKind, ConditionResult};
pub use error::{ExecutorError, StepError};
pub use executor::{CaseState, Executor};
pub use flow::{CallStack, FlowFrame, FlowResolver};
pub use registry::{Command, CommandEnv, CommandRegistry, Dispatch};
pub use result::{
    root_cause, safe_name, summarize_error, CaseStatus, FailureEntry, StepOutcome, SuiteResult,
    TestCaseReport,
};
