//! # Keyword Actions
//!
//! A keyword-driven step interpreter for UI and HTTP test automation.
//!
//! Test cases are rows of `COMMAND | target | data` steps, optionally guarded
//! by a condition (`IF_EXISTS`, `IF_NOT_EXISTS`, `WAIT_UNTIL`, `RETRY(n)`) and
//! storing their result into a per-case variable context.
//!
//! ## Features
//!
//! - **Command registry** - Built-in UI, API, and control keywords; add your own
//! - **Symbolic locators** - `LoginPage.submit` resolves through a locator repository
//! - **Reusable flows** - `CALL_FLOW` with scoped parameters, cycle and depth guards
//! - **Failure policy** - `STOP_ON_FAILURE` or `CONTINUE_ON_FAILURE` per step
//! - **Placeholders** - `${NAME}` substitution from the test case context
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use keyword_actions::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::load("engine.yaml")?;
//!     let suite = SuiteLoader::load_suite(Path::new("suite.yaml"))?;
//!     let locators = SuiteLoader::load_locators(Path::new("locators.yaml"))?;
//!
//!     let surface = SessionSurface::start(&config).await?;
//!     let mut executor = Executor::new(config, Arc::new(surface)).with_locators(locators);
//!     let result = executor.run_suite(&suite).await;
//!
//!     println!("passed={} failed={}", result.passed(), result.failed());
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod engine;
pub mod workflow;

// Re-export main types
pub use bridge::{
    ActionSurface, ApiResponse, BridgeError, HttpMethod, HttpRequest, PlaywrightBridge,
    SessionSurface, WebBridge,
};
pub use engine::{
    CancellationFlag, CaseState, CaseStatus, Command, CommandEnv, CommandRegistry, Dispatch,
    Executor, ExecutorError, FailureEntry, StepError, StepOutcome, SuiteResult, TestCaseReport,
};
pub use workflow::{
    ContextStore, EngineConfig, FailureCategory, LoadError, LocatorRepository, LocatorResolver,
    Step, Suite, SuiteLoader, TestCase,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bridge::{ActionSurface, SessionSurface};
    pub use crate::engine::{
        CancellationFlag, CaseStatus, Command, CommandEnv, CommandRegistry, Dispatch, Executor,
        StepError, SuiteResult, TestCaseReport,
    };
    pub use crate::workflow::{
        ContextStore, EngineConfig, FailureCategory, LoadError, LocatorRepository, Step, Suite,
        SuiteLoader, TestCase,
    };
}
