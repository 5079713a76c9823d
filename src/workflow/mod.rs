//! Suite types and definitions
//!
//! This module contains all types for defining and loading keyword suites:
//! - `suite` - Suite, TestCase, Step, and FailureCategory
//! - `context` - ContextStore for per-case runtime state
//! - `expressions` - `${NAME}` substitution and flow-parameter parsing
//! - `locator` - Locator repository and `Page.Name` resolution
//! - `loader` - Load suites, flow libraries, and locator repositories
//! - `config` - Engine configuration and environments
//! - `platform` - Action surface configurations

pub mod config;
pub mod context;
pub mod expressions;
pub mod loader;
pub mod locator;
pub mod platform;
pub mod suite;

// Re-export all public types for convenience
pub use config::{EngineConfig, Environment, Timeouts};
pub use context::{value_to_string, ContextStore, Snapshot};
pub use expressions::{parse_params, substitute};
pub use loader::{LoadError, SuiteLoader};
pub use locator::{
    has_selector_prefix, split_symbolic, to_selector, LocatorEntry, LocatorError, LocatorRepository,
    LocatorResolver,
};
pub use platform::{
    BrowserType, PlatformsConfig, PlaywrightConfig, Viewport, WebAuthConfig, WebConfig,
};
pub use suite::{is_enabled, FailureCategory, Step, Suite, TestCase};
