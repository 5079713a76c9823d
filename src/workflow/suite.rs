//! Suite, TestCase, and Step definitions
//!
//! These types mirror the rows of a keyword-driven test sheet. They are
//! immutable once loaded; runtime state lives in [`ContextStore`](super::ContextStore).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Execute-flag values that enable a step or test case (compared uppercased)
pub const ENABLED_FLAGS: [&str; 4] = ["Y", "YES", "TRUE", "1"];

/// Returns true when an execute flag enables its row.
///
/// An absent or blank flag means "execute" for steps and test cases alike.
pub fn is_enabled(flag: Option<&str>) -> bool {
    match flag.map(str::trim) {
        None | Some("") => true,
        Some(value) => ENABLED_FLAGS.contains(&value.to_uppercase().as_str()),
    }
}

// ============================================================================
// Suite
// ============================================================================

/// A loaded suite: test cases, the step sheets they reference, and inline flows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Suite {
    /// Test cases in declared order
    #[serde(default)]
    pub testcases: Vec<TestCase>,

    /// Step sheets referenced by test cases and hooks
    #[serde(default)]
    pub sheets: HashMap<String, Vec<Step>>,

    /// Reusable flows declared inline with the suite
    #[serde(default)]
    pub flows: HashMap<String, Vec<Step>>,
}

impl Suite {
    /// Look up a step sheet by name
    pub fn sheet(&self, name: &str) -> Option<&[Step]> {
        self.sheets.get(name).map(Vec::as_slice)
    }

    /// Identifiers of every declared test case
    pub fn test_case_ids(&self) -> HashSet<String> {
        self.testcases.iter().map(|tc| tc.id.clone()).collect()
    }

    /// Iterate over every step in every sheet and inline flow
    pub fn all_steps(&self) -> impl Iterator<Item = &Step> {
        self.sheets.values().chain(self.flows.values()).flatten()
    }
}

// ============================================================================
// TestCase
// ============================================================================

/// A top-level execution unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Test case identifier (must not collide with a flow name)
    #[serde(alias = "TestCaseID")]
    pub id: String,

    /// Execute flag (Y/YES/TRUE/1)
    #[serde(default, deserialize_with = "lenient_string")]
    pub execute: Option<String>,

    /// Flow run before the step sheet
    #[serde(default, alias = "BeforeHook", deserialize_with = "lenient_string")]
    pub before_hook: Option<String>,

    /// Flow run after the step sheet
    #[serde(default, alias = "AfterHook", deserialize_with = "lenient_string")]
    pub after_hook: Option<String>,

    /// Name of the step sheet to run; defaults to the test case id
    #[serde(default, alias = "StepsSheet", deserialize_with = "lenient_string")]
    pub steps: Option<String>,
}

impl TestCase {
    pub fn is_enabled(&self) -> bool {
        is_enabled(self.execute.as_deref())
    }

    /// The step sheet this test case runs
    pub fn sheet_name(&self) -> &str {
        self.steps.as_deref().unwrap_or(&self.id)
    }
}

// ============================================================================
// Step
// ============================================================================

/// One declarative row describing a single command invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Step {
    /// Sequence label (used for artifact names)
    #[serde(default, alias = "Seq", deserialize_with = "lenient_string")]
    pub seq: Option<String>,

    /// Execute flag (Y/YES/TRUE/1); absent means execute
    #[serde(default, alias = "Execute", deserialize_with = "lenient_string")]
    pub execute: Option<String>,

    /// Command keyword, matched case-insensitively
    #[serde(alias = "COMMAND")]
    pub command: String,

    /// Target: a URL, a selector, or a symbolic `Page.Name` locator
    #[serde(default, alias = "TARGET", deserialize_with = "lenient_string")]
    pub target: Option<String>,

    /// Command data
    #[serde(default, alias = "DATA", deserialize_with = "lenient_string")]
    pub data: Option<String>,

    /// Guard expression (IF_EXISTS, IF_NOT_EXISTS, WAIT_UNTIL, RETRY(n))
    #[serde(default, alias = "CONDITION", deserialize_with = "lenient_string")]
    pub condition: Option<String>,

    /// Context key receiving the command result
    #[serde(default, alias = "STORE", deserialize_with = "lenient_string")]
    pub store: Option<String>,

    /// What to do once every attempt has failed
    #[serde(default, alias = "FailureCategory", deserialize_with = "failure_category")]
    pub failure_category: FailureCategory,
}

impl Step {
    /// Create a step with just a command, target, and data
    pub fn new(command: &str, target: &str, data: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            command: command.to_string(),
            target: non_empty(target),
            data: non_empty(data),
            ..Default::default()
        }
    }

    pub fn with_condition(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    pub fn with_store(mut self, key: &str) -> Self {
        self.store = Some(key.to_string());
        self
    }

    pub fn with_category(mut self, category: FailureCategory) -> Self {
        self.failure_category = category;
        self
    }

    pub fn with_execute(mut self, flag: &str) -> Self {
        self.execute = Some(flag.to_string());
        self
    }

    pub fn is_enabled(&self) -> bool {
        is_enabled(self.execute.as_deref())
    }

    /// Uppercased command keyword
    pub fn keyword(&self) -> String {
        self.command.trim().to_uppercase()
    }

    /// Log label `COMMAND | target | data` over the given cell values
    pub fn label(&self, target: &str, data: &str) -> String {
        format!("{} | {} | {}", self.keyword(), target, data)
    }
}

/// Partial-failure policy of a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCategory {
    /// Propagate the error and abort the remaining steps of the sheet
    #[default]
    StopOnFailure,
    /// Record the failure and continue with the next step
    ContinueOnFailure,
}

impl FailureCategory {
    /// Parse a category name; anything unrecognized stops on failure
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "CONTINUE_ON_FAILURE" | "CONTINUE" => FailureCategory::ContinueOnFailure,
            _ => FailureCategory::StopOnFailure,
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCategory::StopOnFailure => write!(f, "STOP_ON_FAILURE"),
            FailureCategory::ContinueOnFailure => write!(f, "CONTINUE_ON_FAILURE"),
        }
    }
}

/// Accept strings, numbers, and booleans; blank cells become `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cell {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    let cell = Option::<Cell>::deserialize(deserializer)?;
    Ok(cell
        .map(|cell| match cell {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Bool(b) => b.to_string(),
        })
        .filter(|s| !s.is_empty()))
}

fn failure_category<'de, D>(deserializer: D) -> Result<FailureCategory, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?
        .map(|s| FailureCategory::parse(&s))
        .unwrap_or_default())
}
