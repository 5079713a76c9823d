//! Condition evaluator
//!
//! A step's condition is a case-insensitive expression combining at most one
//! base keyword with an optional `RETRY(n)` anywhere in the text:
//!
//! - (none / unrecognized): always execute
//! - `IF_EXISTS`: execute when the target matches at least one element
//! - `IF_NOT_EXISTS`: execute when it matches none
//! - `WAIT_UNTIL`: block until the target exists, then execute
//!
//! `RETRY(n)` only sets the number of extra dispatch attempts. `WAIT_UNTIL`
//! polling has its own fixed cadence and is independent of it.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::cancel::CancellationFlag;
use super::error::StepError;
use crate::bridge::ActionSurface;
use crate::workflow::Timeouts;

static RETRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)RETRY\((\d+)\)").expect("retry pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionKind {
    #[default]
    Always,
    IfExists,
    IfNotExists,
    WaitUntil,
}

/// A parsed condition expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Condition {
    pub kind: ConditionKind,
    pub retry_count: u32,
}

impl Condition {
    pub fn parse(expr: Option<&str>) -> Self {
        let Some(expr) = expr.map(str::trim).filter(|e| !e.is_empty()) else {
            return Self::default();
        };
        let normalized = expr.to_uppercase();

        let retry_count = RETRY_REGEX
            .captures(&normalized)
            // Digits only, so a parse failure means the count overflowed
            .map(|caps| caps[1].parse::<u32>().unwrap_or(u32::MAX))
            .unwrap_or(0);
        let remainder = RETRY_REGEX.replace_all(&normalized, " ");

        let kind = remainder
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '|'))
            .find_map(|token| match token {
                "IF_EXISTS" => Some(ConditionKind::IfExists),
                "IF_NOT_EXISTS" => Some(ConditionKind::IfNotExists),
                "WAIT_UNTIL" => Some(ConditionKind::WaitUntil),
                _ => None,
            })
            .unwrap_or(ConditionKind::Always);

        Self { kind, retry_count }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionResult {
    pub should_execute: bool,
    pub retry_count: u32,
}

#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    /// Bound on each single existence probe
    probe_timeout: Duration,
    /// Total `WAIT_UNTIL` budget
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new(&Timeouts::default())
    }
}

impl ConditionEvaluator {
    pub fn new(timeouts: &Timeouts) -> Self {
        Self {
            probe_timeout: timeouts.condition(),
            wait_timeout: timeouts.condition(),
            poll_interval: timeouts.poll_interval(),
        }
    }

    /// Decide whether a step runs and how many retries it gets
    pub async fn evaluate(
        &self,
        expr: Option<&str>,
        target: &str,
        surface: &dyn ActionSurface,
        cancel: &CancellationFlag,
    ) -> Result<ConditionResult, StepError> {
        let condition = Condition::parse(expr);
        let should_execute = match condition.kind {
            ConditionKind::Always => true,
            ConditionKind::IfExists => self.exists(target, surface).await,
            ConditionKind::IfNotExists => !self.exists(target, surface).await,
            ConditionKind::WaitUntil => {
                self.wait_until(target, surface, cancel).await?;
                true
            }
        };

        Ok(ConditionResult {
            should_execute,
            retry_count: condition.retry_count,
        })
    }

    /// Existence probe: a blank target, a probe error, or a probe timeout all
    /// count as "does not exist"
    pub async fn exists(&self, target: &str, surface: &dyn ActionSurface) -> bool {
        if target.trim().is_empty() {
            return false;
        }
        match tokio::time::timeout(self.probe_timeout, surface.count(target)).await {
            Ok(Ok(count)) => count > 0,
            Ok(Err(e)) => {
                debug!(selector = target, error = %e, "Existence probe failed");
                false
            }
            Err(_) => {
                debug!(selector = target, "Existence probe timed out");
                false
            }
        }
    }

    /// Poll until the target exists or the budget runs out.
    /// A blank target has nothing to wait for.
    async fn wait_until(
        &self,
        target: &str,
        surface: &dyn ActionSurface,
        cancel: &CancellationFlag,
    ) -> Result<(), StepError> {
        if target.trim().is_empty() {
            return Ok(());
        }
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            cancel.check()?;
            if self.exists(target, surface).await {
                return Ok(());
            }
            if Instant::now() + self.poll_interval > deadline {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        warn!(selector = target, "WAIT_UNTIL timed out");
        Err(StepError::ConditionTimeout {
            target: target.to_string(),
            timeout_ms: self.wait_timeout.as_millis() as u64,
        })
    }
}
