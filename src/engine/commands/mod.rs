//! Built-in commands
//!
//! Each group is one tagged enum behind the [`Command`] trait:
//! - `ui` - navigation, element interaction, waits, assertions, tabs, screenshots
//! - `api` - HTTP calls and response checks
//! - `control` - flow calls, context writes, sleeps

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::error::StepError;
use super::registry::Command;
use crate::bridge::BridgeError;

pub mod api;
pub mod control;
pub mod ui;

pub use self::api::ApiCommand;
pub use self::control::ControlCommand;
pub use self::ui::UiCommand;

/// Every built-in handler with the name it is registered under
pub fn builtins() -> Vec<(&'static str, Arc<dyn Command>)> {
    let mut commands: Vec<(&'static str, Arc<dyn Command>)> = Vec::new();
    for command in UiCommand::ALL {
        commands.push((command.keyword(), Arc::new(command)));
    }
    commands.push(("FILL_TEXT", Arc::new(UiCommand::Type)));
    for command in ApiCommand::ALL {
        commands.push((command.keyword(), Arc::new(command)));
    }
    for command in ControlCommand::ALL {
        commands.push((command.keyword(), Arc::new(command)));
    }
    commands
}

/// Run a surface call under `timeout`.
///
/// Both the local deadline and a timeout reported by the bridge surface as
/// `ActionTimeout`.
pub async fn bounded<T, F>(action: &str, timeout: Duration, fut: F) -> Result<T, StepError>
where
    F: Future<Output = Result<T, BridgeError>>,
{
    let timed_out = || StepError::ActionTimeout {
        action: action.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    };
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(BridgeError::Timeout)) | Err(_) => Err(timed_out()),
        Ok(Err(e)) => Err(e.into()),
    }
}

/// Join a relative path onto a base URL; absolute URLs pass through
pub fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", &base[..base.len() - 1], path),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// First non-empty of the given values
pub(crate) fn first_non_empty<'a>(values: &[&'a str]) -> Option<&'a str> {
    values.iter().copied().find(|v| !v.trim().is_empty())
}

/// `value`, or `MissingParameter(name)` when it is blank
pub(crate) fn require<'a>(value: &'a str, name: &str) -> Result<&'a str, StepError> {
    if value.trim().is_empty() {
        Err(StepError::MissingParameter(name.to_string()))
    } else {
        Ok(value)
    }
}
