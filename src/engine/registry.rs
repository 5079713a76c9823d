//! Command registry
//!
//! Maps uppercased command keywords to handlers. Built-in commands are
//! registered once at startup; callers may add or replace handlers before a
//! run. Re-registering a name replaces the prior handler.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::cancel::CancellationFlag;
use super::commands;
use super::error::StepError;
use crate::bridge::ActionSurface;
use crate::workflow::{ContextStore, Timeouts};

/// What a command asks the executor to do once it returns
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The command finished; the value is stored when the step has `store`
    Value(Value),
    /// Run a flow with scoped parameters; the flow name is the step result
    CallFlow {
        name: String,
        params: Vec<(String, String)>,
    },
}

impl Dispatch {
    pub fn unit() -> Self {
        Dispatch::Value(Value::Null)
    }
}

impl From<Value> for Dispatch {
    fn from(value: Value) -> Self {
        Dispatch::Value(value)
    }
}

/// Everything a command may touch while it runs
pub struct CommandEnv<'a> {
    pub context: &'a mut ContextStore,
    pub surface: &'a dyn ActionSurface,
    pub timeouts: &'a Timeouts,
    pub artifacts_dir: &'a Path,
    pub cancel: &'a CancellationFlag,
}

/// A uniformly typed executable action
#[async_trait]
pub trait Command: Send + Sync {
    /// Canonical keyword
    fn name(&self) -> &str;

    /// Targets of exempt commands are never resolved as `Page.Name` locators
    fn locator_exempt(&self) -> bool {
        false
    }

    /// Run with the resolved target and data
    async fn execute(
        &self,
        target: &str,
        data: &str,
        env: &mut CommandEnv<'_>,
    ) -> Result<Dispatch, StepError>;
}

#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in command
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, handler) in commands::builtins() {
            registry.register(name, handler);
        }
        registry
    }

    /// Store `handler` under the uppercased `name`, returning any handler it
    /// replaced
    pub fn register(
        &mut self,
        name: impl AsRef<str>,
        handler: Arc<dyn Command>,
    ) -> Option<Arc<dyn Command>> {
        self.commands
            .insert(name.as_ref().trim().to_uppercase(), handler)
    }

    /// Register a handler under its own name
    pub fn register_command(&mut self, handler: impl Command + 'static) -> Option<Arc<dyn Command>> {
        let name = handler.name().to_string();
        self.register(name, Arc::new(handler))
    }

    /// Look up a handler case-insensitively
    pub fn get(&self, name: &str) -> Result<Arc<dyn Command>, StepError> {
        let key = name.trim().to_uppercase();
        self.commands
            .get(&key)
            .cloned()
            .ok_or(StepError::CommandNotFound(key))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.trim().to_uppercase())
    }

    /// Registered keywords, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl Command for Echo {
        fn name(&self) -> &str {
            "ECHO"
        }

        async fn execute(
            &self,
            _target: &str,
            _data: &str,
            _env: &mut CommandEnv<'_>,
        ) -> Result<Dispatch, StepError> {
            Ok(Dispatch::Value(json!(self.0)))
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = CommandRegistry::new();
        registry.register("echo", Arc::new(Echo("first")));

        assert!(registry.get("Echo").is_ok());
        assert!(registry.contains("ECHO"));
        assert_eq!(registry.names(), vec!["ECHO"]);
    }

    #[test]
    fn test_missing_command() {
        let registry = CommandRegistry::new();
        let err = registry.get("fly").err().unwrap();
        assert!(matches!(err, StepError::CommandNotFound(ref n) if n == "FLY"));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = CommandRegistry::new();
        assert!(registry.register_command(Echo("first")).is_none());
        let replaced = registry.register("ECHO", Arc::new(Echo("second")));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_builtins_registered() {
        let registry = CommandRegistry::with_builtins();
        for name in ["OPEN_URL", "CLICK", "TYPE", "FILL_TEXT", "API_CALL", "CALL_FLOW", "SET"] {
            assert!(registry.contains(name), "{} missing", name);
        }
        assert!(registry.get("open_url").unwrap().locator_exempt());
        assert!(!registry.get("click").unwrap().locator_exempt());
    }

    #[test]
    fn test_non_element_commands_are_locator_exempt() {
        let registry = CommandRegistry::with_builtins();
        for name in ["API_CALL", "CALL_FLOW", "SET", "WAIT", "VERIFY_TITLE", "SWITCH_WINDOW"] {
            assert!(registry.get(name).unwrap().locator_exempt(), "{} resolves locators", name);
        }
        for name in ["TYPE", "VERIFY_TEXT", "WAIT_FOR_VISIBLE", "SWITCH_TO_FRAME"] {
            assert!(!registry.get(name).unwrap().locator_exempt(), "{} skips locators", name);
        }
    }
}
