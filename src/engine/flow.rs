//! Flow resolver and call-stack scoping
//!
//! A flow call is guarded four ways, checked in this order: the flow must not
//! already be on the call stack, must not share a name with a test case, must
//! exist, and the stack must be shallower than the depth limit.
//!
//! [`FlowFrame`] is the scope of one flow invocation: it pushes the flow name
//! and applies the call parameters on entry, and pops and restores them when
//! dropped, whichever way the flow exits.

use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use tracing::warn;

use super::error::StepError;
use super::executor::CaseState;
use crate::workflow::{Snapshot, Step};

/// Flow names currently executing, outermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<String>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame == name)
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn current(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }

    pub(crate) fn push(&mut self, name: &str) {
        self.frames.push(name.to_string());
    }

    pub(crate) fn pop(&mut self) -> Option<String> {
        self.frames.pop()
    }
}

#[derive(Debug, Clone)]
pub struct FlowResolver {
    flows: HashMap<String, Vec<Step>>,
    test_ids: HashSet<String>,
    max_depth: usize,
}

impl Default for FlowResolver {
    fn default() -> Self {
        Self::new(HashMap::new(), HashSet::new(), 3)
    }
}

impl FlowResolver {
    pub fn new(
        flows: HashMap<String, Vec<Step>>,
        test_ids: HashSet<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            flows,
            test_ids,
            max_depth,
        }
    }

    /// Merge a flow library with flows declared inline in a suite.
    /// Inline flows win on a name clash.
    pub fn merged(
        library: &HashMap<String, Vec<Step>>,
        inline: &HashMap<String, Vec<Step>>,
        test_ids: HashSet<String>,
        max_depth: usize,
    ) -> Self {
        let mut flows = library.clone();
        for (name, steps) in inline {
            if flows.insert(name.clone(), steps.clone()).is_some() {
                warn!(flow = %name, "Inline flow overrides library flow");
            }
        }
        Self::new(flows, test_ids, max_depth)
    }

    /// Look up a flow for invocation from the current call stack
    pub fn get_flow(&self, name: &str, stack: &CallStack) -> Result<&[Step], StepError> {
        if stack.contains(name) {
            let mut cycle = stack.frames().to_vec();
            cycle.push(name.to_string());
            return Err(StepError::FlowCycleDetected(cycle));
        }
        if self.test_ids.contains(name) {
            return Err(StepError::FlowToTestCallNotAllowed(name.to_string()));
        }
        let steps = self
            .flows
            .get(name)
            .ok_or_else(|| StepError::FlowNotFound(name.to_string()))?;
        if stack.depth() >= self.max_depth {
            return Err(StepError::FlowDepthExceeded(self.max_depth));
        }
        Ok(steps)
    }
}

/// Scope of one flow invocation over the case state
pub struct FlowFrame<'s> {
    state: &'s mut CaseState,
    snapshot: Option<Snapshot>,
}

impl<'s> FlowFrame<'s> {
    /// Push `name` and set each parameter, remembering prior values
    pub fn enter(state: &'s mut CaseState, name: &str, params: &[(String, String)]) -> Self {
        let snapshot = state
            .context
            .snapshot(params.iter().map(|(key, _)| key.as_str()));
        for (key, value) in params {
            state.context.set(key.clone(), value.clone());
        }
        state.stack.push(name);
        Self {
            state,
            snapshot: Some(snapshot),
        }
    }
}

impl Deref for FlowFrame<'_> {
    type Target = CaseState;

    fn deref(&self) -> &CaseState {
        self.state
    }
}

impl DerefMut for FlowFrame<'_> {
    fn deref_mut(&mut self) -> &mut CaseState {
        self.state
    }
}

impl Drop for FlowFrame<'_> {
    fn drop(&mut self) {
        self.state.stack.pop();
        if let Some(snapshot) = self.snapshot.take() {
            self.state.context.restore(snapshot);
        }
    }
}
