//! Control commands: flow calls, context writes, sleeps

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::first_non_empty;
use crate::engine::error::StepError;
use crate::engine::registry::{Command, CommandEnv, Dispatch};
use crate::workflow::parse_params;

/// Sleep granularity for `WAIT`, so cancellation is noticed promptly
const WAIT_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCommand {
    CallFlow,
    Set,
    Wait,
}

impl ControlCommand {
    pub const ALL: [ControlCommand; 3] =
        [ControlCommand::CallFlow, ControlCommand::Set, ControlCommand::Wait];

    pub fn keyword(&self) -> &'static str {
        match self {
            ControlCommand::CallFlow => "CALL_FLOW",
            ControlCommand::Set => "SET",
            ControlCommand::Wait => "WAIT",
        }
    }
}

#[async_trait]
impl Command for ControlCommand {
    fn name(&self) -> &str {
        self.keyword()
    }

    fn locator_exempt(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        target: &str,
        data: &str,
        env: &mut CommandEnv<'_>,
    ) -> Result<Dispatch, StepError> {
        match self {
            // The executor runs the flow; parameters come from data
            ControlCommand::CallFlow => {
                let name = first_non_empty(&[target, data])
                    .ok_or_else(|| StepError::MissingParameter("flow name".to_string()))?
                    .trim()
                    .to_string();
                Ok(Dispatch::CallFlow {
                    name,
                    params: parse_params(data),
                })
            }
            ControlCommand::Set => {
                let key = target.trim();
                if key.is_empty() {
                    return Err(StepError::MissingParameter("target (context key)".to_string()));
                }
                env.context.set(key, data);
                Ok(Dispatch::Value(Value::String(data.to_string())))
            }
            ControlCommand::Wait => {
                let raw = first_non_empty(&[data, target]).unwrap_or("0").trim();
                let millis: u64 = raw.parse().map_err(|_| {
                    StepError::MissingParameter(format!("wait milliseconds (got '{}')", raw))
                })?;
                let deadline = tokio::time::Instant::now() + Duration::from_millis(millis);
                loop {
                    env.cancel.check()?;
                    let now = tokio::time::Instant::now();
                    if now >= deadline {
                        break;
                    }
                    tokio::time::sleep((deadline - now).min(WAIT_SLICE)).await;
                }
                Ok(Dispatch::Value(Value::from(millis)))
            }
        }
    }
}
