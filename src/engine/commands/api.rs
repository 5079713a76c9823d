//! API commands
//!
//! `API_CALL` data is either a JSON object
//! `{"method": "POST", "endpoint": "/users", "payload": {...}}` or the
//! shorthand `POST /users`. The step target supplies the default endpoint.
//! Relative endpoints are joined onto `API_BASE_URL`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{bounded, join_url};
use crate::bridge::{HttpMethod, HttpRequest};
use crate::engine::error::StepError;
use crate::engine::registry::{Command, CommandEnv, Dispatch};

pub const LAST_RESPONSE: &str = "LAST_RESPONSE";
pub const LAST_RESPONSE_JSON: &str = "LAST_RESPONSE_JSON";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCommand {
    Call,
    VerifyStatus,
    StoreResponse,
}

impl ApiCommand {
    pub const ALL: [ApiCommand; 3] = [
        ApiCommand::Call,
        ApiCommand::VerifyStatus,
        ApiCommand::StoreResponse,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            ApiCommand::Call => "API_CALL",
            ApiCommand::VerifyStatus => "VERIFY_STATUS",
            ApiCommand::StoreResponse => "STORE_RESPONSE",
        }
    }
}

/// Parsed `API_CALL` request description
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCallSpec {
    pub method: String,
    pub endpoint: String,
    pub payload: Value,
}

#[derive(Deserialize)]
struct JsonSpec {
    method: Option<String>,
    endpoint: Option<String>,
    payload: Option<Value>,
}

/// Parse `API_CALL` data. Blank data means `GET target`.
pub fn parse_api_data(target: &str, data: &str) -> Result<ApiCallSpec, StepError> {
    let mut spec = ApiCallSpec {
        method: "GET".to_string(),
        endpoint: target.trim().to_string(),
        payload: json!({}),
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(spec);
    }

    if data.starts_with('{') {
        let parsed: JsonSpec = serde_json::from_str(data)
            .map_err(|e| StepError::PayloadParseError(e.to_string()))?;
        if let Some(method) = parsed.method {
            spec.method = method;
        }
        if let Some(endpoint) = parsed.endpoint {
            spec.endpoint = endpoint;
        }
        spec.payload = parsed.payload.filter(|p| !p.is_null()).unwrap_or(spec.payload);
        return Ok(spec);
    }

    let mut parts = data.split_whitespace();
    if let Some(method) = parts.next() {
        spec.method = method.to_string();
    }
    if let Some(endpoint) = parts.next() {
        spec.endpoint = endpoint.to_string();
    }
    Ok(spec)
}

#[async_trait]
impl Command for ApiCommand {
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
            ApiCommand::Call => {
                let spec = parse_api_data(target, data)?;
                let method = HttpMethod::parse(&spec.method)
                    .ok_or_else(|| StepError::UnsupportedHttpMethod(spec.method.clone()))?;
                let url = join_url(&env.context.get_string("API_BASE_URL"), &spec.endpoint);

                let mut request = HttpRequest::new(method, url);
                if method.has_body() {
                    request = request.with_body(spec.payload);
                }

                let response =
                    bounded(self.keyword(), env.timeouts.api(), env.surface.http(&request)).await?;
                debug!(status = response.status, url = %request.url, "API response");

                let response_json = response.json();
                let response_value = serde_json::to_value(&response)
                    .map_err(|e| StepError::PayloadParseError(e.to_string()))?;
                env.context.set(LAST_RESPONSE, response_value.clone());
                env.context.set(LAST_RESPONSE_JSON, response_json);
                Ok(Dispatch::Value(response_value))
            }
            ApiCommand::VerifyStatus => {
                let response = env.context.get(LAST_RESPONSE).ok_or_else(|| {
                    StepError::AssertionFailed(
                        "No API response available for VERIFY_STATUS.".to_string(),
                    )
                })?;
                let actual = response["status"].as_u64().unwrap_or(0) as u16;
                let expected_raw = data.trim();
                let expected = if expected_raw.is_empty() {
                    200
                } else {
                    expected_raw.parse::<u16>().map_err(|_| {
                        StepError::PayloadParseError(format!(
                            "expected status '{}' is not a number",
                            expected_raw
                        ))
                    })?
                };
                if actual != expected {
                    return Err(StepError::ApiStatusMismatch { expected, actual });
                }
                Ok(Dispatch::Value(Value::from(actual)))
            }
            ApiCommand::StoreResponse => Ok(Dispatch::Value(
                env.context.get_or(LAST_RESPONSE_JSON, json!({})),
            )),
        }
    }
}
