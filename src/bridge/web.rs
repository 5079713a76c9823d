//! Web/HTTP Bridge - HTTP requests executed in-process
//!
//! This bridge executes HTTP requests directly using reqwest, without
//! needing a separate process. It supports:
//! - GET, POST, PUT, PATCH, DELETE, HEAD methods
//! - Authentication (Bearer, Basic, API Key)
//! - Default headers from configuration
//! - JSON response parsing (non-JSON bodies are kept as text)
//!
//! Step-level retries are the engine's job; the bridge makes one attempt.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{ActionSurface, ApiResponse, BridgeError, HttpMethod, HttpRequest};
use crate::workflow::{WebAuthConfig, WebConfig};

#[derive(Debug)]
pub struct WebBridge {
    config: WebConfig,
    client: reqwest::Client,
}

impl WebBridge {
    pub fn new(config: WebConfig, timeout: Duration) -> Result<Self, BridgeError> {
        let mut client_builder = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::default()
            } else {
                reqwest::redirect::Policy::none()
            });

        if !config.validate_ssl {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| BridgeError::StartupFailed(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Absolute URLs pass through; anything else is joined onto `base_url`
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!("{}{}", base, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth {
            Some(WebAuthConfig::Bearer { token }) => {
                request.header("Authorization", format!("Bearer {}", token))
            }
            Some(WebAuthConfig::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            Some(WebAuthConfig::ApiKey { header, key }) => request.header(header, key),
            None => request,
        }
    }

    fn apply_headers(
        &self,
        mut request: reqwest::RequestBuilder,
        extra_headers: &HashMap<String, String>,
    ) -> reqwest::RequestBuilder {
        for (key, value) in self.config.headers.iter().chain(extra_headers) {
            request = request.header(key, value);
        }
        request
    }

    async fn execute(&self, req: &HttpRequest) -> Result<ApiResponse, BridgeError> {
        let url = self.build_url(&req.url);
        let start = Instant::now();

        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
        };

        let mut request = self.client.request(method, &url);
        request = self.apply_auth(request);
        request = self.apply_headers(request, &req.headers);
        if let Some(body) = req.body.as_ref().filter(|_| req.method.has_body()) {
            request = request.json(body);
        }

        debug!(method = %req.method, url = %url, "Executing request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BridgeError::Timeout
            } else {
                BridgeError::ServerError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body_text = response
            .text()
            .await
            .map_err(|e| BridgeError::ServerError(e.to_string()))?;
        let body = parse_body(body_text);

        info!(
            "{} {} -> {} ({}ms)",
            req.method,
            url,
            status,
            start.elapsed().as_millis()
        );

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// JSON when it parses, otherwise the raw text; empty bodies are null
fn parse_body(text: String) -> Value {
    if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    }
}

#[async_trait]
impl ActionSurface for WebBridge {
    async fn http(&self, request: &HttpRequest) -> Result<ApiResponse, BridgeError> {
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_test_config() -> WebConfig {
        WebConfig {
            base_url: "https://api.example.com".to_string(),
            ..WebConfig::default()
        }
    }

    fn bridge(config: WebConfig) -> WebBridge {
        WebBridge::new(config, Duration::from_secs(30)).unwrap()
    }

    #[test]
    fn test_build_url() {
        let bridge = bridge(make_test_config());

        assert_eq!(bridge.build_url("/users"), "https://api.example.com/users");
        assert_eq!(bridge.build_url("users"), "https://api.example.com/users");
    }

    #[test]
    fn test_build_url_with_trailing_slash() {
        let mut config = make_test_config();
        config.base_url = "https://api.example.com/".to_string();
        let bridge = bridge(config);

        assert_eq!(bridge.build_url("/users"), "https://api.example.com/users");
    }

    #[test]
    fn test_absolute_url_passes_through() {
        let bridge = bridge(make_test_config());
        assert_eq!(
            bridge.build_url("http://other.local/health"),
            "http://other.local/health"
        );
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(String::new()), Value::Null);
        assert_eq!(parse_body(r#"{"ok":true}"#.to_string()), json!({"ok": true}));
        assert_eq!(parse_body("plain".to_string()), json!("plain"));
    }

    #[test]
    fn test_config_with_auth() {
        let mut config = make_test_config();
        config.auth = Some(WebAuthConfig::Bearer {
            token: "test-token".to_string(),
        });
        let bridge = bridge(config);
        assert!(bridge.config.auth.is_some());
    }
}
