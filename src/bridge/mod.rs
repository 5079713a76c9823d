//! Action surface bridges
//!
//! This module provides the automation capability set that commands
//! dispatch into:
//! - `playwright`: Browser automation via a Playwright JSON-RPC server
//! - `web`: HTTP requests via reqwest
//! - `session`: One surface composed of both halves
//!
//! Commands only ever see the [`ActionSurface`] trait. Every capability has a
//! default implementation that reports it as unsupported, so a surface only
//! implements the half it actually drives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod playwright;
pub mod rpc;
pub mod session;
pub mod web;

pub use playwright::PlaywrightBridge;
pub use session::SessionSurface;
pub use web::WebBridge;

/// Common error type for bridge operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to start server: {0}")]
    StartupFailed(String),

    #[error("Server disconnected")]
    Disconnected,

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },
}

fn unsupported(action: &str) -> BridgeError {
    BridgeError::UnsupportedAction(action.to_string())
}

// ============================================================================
// Capability vocabulary
// ============================================================================

/// Page-level navigation that takes no argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    Back,
    Reload,
}

/// Interaction with a single element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementAction {
    Click,
    DoubleClick,
    RightClick,
    Fill(String),
    Clear,
    Press(String),
    Select(String),
    Hover,
    ScrollIntoView,
}

impl ElementAction {
    pub fn name(&self) -> &'static str {
        match self {
            ElementAction::Click => "click",
            ElementAction::DoubleClick => "double_click",
            ElementAction::RightClick => "right_click",
            ElementAction::Fill(_) => "fill",
            ElementAction::Clear => "clear",
            ElementAction::Press(_) => "press",
            ElementAction::Select(_) => "select",
            ElementAction::Hover => "hover",
            ElementAction::ScrollIntoView => "scroll_into_view",
        }
    }
}

/// Explicit wait conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    Visible(String),
    Hidden(String),
    Attached(String),
    Detached(String),
    Enabled(String),
    Disabled(String),
    Text { selector: String, text: String },
    Url(String),
    LoadState(String),
}

/// Tab, window, and frame management
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowAction {
    /// Open a new tab, optionally navigating it
    NewTab(Option<String>),
    /// Switch to the tab at this index
    Switch(usize),
    /// Close the tab at this index, or the current one
    Close(Option<usize>),
    /// Enter the frame matching this selector
    Frame(String),
    MainFrame,
}

// ============================================================================
// HTTP
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
}

impl HttpMethod {
    /// Parse a method name, case-insensitively
    pub fn parse(method: &str) -> Option<Self> {
        match method.trim().to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "PATCH" => Some(HttpMethod::Patch),
            "HEAD" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
        }
    }

    /// GET and HEAD never carry a payload
    pub fn has_body(&self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// API response from HTTP requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Parsed JSON body, or the raw text as a string, or null when empty
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// The body when it is a JSON object or array, otherwise `{}`
    pub fn json(&self) -> Value {
        match &self.body {
            Value::Object(_) | Value::Array(_) => self.body.clone(),
            _ => Value::Object(Default::default()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ============================================================================
// Action surface
// ============================================================================

/// The automation capability set consumed by commands.
///
/// Implementations report failures as [`BridgeError`]; the engine bounds
/// every call with its own timeout.
#[async_trait]
pub trait ActionSurface: Send + Sync {
    async fn navigate(&self, _url: &str) -> Result<(), BridgeError> {
        Err(unsupported("navigate"))
    }

    async fn page_action(&self, _action: PageAction) -> Result<(), BridgeError> {
        Err(unsupported("page_action"))
    }

    async fn element(&self, _selector: &str, action: &ElementAction) -> Result<(), BridgeError> {
        Err(unsupported(action.name()))
    }

    async fn wait_for(
        &self,
        _condition: &WaitCondition,
        _timeout: Duration,
    ) -> Result<(), BridgeError> {
        Err(unsupported("wait_for"))
    }

    async fn text_content(&self, _selector: &str) -> Result<String, BridgeError> {
        Err(unsupported("text_content"))
    }

    async fn is_visible(&self, _selector: &str) -> Result<bool, BridgeError> {
        Err(unsupported("is_visible"))
    }

    async fn title(&self) -> Result<String, BridgeError> {
        Err(unsupported("title"))
    }

    async fn window(&self, _action: &WindowAction) -> Result<(), BridgeError> {
        Err(unsupported("window"))
    }

    /// Capture the page (or one element) to `path`; returns the written path
    async fn screenshot(
        &self,
        _path: &Path,
        _selector: Option<&str>,
    ) -> Result<PathBuf, BridgeError> {
        Err(unsupported("screenshot"))
    }

    async fn http(&self, _request: &HttpRequest) -> Result<ApiResponse, BridgeError> {
        Err(unsupported("http"))
    }

    /// Number of elements matching `selector`; used for existence probes
    async fn count(&self, _selector: &str) -> Result<usize, BridgeError> {
        Err(unsupported("count"))
    }
}

/// A surface with no capabilities; every call reports unsupported
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl ActionSurface for NullSurface {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("post"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse(" HEAD "), Some(HttpMethod::Head));
        assert_eq!(HttpMethod::parse("TRACE"), None);
        assert!(!HttpMethod::Get.has_body());
        assert!(HttpMethod::Delete.has_body());
    }

    #[test]
    fn test_api_response_json() {
        let response = ApiResponse::new(200, json!({"id": 1}));
        assert_eq!(response.json(), json!({"id": 1}));
        assert!(response.is_success());

        let response = ApiResponse::new(500, json!("Internal error"));
        assert_eq!(response.json(), json!({}));
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_null_surface_is_unsupported() {
        let surface = NullSurface;
        let err = surface
            .element("css=#x", &ElementAction::Click)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedAction(ref a) if a == "click"));
        assert!(surface.count("css=#x").await.is_err());
    }
}
