//! Playwright Bridge - Communication with Playwright via JSON-RPC
//!
//! Starts a Node.js Playwright server, launches one browser with one page,
//! and tracks the open tabs so tab management can switch between them.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use super::rpc::{self, RequestSender};
use super::{ActionSurface, BridgeError, ElementAction, PageAction, WaitCondition, WindowAction};
use crate::workflow::PlaywrightConfig;

#[derive(Debug, Default)]
struct Tabs {
    pages: Vec<String>,
    current: usize,
}

impl Tabs {
    fn current(&self) -> Result<&str, BridgeError> {
        self.pages
            .get(self.current)
            .map(String::as_str)
            .ok_or_else(|| BridgeError::ServerError("No open page".to_string()))
    }
}

pub struct PlaywrightBridge {
    request_tx: RequestSender,
    browser_id: String,
    tabs: RwLock<Tabs>,
    _child: Child,
}

impl PlaywrightBridge {
    /// Spawn the server, launch the browser, and open the first page
    pub async fn start(config: &PlaywrightConfig) -> Result<Self, BridgeError> {
        let node = which::which("node")
            .map_err(|e| BridgeError::StartupFailed(format!("node not found: {}", e)))?;

        let mut child = Command::new(node)
            .arg(&config.server)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::StartupFailed(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::StartupFailed("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::StartupFailed("stdout not captured".to_string()))?;

        let (request_tx, request_rx) = mpsc::channel(100);
        rpc::spawn_communication_task(request_rx, stdin, stdout);

        let viewport = config
            .viewport
            .as_ref()
            .map(|v| json!({ "width": v.width, "height": v.height }));
        let launched = rpc::send_request(
            &request_tx,
            "browser.launch",
            json!({
                "browserType": config.browser.as_str(),
                "headless": config.headless,
                "viewport": viewport,
            }),
        )
        .await?;
        let browser_id = string_field(&launched, "browserId")?;

        let page = rpc::send_request(&request_tx, "page.new", json!({ "browserId": browser_id }))
            .await?;
        let page_id = string_field(&page, "pageId")?;

        info!(
            browser = config.browser.as_str(),
            headless = config.headless,
            "Playwright browser launched"
        );

        Ok(Self {
            request_tx,
            browser_id,
            tabs: RwLock::new(Tabs {
                pages: vec![page_id],
                current: 0,
            }),
            _child: child,
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        debug!(method, "playwright request");
        rpc::send_request(&self.request_tx, method, params).await
    }

    async fn page_id(&self) -> Result<String, BridgeError> {
        Ok(self.tabs.read().await.current()?.to_string())
    }

    /// Request against the current page
    async fn page_request(&self, method: &str, mut params: Value) -> Result<Value, BridgeError> {
        params["pageId"] = Value::String(self.page_id().await?);
        self.request(method, params).await
    }

    pub async fn close(&self) -> Result<(), BridgeError> {
        self.request("browser.close", json!({ "browserId": self.browser_id }))
            .await?;
        Ok(())
    }
}

fn string_field(value: &Value, field: &str) -> Result<String, BridgeError> {
    value[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| BridgeError::ServerError(format!("No {} returned", field)))
}

#[async_trait]
impl ActionSurface for PlaywrightBridge {
    async fn navigate(&self, url: &str) -> Result<(), BridgeError> {
        self.page_request("page.goto", json!({ "url": url })).await?;
        Ok(())
    }

    async fn page_action(&self, action: PageAction) -> Result<(), BridgeError> {
        let method = match action {
            PageAction::Back => "page.goBack",
            PageAction::Reload => "page.reload",
        };
        self.page_request(method, json!({})).await?;
        Ok(())
    }

    async fn element(&self, selector: &str, action: &ElementAction) -> Result<(), BridgeError> {
        let (method, params) = match action {
            ElementAction::Click => ("element.click", json!({ "selector": selector })),
            ElementAction::DoubleClick => ("element.dblclick", json!({ "selector": selector })),
            ElementAction::RightClick => (
                "element.click",
                json!({ "selector": selector, "button": "right" }),
            ),
            ElementAction::Fill(value) => (
                "element.fill",
                json!({ "selector": selector, "value": value }),
            ),
            ElementAction::Clear => ("element.fill", json!({ "selector": selector, "value": "" })),
            ElementAction::Press(key) => (
                "element.press",
                json!({ "selector": selector, "key": key }),
            ),
            ElementAction::Select(value) => (
                "element.select",
                json!({ "selector": selector, "value": value }),
            ),
            ElementAction::Hover => ("element.hover", json!({ "selector": selector })),
            ElementAction::ScrollIntoView => {
                ("element.scrollIntoView", json!({ "selector": selector }))
            }
        };
        self.page_request(method, params).await?;
        Ok(())
    }

    async fn wait_for(&self, condition: &WaitCondition, timeout: Duration) -> Result<(), BridgeError> {
        let timeout = timeout.as_millis() as u64;
        let selector_state = |selector: &str, state: &str| {
            (
                "wait.selector",
                json!({ "selector": selector, "state": state, "timeout": timeout }),
            )
        };
        let (method, params) = match condition {
            WaitCondition::Visible(s) => selector_state(s, "visible"),
            WaitCondition::Hidden(s) => selector_state(s, "hidden"),
            WaitCondition::Attached(s) => selector_state(s, "attached"),
            WaitCondition::Detached(s) => selector_state(s, "detached"),
            WaitCondition::Enabled(s) => (
                "wait.enabled",
                json!({ "selector": s, "enabled": true, "timeout": timeout }),
            ),
            WaitCondition::Disabled(s) => (
                "wait.enabled",
                json!({ "selector": s, "enabled": false, "timeout": timeout }),
            ),
            WaitCondition::Text { selector, text } => (
                "wait.text",
                json!({ "selector": selector, "text": text, "timeout": timeout }),
            ),
            WaitCondition::Url(pattern) => (
                "wait.url",
                json!({ "pattern": pattern, "timeout": timeout }),
            ),
            WaitCondition::LoadState(state) => (
                "wait.loadState",
                json!({ "state": state, "timeout": timeout }),
            ),
        };
        self.page_request(method, params).await?;
        Ok(())
    }

    async fn text_content(&self, selector: &str) -> Result<String, BridgeError> {
        let result = self
            .page_request("element.textContent", json!({ "selector": selector }))
            .await?;
        Ok(result["text"].as_str().unwrap_or_default().to_string())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, BridgeError> {
        let result = self
            .page_request("element.isVisible", json!({ "selector": selector }))
            .await?;
        Ok(result["visible"].as_bool().unwrap_or(false))
    }

    async fn title(&self) -> Result<String, BridgeError> {
        let result = self.page_request("page.title", json!({})).await?;
        string_field(&result, "title")
    }

    async fn window(&self, action: &WindowAction) -> Result<(), BridgeError> {
        match action {
            WindowAction::NewTab(url) => {
                let result = self
                    .request("page.new", json!({ "browserId": self.browser_id, "url": url }))
                    .await?;
                let page_id = string_field(&result, "pageId")?;
                let mut tabs = self.tabs.write().await;
                tabs.pages.push(page_id);
                tabs.current = tabs.pages.len() - 1;
            }
            WindowAction::Switch(index) => {
                let mut tabs = self.tabs.write().await;
                if *index >= tabs.pages.len() {
                    return Err(BridgeError::ServerError(format!(
                        "No tab at index {} ({} open)",
                        index,
                        tabs.pages.len()
                    )));
                }
                tabs.current = *index;
                let page_id = tabs.pages[*index].clone();
                drop(tabs);
                self.request("page.bringToFront", json!({ "pageId": page_id }))
                    .await?;
            }
            WindowAction::Close(index) => {
                let mut tabs = self.tabs.write().await;
                let index = index.unwrap_or(tabs.current);
                if index >= tabs.pages.len() {
                    return Err(BridgeError::ServerError(format!("No tab at index {}", index)));
                }
                let page_id = tabs.pages.remove(index);
                tabs.current = tabs.current.min(tabs.pages.len().saturating_sub(1));
                drop(tabs);
                self.request("page.close", json!({ "pageId": page_id }))
                    .await?;
            }
            WindowAction::Frame(selector) => {
                self.page_request("frame.enter", json!({ "selector": selector }))
                    .await?;
            }
            WindowAction::MainFrame => {
                self.page_request("frame.exit", json!({})).await?;
            }
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path, selector: Option<&str>) -> Result<PathBuf, BridgeError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let path_str = path.display().to_string();
        match selector {
            Some(selector) => {
                self.page_request(
                    "element.screenshot",
                    json!({ "selector": selector, "path": path_str }),
                )
                .await?
            }
            None => {
                self.page_request(
                    "page.screenshot",
                    json!({ "path": path_str, "fullPage": true }),
                )
                .await?
            }
        };
        Ok(path.to_path_buf())
    }

    async fn count(&self, selector: &str) -> Result<usize, BridgeError> {
        let result = self
            .page_request("element.count", json!({ "selector": selector }))
            .await?;
        Ok(result["count"].as_u64().unwrap_or(0) as usize)
    }
}
