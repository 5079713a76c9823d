//! One action surface over both bridges
//!
//! UI capabilities go to the Playwright bridge and HTTP goes to the web
//! bridge. A half that is not configured reports its capabilities as
//! unsupported.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::{
    ActionSurface, ApiResponse, BridgeError, ElementAction, HttpRequest, PageAction,
    PlaywrightBridge, WaitCondition, WebBridge, WindowAction,
};
use crate::workflow::{EngineConfig, WebConfig};

#[derive(Default)]
pub struct SessionSurface {
    ui: Option<PlaywrightBridge>,
    web: Option<WebBridge>,
}

impl SessionSurface {
    pub fn new(ui: Option<PlaywrightBridge>, web: Option<WebBridge>) -> Self {
        Self { ui, web }
    }

    /// Start the configured bridges.
    ///
    /// HTTP is always available (the API base URL comes from the active
    /// environment when the web platform sets none); the browser is only
    /// launched when `platforms.playwright` is configured.
    pub async fn start(config: &EngineConfig) -> Result<Self, BridgeError> {
        let mut web_config = config.platforms.web.clone().unwrap_or_else(WebConfig::default);
        if web_config.base_url.is_empty() {
            web_config.base_url = config.api_base_url();
        }
        let web = WebBridge::new(web_config, config.timeouts.api())?;

        let ui = match &config.platforms.playwright {
            Some(playwright) => Some(PlaywrightBridge::start(playwright).await?),
            None => {
                info!("No playwright platform configured; UI commands are unavailable");
                None
            }
        };

        Ok(Self::new(ui, Some(web)))
    }

    fn ui(&self) -> Result<&PlaywrightBridge, BridgeError> {
        self.ui.as_ref().ok_or_else(|| {
            BridgeError::UnsupportedAction("UI actions need a playwright platform".to_string())
        })
    }

    fn web(&self) -> Result<&WebBridge, BridgeError> {
        self.web.as_ref().ok_or_else(|| {
            BridgeError::UnsupportedAction("HTTP actions need a web platform".to_string())
        })
    }

    /// Close the browser, if one was launched
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        if let Some(ui) = &self.ui {
            ui.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ActionSurface for SessionSurface {
    async fn navigate(&self, url: &str) -> Result<(), BridgeError> {
        self.ui()?.navigate(url).await
    }

    async fn page_action(&self, action: PageAction) -> Result<(), BridgeError> {
        self.ui()?.page_action(action).await
    }

    async fn element(&self, selector: &str, action: &ElementAction) -> Result<(), BridgeError> {
        self.ui()?.element(selector, action).await
    }

    async fn wait_for(&self, condition: &WaitCondition, timeout: Duration) -> Result<(), BridgeError> {
        self.ui()?.wait_for(condition, timeout).await
    }

    async fn text_content(&self, selector: &str) -> Result<String, BridgeError> {
        self.ui()?.text_content(selector).await
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, BridgeError> {
        self.ui()?.is_visible(selector).await
    }

    async fn title(&self) -> Result<String, BridgeError> {
        self.ui()?.title().await
    }

    async fn window(&self, action: &WindowAction) -> Result<(), BridgeError> {
        self.ui()?.window(action).await
    }

    async fn screenshot(&self, path: &Path, selector: Option<&str>) -> Result<PathBuf, BridgeError> {
        self.ui()?.screenshot(path, selector).await
    }

    async fn http(&self, request: &HttpRequest) -> Result<ApiResponse, BridgeError> {
        self.web()?.http(request).await
    }

    async fn count(&self, selector: &str) -> Result<usize, BridgeError> {
        self.ui()?.count(selector).await
    }
}
