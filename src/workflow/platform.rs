//! Automation surface configurations
//!
//! This module contains the configuration types for the two halves of the
//! action surface:
//! - Playwright (browser automation over JSON-RPC)
//! - Web (HTTP API calls)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Playwright Configuration
// ============================================================================

/// Playwright browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaywrightConfig {
    /// Server script speaking JSON-RPC over stdin/stdout
    #[serde(default = "default_server")]
    pub server: String,

    /// Browser to use
    #[serde(default)]
    pub browser: BrowserType,

    /// Run in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Viewport configuration
    pub viewport: Option<Viewport>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            browser: BrowserType::default(),
            headless: default_headless(),
            viewport: None,
        }
    }
}

/// Browser types supported
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserType::Chromium => "chromium",
            BrowserType::Firefox => "firefox",
            BrowserType::Webkit => "webkit",
        }
    }
}

/// Viewport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

fn default_server() -> String {
    "extensions/playwright/server.js".to_string()
}

fn default_headless() -> bool {
    true
}

// ============================================================================
// Web Configuration
// ============================================================================

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Base URL for API requests (e.g., "https://api.example.com").
    /// Falls back to the active environment's `api_base_url` when empty.
    #[serde(default)]
    pub base_url: String,

    /// Default headers to include in all requests
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Authentication configuration
    pub auth: Option<WebAuthConfig>,

    /// Whether to follow redirects (default: true)
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Whether to validate SSL certificates (default: true)
    #[serde(default = "default_validate_ssl")]
    pub validate_ssl: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            headers: HashMap::new(),
            auth: None,
            follow_redirects: default_follow_redirects(),
            validate_ssl: default_validate_ssl(),
        }
    }
}

fn default_follow_redirects() -> bool {
    true
}

fn default_validate_ssl() -> bool {
    true
}

/// Authentication configuration for web requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebAuthConfig {
    /// Bearer token authentication
    Bearer { token: String },
    /// Basic authentication
    Basic { username: String, password: String },
    /// API key authentication
    ApiKey { header: String, key: String },
}

// ============================================================================
// Unified Platforms Container
// ============================================================================

/// Both halves of the action surface; either may be absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlatformsConfig {
    pub playwright: Option<PlaywrightConfig>,
    pub web: Option<WebConfig>,
}

impl PlatformsConfig {
    /// Check if empty (nothing configured)
    pub fn is_empty(&self) -> bool {
        self.playwright.is_none() && self.web.is_none()
    }
}
