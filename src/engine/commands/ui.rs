//! UI commands
//!
//! Targets arrive already resolved to concrete selectors; data is the typed
//! value, key, option, expected text, or artifact name.

use async_trait::async_trait;
use serde_json::Value;

use super::{bounded, first_non_empty, join_url, require};
use crate::bridge::{ElementAction, PageAction, WaitCondition, WindowAction};
use crate::engine::error::StepError;
use crate::engine::registry::{Command, CommandEnv, Dispatch};
use crate::engine::result::safe_name;

/// Subdirectory of the artifacts directory receiving screenshots
pub const SCREENSHOTS_DIR: &str = "screenshots";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiCommand {
    OpenUrl,
    Click,
    DoubleClick,
    RightClick,
    Type,
    ClearText,
    PressKey,
    SelectDropdown,
    Hover,
    ScrollTo,
    WaitForVisible,
    WaitForHidden,
    WaitForAttached,
    WaitForDetached,
    WaitForEnabled,
    WaitForDisabled,
    WaitForText,
    WaitForUrl,
    WaitForLoadState,
    VerifyText,
    VerifyContainsText,
    VerifyVisible,
    VerifyTitle,
    NewTab,
    SwitchWindow,
    CloseTab,
    SwitchToFrame,
    SwitchToMainFrame,
    BrowserBack,
    BrowserRefresh,
    TakeScreenshot,
    ScreenshotElement,
}

impl UiCommand {
    pub const ALL: [UiCommand; 32] = [
        UiCommand::OpenUrl,
        UiCommand::Click,
        UiCommand::DoubleClick,
        UiCommand::RightClick,
        UiCommand::Type,
        UiCommand::ClearText,
        UiCommand::PressKey,
        UiCommand::SelectDropdown,
        UiCommand::Hover,
        UiCommand::ScrollTo,
        UiCommand::WaitForVisible,
        UiCommand::WaitForHidden,
        UiCommand::WaitForAttached,
        UiCommand::WaitForDetached,
        UiCommand::WaitForEnabled,
        UiCommand::WaitForDisabled,
        UiCommand::WaitForText,
        UiCommand::WaitForUrl,
        UiCommand::WaitForLoadState,
        UiCommand::VerifyText,
        UiCommand::VerifyContainsText,
        UiCommand::VerifyVisible,
        UiCommand::VerifyTitle,
        UiCommand::NewTab,
        UiCommand::SwitchWindow,
        UiCommand::CloseTab,
        UiCommand::SwitchToFrame,
        UiCommand::SwitchToMainFrame,
        UiCommand::BrowserBack,
        UiCommand::BrowserRefresh,
        UiCommand::TakeScreenshot,
        UiCommand::ScreenshotElement,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            UiCommand::OpenUrl => "OPEN_URL",
            UiCommand::Click => "CLICK",
            UiCommand::DoubleClick => "DOUBLE_CLICK",
            UiCommand::RightClick => "RIGHT_CLICK",
            UiCommand::Type => "TYPE",
            UiCommand::ClearText => "CLEAR_TEXT",
            UiCommand::PressKey => "PRESS_KEY",
            UiCommand::SelectDropdown => "SELECT_DROPDOWN",
            UiCommand::Hover => "HOVER",
            UiCommand::ScrollTo => "SCROLL_TO",
            UiCommand::WaitForVisible => "WAIT_FOR_VISIBLE",
            UiCommand::WaitForHidden => "WAIT_FOR_HIDDEN",
            UiCommand::WaitForAttached => "WAIT_FOR_ATTACHED",
            UiCommand::WaitForDetached => "WAIT_FOR_DETACHED",
            UiCommand::WaitForEnabled => "WAIT_FOR_ENABLED",
            UiCommand::WaitForDisabled => "WAIT_FOR_DISABLED",
            UiCommand::WaitForText => "WAIT_FOR_TEXT",
            UiCommand::WaitForUrl => "WAIT_FOR_URL",
            UiCommand::WaitForLoadState => "WAIT_FOR_LOAD_STATE",
            UiCommand::VerifyText => "VERIFY_TEXT",
            UiCommand::VerifyContainsText => "VERIFY_CONTAINS_TEXT",
            UiCommand::VerifyVisible => "VERIFY_VISIBLE",
            UiCommand::VerifyTitle => "VERIFY_TITLE",
            UiCommand::NewTab => "NEW_TAB",
            UiCommand::SwitchWindow => "SWITCH_WINDOW",
            UiCommand::CloseTab => "CLOSE_TAB",
            UiCommand::SwitchToFrame => "SWITCH_TO_FRAME",
            UiCommand::SwitchToMainFrame => "SWITCH_TO_MAIN_FRAME",
            UiCommand::BrowserBack => "BROWSER_BACK",
            UiCommand::BrowserRefresh => "BROWSER_REFRESH",
            UiCommand::TakeScreenshot => "TAKE_SCREENSHOT",
            UiCommand::ScreenshotElement => "SCREENSHOT_ELEMENT",
        }
    }

    /// Element interaction for commands that act on a single selector
    fn element_action(&self, data: &str) -> Option<ElementAction> {
        Some(match self {
            UiCommand::Click => ElementAction::Click,
            UiCommand::DoubleClick => ElementAction::DoubleClick,
            UiCommand::RightClick => ElementAction::RightClick,
            UiCommand::Type => ElementAction::Fill(data.to_string()),
            UiCommand::ClearText => ElementAction::Clear,
            UiCommand::PressKey => ElementAction::Press(data.to_string()),
            UiCommand::SelectDropdown => ElementAction::Select(data.to_string()),
            UiCommand::Hover => ElementAction::Hover,
            UiCommand::ScrollTo => ElementAction::ScrollIntoView,
            _ => return None,
        })
    }

    /// Wait condition for the `WAIT_FOR_*` family
    fn wait_condition(&self, target: &str, data: &str) -> Result<Option<WaitCondition>, StepError> {
        let selector = || require(target, "target").map(str::to_string);
        Ok(Some(match self {
            UiCommand::WaitForVisible => WaitCondition::Visible(selector()?),
            UiCommand::WaitForHidden => WaitCondition::Hidden(selector()?),
            UiCommand::WaitForAttached => WaitCondition::Attached(selector()?),
            UiCommand::WaitForDetached => WaitCondition::Detached(selector()?),
            UiCommand::WaitForEnabled => WaitCondition::Enabled(selector()?),
            UiCommand::WaitForDisabled => WaitCondition::Disabled(selector()?),
            UiCommand::WaitForText => WaitCondition::Text {
                selector: selector()?,
                text: data.to_string(),
            },
            UiCommand::WaitForUrl => WaitCondition::Url(
                first_non_empty(&[data, target])
                    .ok_or_else(|| StepError::MissingParameter("url pattern".to_string()))?
                    .to_string(),
            ),
            UiCommand::WaitForLoadState => WaitCondition::LoadState(
                first_non_empty(&[data, target]).unwrap_or("load").to_string(),
            ),
            _ => return Ok(None),
        }))
    }
}

#[async_trait]
impl Command for UiCommand {
    fn name(&self) -> &str {
        self.keyword()
    }

    fn locator_exempt(&self) -> bool {
        matches!(
            self,
            UiCommand::OpenUrl
                | UiCommand::WaitForUrl
                | UiCommand::WaitForLoadState
                | UiCommand::VerifyTitle
                | UiCommand::NewTab
                | UiCommand::SwitchWindow
                | UiCommand::CloseTab
                | UiCommand::SwitchToMainFrame
                | UiCommand::BrowserBack
                | UiCommand::BrowserRefresh
                | UiCommand::TakeScreenshot
        )
    }

    async fn execute(
        &self,
        target: &str,
        data: &str,
        env: &mut CommandEnv<'_>,
    ) -> Result<Dispatch, StepError> {
        let action_timeout = env.timeouts.action();
        let surface = env.surface;
        let name = self.keyword();

        if let Some(action) = self.element_action(data) {
            let selector = require(target, "target")?;
            bounded(name, action_timeout, surface.element(selector, &action)).await?;
            return Ok(Dispatch::unit());
        }

        if let Some(condition) = self.wait_condition(target, data)? {
            bounded(name, action_timeout, surface.wait_for(&condition, action_timeout)).await?;
            return Ok(Dispatch::unit());
        }

        let value = match self {
            UiCommand::OpenUrl => {
                let raw = first_non_empty(&[data, target])
                    .ok_or_else(|| StepError::MissingParameter("url".to_string()))?;
                let url = join_url(&env.context.get_string("BASE_URL"), raw);
                bounded(name, action_timeout, surface.navigate(&url)).await?;
                Value::String(url)
            }
            UiCommand::VerifyText | UiCommand::VerifyContainsText => {
                let selector = require(target, "target")?;
                let actual = bounded(name, action_timeout, surface.text_content(selector)).await?;
                let (actual_trimmed, expected) = (actual.trim(), data.trim());
                let matched = if *self == UiCommand::VerifyText {
                    actual_trimmed == expected
                } else {
                    actual_trimmed.contains(expected)
                };
                if !matched {
                    return Err(StepError::AssertionFailed(format!(
                        "Text mismatch. Expected='{}', Actual='{}'",
                        expected, actual_trimmed
                    )));
                }
                Value::String(actual)
            }
            UiCommand::VerifyVisible => {
                let selector = require(target, "target")?;
                if !bounded(name, action_timeout, surface.is_visible(selector)).await? {
                    return Err(StepError::AssertionFailed(format!(
                        "Element not visible: {}",
                        selector
                    )));
                }
                Value::Bool(true)
            }
            UiCommand::VerifyTitle => {
                let expected = first_non_empty(&[data, target]).unwrap_or("").trim();
                let actual = bounded(name, action_timeout, surface.title()).await?;
                if actual.trim() != expected {
                    return Err(StepError::AssertionFailed(format!(
                        "Title mismatch. Expected='{}', Actual='{}'",
                        expected,
                        actual.trim()
                    )));
                }
                Value::String(actual)
            }
            UiCommand::NewTab => {
                let url = first_non_empty(&[data, target])
                    .map(|raw| join_url(&env.context.get_string("BASE_URL"), raw));
                bounded(name, action_timeout, surface.window(&WindowAction::NewTab(url))).await?;
                Value::Null
            }
            UiCommand::SwitchWindow => {
                let index = parse_index(first_non_empty(&[data, target]))?
                    .ok_or_else(|| StepError::MissingParameter("window index".to_string()))?;
                bounded(name, action_timeout, surface.window(&WindowAction::Switch(index))).await?;
                Value::from(index)
            }
            UiCommand::CloseTab => {
                let index = parse_index(first_non_empty(&[data, target]))?;
                bounded(name, action_timeout, surface.window(&WindowAction::Close(index))).await?;
                Value::Null
            }
            UiCommand::SwitchToFrame => {
                let selector = require(target, "target")?.to_string();
                bounded(name, action_timeout, surface.window(&WindowAction::Frame(selector)))
                    .await?;
                Value::Null
            }
            UiCommand::SwitchToMainFrame => {
                bounded(name, action_timeout, surface.window(&WindowAction::MainFrame)).await?;
                Value::Null
            }
            UiCommand::BrowserBack => {
                bounded(name, action_timeout, surface.page_action(PageAction::Back)).await?;
                Value::Null
            }
            UiCommand::BrowserRefresh => {
                bounded(name, action_timeout, surface.page_action(PageAction::Reload)).await?;
                Value::Null
            }
            UiCommand::TakeScreenshot | UiCommand::ScreenshotElement => {
                let selector = match self {
                    UiCommand::ScreenshotElement => Some(require(target, "target")?),
                    _ => None,
                };
                let path = env
                    .artifacts_dir
                    .join(SCREENSHOTS_DIR)
                    .join(screenshot_file_name(data));
                let written =
                    bounded(name, action_timeout, surface.screenshot(&path, selector)).await?;
                Value::String(written.display().to_string())
            }
            // Element actions and waits returned above
            _ => Value::Null,
        };

        Ok(Dispatch::Value(value))
    }
}

fn parse_index(raw: Option<&str>) -> Result<Option<usize>, StepError> {
    raw.map(|s| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| StepError::MissingParameter(format!("window index (got '{}')", s)))
    })
    .transpose()
}

/// `<data>.png`, or a timestamped name when no name is given
fn screenshot_file_name(data: &str) -> String {
    let name = data.trim();
    let name = if name.is_empty() {
        format!("dsl_{}", chrono::Local::now().format("%Y%m%d_%H%M%S_%6f"))
    } else {
        safe_name(name.strip_suffix(".png").unwrap_or(name))
    };
    format!("{}.png", name)
}
