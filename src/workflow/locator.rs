//! Symbolic locator repository and resolver
//!
//! A step target of the form `Page.Name` is looked up in the repository and
//! turned into a concrete, type-prefixed selector (`css=`, `xpath=`, `text=`,
//! `id=`). Each entry carries a primary expression and an optional secondary
//! expression used when the primary cannot be converted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Selector prefixes passed through unchanged
pub const SELECTOR_PREFIXES: [&str; 4] = ["css=", "xpath=", "text=", "id="];

/// Errors raised while resolving a symbolic locator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    #[error("Invalid locator format '{0}'. Expected PageName.LocatorName")]
    InvalidFormat(String),

    #[error("Page not found for locator: {0}")]
    PageNotFound(String),

    #[error("Locator not found: {0}")]
    LocatorNotFound(String),
}

/// One row of the locator repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorEntry {
    #[serde(default, alias = "Page")]
    pub page: String,

    #[serde(default, alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Primary")]
    pub primary: String,

    #[serde(default, alias = "Secondary")]
    pub secondary: Option<String>,

    /// Locator type: css, xpath, text, id, or button
    #[serde(default, rename = "type", alias = "Type")]
    pub kind: String,
}

impl LocatorEntry {
    pub fn new(page: &str, name: &str, primary: &str, secondary: Option<&str>, kind: &str) -> Self {
        Self {
            page: page.to_string(),
            name: name.to_string(),
            primary: primary.to_string(),
            secondary: secondary.map(str::to_string),
            kind: kind.to_string(),
        }
    }

    /// Rows missing page, name, primary, or type are not resolvable
    fn is_complete(&self) -> bool {
        [&self.page, &self.name, &self.primary, &self.kind]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// page -> name -> entry
#[derive(Debug, Clone, Default)]
pub struct LocatorRepository {
    pages: HashMap<String, HashMap<String, LocatorEntry>>,
}

impl LocatorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository, dropping incomplete rows. Later rows win.
    pub fn from_entries(entries: impl IntoIterator<Item = LocatorEntry>) -> Self {
        let mut repository = Self::new();
        for entry in entries {
            repository.insert(entry);
        }
        repository
    }

    /// Insert an entry; returns false when the row is incomplete
    pub fn insert(&mut self, entry: LocatorEntry) -> bool {
        if !entry.is_complete() {
            return false;
        }
        self.pages
            .entry(entry.page.trim().to_string())
            .or_default()
            .insert(entry.name.trim().to_string(), entry);
        true
    }

    pub fn get(&self, page: &str, name: &str) -> Option<&LocatorEntry> {
        self.pages.get(page)?.get(name)
    }

    pub fn has_page(&self, page: &str) -> bool {
        self.pages.contains_key(page)
    }

    /// Number of entries across all pages
    pub fn len(&self) -> usize {
        self.pages.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Resolves `Page.Name` references with primary/secondary fallback
#[derive(Debug, Clone, Default)]
pub struct LocatorResolver {
    repository: LocatorRepository,
}

impl LocatorResolver {
    pub fn new(repository: LocatorRepository) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &LocatorRepository {
        &self.repository
    }

    /// Resolve a `Page.Name` target into a concrete selector
    pub fn resolve(&self, target: &str) -> Result<String, LocatorError> {
        let (page, name) = split_symbolic(target)
            .ok_or_else(|| LocatorError::InvalidFormat(target.to_string()))?;

        if !self.repository.has_page(page) {
            return Err(LocatorError::PageNotFound(target.to_string()));
        }
        let entry = self
            .repository
            .get(page, name)
            .ok_or_else(|| LocatorError::LocatorNotFound(target.to_string()))?;

        to_selector(&entry.kind, &entry.primary)
            .or_else(|| {
                entry
                    .secondary
                    .as_deref()
                    .and_then(|secondary| to_selector(&entry.kind, secondary))
            })
            .ok_or_else(|| LocatorError::LocatorNotFound(target.to_string()))
    }
}

/// Split `Page.Name`; anything but exactly one `.` is rejected
pub fn split_symbolic(target: &str) -> Option<(&str, &str)> {
    if target.matches('.').count() != 1 {
        return None;
    }
    target.split_once('.')
}

/// True when `target` already carries a selector prefix
pub fn has_selector_prefix(target: &str) -> bool {
    SELECTOR_PREFIXES.iter().any(|p| target.starts_with(p))
}

/// Convert a raw expression into a prefixed selector.
///
/// Already-prefixed values pass through; otherwise the type decides the
/// prefix. Unknown types and blank values yield `None`.
pub fn to_selector(kind: &str, value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if has_selector_prefix(value) {
        return Some(value.to_string());
    }
    let prefix = match kind.trim().to_lowercase().as_str() {
        "css" | "button" => "css=",
        "xpath" => "xpath=",
        "text" => "text=",
        "id" => "id=",
        _ => return None,
    };
    Some(format!("{}{}", prefix, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> LocatorResolver {
        LocatorResolver::new(LocatorRepository::from_entries([
            LocatorEntry::new(
                "LoginPage",
                "submit",
                "#loginBtn",
                Some("//button[text()='Login']"),
                "button",
            ),
            LocatorEntry::new("LoginPage", "prefixed", "xpath=//input", None, "css"),
            LocatorEntry::new("LoginPage", "fallback", "#legacy", Some("xpath=//a"), "unknown"),
            LocatorEntry::new("LoginPage", "broken", "#x", Some("y"), "unknown"),
        ]))
    }

    #[test]
    fn test_primary_gets_type_prefix() {
        assert_eq!(resolver().resolve("LoginPage.submit").unwrap(), "css=#loginBtn");
    }

    #[test]
    fn test_prefixed_primary_unchanged() {
        assert_eq!(resolver().resolve("LoginPage.prefixed").unwrap(), "xpath=//input");
    }

    #[test]
    fn test_secondary_fallback() {
        assert_eq!(resolver().resolve("LoginPage.fallback").unwrap(), "xpath=//a");
    }

    #[test]
    fn test_both_unconvertible() {
        assert_eq!(
            resolver().resolve("LoginPage.broken"),
            Err(LocatorError::LocatorNotFound("LoginPage.broken".to_string()))
        );
    }

    #[test]
    fn test_missing_page_and_name() {
        assert_eq!(
            resolver().resolve("HomePage.submit"),
            Err(LocatorError::PageNotFound("HomePage.submit".to_string()))
        );
        assert_eq!(
            resolver().resolve("LoginPage.cancel"),
            Err(LocatorError::LocatorNotFound("LoginPage.cancel".to_string()))
        );
    }

    #[test]
    fn test_invalid_format() {
        assert!(matches!(
            resolver().resolve("LoginPage"),
            Err(LocatorError::InvalidFormat(_))
        ));
        assert!(matches!(
            resolver().resolve("a.b.c"),
            Err(LocatorError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_incomplete_rows_dropped() {
        let repo = LocatorRepository::from_entries([
            LocatorEntry::new("Page", "ok", "#ok", None, "css"),
            LocatorEntry::new("Page", "no_type", "#x", None, ""),
            LocatorEntry::new("", "no_page", "#x", None, "css"),
        ]);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_to_selector_types() {
        assert_eq!(to_selector("CSS", ".btn").as_deref(), Some("css=.btn"));
        assert_eq!(to_selector("text", "Sign in").as_deref(), Some("text=Sign in"));
        assert_eq!(to_selector("id", "user").as_deref(), Some("id=user"));
        assert_eq!(to_selector("xpath", "//div").as_deref(), Some("xpath=//div"));
        assert_eq!(to_selector("image", "logo.png"), None);
        assert_eq!(to_selector("css", "   "), None);
    }
}
