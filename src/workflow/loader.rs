//! Suite loader
//!
//! Loads a suite file, a directory of flow files, and a locator repository.
//! Every document may be YAML or JSON; the format is picked from the file
//! extension (`.json` is JSON, everything else is YAML).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::locator::{LocatorEntry, LocatorRepository};
use super::suite::{Step, Suite};

/// Suffixes recognized as flow files inside a flows directory
pub const FLOW_SUFFIXES: [&str; 3] = [".flow.yaml", ".flow.yml", ".flow.json"];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },

    #[error("JSON parse error in {file}: {error}")]
    Json {
        file: String,
        error: serde_json::Error,
    },

    #[error("Flow '{0}' has the same name as a test case")]
    FlowNameCollision(String),
}

pub struct SuiteLoader;

impl SuiteLoader {
    /// Load a suite file. Inline flows named like a test case are rejected.
    pub fn load_suite(path: &Path) -> Result<Suite, LoadError> {
        let suite: Suite = parse_file(path)?;
        Self::check_flow_names(suite.flows.keys(), &suite.test_case_ids())?;
        debug!(
            path = %path.display(),
            testcases = suite.testcases.len(),
            sheets = suite.sheets.len(),
            "Loaded suite"
        );
        Ok(suite)
    }

    /// Load every `<Name>.flow.{yaml,yml,json}` file in `dir`.
    ///
    /// A missing directory yields no flows.
    pub fn load_flows_dir(dir: &Path) -> Result<HashMap<String, Vec<Step>>, LoadError> {
        let mut flows = HashMap::new();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "Flows directory not found; no library flows loaded");
            return Ok(flows);
        }

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(flow_name)
            else {
                continue;
            };

            let steps: Vec<Step> = parse_file(&path)?;
            if flows.insert(name.to_string(), steps).is_some() {
                warn!(flow = name, "Duplicate flow file; keeping the last one read");
            }
        }

        Ok(flows)
    }

    /// Load a locator repository. A missing file yields an empty repository.
    pub fn load_locators(path: &Path) -> Result<LocatorRepository, LoadError> {
        if !path.is_file() {
            warn!(path = %path.display(), "Locator repository not found; using an empty one");
            return Ok(LocatorRepository::new());
        }

        let entries: Vec<LocatorEntry> = parse_file(path)?;
        let total = entries.len();
        let repository = LocatorRepository::from_entries(entries);
        if repository.len() < total {
            debug!(
                dropped = total - repository.len(),
                "Dropped incomplete or duplicate locator rows"
            );
        }
        Ok(repository)
    }

    /// Reject any flow whose name is also a test case id
    pub fn check_flow_names<'a>(
        flow_names: impl IntoIterator<Item = &'a String>,
        test_ids: &HashSet<String>,
    ) -> Result<(), LoadError> {
        for name in flow_names {
            if test_ids.contains(name) {
                return Err(LoadError::FlowNameCollision(name.clone()));
            }
        }
        Ok(())
    }
}

/// Flow name of a flows-directory file, if it has a flow suffix
fn flow_name(file_name: &str) -> Option<&str> {
    FLOW_SUFFIXES
        .iter()
        .find_map(|suffix| file_name.strip_suffix(suffix))
        .filter(|name| !name.is_empty())
}

/// Parse a YAML or JSON document, picking the format from the extension
pub(crate) fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = std::fs::read_to_string(path)?;
    let file = path.display().to_string();
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            serde_json::from_str(&content).map_err(|error| LoadError::Json { file, error })
        }
        _ => serde_yaml::from_str(&content).map_err(|error| LoadError::Yaml { file, error }),
    }
}
