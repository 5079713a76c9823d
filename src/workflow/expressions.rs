//! Placeholder substitution and flow-parameter parsing
//!
//! Supports:
//! - `${NAME}` anywhere in a target or data cell
//! - `key=value;key2=value2` parameter lists for `CALL_FLOW`

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::context::{value_to_string, ContextStore};

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Replace every `${NAME}` with the string form of the context value.
/// Unresolved names substitute the empty string.
pub fn substitute(input: &str, ctx: &ContextStore) -> String {
    PLACEHOLDER_REGEX
        .replace_all(input, |caps: &Captures| {
            ctx.get(&caps[1]).map(value_to_string).unwrap_or_default()
        })
        .into_owned()
}

/// Parse `key=value;key2=value2`. Segments without `=` are ignored; keys
/// and values are trimmed; the value keeps any further `=` characters.
pub fn parse_params(data: &str) -> Vec<(String, String)> {
    data.split(';')
        .filter_map(|segment| segment.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
