//! Immutable snapshot of process environment variables.
//!
//! Everything that depends on the environment reads it through [`Environment`]
//! so tests can pass synthetic variables instead of mutating the process.

use std::ffi::OsString;

/// Variable that CI systems set to `true`.
pub const CI_VAR: &str = "CI";
/// Overrides the base reference used for change detection.
pub const BASE_REF_VAR: &str = "GIT_BASE_REF";
/// Enables debug-level tracing for terrahoot when truthy.
pub const DEBUG_VAR: &str = "TERRAHOOT_DEBUG";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(String, String)>,
}

impl Environment {
    /// Snapshot the current process environment. Names and values that are
    /// not valid Unicode are converted lossily.
    pub fn from_process() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    fn from_os_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let vars = pairs
            .into_iter()
            .map(|(key, value)| {
                (
                    key.to_string_lossy().into_owned(),
                    value.to_string_lossy().into_owned(),
                )
            })
            .collect();
        Self { vars }
    }

    /// Build from `KEY=VALUE` strings. Entries without `=` are treated as
    /// variables with an empty value.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vars = pairs
            .into_iter()
            .map(|pair| match pair.as_ref().split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (pair.as_ref().to_string(), String::new()),
            })
            .collect();
        Self { vars }
    }

    /// Value of the first entry named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Like [`Environment::get`], but unset and empty are the same.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    pub fn is_ci(&self) -> bool {
        self.get(CI_VAR) == Some("true")
    }

    pub fn base_ref(&self) -> Option<&str> {
        self.get_non_empty(BASE_REF_VAR)
    }

    pub fn debug_enabled(&self) -> bool {
        match self.get_non_empty(DEBUG_VAR) {
            Some(value) => !matches!(value, "0" | "false" | "FALSE" | "False"),
            None => false,
        }
    }
}
