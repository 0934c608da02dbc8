//! Server settings, read from the client's `initializationOptions`

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Publish at most this many diagnostics per document.
    pub max_problems: Option<usize>,
    /// Walk the workspace folders once the client is initialized.
    pub bootstrap: bool,
    /// Folders walked in addition to the workspace folders.
    pub extra_roots: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_problems: None,
            bootstrap: true,
            extra_roots: Vec::new(),
        }
    }
}

impl Config {
    /// Missing options give the defaults; options that do not deserialize
    /// are logged and ignored.
    #[must_use]
    pub fn from_initialization_options(options: Option<Value>) -> Self {
        match options {
            None | Some(Value::Null) => Self::default(),
            Some(options) => serde_json::from_value(options).unwrap_or_else(|error| {
                tracing::warn!(%error, "invalid initialization options, using defaults");
                Self::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        assert_eq!(Config::from_initialization_options(None), Config::default());
        assert_eq!(
            Config::from_initialization_options(Some(Value::Null)),
            Config::default()
        );
        assert!(Config::default().bootstrap);
    }

    #[test]
    fn test_camel_case_options() {
        let config = Config::from_initialization_options(Some(json!({
            "maxProblems": 10,
            "bootstrap": false,
            "extraRoots": ["/opt/shared"],
        })));
        assert_eq!(
            config,
            Config {
                max_problems: Some(10),
                bootstrap: false,
                extra_roots: vec![PathBuf::from("/opt/shared")],
            }
        );
    }

    #[test]
    fn test_partial_options_keep_other_defaults() {
        let config = Config::from_initialization_options(Some(json!({ "maxProblems": 1 })));
        assert_eq!(config.max_problems, Some(1));
        assert!(config.bootstrap);
    }

    #[test]
    fn test_invalid_options_fall_back() {
        let config = Config::from_initialization_options(Some(json!({ "maxProblems": "many" })));
        assert_eq!(config, Config::default());
    }
}
