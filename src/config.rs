//! Dispatcher configuration
//!
//! Values come from built-in defaults, optionally overlaid by a JSON file,
//! then by command-line flags.

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::error::DispatchError;

pub const DEFAULT_DATASET: &str = "simulated";
pub const DEFAULT_SCRIPT: &str = "get_performance.py";
pub const DEFAULT_PYTHON: &str = "python";
pub const DEFAULT_MULTIPLEXER: &str = "tmux";

/// Configuration for the run dispatcher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Dataset passed to every run of the standard plan
    pub dataset: String,
    /// Benchmark script path
    pub script: String,
    /// Interpreter used to run the script
    pub python: String,
    /// Terminal multiplexer binary
    pub multiplexer: String,
    /// Keep each session open on a read prompt after the run exits
    pub hold_open: bool,
    /// Optional plan file replacing the standard plan
    pub plan_file: Option<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            script: DEFAULT_SCRIPT.to_string(),
            python: DEFAULT_PYTHON.to_string(),
            multiplexer: DEFAULT_MULTIPLEXER.to_string(),
            hold_open: true,
            plan_file: None,
        }
    }
}

impl DispatcherConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, DispatchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::ConfigError(format!(
                "Failed to read config file '{}': {}", path.display(), e
            ))
        })?;
        let config: DispatcherConfig = serde_json::from_str(&content).map_err(|e| {
            DispatchError::ConfigError(format!(
                "Failed to parse config file '{}': {}", path.display(), e
            ))
        })?;
        debug!("Loaded dispatcher config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        for (field, value) in [
            ("script", &self.script),
            ("python", &self.python),
            ("multiplexer", &self.multiplexer),
        ] {
            if value.trim().is_empty() {
                return Err(DispatchError::ConfigError(format!("'{}' must not be empty", field)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.script, "get_performance.py");
        assert_eq!(config.multiplexer, "tmux");
        assert!(config.hold_open);
        assert!(config.validate().is_ok());
    }

    // Fields absent from the file keep their defaults
    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"dataset": "bike", "hold_open": false}"#).unwrap();

        let config = DispatcherConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.dataset, "bike");
        assert!(!config.hold_open);
        assert_eq!(config.python, "python");
        assert_eq!(config.plan_file, None);
    }

    #[test]
    fn test_missing_file() {
        let err = DispatcherConfig::from_json_file(Path::new("/nonexistent/dispatch.json")).unwrap_err();
        assert!(matches!(err, DispatchError::ConfigError(_)));
    }

    #[test]
    fn test_validate_rejects_blank_python() {
        let config = DispatcherConfig {
            python: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("python"));
    }
}
