//! Selector configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! { "max_concurrent_executions": 4, "wait_timeout_secs": 60 }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SelectorError, SelectorResult};

/// Message stored on a freshly dispatched execution.
pub const DEFAULT_HANDOFF_MESSAGE: &str = "Passing execution to executor plugin.";

/// Configuration for selection and dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Upper bound on connector executions running at once. Further
    /// dispatches are accepted and wait for a slot in the background.
    pub max_concurrent_executions: usize,
    /// Poll interval used by `wait()`, in milliseconds.
    pub poll_interval_ms: u64,
    /// How long `wait()` polls before giving up, in seconds.
    pub wait_timeout_secs: u64,
    /// Status message of a freshly dispatched execution.
    pub handoff_message: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: 16,
            poll_interval_ms: 500,
            wait_timeout_secs: 300, // 5 minutes
            handoff_message: DEFAULT_HANDOFF_MESSAGE.to_string(),
        }
    }
}

impl SelectorConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> SelectorResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> SelectorResult<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Reject values the dispatcher cannot work with.
    pub fn validate(&self) -> SelectorResult<()> {
        if self.max_concurrent_executions == 0 {
            return Err(SelectorError::Configuration(
                "max_concurrent_executions must be at least 1".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(SelectorError::Configuration(
                "poll_interval_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn with_max_concurrent_executions(mut self, max: usize) -> Self {
        self.max_concurrent_executions = max;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_handoff_message(mut self, message: impl Into<String>) -> Self {
        self.handoff_message = message.into();
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = SelectorConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SelectorConfig::default());
        assert_eq!(config.handoff_message, DEFAULT_HANDOFF_MESSAGE);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config =
            SelectorConfig::from_json_str(r#"{"max_concurrent_executions": 2, "wait_timeout_secs": 5}"#)
                .unwrap();
        assert_eq!(config.max_concurrent_executions, 2);
        assert_eq!(config.wait_timeout(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = SelectorConfig::from_json_str(r#"{"max_concurrent_executions": 0}"#).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_malformed_json() {
        let err = SelectorConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, SelectorError::Json(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector.json");
        fs::write(&path, r#"{"poll_interval_ms": 10}"#).unwrap();

        let config = SelectorConfig::from_file(&path).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(10));

        let err = SelectorConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, SelectorError::Io(_)));
    }
}
