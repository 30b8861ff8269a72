//! Engine configuration
//!
//! Timeouts and defaults used by the adapters and the node processor.

use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timeout of a REST call made while executing a pipeline
    pub rest_timeout: Duration,

    /// Timeout of a REST call made for a preview
    pub preview_timeout: Duration,

    /// Timeout of a connection test
    pub test_timeout: Duration,

    /// Rows returned by a preview when the request names no limit
    pub default_preview_limit: u64,

    /// Reject malformed filter conditions in every transform node
    pub strict_conditions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rest_timeout: Duration::from_secs(30),
            preview_timeout: Duration::from_secs(10),
            test_timeout: Duration::from_secs(5),
            default_preview_limit: 10,
            strict_conditions: false,
        }
    }
}

impl EngineConfig {
    /// Enables strict condition parsing for all transform nodes
    pub fn with_strict_conditions(mut self, strict: bool) -> Self {
        self.strict_conditions = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let config = EngineConfig::default();
        assert_eq!(config.rest_timeout, Duration::from_secs(30));
        assert_eq!(config.preview_timeout, Duration::from_secs(10));
        assert_eq!(config.test_timeout, Duration::from_secs(5));
        assert_eq!(config.default_preview_limit, 10);
        assert!(!config.strict_conditions);
    }
}
