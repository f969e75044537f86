// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::engine::provisioning::{EngineOptions, ProvisioningEngine};
use crate::traits::ResourceProvider;

/// Factory for creating provisioning engines from configuration
pub struct EngineFactory;

impl EngineFactory {
    /// Resolve configured options, falling back to defaults for anything unset.
    pub fn options_from_config(cfg: &EngineConfig) -> EngineOptions {
        let defaults = EngineOptions::default();
        EngineOptions {
            max_concurrency: cfg
                .max_concurrency
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrency),
            call_timeout: cfg
                .call_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.call_timeout),
            retry_attempts: cfg.retry_attempts.unwrap_or(defaults.retry_attempts),
            retry_backoff: cfg
                .retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
        }
    }

    /// Create an engine for `provider` based on the configuration
    pub fn from_config(cfg: &EngineConfig, provider: Arc<dyn ResourceProvider>) -> ProvisioningEngine {
        ProvisioningEngine::new(provider, Self::options_from_config(cfg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::{DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_RETRY_ATTEMPTS};

    #[test]
    fn test_defaults_fill_unset_options() {
        let options = EngineFactory::options_from_config(&EngineConfig::default());
        assert!(options.max_concurrency >= 1);
        assert_eq!(options.call_timeout, Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS));
        assert_eq!(options.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    }

    #[test]
    fn test_configured_options_win() {
        let cfg = EngineConfig {
            max_concurrency: Some(2),
            call_timeout_seconds: Some(30),
            retry_attempts: Some(3),
            retry_backoff_ms: Some(0),
        };
        let options = EngineFactory::options_from_config(&cfg);
        assert_eq!(options.max_concurrency, 2);
        assert_eq!(options.call_timeout, Duration::from_secs(30));
        assert_eq!(options.retry_attempts, 3);
        assert_eq!(options.retry_backoff, Duration::ZERO);
    }

    #[test]
    fn test_zero_concurrency_falls_back() {
        let cfg = EngineConfig {
            max_concurrency: Some(0),
            ..Default::default()
        };
        assert!(EngineFactory::options_from_config(&cfg).max_concurrency >= 1);
    }
}
