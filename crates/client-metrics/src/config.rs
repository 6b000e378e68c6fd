// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BUFFER_LIMIT: usize = 50;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);
/// Upper bound on `flush_interval`; the timer must be able to add it to the current instant.
pub const MAX_FLUSH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Buffering and flushing parameters for a [`crate::engine::MetricsEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// A queue holding more than this many items triggers a flush of both queues
    pub buffer_limit: usize,
    /// Period of the background flush timer
    pub flush_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_limit: DEFAULT_BUFFER_LIMIT,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let buffer_limit = env::var("CLIENT_METRICS_BUFFER_LIMIT")
            .ok()
            .and_then(|limit| limit.parse::<usize>().ok())
            .unwrap_or(DEFAULT_BUFFER_LIMIT);
        let flush_interval = env::var("CLIENT_METRICS_FLUSH_INTERVAL_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FLUSH_INTERVAL);

        let config = Self {
            buffer_limit,
            flush_interval,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_limit == 0 {
            return Err(ConfigError::Invalid(
                "buffer limit must be greater than 0".to_string(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "flush interval must be greater than 0".to_string(),
            ));
        }
        if self.flush_interval > MAX_FLUSH_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "flush interval must be at most {}s",
                MAX_FLUSH_INTERVAL.as_secs()
            )));
        }
        Ok(())
    }
}

/// Where and how the HTTP transport posts batches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Collector base URL; batches go to `{endpoint}/metrics` and `{endpoint}/clientmetrics`
    pub endpoint: String,
    pub timeout: Duration,
    pub https_proxy: Option<String>,
}

impl HttpTransportConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            https_proxy: None,
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env::var("CLIENT_METRICS_URL").map_err(|_| {
            ConfigError::Invalid("CLIENT_METRICS_URL environment variable is not set".to_string())
        })?;
        let timeout = env::var("CLIENT_METRICS_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let https_proxy = env::var("CLIENT_METRICS_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();

        let config = Self {
            endpoint,
            timeout,
            https_proxy,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn url_for(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint.trim().trim_end_matches('/'))
    }
}
