//! Resilience configuration with builder pattern
//!
//! Bundles the knobs that shape how hard the migration leans on each backend:
//! how many catalog requests may be in flight, and how long the document
//! store applier pauses between writes.

use std::time::Duration;

/// Execution limits for both backends
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub concurrency: ConcurrencyConfig,
    pub throttle: ThrottleConfig,
}

/// Concurrency limiting configuration
#[derive(Debug, Clone)]
pub struct ConcurrencyConfig {
    /// Maximum concurrent HTTP requests to the catalog API
    pub max_concurrent_requests: usize,
    /// Whether concurrency limiting is enabled
    pub enabled: bool,
}

/// Fixed-delay throttling for backends that reject request bursts
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Pause inserted between two consecutive writes
    pub delay: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyConfig::default(),
            throttle: ThrottleConfig::default(),
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 20,
            enabled: true,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        // 100ms keeps the promotions container below its request-unit budget
        Self {
            delay: Duration::from_millis(100),
        }
    }
}

impl ConcurrencyConfig {
    /// Number of operations a batch may keep in flight. Never below one.
    pub fn batch_width(&self) -> usize {
        if self.enabled {
            self.max_concurrent_requests.max(1)
        } else {
            usize::MAX
        }
    }
}

impl ResilienceConfig {
    /// Create a new builder for ResilienceConfig
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }
}

/// Builder for ResilienceConfig
#[derive(Debug)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    /// Set max concurrent requests
    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.config.concurrency.max_concurrent_requests = max;
        self
    }

    /// Set the pause between sequential writes
    pub fn throttle_delay(mut self, delay: Duration) -> Self {
        self.config.throttle.delay = delay;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResilienceConfig::default();

        assert_eq!(config.concurrency.max_concurrent_requests, 20);
        assert!(config.concurrency.enabled);
        assert_eq!(config.throttle.delay, Duration::from_millis(100));
    }

    #[test]
    fn test_unlimited_batch_width() {
        let config = ConcurrencyConfig {
            max_concurrent_requests: 3,
            enabled: false,
        };
        assert_eq!(config.batch_width(), usize::MAX);
    }

    #[test]
    fn test_batch_width_never_zero() {
        let config = ConcurrencyConfig {
            max_concurrent_requests: 0,
            enabled: true,
        };
        assert_eq!(config.batch_width(), 1);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ResilienceConfig::builder()
            .max_concurrent_requests(5)
            .throttle_delay(Duration::from_millis(250))
            .build();

        assert_eq!(config.concurrency.max_concurrent_requests, 5);
        assert!(config.concurrency.enabled);
        assert_eq!(config.concurrency.batch_width(), 5);
        assert_eq!(config.throttle.delay, Duration::from_millis(250));
    }
}
