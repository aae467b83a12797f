//! Connection-level settings for the `reqwest` client.
//!
//! The per-request timeout is not configured here: it travels on every
//! [`pipeline::OutgoingRequest`] so each registry controls its own.

use std::time::Duration;

/// Connection-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Connection establishment timeout (default: 5s).
    pub connect_timeout: Duration,
    /// How long an idle pooled connection is kept (default: 90s).
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10).
    pub pool_max_idle_per_host: usize,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: concat!("kb-request-layer/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl TransportConfig {
    /// Sets the connection establishment timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the `User-Agent` header value.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the connection pool limits.
    #[must_use]
    pub fn with_pool_config(mut self, idle_timeout: Duration, max_idle: usize) -> Self {
        self.pool_idle_timeout = idle_timeout;
        self.pool_max_idle_per_host = max_idle;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = TransportConfig::default()
            .with_connect_timeout(Duration::from_secs(1))
            .with_user_agent("test-agent")
            .with_pool_config(Duration::from_secs(10), 2);

        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.pool_max_idle_per_host, 2);
    }

    #[test]
    fn default_user_agent_carries_version() {
        assert!(TransportConfig::default()
            .user_agent
            .ends_with(env!("CARGO_PKG_VERSION")));
    }
}
