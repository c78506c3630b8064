//! Application Configuration
//!
//! Configuration for the request client.

use std::time::Duration;

/// Request client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin, e.g. `https://api.example.test`
    pub base_url: String,
    /// Per-request timeout (original request and retry alike)
    pub request_timeout: Duration,
    /// Timeout for the refresh exchange
    pub refresh_timeout: Duration,
    /// Refresh endpoint path
    pub refresh_path: String,
    /// `User-Agent` header value
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            request_timeout: Duration::from_secs(15),
            refresh_timeout: Duration::from_secs(10),
            refresh_path: "/v1/auth/refresh".to_string(),
            user_agent: concat!("rewards-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at `base_url` with default timeouts
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Create config for development (local API, generous timeouts for debugging)
    pub fn development() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            refresh_timeout: Duration::from_secs(30),
            ..Default::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Absolute URL for `endpoint`; absolute endpoints pass through unchanged
    pub fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let config = ClientConfig::new("http://api.local/");
        assert_eq!(config.url("/v1/auth/refresh"), "http://api.local/v1/auth/refresh");
        assert_eq!(config.url("v1/intent/capture"), "http://api.local/v1/intent/capture");
        assert_eq!(config.url("https://other.host/x"), "https://other.host/x");
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.refresh_timeout, Duration::from_secs(10));
        assert_eq!(config.refresh_path, "/v1/auth/refresh");
    }
}
