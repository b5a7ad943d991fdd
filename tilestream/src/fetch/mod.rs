//! Batched tile transfer
//!
//! One [`BatchFetcher`] call performs every network request of one
//! coordinator invocation: N URLs in, N results out, index-aligned.
//! The fetcher reports transport outcomes without judging them; the
//! coordinator decides what a 404 or an empty body means.

mod http;

pub use http::HttpBatchFetcher;

#[cfg(test)]
pub use http::tests::MockBatchFetcher;

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::config::FetchConfig;

/// Options applied to every request of one fetch batch.
#[derive(Clone, Debug)]
pub struct FetchOptions {
    /// Maximum requests in flight at once
    pub max_connections: usize,
    /// Per-request timeout
    pub timeout: Duration,
    /// User-Agent header, when set
    pub user_agent: Option<String>,
    /// Referer header, when set
    pub referer: Option<String>,
    /// Accept TLS certificates that fail verification
    pub accept_invalid_certs: bool,
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            timeout: config.timeout,
            user_agent: config.user_agent.clone(),
            referer: config.referer.clone(),
            accept_invalid_certs: config.accept_invalid_certs,
        }
    }
}

/// One completed HTTP exchange, successful or not.
///
/// Carries whatever the server answered; a 404 with an HTML error page
/// is still a `FetchResponse`.
#[derive(Clone, Debug)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, possibly empty
    pub body: Bytes,
}

impl FetchResponse {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request that never produced a response (connection failure,
/// timeout, unreadable body).
#[derive(Clone, Debug, PartialEq)]
pub struct FetchError {
    detail: String,
}

impl FetchError {
    /// Create a fetch error from a human-readable cause.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Human-readable cause.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail)
    }
}

impl std::error::Error for FetchError {}

/// Outcome of one request within a batch.
pub type FetchResult = Result<FetchResponse, FetchError>;

/// Trait for transports that satisfy a whole fetch batch.
///
/// Implementations must return exactly one result per input URL, in
/// input order, and must not retry failed requests.
pub trait BatchFetcher: Send + Sync {
    /// Perform every request of one batch.
    fn fetch_all(&self, urls: &[String], options: &FetchOptions) -> Vec<FetchResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config() {
        let config = FetchConfig::new()
            .with_max_connections(3)
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("agent")
            .with_referer("http://example.com")
            .with_accept_invalid_certs(true);

        let options = FetchOptions::from(&config);
        assert_eq!(options.max_connections, 3);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.user_agent.as_deref(), Some("agent"));
        assert_eq!(options.referer.as_deref(), Some("http://example.com"));
        assert!(options.accept_invalid_certs);
    }

    #[test]
    fn test_response_success_range() {
        let ok = FetchResponse {
            status: 200,
            body: Bytes::from_static(b"data"),
        };
        assert!(ok.is_success());

        let no_content = FetchResponse {
            status: 204,
            body: Bytes::new(),
        };
        assert!(no_content.is_success());

        let not_found = FetchResponse {
            status: 404,
            body: Bytes::new(),
        };
        assert!(!not_found.is_success());
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::new("connection refused");
        assert_eq!(format!("{}", err), "connection refused");
        assert_eq!(err.detail(), "connection refused");
    }
}
