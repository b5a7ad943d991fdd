//! Fetch configuration for a remote dataset.
//!
//! All values arrive already resolved; parsing service description
//! files is a concern of the embedding application. The defaults here
//! match a cautious online dataset: no zero-fill except explicit
//! no-content answers, prefetch off, requests clamped to the raster.

use std::collections::BTreeSet;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum number of parallel connections per fetch batch.
pub const DEFAULT_MAX_CONNECTIONS: usize = 8;

/// HTTP status codes treated as "empty block" out of the box.
///
/// 204 No Content is the only default: the server explicitly said the
/// tile has no data, which is not an error.
pub const DEFAULT_ZERO_BLOCK_CODES: &[u16] = &[204];

/// Resolved fetch behavior for one dataset.
///
/// Shared by every band and overview of the dataset; immutable after
/// the dataset is built.
#[derive(Clone, Debug)]
pub struct FetchConfig {
    /// Never touch the network; uncached blocks become zero blocks.
    pub offline: bool,

    /// Maximum parallel connections within one fetch batch.
    pub max_connections: usize,

    /// Per-request timeout.
    pub timeout: Duration,

    /// User-Agent header, when set.
    pub user_agent: Option<String>,

    /// Referer header, when set.
    pub referer: Option<String>,

    /// Accept TLS certificates that fail verification.
    pub accept_invalid_certs: bool,

    /// HTTP status codes that yield a zero block instead of a failure.
    pub zero_block_codes: BTreeSet<u16>,

    /// Whether a classified service exception yields a zero block
    /// instead of a failure.
    pub zero_block_on_exception: bool,

    /// Whether prefetch requests are honored at all.
    pub advise_read: bool,

    /// Whether prefetched tiles are decoded before being trusted.
    pub verify_advise_read: bool,

    /// Whether request windows are clamped to the raster extent.
    pub clamp_requests: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            offline: false,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            referer: None,
            accept_invalid_certs: false,
            zero_block_codes: DEFAULT_ZERO_BLOCK_CODES.iter().copied().collect(),
            zero_block_on_exception: false,
            advise_read: false,
            verify_advise_read: false,
            clamp_requests: true,
        }
    }
}

impl FetchConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set offline mode.
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the maximum parallel connections per batch.
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the Referer header.
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Accept TLS certificates that fail verification.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Replace the set of zero-block status codes.
    pub fn with_zero_block_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.zero_block_codes = codes.into_iter().collect();
        self
    }

    /// Add one status code to the zero-block set.
    pub fn with_zero_block_code(mut self, code: u16) -> Self {
        self.zero_block_codes.insert(code);
        self
    }

    /// Zero-fill blocks whose response is a classified service exception.
    pub fn with_zero_block_on_exception(mut self, enabled: bool) -> Self {
        self.zero_block_on_exception = enabled;
        self
    }

    /// Enable or disable prefetch handling.
    pub fn with_advise_read(mut self, enabled: bool) -> Self {
        self.advise_read = enabled;
        self
    }

    /// Decode prefetched tiles instead of trusting them unopened.
    pub fn with_verify_advise_read(mut self, enabled: bool) -> Self {
        self.verify_advise_read = enabled;
        self
    }

    /// Clamp request windows to the raster extent.
    pub fn with_clamp_requests(mut self, enabled: bool) -> Self {
        self.clamp_requests = enabled;
        self
    }

    /// Whether the given status code is configured as "empty block".
    pub fn is_zero_block_code(&self, status: u16) -> bool {
        self.zero_block_codes.contains(&status)
    }
}
