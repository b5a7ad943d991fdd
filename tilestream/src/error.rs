//! Crate-level error taxonomy.
//!
//! Four failure families cross this crate's seams: transport failures
//! (the request never yielded a usable response), protocol failures
//! (the service answered with an exception document), decode failures
//! (bytes that cannot be opened or do not match the dataset's shape),
//! and local I/O failures. None of them are retried here; callers see
//! exactly one `Error` per failed operation.

use thiserror::Error;

use crate::coord::CoordError;
use crate::decode::DecodeError;
use crate::exception::ExceptionRecord;
use crate::minidriver::DriverError;

/// Errors surfaced by dataset read and prefetch operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-level failure: timeout, connection error, unexpected
    /// status code, or an empty body.
    #[error("transport failure for {url}: {detail}")]
    Transport {
        /// Request URL
        url: String,
        /// HTTP status, when the exchange completed
        status: Option<u16>,
        /// Human-readable cause
        detail: String,
    },

    /// The service returned a recognizable exception document instead
    /// of tile data. `records` holds every exception extracted from it;
    /// an empty list means the document matched the exception signature
    /// but no record could be parsed out of it.
    #[error("service exception for {url} ({} record(s))", .records.len())]
    Protocol {
        /// Request URL
        url: String,
        /// Structured exception records, possibly empty
        records: Vec<ExceptionRecord>,
    },

    /// A downloaded or cached tile could not be decoded into the
    /// dataset's bands.
    #[error("decode failure for {what}: {source}")]
    Decode {
        /// URL or file path of the offending tile
        what: String,
        #[source]
        source: DecodeError,
    },

    /// Local file operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A resolved configuration value is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller arguments do not fit the dataset's geometry.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Tile URL construction failed.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// Block grid arithmetic failed.
    #[error("coordinate error: {0}")]
    Coord(#[from] CoordError),
}

impl Error {
    /// Transport failure for a completed exchange with a status code.
    pub(crate) fn transport_status(url: &str, status: u16, detail: impl Into<String>) -> Self {
        Error::Transport {
            url: url.to_string(),
            status: Some(status),
            detail: detail.into(),
        }
    }

    /// Transport failure without a status code (the exchange never
    /// completed).
    pub(crate) fn transport(url: &str, detail: impl Into<String>) -> Self {
        Error::Transport {
            url: url.to_string(),
            status: None,
            detail: detail.into(),
        }
    }

    /// Decode failure attributed to a URL or local path.
    pub(crate) fn decode(what: impl Into<String>, source: DecodeError) -> Self {
        Error::Decode {
            what: what.into(),
            source,
        }
    }
}
