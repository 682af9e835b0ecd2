//! Error types for market-data operations.
//!
//! This module defines [`DataError`] which covers every failure that can occur
//! while validating a request, talking to the upstream provider, or reshaping
//! its responses.

use thiserror::Error;

/// Errors that can occur during market-data operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// The requested history period is not one of the supported values.
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Network-related errors (connection failures, unexpected HTTP status, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// The upstream request did not complete within the client timeout.
    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    /// Rate limit exceeded by the upstream provider.
    #[error("Rate limited by {provider}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
    },

    /// The requested symbol was not found.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The upstream provider answered with an error payload.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Error parsing data from the provider.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A price or dividend frame did not have the expected shape.
    #[error("Frame error: {0}")]
    Frame(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl DataError {
    /// Returns true if this error was caused by invalid client input
    /// rather than by the upstream provider or the service itself.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidPeriod(_))
    }
}

impl From<polars::error::PolarsError> for DataError {
    fn from(e: polars::error::PolarsError) -> Self {
        Self::Frame(e.to_string())
    }
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;
