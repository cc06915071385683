//! Crate-wide error type.

use thiserror::Error;

/// Catch-all error for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A required configuration value was missing, out of range, or otherwise invalid (`spec.md`
    /// §7 "Configuration invalid").
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// The geometry described by a configuration is self-inconsistent: incompatible pitches,
    /// wrong region/material counts, unknown material IDs, etc. (§7 "Geometry malformed").
    #[error("malformed geometry: {0}")]
    Geometry(String),
    /// An angular quadrature specification is invalid (§7 "Quadrature invalid").
    #[error("invalid quadrature: {0}")]
    Quadrature(String),
    /// A `Source` was driven out of its legal build order.
    #[error("source assembled out of order: {0}")]
    SourceMisuse(String),
    /// A fatal numerical condition, e.g. a negative source with transverse-leakage splitting
    /// disabled (§7 "Numeric").
    #[error("numerical failure: {0}")]
    Numeric(String),
    /// An error that originates in this crate but doesn't fit the kinds above.
    #[error("{0}")]
    General(String),
    /// Error that does not originate from this crate.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias for this crate's [`Result`](std::result::Result).
pub type Result<T> = std::result::Result<T, Error>;
