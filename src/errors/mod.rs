//! Error types for the txfinder library.
//!
//! Mirrors the failure taxonomy of the matching engine:
//!
//! - [`ValueError`] - a raw record carried a bad numeric or hex encoding; the
//!   record is dropped at normalization and counted
//! - [`SourceFetchError`] - an external collaborator failed; aborts only the
//!   affected source (or leaves a single candidate unresolved)
//! - [`ConfigurationError`] - invalid search parameters; fatal, raised before
//!   any fetch begins
//!
//! An ETH-equivalent value that cannot be determined is not an error at all:
//! it is represented by [`EthValue::Unresolved`](crate::EthValue::Unresolved).
//!
//! [`FinderError`] wraps all of them for callers that do not need to tell the
//! sources apart.

mod config;
mod source;
mod value;

pub use config::ConfigurationError;
pub use source::SourceFetchError;
pub use value::ValueError;

/// Unified error type for all txfinder operations.
///
/// Module-specific errors convert into `FinderError` via `From`, so `?`
/// propagates naturally.
///
/// # Examples
///
/// ```rust
/// use txfinder::{ConfigurationError, FinderError};
///
/// fn validate(tolerance: f64) -> Result<(), FinderError> {
///     if tolerance < 0.0 {
///         return Err(ConfigurationError::invalid_parameter("tolerance", "must be >= 0").into());
///     }
///     Ok(())
/// }
///
/// assert!(matches!(validate(-1.0), Err(FinderError::Configuration(_))));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    /// Invalid or missing run configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Failure of an external data collaborator.
    #[error("Source fetch error: {0}")]
    SourceFetch(#[from] SourceFetchError),

    /// Malformed raw value.
    #[error("Value error: {0}")]
    Value(#[from] ValueError),
}
