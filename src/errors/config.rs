//! Error types for run configuration.
//!
//! Configuration errors are fatal and are reported before any network
//! request is made.

/// Errors raised while validating search parameters or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// A numeric or structural search parameter is out of range.
    ///
    /// Negative tolerances, a non-positive target, a zero combination size or
    /// an inverted time window all land here.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A required environment variable is missing or unparseable.
    #[error("Environment variable {var}: {reason}")]
    Environment {
        /// Name of the environment variable
        var: String,
        /// What was wrong with it
        reason: String,
    },

    /// None of the requested token symbols are known.
    #[error("No known token among requested symbols: {symbols}")]
    UnknownTokens {
        /// Comma separated list of the requested symbols
        symbols: String,
    },

    /// The address blocklist could not be loaded.
    #[error("Failed to load blocklist from {path}: {details}")]
    Blocklist {
        /// Path of the blocklist file
        path: String,
        /// Details about the failure
        details: String,
        /// The underlying I/O error, if any
        #[source]
        source: Option<std::io::Error>,
    },
}

impl ConfigurationError {
    /// Create an `InvalidParameter` error.
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an `Environment` error.
    pub fn environment(var: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigurationError::Environment {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Create a `Blocklist` error.
    pub fn blocklist(
        path: impl Into<String>,
        details: impl Into<String>,
        source: Option<std::io::Error>,
    ) -> Self {
        ConfigurationError::Blocklist {
            path: path.into(),
            details: details.into(),
            source,
        }
    }
}
