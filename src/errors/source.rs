//! Error types for external data collaborators.
//!
//! Every collaborator (block resolver, transfer and transaction fetchers,
//! value and receipt lookups) reports failures through [`SourceFetchError`].
//! The split between transient and permanent failures drives the retry layer:
//! only [`SourceFetchError::Transient`] is retried.

/// Errors returned by the external data collaborators.
///
/// # Examples
///
/// ```rust
/// use txfinder::SourceFetchError;
///
/// let err = SourceFetchError::transient("tokentx page 2", "connection reset");
/// assert!(err.is_retryable());
///
/// let err = SourceFetchError::malformed("tokentx page 2", "result is not an array");
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceFetchError {
    /// A network-level failure that may succeed on retry.
    ///
    /// Connection errors, timeouts, HTTP 5xx and explicit rate-limit
    /// responses from the API all land here.
    #[error("Transient failure during {operation}: {details}")]
    Transient {
        /// Description of the request that failed
        operation: String,
        /// Details about the failure
        details: String,
    },

    /// The response could not be interpreted.
    ///
    /// Retrying will not help; the affected candidate is left unresolved or
    /// the affected source is reported as failed.
    #[error("Malformed response for {operation}: {details}")]
    Malformed {
        /// Description of the request that failed
        operation: String,
        /// What was wrong with the response
        details: String,
    },

    /// The API understood the request and refused it (bad key, bad params).
    #[error("Request rejected during {operation}: {message}")]
    Rejected {
        /// Description of the request that failed
        operation: String,
        /// Message returned by the API
        message: String,
    },

    /// No API key was configured for a client that needs one.
    #[error("Missing API key for block explorer client")]
    MissingApiKey,
}

impl SourceFetchError {
    /// Create a `Transient` error.
    pub fn transient(operation: impl Into<String>, details: impl Into<String>) -> Self {
        SourceFetchError::Transient {
            operation: operation.into(),
            details: details.into(),
        }
    }

    /// Create a `Malformed` error.
    pub fn malformed(operation: impl Into<String>, details: impl Into<String>) -> Self {
        SourceFetchError::Malformed {
            operation: operation.into(),
            details: details.into(),
        }
    }

    /// Create a `Rejected` error.
    pub fn rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        SourceFetchError::Rejected {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceFetchError::Transient { .. })
    }
}
