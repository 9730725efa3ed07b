//! Error types for value normalization.
//!
//! Raised while turning raw on-chain encodings (decimal minor units, hex wei,
//! hex hashes and addresses) into typed values. A record that fails here is
//! dropped at ingestion and counted; it never aborts a run.

/// Errors that can occur while normalizing a raw record.
///
/// # Examples
///
/// ```rust
/// use txfinder::{normalize::normalize, TokenDecimals, ValueError};
///
/// match normalize("12.5", TokenDecimals::USDC) {
///     Err(ValueError::MalformedValue { field, .. }) => assert_eq!(field, "value"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// The input is not a valid encoding for the expected type.
    ///
    /// Covers non-digit characters, empty strings, missing `0x` prefixes on
    /// hex input and integers that do not fit in 256 bits.
    #[error("Malformed {field} {input:?}: {reason}")]
    MalformedValue {
        /// Which field of the record was being parsed
        field: String,
        /// The raw input, truncated for display
        input: String,
        /// Why parsing failed
        reason: String,
    },
}

impl ValueError {
    /// Maximum number of input characters kept in the error.
    const MAX_INPUT_LEN: usize = 80;

    /// Create a `MalformedValue` error for `field`.
    pub fn malformed(
        field: impl Into<String>,
        input: impl AsRef<str>,
        reason: impl Into<String>,
    ) -> Self {
        let input: String = input.as_ref().chars().take(Self::MAX_INPUT_LEN).collect();
        ValueError::MalformedValue {
            field: field.into(),
            input,
            reason: reason.into(),
        }
    }

    /// Name of the field that failed to parse.
    pub fn field(&self) -> &str {
        match self {
            ValueError::MalformedValue { field, .. } => field,
        }
    }
}
