//! Error taxonomy for template evaluation and commitment building.
//!
//! Every failure aborts the whole build; there is no partial output and no
//! internal retry. Variants carry the offending function name or argument
//! position so callers can diagnose which input to correct.

use thiserror::Error;

/// Main error type for the format-commit pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("{function} expects {expected} parameter(s), got {actual}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("{function} failed type check: {expected} != {actual}")]
    TypeMismatch {
        function: String,
        expected: String,
        actual: String,
    },

    #[error("equals failed: {left} != {right}")]
    ValueMismatch { left: String, right: String },

    #[error("{function} index {index} out of range for {count} argument(s)")]
    IndexOutOfRange {
        function: String,
        index: String,
        count: usize,
    },

    #[error("unsupported argument type '{ty}' at position {position}")]
    UnsupportedType { ty: String, position: usize },

    #[error("{function} cannot convert from {from}")]
    UnsupportedConversion { function: String, from: String },

    #[error("{context}: byte length {actual} does not match {expected}")]
    LengthMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("duplicate metadata key: {0}")]
    DuplicateMetadataKey(String),

    #[error("malformed metadata directive: {0:?}")]
    MalformedMetadata(String),

    #[error("template parse failed: {0}")]
    Parse(String),

    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("invalid numeric value {value:?} for {context}")]
    InvalidNumber { value: String, context: String },

    #[error("invalid hex data {value:?}")]
    InvalidHex { value: String },

    #[error("invalid signature: {0:?}")]
    InvalidSignature(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for convenience
pub type FormatResult<T> = Result<T, FormatError>;

impl FormatError {
    /// Arity-check helper used by every registry function before it
    /// evaluates any operand.
    pub(crate) fn check_arity(
        function: &str,
        expected: usize,
        actual: usize,
    ) -> FormatResult<()> {
        if expected != actual {
            return Err(FormatError::ArityMismatch {
                function: function.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}
