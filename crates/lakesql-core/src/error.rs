//! Error types for validation and SQL compilation.

use crate::operation::OperationKind;
use crate::validate::FragmentKind;

/// Why a fragment was rejected by the validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The fragment was empty after stripping delimiters and whitespace.
    #[error("must not be empty")]
    Empty,

    /// The identifier exceeds the maximum identifier length.
    #[error("too long ({length} characters, maximum is {max})")]
    TooLong {
        /// Length of the rejected identifier.
        length: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// The identifier does not begin with an alphabetic character.
    #[error("must start with a letter")]
    MustStartWithLetter,

    /// The fragment contains a character outside the accepted set.
    #[error("invalid character {0:?}")]
    InvalidCharacter(char),

    /// The fragment matched an entry of the deny-list.
    #[error("dangerous pattern ({0})")]
    DangerousPattern(String),

    /// Quotes, brackets, or parentheses do not pair up.
    #[error("unbalanced {0:?}")]
    Unbalanced(char),

    /// The fragment does not have the shape its kind requires.
    #[error("malformed value")]
    Malformed,

    /// A statement terminator is followed by a second statement.
    #[error("dangerous pattern (statement terminator followed by another statement)")]
    StatementStacking,

    /// A numeric value has no SQL representation (NaN or infinity).
    #[error("not a finite number")]
    InvalidNumber,
}

/// A rejected identifier, expression, or SQL text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}': {reason}")]
pub struct ValidationError {
    /// What the fragment was meant to be.
    pub kind: FragmentKind,
    /// The offending input, as supplied.
    pub value: String,
    /// The specific rule that rejected it.
    pub reason: Rejection,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(kind: FragmentKind, value: impl Into<String>, reason: Rejection) -> Self {
        Self {
            kind,
            value: value.into(),
            reason,
        }
    }
}

/// Errors that can occur while building an operation or compiling it to SQL.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A field of the operation failed validation.
    #[error("validation failed for field '{field}': {source}")]
    Validation {
        /// Name of the operation field that carried the fragment.
        field: String,
        /// The underlying rejection.
        #[source]
        source: ValidationError,
    },

    /// The dialect has no builder for this operation.
    #[error("unsupported operation: dialect '{dialect}' does not support {operation}")]
    UnsupportedOperation {
        /// Name of the dialect.
        dialect: &'static str,
        /// Variant tag of the rejected operation.
        operation: OperationKind,
    },

    /// The operation is supported but requested a clause the dialect cannot express.
    #[error("unsupported operation: dialect '{dialect}' cannot express {feature} in {operation}")]
    UnsupportedFeature {
        /// Name of the dialect.
        dialect: &'static str,
        /// Variant tag of the operation.
        operation: OperationKind,
        /// The clause that cannot be emitted.
        feature: &'static str,
    },

    /// The operation violates one of its own shape invariants.
    #[error("malformed operation {operation}: {message}")]
    MalformedOperation {
        /// Variant tag of the operation.
        operation: OperationKind,
        /// Which invariant was violated.
        message: String,
    },

    /// The configuration names a backend no dialect implements.
    #[error("platform not supported: '{0}'")]
    UnrecognizedBackend(String),

    /// The configuration descriptor could not be resolved for its backend.
    #[error("invalid configuration for backend '{backend}': {message}")]
    InvalidConfig {
        /// Backend the descriptor was resolved for.
        backend: String,
        /// What was wrong with it.
        message: String,
    },
}

impl CompileError {
    /// Wraps a validation failure with the field it came from.
    #[must_use]
    pub fn validation(field: impl Into<String>, source: ValidationError) -> Self {
        Self::Validation {
            field: field.into(),
            source,
        }
    }

    /// Creates a malformed-operation error.
    #[must_use]
    pub fn malformed(operation: OperationKind, message: impl Into<String>) -> Self {
        Self::MalformedOperation {
            operation,
            message: message.into(),
        }
    }

    /// Returns the rejection reason if this is a validation failure.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Validation { source, .. } => Some(&source.reason),
            _ => None,
        }
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
