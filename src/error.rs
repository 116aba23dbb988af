//! Error types for query option parsing and binding.

use thiserror::Error;

/// Result type alias using [`QueryError`].
pub type Result<T> = std::result::Result<T, QueryError>;

/// Error types for query option parsing and binding.
///
/// Every error aborts the whole parse or bind; there is no partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    // ==================== Lexing and Parsing ====================
    /// Malformed literal or unrecognized character.
    #[error("Lexical error at position {position}: {message}")]
    Lexical { position: usize, message: String },

    /// Token stream does not match the grammar.
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Nesting exceeded the caller-supplied recursion budget.
    #[error("Recursion limit of {limit} exceeded")]
    RecursionLimitExceeded { limit: usize },

    // ==================== Binding ====================
    /// Identifier is not a property, navigation or range variable.
    #[error("Could not find a property named '{name}' on type '{type_name}'")]
    UnknownIdentifier { name: String, type_name: String },

    /// Qualified type name is not defined in the model.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Function name matches neither a built-in nor a model operation.
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// More than one operation overload matches the call.
    #[error("Ambiguous overload for '{0}'")]
    AmbiguousOverload(String),

    /// Operand or result type is not what the construct requires.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Type cast to a type unrelated to the current one.
    #[error("Invalid cast: type '{to}' is not related to type '{from}'")]
    InvalidCast { from: String, to: String },

    // ==================== Paths ====================
    /// Select or expand path has too many segments.
    #[error("Path exceeds the maximum depth of {limit}")]
    PathTooDeep { limit: usize },

    /// Path segment is not valid in its position.
    #[error("Invalid path segment: {0}")]
    InvalidPathSegment(String),

    /// `$expand` tree is deeper or wider than configured.
    #[error("Expansion limit exceeded: {0}")]
    ExpansionLimitExceeded(String),

    // ==================== Model ====================
    /// Model construction errors (duplicate type, dangling reference, etc.).
    #[error("Schema error: {0}")]
    Schema(String),
}

/// Stable discriminant of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    RecursionLimitExceeded,
    UnknownIdentifier,
    UnknownType,
    UnknownFunction,
    AmbiguousOverload,
    TypeMismatch,
    InvalidCast,
    PathTooDeep,
    InvalidPathSegment,
    ExpansionLimitExceeded,
    Schema,
}

impl QueryError {
    /// Returns the discriminated kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Lexical { .. } => ErrorKind::Lexical,
            QueryError::Syntax { .. } => ErrorKind::Syntax,
            QueryError::RecursionLimitExceeded { .. } => ErrorKind::RecursionLimitExceeded,
            QueryError::UnknownIdentifier { .. } => ErrorKind::UnknownIdentifier,
            QueryError::UnknownType(_) => ErrorKind::UnknownType,
            QueryError::UnknownFunction(_) => ErrorKind::UnknownFunction,
            QueryError::AmbiguousOverload(_) => ErrorKind::AmbiguousOverload,
            QueryError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            QueryError::InvalidCast { .. } => ErrorKind::InvalidCast,
            QueryError::PathTooDeep { .. } => ErrorKind::PathTooDeep,
            QueryError::InvalidPathSegment(_) => ErrorKind::InvalidPathSegment,
            QueryError::ExpansionLimitExceeded(_) => ErrorKind::ExpansionLimitExceeded,
            QueryError::Schema(_) => ErrorKind::Schema,
        }
    }

    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        QueryError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn lexical(position: usize, message: impl Into<String>) -> Self {
        QueryError::Lexical {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        QueryError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
