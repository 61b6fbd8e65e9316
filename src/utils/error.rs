//! Error handling for PLC

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Which pass raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Analysis,
    Runtime,
}

/// Analyzer and interpreter error.
///
/// Every error aborts the pass that raised it; there is no recovery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Static Errors ====================

    #[error("Missing entry point: {message}")]
    EntryPoint { message: String },

    #[error("Unknown type: {name}")]
    UnknownType { name: String, span: Span },

    #[error("Unresolved name: {name}")]
    UnresolvedName { name: String, span: Span },

    #[error("Duplicate binding: {name}")]
    DuplicateBinding { name: String, span: Span },

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("Literal out of range: {literal}")]
    LiteralRange { literal: String, span: Span },

    #[error("Invalid statement form: {message}")]
    InvalidStatementForm { message: String, span: Span },

    // ==================== Runtime Errors ====================

    #[error("Division by zero")]
    DivisionByZero { span: Span },

    #[error("Negative exponent: {exponent}")]
    NegativeExponent { exponent: String, span: Span },

    #[error("Index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: String, len: usize, span: Span },

    #[error("IO error: {0}")]
    Io(String),
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnknownType { span, .. } => Some(*span),
            Self::UnresolvedName { span, .. } => Some(*span),
            Self::DuplicateBinding { span, .. } => Some(*span),
            Self::TypeMismatch { span, .. } => Some(*span),
            Self::LiteralRange { span, .. } => Some(*span),
            Self::InvalidStatementForm { span, .. } => Some(*span),
            Self::DivisionByZero { span } => Some(*span),
            Self::NegativeExponent { span, .. } => Some(*span),
            Self::IndexOutOfBounds { span, .. } => Some(*span),
            Self::EntryPoint { .. } | Self::Io(_) => None,
        }
    }

    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            Self::EntryPoint { .. } => "E0001",
            Self::UnknownType { .. } => "E0002",
            Self::UnresolvedName { .. } => "E0003",
            Self::DuplicateBinding { .. } => "E0004",
            Self::TypeMismatch { .. } => "E0005",
            Self::LiteralRange { .. } => "E0006",
            Self::InvalidStatementForm { .. } => "E0007",
            Self::DivisionByZero { .. } => "E0101",
            Self::NegativeExponent { .. } => "E0102",
            Self::IndexOutOfBounds { .. } => "E0103",
            Self::Io(_) => "E0104",
        }
    }

    /// The pass that raises this kind of error.
    ///
    /// `TypeMismatch` and `UnresolvedName` can also surface at runtime when
    /// the interpreter is driven over an unchecked tree; they are reported as
    /// analysis errors since a checked tree never produces them.
    pub fn phase(&self) -> Phase {
        match self {
            Self::DivisionByZero { .. }
            | Self::NegativeExponent { .. }
            | Self::IndexOutOfBounds { .. }
            | Self::Io(_) => Phase::Runtime,
            _ => Phase::Analysis,
        }
    }

    pub(crate) fn mismatch(expected: impl ToString, got: impl ToString, span: Span) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
            span,
        }
    }

    pub(crate) fn invalid_form(message: impl Into<String>, span: Span) -> Self {
        Self::InvalidStatementForm {
            message: message.into(),
            span,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
