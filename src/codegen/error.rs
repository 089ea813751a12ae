//! Code generation error and warning types.

use crate::token::Span;

/// The kind of code generation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodegenErrorKind {
    /// An expression that must fold to an immediate but does not.
    NotConstant,
    /// A write to a `const` name.
    WriteToConstant,
    /// A name that is neither a local, a global, nor a function.
    UnknownName,
    /// Operand types that do not fit the operation.
    TypeMismatch,
    /// Division by a constant zero.
    DivisionByZero,
    /// A call with the wrong argument count, too many arguments for the
    /// register convention, or a non-function target.
    InvalidCall,
    /// A `return` that does not match the function's return type.
    InvalidReturn,
    /// A numeric literal that fits no numeric type.
    InvalidNumber,
    /// Two locals with the same name in one function.
    DuplicateLocal,
    /// A construct with no lowering (pointer dereference, struct
    /// values in expressions).
    Unsupported,
}

/// An error that occurred during code generation.
///
/// Contains a structured kind, a human-readable message, and optionally
/// the source location where the error occurred.
#[derive(Debug)]
pub struct CodegenError {
    kind: CodegenErrorKind,
    message: String,
    span: Option<Span>,
}

impl CodegenError {
    /// Creates a new error with a source location.
    pub fn new(kind: CodegenErrorKind, message: impl Into<String>, span: Span) -> Self {
        CodegenError {
            kind,
            message: message.into(),
            span: Some(span),
        }
    }

    /// Creates a new error with no source location.
    pub fn without_span(kind: CodegenErrorKind, message: impl Into<String>) -> Self {
        CodegenError {
            kind,
            message: message.into(),
            span: None,
        }
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> CodegenErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source location of the error, if available.
    pub fn span(&self) -> Option<Span> {
        self.span
    }
}

impl std::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(span) = &self.span {
            write!(f, "{}:{}: {}", span.line, span.column, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for CodegenError {}

/// A non-fatal diagnostic produced during code generation.
///
/// Warnings are collected by the generator and reported by the driver;
/// they never stop the run.
#[derive(Debug, Clone)]
pub struct Warning {
    /// A human-readable description.
    pub message: String,
    /// The source location the warning points at.
    pub span: Span,
}

impl Warning {
    /// Creates a new warning.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Warning {
            message: message.into(),
            span,
        }
    }
}
