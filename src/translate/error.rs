//! Translation error types.

use crate::token::Span;

/// The kind of translation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateErrorKind {
    /// A top-level group that is none of the four item forms.
    ExpectedItem,
    /// A name was required (declaration, function header).
    ExpectedName,
    /// A type was required.
    ExpectedType,
    /// An item form with the right leading token but the wrong shape.
    MalformedItem,
    /// An expression was required but the group is empty.
    EmptyExpression,
    /// A group that matches no expression form.
    MalformedExpression,
    /// A keyword with no translation (`cast`, `sizeof`, `if`, `while`,
    /// `for`) used in an expression or item position.
    ReservedKeyword,
    /// An operator token that reaches the reducer but has no AST
    /// lowering.
    UnsupportedOperator,
    /// An operator missing one of its operands.
    MissingOperand,
    /// An operand that does not produce a readable value.
    NotReadable,
    /// An assignment target that is not writable.
    NotWritable,
}

/// An error that occurred while translating the reduced tree to an AST.
#[derive(Debug)]
pub struct TranslateError {
    kind: TranslateErrorKind,
    message: String,
    span: Span,
}

impl TranslateError {
    /// Creates a new error at `span`.
    pub fn new(kind: TranslateErrorKind, message: impl Into<String>, span: Span) -> Self {
        TranslateError {
            kind,
            message: message.into(),
            span,
        }
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> TranslateErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source location of the error.
    pub fn span(&self) -> Span {
        self.span
    }
}

impl std::fmt::Display for TranslateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for TranslateError {}
