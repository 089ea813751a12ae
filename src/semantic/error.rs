//! Semantic analysis error types.

use crate::token::Span;

/// The kind of semantic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// A name defined twice (second struct, second function body, second
    /// global initializer, or a name reused across item kinds).
    DuplicateDefinition,
    /// A redeclaration whose type or mutability differs from the first
    /// declaration.
    IncompatibleRedeclaration,
    /// A bare `name = expr` definition with no matching declaration.
    UndeclaredGlobal,
    /// A named type that does not exist.
    UnknownType,
    /// A struct that participates in a value-member cycle.
    CyclicStruct,
    /// A struct member of type `void`.
    VoidMember,
    /// A struct member of function type.
    FunctionMember,
    /// A type that is invalid in its position (e.g. a `void` global).
    InvalidType,
}

/// An error that occurred during type-context construction.
///
/// Contains a structured kind, a human-readable message, and the source
/// location where the error occurred.
#[derive(Debug)]
pub struct SemanticError {
    kind: SemanticErrorKind,
    message: String,
    span: Span,
}

impl SemanticError {
    /// Creates a new error at `span`.
    pub fn new(kind: SemanticErrorKind, message: impl Into<String>, span: Span) -> Self {
        SemanticError {
            kind,
            message: message.into(),
            span,
        }
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> SemanticErrorKind {
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

impl std::fmt::Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for SemanticError {}
