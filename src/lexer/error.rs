//! Lexical analysis error types.
//!
//! This module defines [`LexError`], which covers both tokenization
//! failures and preprocessor failures (the preprocessor runs inside the
//! lexer, so its errors surface through the same type).

use crate::token::Span;

/// The kind of lexical error.
///
/// Preprocessor kinds report under the `PreprocessorError` heading; all
/// other kinds report under `LexError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A byte with no rule in the current FSM state.
    UnexpectedCharacter,
    /// A line ended while a token was still being built.
    UnexpectedEndOfLine,
    /// An operator sequence that matches no operator or prefix.
    MalformedOperator,
    /// A numeric literal with more than one `.`.
    MalformedNumber,
    /// An `#IMPORT` argument that is neither `"path"` nor `<library>`.
    ImportSyntax,
    /// An `#IMPORT`ed file could not be read.
    ImportNotFound,
    /// The `#IMPORT` nesting bound was exceeded.
    ImportDepthExceeded,
    /// A preprocessor command that does not exist.
    UnknownCommand,
    /// A recognized preprocessor command with no implementation
    /// (`#IMPORT <lib>`, `#DEFINE`, `#UNDEFINE`, `#IFDEF`, `#ENDIF`).
    UnimplementedCommand,
    /// `lex` was called twice on the same lexer instance.
    LexerReused,
}

impl LexErrorKind {
    /// Returns the taxonomy heading errors of this kind report under.
    pub fn title(&self) -> &'static str {
        match self {
            LexErrorKind::UnknownCommand | LexErrorKind::UnimplementedCommand => {
                "PreprocessorError"
            }
            _ => "LexError",
        }
    }
}

/// An error that occurred during lexical analysis.
///
/// Contains a structured kind, a human-readable message, and the source
/// location where the error occurred, enabling rich error reporting.
#[derive(Debug)]
pub struct LexError {
    kind: LexErrorKind,
    message: String,
    span: Span,
}

impl LexError {
    /// Creates a new error.
    pub fn new(kind: LexErrorKind, message: impl Into<String>, span: Span) -> Self {
        LexError {
            kind,
            message: message.into(),
            span,
        }
    }

    /// Creates an "unexpected character" error for `byte` in `state`.
    pub fn unexpected_character(byte: u8, state: &str, span: Span) -> Self {
        let printable = if byte.is_ascii_graphic() || byte == b' ' {
            format!("'{}'", byte as char)
        } else {
            format!("0x{:02X}", byte)
        };
        LexError::new(
            LexErrorKind::UnexpectedCharacter,
            format!("unexpected character {} in {} state", printable, state),
            span,
        )
    }

    /// Creates an "end of line" error for a line ending in `state`.
    pub fn unexpected_end_of_line(state: &str, span: Span) -> Self {
        LexError::new(
            LexErrorKind::UnexpectedEndOfLine,
            format!("end of line while still in {} state", state),
            span,
        )
    }

    /// Creates a malformed-operator error.
    pub fn malformed_operator(span: Span) -> Self {
        LexError::new(
            LexErrorKind::MalformedOperator,
            "syntax error around operator",
            span,
        )
    }

    /// Creates a malformed-number error for the literal `text`.
    pub fn malformed_number(text: &str, span: Span) -> Self {
        LexError::new(
            LexErrorKind::MalformedNumber,
            format!("syntax error around number '{}'", text),
            span,
        )
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> LexErrorKind {
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

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.span.line, self.span.column, self.message
        )
    }
}

impl std::error::Error for LexError {}
