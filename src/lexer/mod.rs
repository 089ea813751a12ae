//! Lexical analysis for the Tern programming language.
//!
//! This module provides the [`Lexer`], a table-driven finite-state machine
//! that converts source text into a stream of [`Token`]s, running the
//! preprocessor (`#ECHO`, `#IMPORT`) as it goes.
//!
//! # Overview
//!
//! The machine works line by line over the bytes of the input. Each step
//! looks up the current `(state, byte)` pair in the rule table and applies
//! the resulting action, which decides the next state, the start-of-token
//! index, and whether the byte is consumed. Operators are recognized with
//! maximal munch driven by a prefix trie; `//` and `/*` divert into the
//! comment states from inside the operator machinery.
//!
//! `#IMPORT "path"` recursively lexes the named file (relative to the
//! importing file's directory) and splices its tokens into the current
//! stream; every spliced token carries an anchor pointing at the import
//! site, so diagnostics can print the full import chain.
//!
//! # One-shot use
//!
//! A `Lexer` lexes exactly once. Calling [`lex`](Lexer::lex) a second time
//! on the same instance is an error.
//!
//! # Module Structure
//!
//! - [`error`] - Error types for lexing and preprocessing
//! - `charset` - Byte classes used by the rule table
//! - `optrie` - Operator prefix trie
//! - `rules` - FSM states, actions, and the rule table
//! - `preprocessor` - `#`-directive execution
//! - `tests` - Unit tests (test-only)

mod charset;
pub mod error;
mod optrie;
mod preprocessor;
mod rules;


pub use error::{LexError, LexErrorKind};

use crate::source::{AnchorId, FileId, SourceSet};
use crate::token::{Span, Token, TokenKind};
use optrie::OpProbe;
use rules::{Action, State};

/// A table-driven FSM lexer for Tern source code.
///
/// The lexer registers its file in the shared [`SourceSet`] on
/// construction so that diagnostics can render snippets from it later.
pub struct Lexer<'a> {
    /// The shared file arena; imported files register themselves here.
    pub(super) sources: &'a mut SourceSet,
    /// The file being lexed.
    pub(super) file: FileId,
    /// The import site this file was pulled in from, if any.
    pub(super) anchor: Option<AnchorId>,
    /// The input split into lines, each terminated by `\n`.
    pub(super) lines: Vec<Vec<u8>>,
    /// Current FSM state.
    state: State,
    /// Current line index (0-based).
    pub(super) line: usize,
    /// Column of the first byte of the token being built (0-based).
    start: usize,
    /// Current column (0-based).
    pos: usize,
    /// Tokens produced so far.
    pub(super) tokens: Vec<Token>,
    /// Set once `lex` has run; enforces one-shot use.
    used: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer for `text`, registering it in `sources` under
    /// `name`.
    pub fn new(sources: &'a mut SourceSet, name: impl Into<String>, text: &str) -> Self {
        Lexer::build(sources, name.into(), text, None)
    }

    /// Creates a lexer for an imported file, anchored at its import site.
    pub(super) fn for_import(
        sources: &'a mut SourceSet,
        name: String,
        text: &str,
        anchor: AnchorId,
    ) -> Self {
        Lexer::build(sources, name, text, Some(anchor))
    }

    fn build(
        sources: &'a mut SourceSet,
        name: String,
        text: &str,
        anchor: Option<AnchorId>,
    ) -> Self {
        let file = sources.add_file(name, text);
        let mut lines: Vec<Vec<u8>> = text
            .split('\n')
            .map(|l| {
                let l = l.strip_suffix('\r').unwrap_or(l);
                let mut bytes = l.as_bytes().to_vec();
                bytes.push(b'\n');
                bytes
            })
            .collect();
        if text.ends_with('\n') {
            lines.pop();
        }
        Lexer {
            sources,
            file,
            anchor,
            lines,
            state: State::Init,
            line: 0,
            start: 0,
            pos: 0,
            tokens: Vec::new(),
            used: false,
        }
    }

    /// Lexes the whole input and returns the token stream.
    ///
    /// # Errors
    ///
    /// Returns a [`LexError`] on any unexpected byte, a line ending inside
    /// a token, a malformed operator or number, a preprocessor failure, or
    /// when called a second time on the same instance.
    pub fn lex(&mut self) -> Result<Vec<Token>, LexError> {
        if self.used {
            return Err(LexError::new(
                LexErrorKind::LexerReused,
                "lexer instance already used",
                self.span_at(0, 0),
            ));
        }
        self.used = true;

        if self.lines.is_empty() {
            return Ok(std::mem::take(&mut self.tokens));
        }

        loop {
            let byte = self.lines[self.line][self.pos];
            let action = rules::rule_table().lookup(self.state, byte).ok_or_else(|| {
                LexError::unexpected_character(byte, self.state.name(), self.span_at(self.pos, 1))
            })?;

            if self.apply(action, byte)? {
                self.pos += 1;
                if self.pos >= self.lines[self.line].len() {
                    if self.state != State::Init && self.state != State::Com2 {
                        return Err(LexError::unexpected_end_of_line(
                            self.state.name(),
                            self.span_at(self.start, self.pos - self.start),
                        ));
                    }
                    self.start = 0;
                    self.pos = 0;
                    self.line += 1;
                    if self.line >= self.lines.len() {
                        break;
                    }
                }
            }
        }

        Ok(std::mem::take(&mut self.tokens))
    }

    /// Applies one action. Returns whether the current byte was consumed.
    fn apply(&mut self, action: Action, byte: u8) -> Result<bool, LexError> {
        match action {
            Action::Whitespace => {
                self.state = State::Init;
                self.start = self.pos + 1;
                Ok(true)
            }
            Action::NameStart => {
                self.state = State::Name;
                Ok(true)
            }
            Action::NameBody => Ok(true),
            Action::NameEnd => {
                let text = self.slice(self.start, self.pos);
                let kind = classify_name(&text);
                self.push(kind, text, self.start, self.pos);
                self.state = State::Init;
                self.start = self.pos;
                Ok(false)
            }
            Action::Semicolon => {
                self.push(TokenKind::Semicolon, ";".to_string(), self.pos, self.pos + 1);
                self.state = State::Init;
                self.start = self.pos + 1;
                Ok(true)
            }
            Action::Comma => {
                self.push(TokenKind::Comma, ",".to_string(), self.pos, self.pos + 1);
                self.state = State::Init;
                self.start = self.pos + 1;
                Ok(true)
            }
            Action::Bracket => {
                self.push(
                    TokenKind::Bracket,
                    (byte as char).to_string(),
                    self.pos,
                    self.pos + 1,
                );
                self.state = State::Init;
                self.start = self.pos + 1;
                Ok(true)
            }
            Action::OperatorStep => {
                let prefix = self.slice(self.start, self.pos);
                match rules::operator_trie().probe(&prefix, Some(byte)) {
                    OpProbe::Extensible => {
                        self.state = State::Oper;
                        Ok(true)
                    }
                    OpProbe::Last => self.finish_operator(prefix),
                    OpProbe::Error => {
                        Err(LexError::malformed_operator(self.span_at(self.pos, 1)))
                    }
                }
            }
            Action::OperatorEnd => {
                let prefix = self.slice(self.start, self.pos);
                match rules::operator_trie().probe(&prefix, None) {
                    OpProbe::Last => self.finish_operator(prefix),
                    _ => Err(LexError::malformed_operator(
                        self.span_at(self.start, self.pos - self.start),
                    )),
                }
            }
            Action::NumStart | Action::NumBody => {
                self.state = State::Num;
                Ok(true)
            }
            Action::NumEnd => {
                let text = self.slice(self.start, self.pos);
                if text.bytes().filter(|b| *b == b'.').count() > 1 {
                    return Err(LexError::malformed_number(
                        &text,
                        self.span_at(self.start, self.pos - self.start),
                    ));
                }
                self.push(TokenKind::Num, text, self.start, self.pos);
                self.state = State::Init;
                self.start = self.pos;
                Ok(false)
            }
            Action::StrStart | Action::StrBody => {
                self.state = State::Str;
                Ok(true)
            }
            Action::StrEscape => {
                self.state = State::StrEsc;
                Ok(true)
            }
            Action::StrEscapeHexFirst => {
                self.state = State::StrEscH1;
                Ok(true)
            }
            Action::StrEscapeHexSecond => {
                self.state = State::StrEscH2;
                Ok(true)
            }
            Action::StrEnd => {
                let raw = self.slice(self.start + 1, self.pos);
                let decoded = decode_escapes(&raw);
                self.push(TokenKind::Str, decoded, self.start, self.pos + 1);
                self.state = State::Init;
                self.start = self.pos + 1;
                Ok(true)
            }
            Action::CommentBody => {
                self.state = State::Com;
                Ok(true)
            }
            Action::CommentEnd => {
                self.state = State::Init;
                Ok(true)
            }
            Action::Comment2Body => {
                self.state = State::Com2;
                Ok(true)
            }
            Action::Comment2Star => {
                self.state = State::Com2Star;
                Ok(true)
            }
            Action::Comment2End => {
                self.state = State::Init;
                Ok(true)
            }
            Action::PreprocessorBody => {
                self.state = State::Pre;
                Ok(true)
            }
            Action::PreprocessorEnd => {
                preprocessor::execute(self)?;
                self.state = State::Init;
                Ok(true)
            }
        }
    }

    /// Finishes an operator whose text is already known to be complete.
    ///
    /// `//` and `/*` divert into the comment states instead of producing
    /// tokens.
    fn finish_operator(&mut self, text: String) -> Result<bool, LexError> {
        match text.as_str() {
            "//" => {
                self.state = State::Com;
                self.start = self.pos;
            }
            "/*" => {
                self.state = State::Com2;
                self.start = self.pos;
            }
            _ => {
                self.push(TokenKind::Operator, text, self.start, self.pos);
                self.state = State::Init;
                self.start = self.pos;
            }
        }
        Ok(false)
    }

    /// Returns the current line's bytes `[a, b)` as a string.
    fn slice(&self, a: usize, b: usize) -> String {
        String::from_utf8_lossy(&self.lines[self.line][a..b]).into_owned()
    }

    /// Pushes a token covering columns `[start_col, end_col)` of the
    /// current line.
    fn push(&mut self, kind: TokenKind, text: String, start_col: usize, end_col: usize) {
        let span = self.span_at(start_col, end_col - start_col);
        self.tokens.push(Token::new(kind, text, span));
    }

    /// Builds a span of `len` bytes starting at `col` on the current line.
    pub(super) fn span_at(&self, col: usize, len: usize) -> Span {
        let line_start = self.sources.file(self.file).line_start(self.line + 1);
        let mut span = Span::new(
            self.file,
            line_start + col,
            line_start + col + len,
            self.line + 1,
            col + 1,
        );
        if let Some(anchor) = self.anchor {
            span = span.with_anchor(anchor);
        }
        span
    }

    /// Builds a span covering the current line's content.
    pub(super) fn line_span(&self) -> Span {
        let len = self.lines[self.line].len().saturating_sub(1);
        self.span_at(0, len)
    }
}

/// Classifies a finished name as keyword, primitive type, or plain name.
fn classify_name(text: &str) -> TokenKind {
    if rules::KEYWORDS.contains(&text) {
        TokenKind::Keyword
    } else if rules::BUILTIN_TYPES.contains(&text) {
        TokenKind::Type
    } else {
        TokenKind::Name
    }
}

/// Decodes the escape sequences of a raw string-literal body.
///
/// The FSM has already validated every escape, so this walk only has to
/// map them: `\n \t \' \" \\` and `\xHH`.
fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('x') => {
                let hi = chars.next().and_then(|d| d.to_digit(16)).unwrap_or(0);
                let lo = chars.next().and_then(|d| d.to_digit(16)).unwrap_or(0);
                out.push(char::from_u32(hi * 16 + lo).unwrap_or('\u{FFFD}'));
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
