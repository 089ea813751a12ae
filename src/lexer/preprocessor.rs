//! Execution of `#` preprocessor directives.
//!
//! Directives run while the lexer is scanning, at the newline that ends
//! the directive line. `#ECHO` prints the line to stderr; `#IMPORT "path"`
//! recursively lexes the named file and splices its tokens into the
//! current stream. The remaining commands (`#IMPORT <lib>`, `#DEFINE`,
//! `#UNDEFINE`, `#IFDEF`, `#ENDIF`) are recognized but rejected.

use std::fs;
use std::path::Path;

use super::{LexError, LexErrorKind, Lexer};
use crate::source::MAX_IMPORT_DEPTH;
use crate::token::Span;

/// Executes the directive on the lexer's current line.
pub(super) fn execute(lexer: &mut Lexer<'_>) -> Result<(), LexError> {
    let bytes = &lexer.lines[lexer.line];
    let text = String::from_utf8_lossy(&bytes[..bytes.len() - 1]).into_owned();

    // Strip everything up to and including the first '#'.
    let after_hash = text.find('#').map(|i| i + 1).unwrap_or(0);
    let directive = &text[after_hash..];
    let (command, rest) = match directive.split_once(' ') {
        Some((command, rest)) => (command.to_uppercase(), rest),
        None => (directive.trim().to_uppercase(), ""),
    };

    let span = lexer.line_span();
    match command.as_str() {
        "ECHO" => {
            let name = lexer.sources.file(lexer.file).name().to_string();
            eprintln!("PreprocessorEcho in {}:{}", name, lexer.line + 1);
            eprintln!("{}", text);
            Ok(())
        }
        "IMPORT" => import(lexer, rest.trim(), span),
        "DEFINE" | "UNDEFINE" | "IFDEF" | "ENDIF" => Err(LexError::new(
            LexErrorKind::UnimplementedCommand,
            format!("preprocessor command #{} is not implemented", command),
            span,
        )),
        _ => Err(LexError::new(
            LexErrorKind::UnknownCommand,
            format!("unknown preprocessor command #{}", command),
            span,
        )),
    }
}

/// Handles `#IMPORT`: resolves the path relative to the importing file,
/// lexes it with a fresh anchored lexer, and splices the tokens in.
fn import(lexer: &mut Lexer<'_>, argument: &str, span: Span) -> Result<(), LexError> {
    let path = if argument.len() >= 2 && argument.starts_with('"') && argument.ends_with('"') {
        &argument[1..argument.len() - 1]
    } else if argument.len() >= 2 && argument.starts_with('<') && argument.ends_with('>') {
        return Err(LexError::new(
            LexErrorKind::UnimplementedCommand,
            "library imports are not implemented",
            span,
        ));
    } else {
        return Err(LexError::new(
            LexErrorKind::ImportSyntax,
            format!("import expects \"path\" or <library>, got '{}'", argument),
            span,
        ));
    };

    if let Some(parent) = lexer.anchor {
        if lexer.sources.anchor_depth(parent) + 1 > MAX_IMPORT_DEPTH {
            return Err(LexError::new(
                LexErrorKind::ImportDepthExceeded,
                format!("import depth exceeded ({} levels)", MAX_IMPORT_DEPTH),
                span,
            ));
        }
    }

    let importer = lexer.sources.file(lexer.file).name();
    let full = match Path::new(importer).parent() {
        Some(dir) => dir.join(path),
        None => Path::new(path).to_path_buf(),
    };

    let text = fs::read_to_string(&full).map_err(|_| {
        LexError::new(
            LexErrorKind::ImportNotFound,
            format!("import file '{}' not found", full.display()),
            span,
        )
    })?;

    let anchor = lexer.sources.add_anchor(span);
    let name = full.to_string_lossy().into_owned();
    let mut sub = Lexer::for_import(&mut *lexer.sources, name, &text, anchor);
    let tokens = sub.lex()?;
    lexer.tokens.extend(tokens);
    Ok(())
}
