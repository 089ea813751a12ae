//! Pipeline orchestration.
//!
//! The [`Driver`] owns the [`SourceSet`] and runs the five stages in
//! order: lexer, parse-tree reducer, AST translator, type context, code
//! generator. Data flows strictly forward; the first stage error aborts
//! the run.

use std::fs;

use crate::codegen::{self, CodegenError, Warning};
use crate::lexer::{LexError, Lexer};
use crate::parser::{ParseError, Reducer};
use crate::semantic::{self, SemanticError};
use crate::source::SourceSet;
use crate::translate::{self, TranslateError};

/// A compilation error from any stage of the pipeline.
#[derive(Debug)]
pub enum CompileError {
    /// Failed to read the input file.
    Io {
        path: String,
        source: std::io::Error,
    },
    /// An error during lexing or preprocessing.
    Lex(LexError),
    /// An error during parse-tree reduction.
    Parse(ParseError),
    /// An error during AST translation.
    Translate(TranslateError),
    /// An error during type-context construction.
    Semantic(SemanticError),
    /// An error during code generation.
    Codegen(CodegenError),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Io { path, source } => {
                write!(f, "failed to read '{}': {}", path, source)
            }
            CompileError::Lex(e) => write!(f, "{}", e),
            CompileError::Parse(e) => write!(f, "{}", e),
            CompileError::Translate(e) => write!(f, "{}", e),
            CompileError::Semantic(e) => write!(f, "{}", e),
            CompileError::Codegen(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {}

/// The result of a successful compilation.
#[derive(Debug)]
pub struct Output {
    /// The generated assembly text.
    pub assembly: String,
    /// Warnings produced while folding constants.
    pub warnings: Vec<Warning>,
}

/// Runs the compilation pipeline over one entry file.
#[derive(Debug, Default)]
pub struct Driver {
    sources: SourceSet,
}

impl Driver {
    /// Creates a driver with an empty source set.
    pub fn new() -> Self {
        Driver::default()
    }

    /// Returns every file the driver has lexed, for diagnostics.
    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Reads and compiles `path`.
    pub fn compile_file(&mut self, path: &str) -> Result<Output, CompileError> {
        let text = fs::read_to_string(path).map_err(|e| CompileError::Io {
            path: path.to_string(),
            source: e,
        })?;
        self.compile_source(path, &text)
    }

    /// Compiles already-loaded source text registered under `name`.
    pub fn compile_source(&mut self, name: &str, text: &str) -> Result<Output, CompileError> {
        let mut lexer = Lexer::new(&mut self.sources, name, text);
        let tokens = lexer.lex().map_err(CompileError::Lex)?;

        let root = Reducer::standard()
            .reduce(tokens)
            .map_err(CompileError::Parse)?;

        let items = translate::translate(&root).map_err(CompileError::Translate)?;

        let (unit, context) = semantic::analyze(items).map_err(CompileError::Semantic)?;

        let (assembly, warnings) =
            codegen::generate(&unit, &context, name).map_err(CompileError::Codegen)?;

        Ok(Output { assembly, warnings })
    }
}
