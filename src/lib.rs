//! The Tern programming language compiler library.
//!
//! This library provides the core components of the Tern compiler:
//! lexical analysis with a file-including preprocessor, parse-tree
//! reduction, AST translation, type checking, and x86-64 assembly
//! generation.
//!
//! # Modules
//!
//! - [`source`] - Source file arena, spans, and import anchors
//! - [`token`] - Token types
//! - [`lexer`] - Table-driven FSM lexer and preprocessor
//! - [`parser`] - Parse-tree reducer (brackets, delimiters, precedence layers)
//! - [`ast`] - Abstract Syntax Tree definitions
//! - [`translate`] - Reduced-tree to AST translation
//! - [`semantic`] - Type context: struct layout, signatures, globals
//! - [`codegen`] - GNU-assembler x86-64 text generation
//! - [`driver`] - Pipeline orchestration
//! - [`diagnostics`] - Error and warning rendering
//!
//! # Example
//!
//! ```
//! use tern::driver::Driver;
//!
//! let mut driver = Driver::new();
//! let output = driver
//!     .compile_source("demo.tn", "var i32 x = 5;")
//!     .expect("compile error");
//!
//! assert!(output.assembly.contains(".long\t5"));
//! ```

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod driver;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod source;
pub mod token;
pub mod translate;
