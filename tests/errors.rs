//! Error-path tests: each pipeline stage surfaces through the driver as
//! its own `CompileError` variant with a usable span.

mod common;

use common::compile_err;
use tern::driver::CompileError;
use tern::lexer::LexErrorKind;
use tern::parser::ParseErrorKind;
use tern::semantic::SemanticErrorKind;

#[test]
fn test_lex_error_variant() {
    let CompileError::Lex(e) = compile_err("var i32 x @ 5;") else {
        panic!("expected a lex error");
    };
    assert_eq!(e.kind(), LexErrorKind::UnexpectedCharacter);
    assert_eq!(e.span().line, 1);
    assert_eq!(e.span().column, 11);
}

#[test]
fn test_preprocessor_error_variant() {
    let CompileError::Lex(e) = compile_err("#DEFINE X 1\n") else {
        panic!("expected a preprocessor error");
    };
    assert_eq!(e.kind(), LexErrorKind::UnimplementedCommand);
    assert_eq!(e.kind().title(), "PreprocessorError");
}

#[test]
fn test_parse_error_variant() {
    let CompileError::Parse(e) = compile_err("function void f() { (a; };") else {
        panic!("expected a parse error");
    };
    assert_eq!(e.kind(), ParseErrorKind::MismatchedBracket);
    assert!(e.related().is_some());
}

#[test]
fn test_translate_error_variant() {
    let CompileError::Translate(_) = compile_err("function void f() { a && b; };") else {
        panic!("expected a translate error");
    };
}

#[test]
fn test_semantic_error_variant() {
    let CompileError::Semantic(e) = compile_err("struct A { B x }; struct B { A y };") else {
        panic!("expected a semantic error");
    };
    assert_eq!(e.kind(), SemanticErrorKind::CyclicStruct);
}

#[test]
fn test_codegen_error_variant() {
    let CompileError::Codegen(e) =
        compile_err("function void f() { const i32 c = 1; c = 2; };")
    else {
        panic!("expected a codegen error");
    };
    let span = e.span().expect("span missing");
    assert_eq!(span.line, 1);
}

#[test]
fn test_io_error_variant() {
    let mut driver = tern::driver::Driver::new();
    let err = driver
        .compile_file("definitely_missing_file.tn")
        .unwrap_err();
    assert!(matches!(err, CompileError::Io { .. }));
}

#[test]
fn test_error_line_numbers_cross_lines() {
    let CompileError::Codegen(e) = compile_err(
        "var i32 x = 1;\n\
         function void f()\n\
         {\n\
             y = 2;\n\
         };\n",
    ) else {
        panic!("expected a codegen error");
    };
    assert_eq!(e.span().expect("span missing").line, 4);
}
