//! Preprocessor `#IMPORT` tests, driven through real files.

mod common;

use std::fs;

use tern::driver::{CompileError, Driver, Output};
use tern::lexer::LexErrorKind;

/// Compiles the entry file of a directory of sources.
fn compile_files(files: &[(&str, &str)], entry: &str) -> (Driver, Result<Output, CompileError>) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (name, text) in files {
        fs::write(dir.path().join(name), text).expect("failed to write source file");
    }
    let entry_path = dir.path().join(entry);
    let mut driver = Driver::new();
    let result = driver.compile_file(entry_path.to_str().expect("path is valid UTF-8"));
    (driver, result)
}

#[test]
fn test_import_splices_tokens() {
    let (_, result) = compile_files(
        &[
            ("main.tn", "#IMPORT \"lib.tn\"\nvar i32 x = answer;\n"),
            ("lib.tn", "var i32 answer;\nanswer = 42;\n"),
        ],
        "main.tn",
    );
    // `x = answer` is not constant, so the import must have brought the
    // declaration in for the error to be about constness.
    let err = result.err().expect("non-constant initializer must fail");
    assert!(matches!(err, CompileError::Codegen(_)), "{}", err);
}

#[test]
fn test_import_compiles_to_combined_unit() {
    let (_, result) = compile_files(
        &[
            ("main.tn", "#IMPORT \"lib.tn\"\nfunction i32 g() { return helper(1); };\n"),
            ("lib.tn", "function i32 helper(i32 x) { return x + 1; };\n"),
        ],
        "main.tn",
    );
    let output = result.expect("import should compile");
    assert!(output.assembly.contains(".globl\thelper"));
    assert!(output.assembly.contains("call\thelper"));
}

#[test]
fn test_import_path_is_relative_to_importer() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::create_dir(dir.path().join("sub")).expect("failed to create subdir");
    fs::write(dir.path().join("main.tn"), "#IMPORT \"sub/a.tn\"\n").expect("write failed");
    fs::write(dir.path().join("sub/a.tn"), "#IMPORT \"b.tn\"\n").expect("write failed");
    fs::write(dir.path().join("sub/b.tn"), "var i32 ok = 1;\n").expect("write failed");

    let mut driver = Driver::new();
    let result = driver.compile_file(dir.path().join("main.tn").to_str().expect("utf-8 path"));
    let output = result.expect("nested relative import should compile");
    assert!(output.assembly.contains("ok:\n\t.long\t1"));
}

#[test]
fn test_error_in_imported_file_carries_the_import_chain() {
    let (driver, result) = compile_files(
        &[
            ("main.tn", "var i32 a = 1;\n#IMPORT \"bad.tn\"\n"),
            ("bad.tn", "var i32 b @ 2;\n"),
        ],
        "main.tn",
    );
    let CompileError::Lex(e) = result.err().expect("lex error expected") else {
        panic!("expected a lex error");
    };
    assert_eq!(e.kind(), LexErrorKind::UnexpectedCharacter);

    // The error span points into bad.tn...
    let span = e.span();
    let file = driver.sources().file(span.file);
    assert!(file.name().ends_with("bad.tn"));
    assert_eq!(span.line, 1);

    // ...and its anchor chain leads back to the `#IMPORT` line in
    // main.tn.
    let anchor = span.anchor.expect("imported token must carry an anchor");
    let site = driver.sources().anchor(anchor).site;
    let importer = driver.sources().file(site.file);
    assert!(importer.name().ends_with("main.tn"));
    assert_eq!(site.line, 2);
    assert!(site.anchor.is_none());
}

#[test]
fn test_two_level_chain_depth() {
    let (driver, result) = compile_files(
        &[
            ("main.tn", "#IMPORT \"mid.tn\"\n"),
            ("mid.tn", "#IMPORT \"leaf.tn\"\n"),
            ("leaf.tn", "var i32 c @ 1;\n"),
        ],
        "main.tn",
    );
    let CompileError::Lex(e) = result.err().expect("lex error expected") else {
        panic!("expected a lex error");
    };
    let anchor = e.span().anchor.expect("anchor missing");
    assert_eq!(driver.sources().anchor_depth(anchor), 2);
}

#[test]
fn test_missing_import_reports_at_the_directive() {
    let (_, result) = compile_files(&[("main.tn", "#IMPORT \"gone.tn\"\n")], "main.tn");
    let CompileError::Lex(e) = result.err().expect("import must fail") else {
        panic!("expected a lex error");
    };
    assert_eq!(e.kind(), LexErrorKind::ImportNotFound);
    assert_eq!(e.span().line, 1);
}

#[test]
fn test_import_requires_quoted_path() {
    let (_, result) = compile_files(&[("main.tn", "#IMPORT lib\n")], "main.tn");
    let CompileError::Lex(e) = result.err().expect("import must fail") else {
        panic!("expected a lex error");
    };
    assert_eq!(e.kind(), LexErrorKind::ImportSyntax);
}

#[test]
fn test_redeclaration_across_files_merges() {
    let (_, result) = compile_files(
        &[
            ("main.tn", "#IMPORT \"decl.tn\"\nshared = 7;\n"),
            ("decl.tn", "var i32 shared;\n"),
        ],
        "main.tn",
    );
    let output = result.expect("cross-file definition should compile");
    assert!(output.assembly.contains("shared:\n\t.long\t7"));
}
