//! Shared helpers for the Tern integration tests.

// Each test file is compiled as a separate crate, so not every helper is
// used in every file.
#![allow(dead_code)]

use tern::driver::{CompileError, Driver, Output};

/// Compiles `source` through the whole pipeline.
pub fn compile(source: &str) -> Result<Output, CompileError> {
    let mut driver = Driver::new();
    driver.compile_source("test.tn", source)
}

/// Compiles `source`, panicking with the error on failure.
pub fn compile_ok(source: &str) -> Output {
    compile(source).unwrap_or_else(|e| panic!("compilation failed for {:?}: {}", source, e))
}

/// Compiles `source`, panicking if it unexpectedly succeeds.
pub fn compile_err(source: &str) -> CompileError {
    match compile(source) {
        Ok(output) => panic!(
            "expected compilation of {:?} to fail, got:\n{}",
            source, output.assembly
        ),
        Err(e) => e,
    }
}

/// Asserts that the assembly contains `needle`.
pub fn assert_asm_contains(output: &Output, needle: &str) {
    assert!(
        output.assembly.contains(needle),
        "expected {:?} in assembly:\n{}",
        needle,
        output.assembly
    );
}
