use super::*;
use crate::lexer::Lexer;
use crate::parser::Reducer;
use crate::source::SourceSet;
use crate::translate::translate;

/// Runs the full pipeline and returns the assembly and warnings.
fn compile(input: &str) -> (String, Vec<Warning>) {
    try_compile(input)
        .unwrap_or_else(|e| panic!("code generation failed for {:?}: {}", input, e))
}

fn try_compile(input: &str) -> Result<(String, Vec<Warning>), CodegenError> {
    let mut sources = SourceSet::new();
    let mut lexer = Lexer::new(&mut sources, "test.tn", input);
    let tokens = lexer.lex().expect("lex error");
    let root = Reducer::standard().reduce(tokens).expect("reduce error");
    let items = translate(&root).expect("translate error");
    let (unit, context) = crate::semantic::analyze(items).expect("semantic error");
    generate(&unit, &context, "test.tn")
}

fn compile_error(input: &str) -> CodegenError {
    match try_compile(input) {
        Ok((asm, _)) => panic!("expected codegen error for {:?}, got:\n{}", input, asm),
        Err(e) => e,
    }
}

fn assert_contains(asm: &str, needle: &str) {
    assert!(
        asm.contains(needle),
        "expected {:?} in assembly:\n{}",
        needle,
        asm
    );
}

// ===================
// Output skeleton
// ===================

#[test]
fn test_file_header_and_footer() {
    let (asm, _) = compile("var i32 x = 1;");
    assert!(asm.starts_with("\t.file\t\"test.tn\"\n"));
    assert_contains(&asm, ".ident\t\"tern\"");
    assert_contains(&asm, ".section\t.note.GNU-stack,\"\",@progbits");
}

// ===================
// Global data items
// ===================

#[test]
fn test_int_global() {
    let (asm, warnings) = compile("var i32 x = 5;");
    assert_contains(&asm, ".globl\tx");
    assert_contains(&asm, "x:\n\t.long\t5");
    assert_contains(&asm, ".align 4");
    assert_contains(&asm, ".size\tx, 4");
    assert!(warnings.is_empty());
}

#[test]
fn test_double_global_bit_pattern() {
    let (asm, _) = compile("var double d = 1.5;");
    assert_contains(&asm, "d:\n\t.quad\t0x3FF8000000000000");
}

#[test]
fn test_float_global_bit_pattern() {
    let (asm, _) = compile("var float f = 1.5;");
    assert_contains(&asm, "f:\n\t.long\t0x3FC00000");
}

#[test]
fn test_constant_folded_initializer() {
    let (asm, warnings) = compile("const u64 k = 1 + 2;");
    assert_contains(&asm, "k:\n\t.quad\t3");
    assert!(warnings.is_empty());
}

#[test]
fn test_small_globals() {
    let (asm, _) = compile("var i8 b = 7; var u16 s = 300;");
    assert_contains(&asm, "b:\n\t.byte\t7");
    assert_contains(&asm, "s:\n\t.value\t300");
}

#[test]
fn test_string_global() {
    let (asm, _) = compile("var *i8 s = \"hi\";");
    assert_contains(&asm, ".section\t.rodata");
    assert_contains(&asm, ".LC0:\n\t.string\t\"hi\"");
    assert_contains(&asm, "s:\n\t.quad\t.LC0");
}

#[test]
fn test_declaration_only_emits_nothing() {
    let (asm, _) = compile("var i32 x;");
    assert!(!asm.contains("x:"));
}

#[test]
fn test_separate_definition_emits() {
    let (asm, _) = compile("var i32 x; x = 42;");
    assert_contains(&asm, "x:\n\t.long\t42");
}

#[test]
fn test_fold_overflow_warns_and_wraps() {
    let (asm, warnings) = compile(
        "var u64 m = 10000000000000000000 + 10000000000000000000;",
    );
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("overflow"));
    assert_contains(&asm, "m:\n\t.quad\t1553255926290448384");
}

#[test]
fn test_lossy_conversion_warns() {
    let (asm, warnings) = compile("var i32 x = 2.5;");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("fraction"));
    assert_contains(&asm, "x:\n\t.long\t2");
}

#[test]
fn test_narrowing_initializer_wraps_with_warning() {
    let (asm, warnings) = compile("var i8 b = 100 + 100;");
    assert_eq!(warnings.len(), 1);
    assert_contains(&asm, "b:\n\t.byte\t-56");
}

#[test]
fn test_division_by_zero_rejected() {
    let err = compile_error("const i32 z = 1 / 0;");
    assert_eq!(err.kind(), CodegenErrorKind::DivisionByZero);
}

#[test]
fn test_non_constant_initializer_rejected() {
    let err = compile_error("var i32 q; var i32 r = q;");
    assert_eq!(err.kind(), CodegenErrorKind::NotConstant);
}

#[test]
fn test_string_into_non_pointer_rejected() {
    let err = compile_error("var i32 x = \"hi\";");
    assert_eq!(err.kind(), CodegenErrorKind::TypeMismatch);
}

// ===================
// Function frames
// ===================

#[test]
fn test_frame_protocol() {
    let (asm, _) = compile("function i32 f() { var i32 a; a = 7; };");
    assert_contains(&asm, ".globl\tf");
    assert_contains(&asm, ".type\tf, @function");
    assert_contains(&asm, ".LFB0:");
    assert_contains(&asm, ".cfi_startproc");
    assert_contains(&asm, "pushq\t%rbp");
    assert_contains(&asm, "movq\t%rsp, %rbp");
    assert_contains(&asm, "subq\t$8, %rsp");
    assert_contains(&asm, "movl\t$7, -8(%rbp)");
    assert_contains(&asm, "addq\t$8, %rsp");
    assert_contains(&asm, "popq\t%rbp");
    assert_contains(&asm, "ret");
    assert_contains(&asm, ".cfi_endproc");
    assert_contains(&asm, ".LFE0:");
    assert_contains(&asm, ".size\tf, .-f");
}

#[test]
fn test_function_ids_are_unique() {
    let (asm, _) = compile("function void a() { }; function void b() { };");
    assert_contains(&asm, ".LFB0:");
    assert_contains(&asm, ".LFE0:");
    assert_contains(&asm, ".LFB1:");
    assert_contains(&asm, ".LFE1:");
}

#[test]
fn test_return_negative_immediate() {
    let (asm, _) = compile("function i32 g() { return -1; };");
    let movl = asm.find("movl\t$-1, %eax").expect("return value move missing");
    let pop = asm.find("popq\t%rbp").expect("epilogue missing");
    assert!(movl < pop, "return register write must come before the epilogue");
}

#[test]
fn test_return_restores_stack_with_locals() {
    let (asm, _) = compile("function i32 g() { var i32 a; a = 1; return a; };");
    assert_contains(&asm, "movq\t%rbp, %rsp");
}

#[test]
fn test_parameters_spill_in_order() {
    let (asm, _) = compile("function i32 add2(i32 a, i32 b) { return a + b; };");
    assert_contains(&asm, "pushq\t%rdi");
    assert_contains(&asm, "pushq\t%rsi");
}

// ===================
// Expressions
// ===================

#[test]
fn test_register_addition() {
    let (asm, _) = compile("function i32 add2(i32 a, i32 b) { return a + b; };");
    assert_contains(&asm, "pushq\t%rax");
    assert_contains(&asm, "movq\t%rax, %rcx");
    assert_contains(&asm, "popq\t%rax");
    assert_contains(&asm, "addl\t%ecx, %eax");
}

#[test]
fn test_signed_division() {
    let (asm, _) = compile("function i32 d(i32 a, i32 b) { return a / b; };");
    assert_contains(&asm, "cltd");
    assert_contains(&asm, "idivl\t%ecx");
}

#[test]
fn test_unsigned_division() {
    let (asm, _) = compile("function u32 d(u32 a, u32 b) { return a / b; };");
    assert_contains(&asm, "xorl\t%edx, %edx");
    assert_contains(&asm, "divl\t%ecx");
}

#[test]
fn test_float_arithmetic() {
    let (asm, _) = compile("function double m(double a, double b) { return a * b; };");
    assert_contains(&asm, "mulsd\t%xmm1, %xmm0");
}

#[test]
fn test_int_operand_converts_to_double() {
    let (asm, _) = compile("function double m(double a, i32 b) { return a + b; };");
    assert_contains(&asm, "cvtsi2sd\t%eax, %xmm0");
    assert_contains(&asm, "addsd\t%xmm1, %xmm0");
}

#[test]
fn test_widening_signed_conversion() {
    let (asm, _) = compile("function i64 w(i32 a, i64 b) { return a + b; };");
    assert_contains(&asm, "movslq\t%eax, %rax");
    assert_contains(&asm, "addq\t%rcx, %rax");
}

#[test]
fn test_rank_picks_unsigned_of_same_width() {
    let (asm, _) = compile("function u32 r(i32 a, u32 b) { return a + b; };");
    assert_contains(&asm, "addl\t%ecx, %eax");
}

#[test]
fn test_register_negation() {
    let (asm, _) = compile("function i32 n(i32 a) { return -a; };");
    assert_contains(&asm, "negl\t%eax");
}

#[test]
fn test_float_negation() {
    let (asm, _) = compile("function double n(double a) { return -a; };");
    assert_contains(&asm, "pxor\t%xmm0, %xmm0");
    assert_contains(&asm, "subsd\t%xmm1, %xmm0");
}

#[test]
fn test_global_load_and_store() {
    let (asm, _) = compile(
        "var i32 g = 1; function void t() { g = 2; };",
    );
    assert_contains(&asm, "movl\t$2, g(%rip)");
}

#[test]
fn test_compound_assignment_reads_and_writes() {
    let (asm, _) = compile("var i32 g = 1; function void t() { g += 3; };");
    assert_contains(&asm, "movl\tg(%rip), %eax");
    assert_contains(&asm, "addl\t%ecx, %eax");
    assert_contains(&asm, "movl\t%eax, g(%rip)");
}

#[test]
fn test_string_in_expression() {
    let (asm, _) = compile("function void t() { var *i8 s = \"x\"; };");
    assert_contains(&asm, "leaq\t.LC0(%rip), %rax");
}

#[test]
fn test_nested_scopes_release_in_order() {
    let (asm, _) = compile(
        "function void t() { var i32 a; { var i32 b; var i32 c; }; var i32 d; };",
    );
    // Once for the inner scope (b, c), once for the body scope (a, d).
    assert_eq!(asm.matches("addq\t$16, %rsp").count(), 2);
}

// ===================
// Calls
// ===================

#[test]
fn test_call_with_immediate_argument() {
    let (asm, _) = compile(
        "function i32 f(i32 x); function i32 g() { return f(5); };",
    );
    assert_contains(&asm, "movl\t$5, %edi");
    assert_contains(&asm, "call\tf");
}

#[test]
fn test_call_with_register_arguments() {
    let (asm, _) = compile(
        "function i32 f(i32 x, i32 y); function i32 g(i32 a) { return f(a, a); };",
    );
    assert_contains(&asm, "popq\t%rsi");
    assert_contains(&asm, "popq\t%rdi");
    assert_contains(&asm, "call\tf");
}

#[test]
fn test_call_with_float_argument() {
    let (asm, _) = compile(
        "function void f(double x); function void g() { f(1.5); };",
    );
    assert_contains(&asm, "movabsq\t$0x3FF8000000000000, %rax");
    assert_contains(&asm, "movq\t%rax, %xmm0");
    assert_contains(&asm, "call\tf");
}

#[test]
fn test_call_argument_count_mismatch() {
    let err = compile_error("function i32 f(i32 x); function i32 g() { return f(1, 2); };");
    assert_eq!(err.kind(), CodegenErrorKind::InvalidCall);
}

#[test]
fn test_call_of_non_function() {
    let err = compile_error("var i32 x; function void t() { x(); };");
    assert_eq!(err.kind(), CodegenErrorKind::InvalidCall);
}

// ===================
// Rejections
// ===================

#[test]
fn test_write_to_local_constant() {
    let err = compile_error("function void t() { const i32 c = 1; c = 2; };");
    assert_eq!(err.kind(), CodegenErrorKind::WriteToConstant);
    let span = err.span().expect("span missing");
    assert_eq!(span.column, 38);
}

#[test]
fn test_write_to_global_constant() {
    let err = compile_error("const i32 c = 1; function void t() { c = 2; };");
    assert_eq!(err.kind(), CodegenErrorKind::WriteToConstant);
}

#[test]
fn test_unknown_name() {
    let err = compile_error("function void t() { nope = 1; };");
    assert_eq!(err.kind(), CodegenErrorKind::UnknownName);
}

#[test]
fn test_deref_has_no_lowering() {
    let err = compile_error("var *i32 p; function void t() { var i64 v = *p; };");
    assert_eq!(err.kind(), CodegenErrorKind::Unsupported);
}

#[test]
fn test_return_value_from_void_function() {
    let err = compile_error("function void t() { return 1; };");
    assert_eq!(err.kind(), CodegenErrorKind::InvalidReturn);
}

#[test]
fn test_bare_return_from_value_function() {
    let err = compile_error("function i32 t() { return; };");
    assert_eq!(err.kind(), CodegenErrorKind::InvalidReturn);
}

#[test]
fn test_duplicate_local() {
    let err = compile_error("function void t() { var i32 a; var i32 a; };");
    assert_eq!(err.kind(), CodegenErrorKind::DuplicateLocal);
}

#[test]
fn test_incompatible_pointer_assignment() {
    let err = compile_error(
        "var *i32 p; var *i64 q; function void t() { p = q; };",
    );
    assert_eq!(err.kind(), CodegenErrorKind::TypeMismatch);
}
