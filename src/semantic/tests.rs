use super::*;
use crate::lexer::Lexer;
use crate::parser::Reducer;
use crate::source::SourceSet;
use crate::translate::translate;

/// Runs the front end and the analyzer on `input`.
fn analyze_source(input: &str) -> Result<(Unit, TypeContext), SemanticError> {
    let mut sources = SourceSet::new();
    let mut lexer = Lexer::new(&mut sources, "test.tn", input);
    let tokens = lexer.lex().expect("lex error");
    let root = Reducer::standard().reduce(tokens).expect("reduce error");
    let items = translate(&root).expect("translate error");
    analyze(items)
}

fn analyze_ok(input: &str) -> (Unit, TypeContext) {
    analyze_source(input).unwrap_or_else(|e| panic!("analysis failed for {:?}: {}", input, e))
}

fn analyze_error(input: &str) -> SemanticError {
    match analyze_source(input) {
        Ok(_) => panic!("expected analysis to fail for {:?}", input),
        Err(e) => e,
    }
}

// ===================
// Struct layout
// ===================

#[test]
fn test_struct_offsets_and_padding() {
    let (_, context) = analyze_ok("struct S { i32 a; i64 b; i8 c };");
    assert_eq!(context.member_offset("S", "a"), Some(0));
    assert_eq!(context.member_offset("S", "b"), Some(8));
    assert_eq!(context.member_offset("S", "c"), Some(16));
    assert_eq!(context.align_of(&Type::Struct("S".to_string())), Some(8));
    assert_eq!(context.size_of(&Type::Struct("S".to_string())), Some(24));
}

#[test]
fn test_packed_struct_layout() {
    let (_, context) = analyze_ok("struct P { i8 a; i8 b; i16 c };");
    assert_eq!(context.member_offset("P", "a"), Some(0));
    assert_eq!(context.member_offset("P", "b"), Some(1));
    assert_eq!(context.member_offset("P", "c"), Some(2));
    assert_eq!(context.size_of(&Type::Struct("P".to_string())), Some(4));
}

#[test]
fn test_nested_struct_layout() {
    let (_, context) = analyze_ok(
        "struct Inner { i32 x; i32 y };\
         struct Outer { i8 tag; Inner value };",
    );
    assert_eq!(context.size_of(&Type::Struct("Inner".to_string())), Some(8));
    assert_eq!(context.member_offset("Outer", "value"), Some(4));
    assert_eq!(context.size_of(&Type::Struct("Outer".to_string())), Some(12));
}

#[test]
fn test_struct_declared_after_use() {
    // Registration is order-independent for value members.
    let (_, context) = analyze_ok(
        "struct Outer { Inner value };\
         struct Inner { i64 x };",
    );
    assert_eq!(context.size_of(&Type::Struct("Outer".to_string())), Some(8));
}

#[test]
fn test_struct_cycle_rejected() {
    let err = analyze_error("struct A { B x }; struct B { A y };");
    assert_eq!(err.kind(), SemanticErrorKind::CyclicStruct);
}

#[test]
fn test_self_referential_struct_rejected() {
    let err = analyze_error("struct A { A x };");
    assert_eq!(err.kind(), SemanticErrorKind::CyclicStruct);
}

#[test]
fn test_pointer_breaks_cycle() {
    let (_, context) = analyze_ok("struct A { *A next; i32 v };");
    assert_eq!(context.size_of(&Type::Struct("A".to_string())), Some(16));
    assert_eq!(context.member_offset("A", "v"), Some(8));
}

#[test]
fn test_void_member_rejected() {
    let err = analyze_error("struct S { void v };");
    assert_eq!(err.kind(), SemanticErrorKind::VoidMember);
}

#[test]
fn test_function_member_rejected() {
    let err = analyze_error("struct S { i32(i32) f };");
    assert_eq!(err.kind(), SemanticErrorKind::FunctionMember);
}

#[test]
fn test_unknown_member_struct_rejected() {
    let err = analyze_error("struct S { Missing m };");
    assert_eq!(err.kind(), SemanticErrorKind::UnknownType);
}

#[test]
fn test_unknown_struct_behind_member_pointer_rejected() {
    let err = analyze_error("struct S { *Missing p };");
    assert_eq!(err.kind(), SemanticErrorKind::UnknownType);
}

#[test]
fn test_duplicate_member_rejected() {
    let err = analyze_error("struct S { i32 a; i64 a };");
    assert_eq!(err.kind(), SemanticErrorKind::DuplicateDefinition);
}

#[test]
fn test_empty_struct() {
    let (_, context) = analyze_ok("struct E { };");
    assert_eq!(context.size_of(&Type::Struct("E".to_string())), Some(0));
    assert_eq!(context.align_of(&Type::Struct("E".to_string())), Some(1));
}

// ===================
// Redeclarations
// ===================

#[test]
fn test_function_redeclaration_permitted() {
    let (unit, _) = analyze_ok("function i32 f(i32 x); function i32 f(i32 x);");
    assert!(unit.function("f").is_some());
}

#[test]
fn test_function_definition_after_declaration() {
    let (unit, _) = analyze_ok("function i32 f(i32 x); function i32 f(i32 y) { return y; };");
    assert!(unit.function("f").unwrap().body.is_some());
}

#[test]
fn test_function_defined_twice_rejected() {
    let err = analyze_error(
        "function i32 f() { return 1; }; function i32 f() { return 2; };",
    );
    assert_eq!(err.kind(), SemanticErrorKind::DuplicateDefinition);
}

#[test]
fn test_function_incompatible_redeclaration() {
    let err = analyze_error("function i32 f(i32 x); function i64 f(i32 x);");
    assert_eq!(err.kind(), SemanticErrorKind::IncompatibleRedeclaration);
}

#[test]
fn test_global_redeclaration_merges() {
    let (unit, _) = analyze_ok("var i32 x; var i32 x = 5;");
    assert!(unit.global("x").unwrap().init.is_some());
    assert_eq!(unit.defined_globals().count(), 1);
}

#[test]
fn test_global_incompatible_redeclaration() {
    let err = analyze_error("var i32 x; var i64 x;");
    assert_eq!(err.kind(), SemanticErrorKind::IncompatibleRedeclaration);
}

#[test]
fn test_global_mutability_mismatch() {
    let err = analyze_error("var i32 x; const i32 x;");
    assert_eq!(err.kind(), SemanticErrorKind::IncompatibleRedeclaration);
}

#[test]
fn test_global_initialized_twice_rejected() {
    let err = analyze_error("var i32 x = 1; x = 2;");
    assert_eq!(err.kind(), SemanticErrorKind::DuplicateDefinition);
}

#[test]
fn test_bare_definition_attaches_to_declaration() {
    let (unit, _) = analyze_ok("var i32 x; x = 5;");
    assert!(unit.global("x").unwrap().init.is_some());
}

#[test]
fn test_undeclared_global_definition_rejected() {
    let err = analyze_error("x = 5;");
    assert_eq!(err.kind(), SemanticErrorKind::UndeclaredGlobal);
}

#[test]
fn test_cross_kind_name_clash_rejected() {
    let err = analyze_error("var i32 f; function i32 f();");
    assert_eq!(err.kind(), SemanticErrorKind::DuplicateDefinition);
}

// ===================
// Signatures and globals
// ===================

#[test]
fn test_unknown_struct_in_signature() {
    let err = analyze_error("function Missing f();");
    assert_eq!(err.kind(), SemanticErrorKind::UnknownType);
}

#[test]
fn test_unknown_struct_behind_pointer() {
    let err = analyze_error("var *Missing p;");
    assert_eq!(err.kind(), SemanticErrorKind::UnknownType);
}

#[test]
fn test_void_parameter_rejected() {
    let err = analyze_error("function i32 f(void v);");
    assert_eq!(err.kind(), SemanticErrorKind::InvalidType);
}

#[test]
fn test_void_global_rejected() {
    let err = analyze_error("var void v;");
    assert_eq!(err.kind(), SemanticErrorKind::InvalidType);
}

#[test]
fn test_names_keep_declaration_order() {
    let (unit, _) = analyze_ok("var i32 a; struct S { i32 x }; function void f();");
    assert_eq!(unit.names(), &["a".to_string(), "S".to_string(), "f".to_string()]);
}
