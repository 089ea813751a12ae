use super::*;
use crate::ast::{AssignOp, BinaryOp, ExprKind, NumberType, Type, UnaryOp};
use crate::lexer::Lexer;
use crate::parser::Reducer;
use crate::source::SourceSet;

/// Runs lexer + reducer + translator on `input`.
fn items(input: &str) -> Vec<Item> {
    let mut sources = SourceSet::new();
    let mut lexer = Lexer::new(&mut sources, "test.tn", input);
    let tokens = lexer.lex().expect("lex error");
    let root = Reducer::standard().reduce(tokens).expect("reduce error");
    translate(&root).unwrap_or_else(|e| panic!("translate failed for {:?}: {}", input, e))
}

fn translate_error(input: &str) -> TranslateError {
    let mut sources = SourceSet::new();
    let mut lexer = Lexer::new(&mut sources, "test.tn", input);
    let tokens = lexer.lex().expect("lex error");
    let root = Reducer::standard().reduce(tokens).expect("reduce error");
    match translate(&root) {
        Ok(items) => panic!(
            "expected translate error for {:?}, got {} items",
            input,
            items.len()
        ),
        Err(e) => e,
    }
}

/// Translates a single function body statement for expression tests.
fn body_expr(stmt: &str) -> Expr {
    let source = format!("function void t() {{ {} ; }};", stmt);
    let items = items(&source);
    let [Item::Function(f)] = &items[..] else {
        panic!("expected one function");
    };
    let Some(Expr {
        kind: ExprKind::Scope(body),
        ..
    }) = &f.body
    else {
        panic!("expected a body scope");
    };
    assert_eq!(body.len(), 1, "expected one statement in {:?}", stmt);
    body[0].clone()
}

// ===================
// Globals
// ===================

#[test]
fn test_global_var_declaration() {
    let items = items("var i32 x;");
    let [Item::Global(g)] = &items[..] else {
        panic!("expected one global");
    };
    assert!(g.mutable);
    assert_eq!(g.ty, Type::Number(NumberType::I32));
    assert_eq!(g.name, "x");
    assert!(g.init.is_none());
}

#[test]
fn test_global_const_with_initializer() {
    let items = items("const u64 k = 3;");
    let [Item::Global(g)] = &items[..] else {
        panic!("expected one global");
    };
    assert!(!g.mutable);
    assert_eq!(g.ty, Type::Number(NumberType::U64));
    assert!(matches!(
        g.init.as_ref().map(|e| &e.kind),
        Some(ExprKind::Number(n)) if n == "3"
    ));
}

#[test]
fn test_global_pointer_type() {
    let items = items("var *i32 p;");
    let [Item::Global(g)] = &items[..] else {
        panic!("expected one global");
    };
    assert_eq!(g.ty, Type::Pointer(Box::new(Type::Number(NumberType::I32))));
}

#[test]
fn test_global_double_pointer() {
    let items = items("var * * u8 pp;");
    let [Item::Global(g)] = &items[..] else {
        panic!("expected one global");
    };
    assert_eq!(
        g.ty,
        Type::Pointer(Box::new(Type::Pointer(Box::new(Type::Number(
            NumberType::U8
        )))))
    );
}

#[test]
fn test_bare_global_definition() {
    let items = items("var i32 x; x = 5;");
    assert!(matches!(&items[0], Item::Global(_)));
    let Item::GlobalInit(init) = &items[1] else {
        panic!("expected a global definition");
    };
    assert_eq!(init.name, "x");
}

#[test]
fn test_struct_typed_global() {
    let items = items("var Point p;");
    let [Item::Global(g)] = &items[..] else {
        panic!("expected one global");
    };
    assert_eq!(g.ty, Type::Struct("Point".to_string()));
}

// ===================
// Functions
// ===================

#[test]
fn test_function_declaration_without_body() {
    let items = items("function i32 f(i32 x);");
    let [Item::Function(f)] = &items[..] else {
        panic!("expected one function");
    };
    assert_eq!(f.name, "f");
    assert_eq!(f.ret, Type::Number(NumberType::I32));
    assert_eq!(f.params.len(), 1);
    assert_eq!(f.params[0].name, "x");
    assert!(f.body.is_none());
}

#[test]
fn test_function_definition_with_body() {
    let items = items("function void main() { return; };");
    let [Item::Function(f)] = &items[..] else {
        panic!("expected one function");
    };
    assert_eq!(f.ret, Type::Void);
    assert!(f.params.is_empty());
    let Some(Expr {
        kind: ExprKind::Scope(body),
        ..
    }) = &f.body
    else {
        panic!("expected a body");
    };
    assert!(matches!(&body[0].kind, ExprKind::Return(None)));
}

#[test]
fn test_function_pointer_return_type() {
    let items = items("function *u8 data();");
    let [Item::Function(f)] = &items[..] else {
        panic!("expected one function");
    };
    assert_eq!(f.ret, Type::Pointer(Box::new(Type::Number(NumberType::U8))));
}

#[test]
fn test_function_type_parameter() {
    let items = items("function void apply(i32(i32) callback);");
    let [Item::Function(f)] = &items[..] else {
        panic!("expected one function");
    };
    assert_eq!(
        f.params[0].ty,
        Type::Function {
            ret: Box::new(Type::Number(NumberType::I32)),
            params: vec![Type::Number(NumberType::I32)],
        }
    );
}

#[test]
fn test_function_missing_parens() {
    let err = translate_error("function i32 f;");
    assert_eq!(err.kind(), TranslateErrorKind::MalformedItem);
}

// ===================
// Structs
// ===================

#[test]
fn test_struct_definition() {
    let items = items("struct S { i32 a; i64 b; i8 c };");
    let [Item::Struct(s)] = &items[..] else {
        panic!("expected one struct");
    };
    assert_eq!(s.name, "S");
    let names: Vec<&str> = s.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(s.members[1].ty, Type::Number(NumberType::I64));
}

#[test]
fn test_struct_member_with_keyword_rejected() {
    let err = translate_error("struct S { var i32 a; };");
    assert_eq!(err.kind(), TranslateErrorKind::MalformedItem);
}

// ===================
// Top-level dispatch
// ===================

#[test]
fn test_reserved_keyword_item() {
    let err = translate_error("while x;");
    assert_eq!(err.kind(), TranslateErrorKind::ReservedKeyword);
}

#[test]
fn test_unknown_item_form() {
    let err = translate_error("i32 x;");
    assert_eq!(err.kind(), TranslateErrorKind::ExpectedItem);
}

#[test]
fn test_empty_groups_are_skipped() {
    assert!(items(";;;").is_empty());
}

// ===================
// Expressions
// ===================

#[test]
fn test_assignment_is_right_associative() {
    let expr = body_expr("a = b = 1");
    let ExprKind::Assign { op, target, value } = &expr.kind else {
        panic!("expected assignment");
    };
    assert_eq!(*op, AssignOp::Assign);
    assert!(matches!(&target.kind, ExprKind::Name(n) if n == "a"));
    assert!(matches!(&value.kind, ExprKind::Assign { .. }));
}

#[test]
fn test_arithmetic_is_left_associative() {
    let expr = body_expr("x = a - b - c");
    let ExprKind::Assign { value, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Binary { op, lhs, rhs } = &value.kind else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Sub);
    assert!(matches!(&rhs.kind, ExprKind::Name(n) if n == "c"));
    assert!(matches!(&lhs.kind, ExprKind::Binary { .. }));
}

#[test]
fn test_precedence_mul_inside_add() {
    let expr = body_expr("x = b + c * d");
    let ExprKind::Assign { value, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Binary { op, rhs, .. } = &value.kind else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(
        &rhs.kind,
        ExprKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn test_unary_minus() {
    let expr = body_expr("x = -1");
    let ExprKind::Assign { value, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Unary { op, operand } = &value.kind else {
        panic!("expected unary, got {:?}", value.kind);
    };
    assert_eq!(*op, UnaryOp::Neg);
    assert!(matches!(&operand.kind, ExprKind::Number(n) if n == "1"));
}

#[test]
fn test_unary_in_binary_chain() {
    let expr = body_expr("x = a + -b");
    let ExprKind::Assign { value, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    let ExprKind::Binary { op, rhs, .. } = &value.kind else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(
        &rhs.kind,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
}

#[test]
fn test_deref_unary() {
    let expr = body_expr("x = *p");
    let ExprKind::Assign { value, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(
        &value.kind,
        ExprKind::Unary {
            op: UnaryOp::Deref,
            ..
        }
    ));
}

#[test]
fn test_return_unary_minus() {
    let expr = body_expr("return -1");
    let ExprKind::Return(Some(value)) = &expr.kind else {
        panic!("expected return with value, got {:?}", expr.kind);
    };
    assert!(matches!(
        &value.kind,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            ..
        }
    ));
}

#[test]
fn test_local_declaration_with_initializer() {
    let expr = body_expr("var i32 a = 5");
    let ExprKind::Assign { op, target, .. } = &expr.kind else {
        panic!("expected assignment, got {:?}", expr.kind);
    };
    assert_eq!(*op, AssignOp::Assign);
    let ExprKind::Declaration { mutable, ty, name } = &target.kind else {
        panic!("expected declaration target");
    };
    assert!(mutable);
    assert_eq!(*ty, Type::Number(NumberType::I32));
    assert_eq!(name, "a");
}

#[test]
fn test_compound_assignment() {
    let expr = body_expr("a += 2");
    let ExprKind::Assign { op, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    assert_eq!(*op, AssignOp::AddAssign);
}

#[test]
fn test_call_with_arguments() {
    let expr = body_expr("f(a, 1)");
    let ExprKind::Call { target, args } = &expr.kind else {
        panic!("expected call, got {:?}", expr.kind);
    };
    assert!(matches!(&target.kind, ExprKind::Name(n) if n == "f"));
    assert_eq!(args.len(), 2);
}

#[test]
fn test_call_chaining_folds_left() {
    let expr = body_expr("f(a)(b)");
    let ExprKind::Call { target, .. } = &expr.kind else {
        panic!("expected call");
    };
    assert!(matches!(&target.kind, ExprKind::Call { .. }));
}

#[test]
fn test_nested_scope() {
    let expr = body_expr("{ a = 1; b = 2; }");
    let ExprKind::Scope(body) = &expr.kind else {
        panic!("expected scope, got {:?}", expr.kind);
    };
    assert_eq!(body.len(), 2);
}

// ===================
// Rejections
// ===================

#[test]
fn test_unsupported_operator_rejected() {
    let err = translate_error("function void t() { x = a << b; };");
    assert_eq!(err.kind(), TranslateErrorKind::UnsupportedOperator);
}

#[test]
fn test_unsupported_postfix_rejected() {
    let err = translate_error("function void t() { a++; };");
    assert_eq!(err.kind(), TranslateErrorKind::MissingOperand);
}

#[test]
fn test_member_access_rejected() {
    let err = translate_error("function void t() { x = p->y; };");
    assert_eq!(err.kind(), TranslateErrorKind::UnsupportedOperator);
}

#[test]
fn test_reserved_keyword_in_body() {
    let err = translate_error("function void t() { if(x); };");
    assert_eq!(err.kind(), TranslateErrorKind::ReservedKeyword);
}

#[test]
fn test_assignment_to_literal_rejected() {
    let err = translate_error("function void t() { 1 = x; };");
    assert_eq!(err.kind(), TranslateErrorKind::NotWritable);
}

#[test]
fn test_compound_assignment_to_declaration_rejected() {
    let err = translate_error("function void t() { var i32 a += 1; };");
    assert_eq!(err.kind(), TranslateErrorKind::NotReadable);
}

#[test]
fn test_operator_missing_right_operand() {
    let err = translate_error("function void t() { x = a + ; };");
    assert_eq!(err.kind(), TranslateErrorKind::MissingOperand);
}
