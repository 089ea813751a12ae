//! Expression translation off the reduced tree.
//!
//! Operator nodes from the reducer are folded here: assignments peel
//! their target from the left (making `=` right-associative), arithmetic
//! peels its right operand from the right (making `+ - * /`
//! left-associative). A prefix operator shows up as an empty left group;
//! only `-` and `*` may be prefix. Operator tokens with no defined
//! lowering are rejected.

use super::error::{TranslateError, TranslateErrorKind};
use super::helpers::{comma_groups, detach_leading_keyword, semicolon_groups, unpack_bracket};
use super::types::parse_typed_name;
use crate::ast::{AssignOp, BinaryOp, Expr, ExprKind, UnaryOp};
use crate::parser::{Node, first_token};
use crate::token::{Span, Token, TokenKind};

/// Translates a node list into one expression.
///
/// `at` is the span blamed when the list is empty.
pub(super) fn translate_expr(nodes: &[Node], at: Span) -> Result<Expr, TranslateError> {
    if nodes.is_empty() {
        return Err(TranslateError::new(
            TranslateErrorKind::EmptyExpression,
            "expected an expression",
            at,
        ));
    }

    // An assignment node binds before its leading keyword: the target
    // group of `var i32 a = 5` starts with `var`, and the declaration is
    // parsed while folding the assignment.
    if let [node] = nodes {
        if is_assignment_node(node) {
            return translate_node(node, at);
        }
    }

    // Other leading keywords bind before any operator structure.
    if let Some((keyword, rest)) = detach_leading_keyword(nodes) {
        return translate_keyword(&keyword, &rest);
    }

    if nodes.len() == 1 {
        return translate_node(&nodes[0], at);
    }

    // Call chaining: `f (a)` and, folded right to left, `f (a) (b)`.
    if let Some(args) = unpack_bracket(&nodes[nodes.len() - 1], "(") {
        let open_span = nodes[nodes.len() - 1].span().unwrap_or(at);
        let target = translate_expr(&nodes[..nodes.len() - 1], at)?;
        if !target.is_readable() {
            return Err(TranslateError::new(
                TranslateErrorKind::NotReadable,
                "call target does not produce a value",
                target.span,
            ));
        }
        let args = translate_args(args, open_span)?;
        let span = target.span;
        return Ok(Expr::new(
            ExprKind::Call {
                target: Box::new(target),
                args,
            },
            span,
        ));
    }

    let span = first_token(nodes).map(|t| t.span).unwrap_or(at);
    Err(TranslateError::new(
        TranslateErrorKind::MalformedExpression,
        "cannot parse expression",
        span,
    ))
}

/// Translates the comma-separated argument list of a call.
fn translate_args(nodes: &[Node], at: Span) -> Result<Vec<Expr>, TranslateError> {
    let groups = comma_groups(nodes);
    if groups.len() == 1 && groups[0].is_empty() {
        return Ok(Vec::new());
    }
    groups
        .into_iter()
        .map(|group| {
            let arg = translate_expr(group, at)?;
            if !arg.is_readable() {
                return Err(TranslateError::new(
                    TranslateErrorKind::NotReadable,
                    "argument does not produce a value",
                    arg.span,
                ));
            }
            Ok(arg)
        })
        .collect()
}

/// Translates a group led by a keyword.
fn translate_keyword(keyword: &Token, rest: &[Node]) -> Result<Expr, TranslateError> {
    match keyword.text.as_str() {
        "var" | "const" => {
            let (ty, name) = parse_typed_name(rest, keyword.span)?;
            Ok(Expr::new(
                ExprKind::Declaration {
                    mutable: keyword.text == "var",
                    ty,
                    name: name.text.clone(),
                },
                name.span,
            ))
        }
        "return" => {
            let value = if rest.iter().all(is_empty_node) {
                None
            } else {
                let value = translate_expr(rest, keyword.span)?;
                if !value.is_readable() {
                    return Err(TranslateError::new(
                        TranslateErrorKind::NotReadable,
                        "return value does not produce a value",
                        value.span,
                    ));
                }
                Some(Box::new(value))
            };
            Ok(Expr::new(ExprKind::Return(value), keyword.span))
        }
        _ => Err(TranslateError::new(
            TranslateErrorKind::ReservedKeyword,
            format!("keyword '{}' is not supported here", keyword.text),
            keyword.span,
        )),
    }
}

/// Returns true when `node` is an assignment-layer operator node.
pub(super) fn is_assignment_node(node: &Node) -> bool {
    match node {
        Node::Inner { tokens, .. } if !node.is_bracketed() => tokens
            .first()
            .map(|t| t.kind == TokenKind::Operator && AssignOp::from_text(&t.text).is_some())
            .unwrap_or(false),
        _ => false,
    }
}

fn is_empty_node(node: &Node) -> bool {
    match node {
        Node::Leaf(_) => false,
        Node::Inner { tokens, groups } => {
            tokens.is_empty() && groups.iter().all(|g| g.iter().all(is_empty_node))
        }
    }
}

/// Translates a single node.
fn translate_node(node: &Node, at: Span) -> Result<Expr, TranslateError> {
    match node {
        Node::Leaf(token) => translate_leaf(token),
        Node::Inner { tokens, groups } => {
            if let Some(inner) = unpack_bracket(node, "(") {
                return translate_expr(inner, tokens[0].span);
            }
            if let Some(inner) = unpack_bracket(node, "{") {
                return translate_scope(inner, tokens[0].span);
            }
            if node.is_bracketed() {
                return Err(TranslateError::new(
                    TranslateErrorKind::MalformedExpression,
                    format!("'{}' has no meaning in an expression", tokens[0].text),
                    tokens[0].span,
                ));
            }
            match tokens.first() {
                Some(first) if first.kind == TokenKind::Operator => {
                    let groups: Vec<&[Node]> = groups.iter().map(|g| g.as_slice()).collect();
                    if AssignOp::from_text(&first.text).is_some() {
                        fold_assign(tokens, &groups)
                    } else {
                        fold_arith(tokens, &groups, None)
                    }
                }
                Some(first) => Err(TranslateError::new(
                    TranslateErrorKind::MalformedExpression,
                    format!("unexpected '{}'", first.text),
                    first.span,
                )),
                // A token-less wrapper; descend into its single group.
                None => translate_expr(&groups[0], at),
            }
        }
    }
}

/// Translates a `{ ... }` block.
pub(super) fn translate_scope(nodes: &[Node], at: Span) -> Result<Expr, TranslateError> {
    let mut body = Vec::new();
    for group in semicolon_groups(nodes) {
        if group.is_empty() {
            continue;
        }
        body.push(translate_expr(group, at)?);
    }
    Ok(Expr::new(ExprKind::Scope(body), at))
}

/// Translates a leaf token in expression position.
fn translate_leaf(token: &Token) -> Result<Expr, TranslateError> {
    match token.kind {
        TokenKind::Name => Ok(Expr::new(ExprKind::Name(token.text.clone()), token.span)),
        TokenKind::Num => Ok(Expr::new(ExprKind::Number(token.text.clone()), token.span)),
        TokenKind::Str => Ok(Expr::new(ExprKind::Str(token.text.clone()), token.span)),
        TokenKind::Keyword => Err(TranslateError::new(
            TranslateErrorKind::ReservedKeyword,
            format!("keyword '{}' is not supported here", token.text),
            token.span,
        )),
        _ => Err(TranslateError::new(
            TranslateErrorKind::MalformedExpression,
            format!("unexpected '{}'", token.text),
            token.span,
        )),
    }
}

/// Folds an assignment layer, peeling the target from the left so that
/// `a = b = c` parses as `a = (b = c)`.
fn fold_assign(tokens: &[Token], groups: &[&[Node]]) -> Result<Expr, TranslateError> {
    let op_token = &tokens[0];
    let op = AssignOp::from_text(&op_token.text).ok_or_else(|| {
        TranslateError::new(
            TranslateErrorKind::UnsupportedOperator,
            format!("operator '{}' has no meaning here", op_token.text),
            op_token.span,
        )
    })?;

    if groups[0].is_empty() {
        return Err(TranslateError::new(
            TranslateErrorKind::MissingOperand,
            "assignment without a target",
            op_token.span,
        ));
    }
    let target = translate_expr(groups[0], op_token.span)?;

    let value = if tokens.len() == 1 {
        translate_expr(groups[1], op_token.span)?
    } else {
        fold_assign(&tokens[1..], &groups[1..])?
    };

    if !target.is_writable() {
        return Err(TranslateError::new(
            TranslateErrorKind::NotWritable,
            "assignment target is not writable",
            target.span,
        ));
    }
    if op.binary().is_some() && !target.is_readable() {
        return Err(TranslateError::new(
            TranslateErrorKind::NotReadable,
            format!("target of '{}' must also be readable", op_token.text),
            target.span,
        ));
    }
    if !value.is_readable() {
        return Err(TranslateError::new(
            TranslateErrorKind::NotReadable,
            "assigned value does not produce a value",
            value.span,
        ));
    }

    let span = target.span;
    Ok(Expr::new(
        ExprKind::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        },
        span,
    ))
}

/// Folds an arithmetic layer, peeling the right operand from the right
/// so that `a - b - c` parses as `(a - b) - c`.
///
/// `tail` carries an already-folded right operand during unary splicing.
fn fold_arith(
    tokens: &[Token],
    groups: &[&[Node]],
    tail: Option<Expr>,
) -> Result<Expr, TranslateError> {
    let n = tokens.len();
    if n == 0 {
        // Only reachable through unary splicing, which always passes a
        // tail.
        return Ok(tail.unwrap_or_else(|| unreachable!("operator fold over an empty layer")));
    }

    let op_token = &tokens[n - 1];
    let rhs = match tail {
        Some(expr) => expr,
        None => {
            if groups[n].is_empty() {
                return Err(TranslateError::new(
                    TranslateErrorKind::MissingOperand,
                    format!("operator '{}' has no right operand", op_token.text),
                    op_token.span,
                ));
            }
            translate_expr(groups[n], op_token.span)?
        }
    };

    if groups[n - 1].is_empty() {
        // Prefix position: only `-` and `*` may be unary.
        let op = match op_token.text.as_str() {
            "-" => UnaryOp::Neg,
            "*" => UnaryOp::Deref,
            text if BinaryOp::from_text(text).is_some() => {
                return Err(TranslateError::new(
                    TranslateErrorKind::MissingOperand,
                    format!("operator '{}' has no left operand", text),
                    op_token.span,
                ));
            }
            text => {
                return Err(TranslateError::new(
                    TranslateErrorKind::UnsupportedOperator,
                    format!("operator '{}' has no meaning here", text),
                    op_token.span,
                ));
            }
        };
        if !rhs.is_readable() {
            return Err(TranslateError::new(
                TranslateErrorKind::NotReadable,
                "operand does not produce a value",
                rhs.span,
            ));
        }
        let unary = Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(rhs),
            },
            op_token.span,
        );
        if n == 1 {
            return Ok(unary);
        }
        return fold_arith(&tokens[..n - 1], &groups[..n - 1], Some(unary));
    }

    let op = BinaryOp::from_text(&op_token.text).ok_or_else(|| {
        TranslateError::new(
            TranslateErrorKind::UnsupportedOperator,
            format!("operator '{}' has no meaning here", op_token.text),
            op_token.span,
        )
    })?;
    let lhs = if n == 1 {
        translate_expr(groups[0], op_token.span)?
    } else {
        fold_arith(&tokens[..n - 1], &groups[..n], None)?
    };
    for operand in [&lhs, &rhs] {
        if !operand.is_readable() {
            return Err(TranslateError::new(
                TranslateErrorKind::NotReadable,
                "operand does not produce a value",
                operand.span,
            ));
        }
    }
    let span = lhs.span;
    Ok(Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    ))
}
