//! Type and declaration parsing off the reduced tree.

use super::error::{TranslateError, TranslateErrorKind};
use super::helpers::{comma_groups, flatten_operators, unpack_bracket};
use crate::ast::{NumberType, Type};
use crate::parser::{Node, first_token};
use crate::token::{Span, Token, TokenKind};

/// Parses a type from an already-flattened node list.
///
/// Recognized forms: a primitive name, a struct name, `*T`, and
/// `ret_t(arg_t, arg_t, ...)`. Chained `*` nests left-to-right.
pub(super) fn parse_type(nodes: &[Node], at: Span) -> Result<Type, TranslateError> {
    if nodes.is_empty() {
        return Err(TranslateError::new(
            TranslateErrorKind::ExpectedType,
            "expected a type",
            at,
        ));
    }

    // `*T`
    if let Node::Leaf(token) = &nodes[0] {
        if token.is(TokenKind::Operator, "*") {
            let inner = parse_type(&nodes[1..], token.span)?;
            return Ok(Type::Pointer(Box::new(inner)));
        }
    }

    // `ret_t(arg_t, ...)`
    if nodes.len() >= 2 {
        if let Some(args) = unpack_bracket(&nodes[nodes.len() - 1], "(") {
            let ret = parse_type(&nodes[..nodes.len() - 1], at)?;
            let mut params = Vec::new();
            let groups = comma_groups(args);
            if !(groups.len() == 1 && groups[0].is_empty()) {
                for group in groups {
                    let flat = flatten_operators(group);
                    params.push(parse_type(&flat, at)?);
                }
            }
            return Ok(Type::Function {
                ret: Box::new(ret),
                params,
            });
        }
    }

    if let [Node::Leaf(token)] = nodes {
        match token.kind {
            TokenKind::Type => {
                if token.text == "void" {
                    return Ok(Type::Void);
                }
                if let Some(number) = NumberType::from_name(&token.text) {
                    return Ok(Type::Number(number));
                }
            }
            TokenKind::Name => return Ok(Type::Struct(token.text.clone())),
            _ => {}
        }
    }

    let span = first_token(nodes).map(|t| t.span).unwrap_or(at);
    Err(TranslateError::new(
        TranslateErrorKind::ExpectedType,
        "cannot parse type",
        span,
    ))
}

/// Parses a `type name` region (struct member, parameter, declaration
/// tail). The region is flattened first, so pointer stars split by the
/// reducer reappear in place.
pub(super) fn parse_typed_name(
    nodes: &[Node],
    at: Span,
) -> Result<(Type, Token), TranslateError> {
    let flat = flatten_operators(nodes);
    let name = match flat.last() {
        Some(Node::Leaf(token)) if token.kind == TokenKind::Name => token.clone(),
        Some(node) => {
            let span = node.span().unwrap_or(at);
            return Err(TranslateError::new(
                TranslateErrorKind::ExpectedName,
                "expected a name after the type",
                span,
            ));
        }
        None => {
            return Err(TranslateError::new(
                TranslateErrorKind::ExpectedName,
                "expected a type and a name",
                at,
            ));
        }
    };
    let ty = parse_type(&flat[..flat.len() - 1], name.span)?;
    Ok((ty, name))
}
