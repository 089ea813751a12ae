//! Reduced-tree to AST translation for the Tern programming language.
//!
//! This module recognizes the language's grammatical forms out of the
//! generic reduced tree produced by [`crate::parser`]. The top level is a
//! semicolon-separated list of items, each dispatched on its leading
//! token:
//!
//! - `var` / `const` - global declaration, optionally `= expr`
//! - `function` - function declaration or definition
//! - `struct` - struct definition
//! - a bare `name = expr` - initializer for a separately declared global
//!
//! # Module Structure
//!
//! - [`error`] - Translation error types
//! - `helpers` - Shape-matching utilities over node lists
//! - `types` - Type and `type name` parsing
//! - `expr` - Expression translation and operator folding
//! - `tests` - Unit tests (test-only)
//!
//! # See Also
//!
//! * [`crate::parser`] - Produces the reduced tree
//! * [`crate::semantic`] - Validates and registers the produced items

pub mod error;
mod expr;
mod helpers;
mod types;

#[cfg(test)]
mod tests;

pub use error::{TranslateError, TranslateErrorKind};

use crate::ast::{Declaration, Expr, Function, GlobalInit, GlobalVar, Item, StructDef};
use crate::parser::{Node, first_token};
use crate::token::TokenKind;
use expr::{is_assignment_node, translate_expr, translate_scope};
use helpers::{comma_groups, detach_leading_keyword, flatten_operators, semicolon_groups, unpack_bracket};
use types::{parse_type, parse_typed_name};

/// Translates the reduced tree into the list of top-level items.
///
/// # Errors
///
/// Returns a [`TranslateError`] when any group fails to match one of the
/// item forms, or when an expression inside an item is ill-formed.
pub fn translate(root: &Node) -> Result<Vec<Item>, TranslateError> {
    let top: &[Node] = match root {
        Node::Inner { tokens, groups } if tokens.is_empty() && groups.len() == 1 => &groups[0],
        _ => std::slice::from_ref(root),
    };

    let mut items = Vec::new();
    for group in semicolon_groups(top) {
        if group.is_empty() {
            continue;
        }
        items.push(translate_item(group)?);
    }
    Ok(items)
}

/// Dispatches one top-level group by its leading token.
fn translate_item(nodes: &[Node]) -> Result<Item, TranslateError> {
    let first = match first_token(nodes) {
        Some(token) => token.clone(),
        None => {
            return Err(TranslateError::new(
                TranslateErrorKind::ExpectedItem,
                "expected a declaration",
                nodes[0].span().unwrap_or_else(|| {
                    unreachable!("non-empty group without any token")
                }),
            ));
        }
    };

    match (first.kind, first.text.as_str()) {
        (TokenKind::Keyword, "var") | (TokenKind::Keyword, "const") => global_item(nodes),
        (TokenKind::Keyword, "function") => function_item(nodes),
        (TokenKind::Keyword, "struct") => struct_item(nodes),
        (TokenKind::Keyword, other) => Err(TranslateError::new(
            TranslateErrorKind::ReservedKeyword,
            format!("keyword '{}' cannot start a declaration", other),
            first.span,
        )),
        _ if matches!(nodes, [node] if is_assignment_node(node)) => global_item(nodes),
        _ => Err(TranslateError::new(
            TranslateErrorKind::ExpectedItem,
            "expected 'var', 'const', 'function', 'struct', or a global definition",
            first.span,
        )),
    }
}

/// Parses a global declaration (`var`/`const ... [= expr]`) or a bare
/// `name = expr` definition.
fn global_item(nodes: &[Node]) -> Result<Item, TranslateError> {
    let (decl_nodes, init) = match nodes {
        [node @ Node::Inner { tokens, groups }] if is_assignment_node(node) => {
            if tokens.len() != 1 || tokens[0].text != "=" {
                return Err(TranslateError::new(
                    TranslateErrorKind::MalformedItem,
                    "a global definition takes a single '='",
                    tokens[0].span,
                ));
            }
            let value = translate_expr(&groups[1], tokens[0].span)?;
            if !value.is_readable() {
                return Err(TranslateError::new(
                    TranslateErrorKind::NotReadable,
                    "initializer does not produce a value",
                    value.span,
                ));
            }
            (groups[0].as_slice(), Some(value))
        }
        _ => (nodes, None),
    };

    match detach_leading_keyword(decl_nodes) {
        Some((keyword, rest)) if keyword.text == "var" || keyword.text == "const" => {
            let (ty, name) = parse_typed_name(&rest, keyword.span)?;
            Ok(Item::Global(GlobalVar {
                mutable: keyword.text == "var",
                ty,
                name: name.text.clone(),
                init,
                span: name.span,
            }))
        }
        Some((keyword, _)) => Err(TranslateError::new(
            TranslateErrorKind::ReservedKeyword,
            format!("keyword '{}' cannot start a declaration", keyword.text),
            keyword.span,
        )),
        None => global_init_item(decl_nodes, init),
    }
}

/// Parses the bare `name = expr` form.
fn global_init_item(decl: &[Node], init: Option<Expr>) -> Result<Item, TranslateError> {
    let flat = flatten_operators(decl);
    if let ([Node::Leaf(token)], Some(value)) = (&flat[..], init) {
        if token.kind == TokenKind::Name {
            return Ok(Item::GlobalInit(GlobalInit {
                name: token.text.clone(),
                value,
                span: token.span,
            }));
        }
    }
    let span = first_token(decl)
        .map(|t| t.span)
        .unwrap_or_else(|| unreachable!("global definition without any token"));
    Err(TranslateError::new(
        TranslateErrorKind::ExpectedItem,
        "a global definition is 'name = expression'",
        span,
    ))
}

/// Parses a function declaration or definition.
fn function_item(nodes: &[Node]) -> Result<Item, TranslateError> {
    let flat = flatten_operators(nodes);
    let keyword = match &flat[0] {
        Node::Leaf(token) if token.is(TokenKind::Keyword, "function") => token.clone(),
        _ => {
            let span = first_token(&flat).map(|t| t.span);
            return Err(TranslateError::new(
                TranslateErrorKind::MalformedItem,
                "malformed function declaration",
                span.unwrap_or_else(|| unreachable!("function item without any token")),
            ));
        }
    };

    let mut end = flat.len();
    let body_nodes = match flat.last() {
        Some(last) => unpack_bracket(last, "{"),
        None => None,
    };
    let body_span = if body_nodes.is_some() {
        end -= 1;
        flat[end].span()
    } else {
        None
    };

    let args_node = end.checked_sub(1).map(|i| &flat[i]);
    let args = args_node.and_then(|n| unpack_bracket(n, "(")).ok_or_else(|| {
        TranslateError::new(
            TranslateErrorKind::MalformedItem,
            "expected a parenthesized parameter list",
            keyword.span,
        )
    })?;
    let args_span = flat[end - 1].span().unwrap_or(keyword.span);
    end -= 1;

    let name = match end.checked_sub(1).map(|i| &flat[i]) {
        Some(Node::Leaf(token)) if token.kind == TokenKind::Name => token.clone(),
        _ => {
            return Err(TranslateError::new(
                TranslateErrorKind::ExpectedName,
                "expected a function name",
                keyword.span,
            ));
        }
    };
    end -= 1;

    let ret = parse_type(&flat[1..end], name.span)?;

    let mut params = Vec::new();
    let groups = comma_groups(args);
    if !(groups.len() == 1 && groups[0].is_empty()) {
        for group in groups {
            let (ty, param) = parse_typed_name(group, args_span)?;
            params.push(Declaration {
                mutable: true,
                ty,
                name: param.text.clone(),
                span: param.span,
            });
        }
    }

    let body = match body_nodes {
        Some(nodes) => Some(translate_scope(nodes, body_span.unwrap_or(name.span))?),
        None => None,
    };

    Ok(Item::Function(Function {
        ret,
        name: name.text.clone(),
        params,
        body,
        span: name.span,
    }))
}

/// Parses a struct definition.
fn struct_item(nodes: &[Node]) -> Result<Item, TranslateError> {
    let flat = flatten_operators(nodes);
    let (keyword, name, braces) = match &flat[..] {
        [Node::Leaf(kw), Node::Leaf(name), braces]
            if kw.is(TokenKind::Keyword, "struct") && name.kind == TokenKind::Name =>
        {
            (kw.clone(), name.clone(), braces)
        }
        _ => {
            let span = first_token(&flat)
                .map(|t| t.span)
                .unwrap_or_else(|| unreachable!("struct item without any token"));
            return Err(TranslateError::new(
                TranslateErrorKind::MalformedItem,
                "a struct definition is 'struct Name { members }'",
                span,
            ));
        }
    };

    let members_nodes = unpack_bracket(braces, "{").ok_or_else(|| {
        TranslateError::new(
            TranslateErrorKind::MalformedItem,
            "expected '{' after the struct name",
            keyword.span,
        )
    })?;

    let mut members = Vec::new();
    for group in semicolon_groups(members_nodes) {
        if group.is_empty() {
            continue;
        }
        if let Some(token) = first_token(group) {
            if token.kind == TokenKind::Keyword {
                return Err(TranslateError::new(
                    TranslateErrorKind::MalformedItem,
                    "a struct member is 'type name'",
                    token.span,
                ));
            }
        }
        let (ty, member) = parse_typed_name(group, name.span)?;
        members.push(Declaration {
            mutable: true,
            ty,
            name: member.text.clone(),
            span: member.span,
        });
    }

    Ok(Item::Struct(StructDef {
        name: name.text.clone(),
        members,
        span: name.span,
    }))
}
