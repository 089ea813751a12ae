//! Shape-matching helpers over reduced-tree node lists.
//!
//! The translator works on `&[Node]` groups throughout; these helpers
//! recognize the recurring shapes: bracketed sub-trees, delimiter-split
//! lists, operator layers that need re-flattening for positional parsing
//! (item headers, type-and-name regions), and leading keywords buried in
//! the first group of an operator chain.

use crate::parser::Node;
use crate::token::{Token, TokenKind};

/// Returns the enclosed group when `node` is a bracket node opened by
/// `open`.
pub(super) fn unpack_bracket<'a>(node: &'a Node, open: &str) -> Option<&'a [Node]> {
    match node {
        Node::Inner { tokens, groups } if node.is_bracketed() && tokens[0].text == open => {
            Some(&groups[0])
        }
        _ => None,
    }
}

/// Splits `nodes` as a delimiter list of the given kind.
///
/// When `nodes` is a single delimiter node of that kind, its groups are
/// returned; otherwise the whole list is one group.
fn delimiter_groups(nodes: &[Node], kind: TokenKind) -> Vec<&[Node]> {
    if let [Node::Inner { tokens, groups }] = nodes {
        let is_layer = !tokens.is_empty()
            && tokens.iter().all(|t| t.kind == kind)
            && groups.len() == tokens.len() + 1;
        if is_layer {
            return groups.iter().map(|g| g.as_slice()).collect();
        }
    }
    vec![nodes]
}

/// Splits `nodes` on `;`.
pub(super) fn semicolon_groups(nodes: &[Node]) -> Vec<&[Node]> {
    delimiter_groups(nodes, TokenKind::Semicolon)
}

/// Splits `nodes` on `,`.
pub(super) fn comma_groups(nodes: &[Node]) -> Vec<&[Node]> {
    delimiter_groups(nodes, TokenKind::Comma)
}

/// Re-flattens operator-layer nodes back into a positional list.
///
/// Item headers and type-and-name regions are parsed positionally, but
/// the operator passes may have split them (a `*` in a pointer type
/// splits the whole group). This expands every non-bracket inner node
/// back into `group₀ token₀ group₁ ...` order, leaving bracket nodes
/// intact.
pub(super) fn flatten_operators(nodes: &[Node]) -> Vec<Node> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            Node::Inner { tokens, groups } if !node.is_bracketed() && !tokens.is_empty() => {
                for (i, group) in groups.iter().enumerate() {
                    if i > 0 {
                        out.push(Node::Leaf(tokens[i - 1].clone()));
                    }
                    out.extend(flatten_operators(group));
                }
            }
            Node::Inner { tokens, groups } if !node.is_bracketed() && tokens.is_empty() => {
                for group in groups {
                    out.extend(flatten_operators(group));
                }
            }
            _ => out.push(node.clone()),
        }
    }
    out
}

/// Detaches a leading keyword from a node list.
///
/// The keyword may be buried as the first leaf of the first group of an
/// operator chain (`return -1` reduces to `[- [return] [1]]`); in that
/// case the chain is rebuilt without it, which is exactly what turns the
/// remaining `-` into a prefix operator.
pub(super) fn detach_leading_keyword(nodes: &[Node]) -> Option<(Token, Vec<Node>)> {
    match nodes.first()? {
        Node::Leaf(token) if token.kind == TokenKind::Keyword => {
            Some((token.clone(), nodes[1..].to_vec()))
        }
        node @ Node::Inner { tokens, groups } if !node.is_bracketed() => {
            let (keyword, rest) = detach_leading_keyword(groups.first()?)?;
            let mut new_groups = groups.clone();
            new_groups[0] = rest;
            let mut out = vec![Node::Inner {
                tokens: tokens.clone(),
                groups: new_groups,
            }];
            out.extend(nodes[1..].iter().cloned());
            Some((keyword, out))
        }
        _ => None,
    }
}
