//! Reduced-tree nodes.

use crate::token::{Span, Token};

/// A node of the reduced tree.
///
/// A node is either a single token or an inner node holding the delimiter
/// tokens a rule consumed plus the child groups between them.
///
/// # Shapes
///
/// Inner nodes come in two shapes, both maintained by the reducer:
///
/// - **Delimiter nodes**: `n` delimiter tokens and `n + 1` groups (the
///   between-spans), or no tokens and a single group for the root.
/// - **Bracket nodes**: exactly two tokens (the opening and closing
///   bracket) and a single group (the enclosed span).
#[derive(Debug, Clone)]
pub enum Node {
    /// A single token.
    Leaf(Token),
    /// Delimiter tokens and the child groups between them.
    Inner {
        /// The tokens consumed by the rule that built this node.
        tokens: Vec<Token>,
        /// The child groups.
        groups: Vec<Vec<Node>>,
    },
}

impl Node {
    /// Returns the token when this node is a leaf.
    pub fn leaf(&self) -> Option<&Token> {
        match self {
            Node::Leaf(token) => Some(token),
            Node::Inner { .. } => None,
        }
    }

    /// Returns true when this inner node is bracket-shaped: a single
    /// group enclosed by an open/close token pair.
    pub fn is_bracketed(&self) -> bool {
        matches!(
            self,
            Node::Inner { tokens, groups } if tokens.len() == 2 && groups.len() == 1
        )
    }

    /// Returns the first token anywhere in this node, in source order.
    pub fn first_token(&self) -> Option<&Token> {
        match self {
            Node::Leaf(token) => Some(token),
            Node::Inner { tokens, groups } => {
                if self.is_bracketed() {
                    return tokens.first();
                }
                for node in groups.first().into_iter().flatten() {
                    if let Some(token) = node.first_token() {
                        return Some(token);
                    }
                }
                tokens.first()
            }
        }
    }

    /// Returns the span of the first token in this node, if any.
    pub fn span(&self) -> Option<Span> {
        self.first_token().map(|t| t.span)
    }

    /// Renders the node as a compact single-line form, used by tests and
    /// debugging: leaves print their text, inner nodes print their groups
    /// interleaved with delimiters inside `[...]`, with `·` for empty
    /// groups.
    pub fn dump(&self) -> String {
        let render_group = |nodes: &[Node]| {
            if nodes.is_empty() {
                "·".to_string()
            } else {
                nodes.iter().map(Node::dump).collect::<Vec<_>>().join(" ")
            }
        };
        match self {
            Node::Leaf(token) => token.text.clone(),
            Node::Inner { tokens, groups } => {
                if self.is_bracketed() {
                    return format!(
                        "[{} {} {}]",
                        tokens[0].text,
                        render_group(&groups[0]),
                        tokens[1].text
                    );
                }
                let mut out = String::from("[");
                for (i, group) in groups.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                        out.push_str(&tokens[i - 1].text);
                        out.push(' ');
                    }
                    out.push_str(&render_group(group));
                }
                out.push(']');
                out
            }
        }
    }
}

/// Returns the first token of a node list, in source order.
pub fn first_token(nodes: &[Node]) -> Option<&Token> {
    nodes.iter().find_map(Node::first_token)
}
