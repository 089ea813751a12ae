//! Parse-tree reduction for the Tern programming language.
//!
//! This module provides the [`Reducer`], which rewrites a flat token
//! stream into a nested [`Node`] tree by applying a fixed sequence of
//! rules. Each rule is a post-order rewrite over the node lists of the
//! tree produced so far:
//!
//! 1. **Brackets** - `()`, `[]`, `{}` become inner nodes holding the
//!    bracket pair and the enclosed span.
//! 2. **Delimiter splits** - a pass per delimiter class (`;`, then `,`,
//!    then one pass per operator precedence layer, loosest first). A pass
//!    that finds its delimiters collapses the list into a single inner
//!    node whose groups are the between-spans.
//!
//! After reduction the tree encodes precedence structurally; the AST
//! translator never has to re-parse operators.
//!
//! # Module Structure
//!
//! - [`error`] - Reduction error types
//! - `node` - The reduced-tree node
//! - `tests` - Unit tests (test-only)
//!
//! # See Also
//!
//! * [`crate::lexer`] - Produces the token stream
//! * [`crate::translate`] - Consumes the reduced tree

pub mod error;
mod node;


pub use error::{ParseError, ParseErrorKind};
pub use node::{Node, first_token};

use crate::token::{Token, TokenKind};

/// The operator precedence layers, loosest binding first.
///
/// Each layer gets its own split pass, so tighter-binding operators end
/// up deeper in the tree.
pub const OPERATOR_LAYERS: &[&[&str]] = &[
    &["=", "+=", "-=", "/=", "*="],
    &["||"],
    &["&&"],
    &["|"],
    &["^"],
    &["&"],
    &["==", "!="],
    &["<", ">", "<=", ">="],
    &["<<", ">>"],
    &["+", "-"],
    &["*", "/", "%"],
    &["!", "~"],
    &["++", "--"],
    &["->", "."],
];

/// A `(kind, values)` pattern set recognized by a delimiter-split rule.
///
/// An empty value list matches every token of the kind.
#[derive(Debug, Clone, Copy)]
struct Delimiters {
    kind: TokenKind,
    values: &'static [&'static str],
}

impl Delimiters {
    fn matches(&self, token: &Token) -> bool {
        token.kind == self.kind
            && (self.values.is_empty() || self.values.contains(&token.text.as_str()))
    }
}

/// One reduction rule.
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Match bracket pairs and nest their contents.
    Brackets,
    /// Split a node list on the given delimiter tokens.
    Split(Delimiters),
}

/// Applies the configured rule sequence to a token stream.
pub struct Reducer {
    rules: Vec<Rule>,
}

impl Reducer {
    /// Creates the reducer with the standard rule order: brackets, `;`,
    /// `,`, then the operator layers of [`OPERATOR_LAYERS`].
    pub fn standard() -> Self {
        let mut rules = vec![
            Rule::Brackets,
            Rule::Split(Delimiters {
                kind: TokenKind::Semicolon,
                values: &[],
            }),
            Rule::Split(Delimiters {
                kind: TokenKind::Comma,
                values: &[],
            }),
        ];
        for layer in OPERATOR_LAYERS {
            rules.push(Rule::Split(Delimiters {
                kind: TokenKind::Operator,
                values: layer,
            }));
        }
        Reducer { rules }
    }

    /// Reduces `tokens` into a tree.
    ///
    /// The stream is wrapped as the single group of a root inner node,
    /// then every rule is applied in order.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] on mismatched or unclosed brackets.
    pub fn reduce(&self, tokens: Vec<Token>) -> Result<Node, ParseError> {
        let leaves = tokens.into_iter().map(Node::Leaf).collect();
        let mut root = Node::Inner {
            tokens: Vec::new(),
            groups: vec![leaves],
        };
        for rule in &self.rules {
            root = Self::apply(*rule, root)?;
        }
        Ok(root)
    }

    /// Post-order application of one rule: children first, then the
    /// node's own groups.
    fn apply(rule: Rule, node: Node) -> Result<Node, ParseError> {
        match node {
            Node::Leaf(_) => Ok(node),
            Node::Inner { tokens, groups } => {
                let groups = groups
                    .into_iter()
                    .map(|group| {
                        let group = group
                            .into_iter()
                            .map(|child| Self::apply(rule, child))
                            .collect::<Result<Vec<_>, _>>()?;
                        Self::run(rule, group)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Node::Inner { tokens, groups })
            }
        }
    }

    fn run(rule: Rule, nodes: Vec<Node>) -> Result<Vec<Node>, ParseError> {
        match rule {
            Rule::Brackets => bracket_rule(nodes),
            Rule::Split(delimiters) => Ok(split_rule(delimiters, nodes)),
        }
    }
}

/// Which opening bracket a closing bracket requires.
fn opening_for(close: &str) -> Option<&'static str> {
    match close {
        ")" => Some("("),
        "]" => Some("["),
        "}" => Some("{"),
        _ => None,
    }
}

/// The bracket rule: wraps every bracket pair and its contents into an
/// inner node whose `tokens` are `[open, close]`.
fn bracket_rule(nodes: Vec<Node>) -> Result<Vec<Node>, ParseError> {
    // Stack of pending opens: the open token and the nodes collected
    // since it.
    let mut stack: Vec<(Token, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();

    for node in nodes {
        let bracket = match node.leaf() {
            Some(token) if token.kind == TokenKind::Bracket => Some(token.clone()),
            _ => None,
        };
        let Some(token) = bracket else {
            current.push(node);
            continue;
        };

        match opening_for(&token.text) {
            Some(expected) => {
                let Some((open, outer)) = stack.pop() else {
                    return Err(ParseError::new(
                        ParseErrorKind::MissingOpeningBracket,
                        format!("closing bracket '{}' without opening bracket", token.text),
                        token.span,
                    ));
                };
                if open.text != expected {
                    return Err(ParseError::new(
                        ParseErrorKind::MismatchedBracket,
                        format!(
                            "closing bracket '{}' does not match opening bracket '{}'",
                            token.text, open.text
                        ),
                        token.span,
                    )
                    .with_related(open.span));
                }
                let inner = Node::Inner {
                    tokens: vec![open, token],
                    groups: vec![current],
                };
                current = outer;
                current.push(inner);
            }
            None => {
                stack.push((token, std::mem::take(&mut current)));
            }
        }
    }

    if let Some((open, _)) = stack.pop() {
        return Err(ParseError::new(
            ParseErrorKind::UnclosedBracket,
            format!("opening bracket '{}' is never closed", open.text),
            open.span,
        ));
    }

    Ok(current)
}

/// The delimiter-split rule: if any delimiter occurs in `nodes`, collapse
/// the list into one inner node whose groups are the between-spans (some
/// possibly empty). Otherwise the list is returned unchanged.
fn split_rule(delimiters: Delimiters, nodes: Vec<Node>) -> Vec<Node> {
    let found = nodes.iter().any(|node| {
        node.leaf()
            .map(|token| delimiters.matches(token))
            .unwrap_or(false)
    });
    if !found {
        return nodes;
    }

    let mut tokens = Vec::new();
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for node in nodes {
        let delim = match node.leaf() {
            Some(token) if delimiters.matches(token) => Some(token.clone()),
            _ => None,
        };
        match delim {
            Some(token) => {
                tokens.push(token);
                groups.push(std::mem::take(&mut current));
            }
            None => current.push(node),
        }
    }
    groups.push(current);

    vec![Node::Inner { tokens, groups }]
}
