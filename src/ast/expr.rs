//! Expression nodes for the Tern AST.

use super::types::Type;
use crate::token::Span;

/// An assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
}

impl AssignOp {
    /// Parses an assignment operator token text.
    pub fn from_text(text: &str) -> Option<AssignOp> {
        match text {
            "=" => Some(AssignOp::Assign),
            "+=" => Some(AssignOp::AddAssign),
            "-=" => Some(AssignOp::SubAssign),
            "*=" => Some(AssignOp::MulAssign),
            "/=" => Some(AssignOp::DivAssign),
            _ => None,
        }
    }

    /// Returns the binary operation a read-modify-write form applies, or
    /// `None` for plain `=`.
    pub fn binary(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
        }
    }
}

/// A binary operator with defined lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Parses a binary operator token text.
    pub fn from_text(text: &str) -> Option<BinaryOp> {
        match text {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Sub),
            "*" => Some(BinaryOp::Mul),
            "/" => Some(BinaryOp::Div),
            _ => None,
        }
    }

    /// Returns the operator's source spelling.
    pub fn text(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// A prefix unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-` (numeric negation)
    Neg,
    /// `*` (pointer dereference)
    Deref,
}

/// The kind of an expression.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A reference to a named variable, constant, or function.
    Name(String),
    /// A numeric literal, kept as its source text; numeric interpretation
    /// happens against the context type during lowering.
    Number(String),
    /// A string literal (already decoded by the lexer).
    Str(String),
    /// A local variable declaration.
    Declaration {
        mutable: bool,
        ty: Type,
        name: String,
    },
    /// An assignment, plain or read-modify-write.
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// A binary operation.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// A prefix unary operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// A function call.
    Call {
        target: Box<Expr>,
        args: Vec<Expr>,
    },
    /// A `return` statement, with an optional value.
    Return(Option<Box<Expr>>),
    /// A `{ ... }` block of semicolon-separated expressions.
    Scope(Vec<Expr>),
}

/// An expression with its source location.
///
/// The span points at the token to flag when the expression fails a
/// check later in the pipeline.
#[derive(Debug, Clone)]
pub struct Expr {
    /// The kind of expression.
    pub kind: ExprKind,
    /// The source location of this expression.
    pub span: Span,
}

impl Expr {
    /// Creates a new expression.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    /// Returns true when the expression produces a readable value.
    pub fn is_readable(&self) -> bool {
        match &self.kind {
            ExprKind::Name(_)
            | ExprKind::Number(_)
            | ExprKind::Str(_)
            | ExprKind::Assign { .. }
            | ExprKind::Binary { .. }
            | ExprKind::Unary { .. }
            | ExprKind::Call { .. } => true,
            ExprKind::Declaration { .. } | ExprKind::Return(_) | ExprKind::Scope(_) => false,
        }
    }

    /// Returns true when the expression can be the target of an
    /// assignment.
    ///
    /// Whether a writable name is actually mutable is a separate check
    /// made against the declaration during code generation.
    pub fn is_writable(&self) -> bool {
        matches!(
            &self.kind,
            ExprKind::Name(_) | ExprKind::Declaration { .. }
        )
    }
}
