//! Top-level items of a Tern program.

use super::expr::Expr;
use super::types::Type;
use crate::token::Span;

/// A declaration: a type bound to a name.
///
/// Used for struct members and function parameters.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// False for `const` declarations.
    pub mutable: bool,
    /// The declared type.
    pub ty: Type,
    /// The declared name.
    pub name: String,
    /// The source location of the name.
    pub span: Span,
}

/// A global variable or constant.
#[derive(Debug, Clone)]
pub struct GlobalVar {
    /// False for `const` declarations.
    pub mutable: bool,
    /// The declared type.
    pub ty: Type,
    /// The declared name.
    pub name: String,
    /// The initializer, when this declaration carries one.
    pub init: Option<Expr>,
    /// The source location of the declaration.
    pub span: Span,
}

/// A bare `name = expr;` at the top level, defining the initializer of a
/// separately declared global.
#[derive(Debug, Clone)]
pub struct GlobalInit {
    /// The global's name.
    pub name: String,
    /// The initializer expression.
    pub value: Expr,
    /// The source location of the name.
    pub span: Span,
}

/// A function declaration or definition.
#[derive(Debug, Clone)]
pub struct Function {
    /// The return type.
    pub ret: Type,
    /// The function name.
    pub name: String,
    /// The parameters, in order.
    pub params: Vec<Declaration>,
    /// The body scope; `None` for a pure declaration.
    pub body: Option<Expr>,
    /// The source location of the declaration.
    pub span: Span,
}

impl Function {
    /// Returns the function's type (return and parameter types).
    pub fn signature(&self) -> Type {
        Type::Function {
            ret: Box::new(self.ret.clone()),
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
        }
    }
}

/// A struct definition.
#[derive(Debug, Clone)]
pub struct StructDef {
    /// The struct name.
    pub name: String,
    /// The members, in declaration order.
    pub members: Vec<Declaration>,
    /// The source location of the definition.
    pub span: Span,
}

/// One top-level item.
#[derive(Debug, Clone)]
pub enum Item {
    /// `var`/`const` declaration, optionally initialized.
    Global(GlobalVar),
    /// Bare `name = expr` definition of a declared global.
    GlobalInit(GlobalInit),
    /// Function declaration or definition.
    Function(Function),
    /// Struct definition.
    Struct(StructDef),
}

impl Item {
    /// Returns the declared name.
    pub fn name(&self) -> &str {
        match self {
            Item::Global(g) => &g.name,
            Item::GlobalInit(g) => &g.name,
            Item::Function(f) => &f.name,
            Item::Struct(s) => &s.name,
        }
    }

    /// Returns the item's source location.
    pub fn span(&self) -> Span {
        match self {
            Item::Global(g) => g.span,
            Item::GlobalInit(g) => g.span,
            Item::Function(f) => f.span,
            Item::Struct(s) => s.span,
        }
    }
}
