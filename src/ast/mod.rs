//! Abstract Syntax Tree definitions for the Tern programming language.
//!
//! The AST is produced by [`crate::translate`] from the reduced tree,
//! validated and registered by [`crate::semantic`], and consumed by
//! [`crate::codegen`].
//!
//! # Structure
//!
//! - [`Item`] - Top-level items: globals, functions, structs
//! - [`Expr`] - Expressions, including declarations, scopes, and `return`
//! - [`Type`] / [`NumberType`] - The type representation
//!
//! Every node carries the [`Span`](crate::token::Span) of the token to
//! flag when a later stage rejects it.

mod expr;
mod item;
mod types;

pub use expr::{AssignOp, BinaryOp, Expr, ExprKind, UnaryOp};
pub use item::{Declaration, Function, GlobalInit, GlobalVar, Item, StructDef};
pub use types::{NumberType, Type};
