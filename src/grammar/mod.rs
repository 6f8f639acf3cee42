//! Grammar of the target expression language
//!
//! This module defines the AST the generator builds, the operator sets,
//! the built-in registry and the canonical rendering to source text.
//! The language itself (parsing, type checking, evaluation) lives behind
//! the [`crate::oracle::Oracle`] boundary.

mod ast;
mod builtins;

pub use ast::{is_identifier, BinaryOp, ExprNode, NodeKind, UnaryOp};
pub use builtins::{is_builtin, BUILTIN_NAMES, PREDICATE_NAMES};
