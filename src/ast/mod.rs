//! AST (Abstract Syntax Tree) module.
//!
//! Nodes live in one arena owned by [`ast::Ast`] and refer to each other by
//! [`ast::NodeId`]. Ordered children are a first-child id plus the `next`
//! link of each child.
//!
//! Submodules:
//! - ast: node kinds, the node arena, precedence and rendering
//! - types: the structural types the type checker assigns

pub mod ast;
pub mod types;

#[cfg(test)]
mod tests;
