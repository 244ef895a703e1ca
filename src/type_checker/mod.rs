//! Type checking over the parsed AST.
//!
//! The checker walks the tree once with a stack of active scopes, infers a
//! type for every expression, writes declared and inferred types back into
//! the symbol table and rejects the first ill-typed construct it meets.

pub mod expr;
pub mod type_checker;

#[cfg(test)]
mod tests;
