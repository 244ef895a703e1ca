//! Arena allocation for the front end.
//!
//! Every AST node, symbol-table entry and scope-stack frame lives in an
//! arena and is addressed by a typed index instead of a pointer. Nothing is
//! freed individually; an arena releases all of its storage at once when it
//! is dropped, and a sub-arena gives stack-discipline storage on top of a
//! parent arena that is rewound when the sub-arena goes away.

pub mod arena;
