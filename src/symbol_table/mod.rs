//! Symbol table: three namespaces of entries keyed by (name, scope).

pub mod symbol_table;

#[cfg(test)]
mod tests;
