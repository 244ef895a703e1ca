use crate::ast::types::TypeInfo;

use super::symbol_table::{Namespace, SymbolTable, TABLE_SIZE};

fn table() -> SymbolTable {
    SymbolTable::new().unwrap()
}

#[test]
fn test_insert_then_lookup() {
    let mut symbols = table();
    let root = symbols.root();

    let x = symbols
        .insert(Namespace::Variables, "x", root, TypeInfo::Integer, None)
        .unwrap();

    assert_eq!(symbols.lookup(Namespace::Variables, "x", root), Some(x));
    assert_eq!(symbols.value(x), &TypeInfo::Integer);
    assert_eq!(symbols.entry(x).name, "x");
    assert_eq!(symbols.entry(x).scope, Some(root));
}

#[test]
fn test_reinsert_overwrites_in_place() {
    let mut symbols = table();
    let root = symbols.root();

    let first = symbols
        .insert(Namespace::Variables, "x", root, TypeInfo::Unknown, None)
        .unwrap();
    let entries = symbols.len();
    let second = symbols
        .insert(Namespace::Variables, "x", root, TypeInfo::Float, None)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(symbols.len(), entries);
    assert_eq!(symbols.value(first), &TypeInfo::Float);
}

#[test]
fn test_namespaces_are_independent() {
    let mut symbols = table();
    let root = symbols.root();

    let function = symbols
        .insert(Namespace::Functions, "shape", root, TypeInfo::Unknown, None)
        .unwrap();
    let class = symbols
        .insert(Namespace::Classes, "shape", root, TypeInfo::Unknown, None)
        .unwrap();

    assert_ne!(function, class);
    assert_eq!(symbols.lookup(Namespace::Variables, "shape", root), None);
    assert_eq!(symbols.lookup(Namespace::Functions, "shape", root), Some(function));
    assert_eq!(symbols.lookup(Namespace::Classes, "shape", root), Some(class));
}

#[test]
fn test_lookup_does_not_walk_scopes() {
    let mut symbols = table();
    let root = symbols.root();

    let outer = symbols
        .insert(Namespace::Functions, "outer", root, TypeInfo::Unknown, None)
        .unwrap();
    symbols
        .insert(Namespace::Variables, "x", root, TypeInfo::Integer, None)
        .unwrap();

    assert_eq!(symbols.lookup(Namespace::Variables, "x", outer), None);
}

#[test]
fn test_same_name_in_same_named_scopes() {
    let mut symbols = table();
    let root = symbols.root();

    // Two scopes called `inner` under different parents.
    let a = symbols
        .insert(Namespace::Classes, "A", root, TypeInfo::Unknown, None)
        .unwrap();
    let b = symbols
        .insert(Namespace::Classes, "B", root, TypeInfo::Unknown, None)
        .unwrap();
    let a_inner = symbols
        .insert(Namespace::Functions, "inner", a, TypeInfo::Unknown, None)
        .unwrap();
    let b_inner = symbols
        .insert(Namespace::Functions, "inner", b, TypeInfo::Unknown, None)
        .unwrap();

    let in_a = symbols
        .insert(Namespace::Variables, "v", a_inner, TypeInfo::Integer, None)
        .unwrap();
    let in_b = symbols
        .insert(Namespace::Variables, "v", b_inner, TypeInfo::String, None)
        .unwrap();

    assert_ne!(in_a, in_b);
    assert_eq!(symbols.value(in_a), &TypeInfo::Integer);
    assert_eq!(symbols.value(in_b), &TypeInfo::String);
    assert_eq!(symbols.qualified_name(in_b), "B.inner.v");
}

#[test]
fn test_collisions_chain() {
    let mut symbols = table();
    let root = symbols.root();

    // More names than buckets forces chaining.
    let ids: Vec<_> = (0..TABLE_SIZE + 50)
        .map(|n| {
            symbols
                .insert(
                    Namespace::Variables,
                    &format!("name{}", n),
                    root,
                    TypeInfo::Integer,
                    None,
                )
                .unwrap()
        })
        .collect();

    for (n, id) in ids.iter().enumerate() {
        assert_eq!(
            symbols.lookup(Namespace::Variables, &format!("name{}", n), root),
            Some(*id)
        );
    }
}

#[test]
fn test_builtins_are_registered() {
    let symbols = table();
    let root = symbols.root();

    let int = symbols.lookup(Namespace::Classes, "int", root).unwrap();
    assert_eq!(symbols.value(int), &TypeInfo::Integer);
    assert!(symbols.is_builtin(int));

    let exception = symbols
        .lookup(Namespace::Classes, "Exception", root)
        .unwrap();
    assert_eq!(symbols.value(exception), &TypeInfo::Class(exception));

    let len = symbols.lookup(Namespace::Functions, "len", root).unwrap();
    assert_eq!(
        symbols.value(len),
        &TypeInfo::function(TypeInfo::Integer, Some(len))
    );

    let range = symbols.lookup(Namespace::Functions, "range", root).unwrap();
    assert_eq!(
        symbols.value(range),
        &TypeInfo::function(TypeInfo::list(TypeInfo::Integer), Some(range))
    );
}

#[test]
fn test_entries_in_scope() {
    let mut symbols = table();
    let root = symbols.root();

    let f = symbols
        .insert(Namespace::Functions, "f", root, TypeInfo::Unknown, None)
        .unwrap();
    let a = symbols
        .insert(Namespace::Variables, "a", f, TypeInfo::Integer, None)
        .unwrap();
    let b = symbols
        .insert(Namespace::Variables, "b", f, TypeInfo::Integer, None)
        .unwrap();

    assert_eq!(symbols.entries_in_scope(f), vec![a, b]);
}

#[test]
fn test_class_types_compare_by_entry() {
    let mut symbols = table();
    let root = symbols.root();

    let f = symbols
        .insert(Namespace::Functions, "f", root, TypeInfo::Unknown, None)
        .unwrap();
    let outer = symbols
        .insert(Namespace::Classes, "Point", root, TypeInfo::Unknown, None)
        .unwrap();
    let inner = symbols
        .insert(Namespace::Classes, "Point", f, TypeInfo::Unknown, None)
        .unwrap();

    assert_ne!(TypeInfo::Class(outer), TypeInfo::Class(inner));
    assert_eq!(TypeInfo::Class(outer), TypeInfo::Class(outer));
    assert_eq!(TypeInfo::Class(inner).render(&symbols), "f.Point");
}
