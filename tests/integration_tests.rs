//! Integration tests for the whole front end.
//!
//! These tests run complete programs through tokenization, parsing and type
//! checking, and check the rendered diagnostics of failing ones.

use std::path::Path;

use pyfront::{
    ast::types::TypeInfo,
    compile_source,
    errors::errors::{ErrorImpl, ErrorPhase},
    format_error,
    symbol_table::symbol_table::Namespace,
};

const INVENTORY: &str = r#"from typing import Optional


class Item:
    def __init__(self, name: str, price: float, quantity: int = 0):
        self.name = name
        self.price = price
        self.quantity = quantity

    def total(self) -> float:
        return self.price * self.quantity


class Inventory:
    def __init__(self):
        self.items: list[Item] = []

    def add(self, item: Item) -> None:
        self.items.append(item)

    def find(self, name: str) -> Optional[Item]:
        for item in self.items:
            if item.name == name:
                return item
        return None

    def value(self) -> float:
        total = 0.0
        for item in self.items:
            total += item.total()
        return total


def main():
    inventory = Inventory()
    inventory.add(Item("bolt", 0.25, quantity=400))
    inventory.add(Item("nut", 0.1, 250))
    names = [item.name for item in inventory.items if item.quantity > 0]
    summary = {name: len(name) for name in names}
    print(inventory.value(), summary)


main()
"#;

#[test]
fn test_compile_program() {
    let module = compile_source(INVENTORY, "inventory.py").unwrap();
    assert_eq!(module.lines, 43);

    let root = module.symbols.root();
    let inventory = module
        .symbols
        .lookup(Namespace::Classes, "Inventory", root)
        .unwrap();
    let value = module
        .symbols
        .lookup(Namespace::Functions, "value", inventory)
        .unwrap();
    assert_eq!(
        module.symbols.value(value),
        &TypeInfo::function(TypeInfo::Float, Some(value))
    );
    assert_eq!(module.symbols.qualified_name(value), "Inventory.value");
}

#[test]
fn test_compile_control_flow() {
    let source = r#"def classify(n: int) -> str:
    if n < 0:
        return "negative"
    elif n == 0:
        return "zero"
    else:
        return "positive"


def collatz(n: int) -> int:
    steps = 0
    while n != 1:
        if n % 2 == 0:
            n = n // 2
        else:
            n = 3 * n + 1
        steps += 1
    return steps


results = []
for i in range(1, 10):
    results.append(classify(i))
try:
    steps = collatz(27)
except ValueError as error:
    print(error)
finally:
    print("done")
"#;
    let module = compile_source(source, "flow.py").unwrap();
    let root = module.symbols.root();
    let steps = module
        .symbols
        .lookup(Namespace::Variables, "steps", root)
        .unwrap();
    assert_eq!(module.symbols.value(steps), &TypeInfo::Integer);
}

#[test]
fn test_lexical_error() {
    let error = compile_source("x = 'unterminated\n", "bad.py").unwrap_err();
    assert_eq!(error.phase(), ErrorPhase::Lexical);
    assert_eq!(error.get_impl(), &ErrorImpl::UnterminatedString);
}

#[test]
fn test_inconsistent_indentation() {
    let source = "if True:\n        x = 1\n    y = 2\n";
    let error = compile_source(source, "bad.py").unwrap_err();
    assert_eq!(error.get_error_name(), "InconsistentIndentation");
    assert_eq!(error.get_position().line, 3);
}

#[test]
fn test_syntax_error_report() {
    let source = "x = 1\nif x > 0\n    x = 2\n";
    let error = compile_source(source, "main.py").unwrap_err();
    assert_eq!(error.phase(), ErrorPhase::Syntax);

    let report = format_error(&error, source, Path::new("main.py"));
    assert!(report.starts_with("Error: UnexpectedToken (Expected `Colon`, found `Newline`)\n"));
    assert!(report.contains("-> main.py:2:"));
    assert!(report.contains("2 | if x > 0\n"));
}

#[test]
fn test_type_error_report() {
    let source = "def greet(name: str) -> str:\n    return \"hi \" + name\n\ngreet(42)\n";
    let error = compile_source(source, "greet.py").unwrap_err();
    assert_eq!(error.phase(), ErrorPhase::Type);
    assert_eq!(
        error.get_impl(),
        &ErrorImpl::ArgumentTypeMatchError {
            expected: String::from("str"),
            received: String::from("int"),
        }
    );
    assert_eq!(error.get_position().line, 4);
    assert_eq!(error.get_context(), Some("42"));

    let report = format_error(&error, source, Path::new("greet.py"));
    assert!(report.contains("4 | greet(42)\n"));
    assert!(report.contains("in: 42"));
}

#[test]
fn test_method_return_mismatch() {
    let source = "class Counter:\n    def __init__(self):\n        self.count = 0\n\n    def label(self) -> str:\n        return self.count\n";
    let error = compile_source(source, "counter.py").unwrap_err();
    assert_eq!(
        error.get_impl(),
        &ErrorImpl::ReturnTypeMismatch {
            function: String::from("Counter.label"),
            expected: String::from("str"),
            received: String::from("int"),
        }
    );
}

#[test]
fn test_structural_limits() {
    let source = format!("x = {}1{}\n", "(".repeat(10_000), ")".repeat(10_000));
    let error = compile_source(&source, "deep.py").unwrap_err();
    assert_eq!(error.get_error_name(), "NestingTooDeep");
    assert_eq!(error.phase(), ErrorPhase::Syntax);

    let error = compile_source("def f(a, b, a):\n    return a\n", "dup.py").unwrap_err();
    assert_eq!(error.get_error_name(), "DuplicateParameter");
}

#[test]
fn test_comprehension_and_class_values() {
    let source = "class P:\n    pass\n\nps = [P() for k in range(3)]\nq = k\n";
    let error = compile_source(source, "leak.py").unwrap_err();
    assert_eq!(
        error.get_impl(),
        &ErrorImpl::UnresolvedName {
            name: String::from("k")
        }
    );

    let error = compile_source("class P:\n    pass\n\np: P = P\n", "cls.py").unwrap_err();
    assert_eq!(
        error.get_impl(),
        &ErrorImpl::TypeMatchError {
            expected: String::from("P"),
            received: String::from("type[P]"),
        }
    );
}
