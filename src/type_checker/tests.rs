use std::rc::Rc;

use crate::{
    arena::arena::Arena,
    ast::{ast::NodeKind, types::TypeInfo},
    errors::errors::{Error, ErrorImpl},
    lexer::lexer::tokenize,
    parser::parser::{parse, Module, MAX_NESTING_DEPTH},
    symbol_table::symbol_table::Namespace,
};

use super::type_checker::{type_check, FrameKind, TypeChecker, SCOPE_STACK_DEPTH};

fn parse_source(source: &str) -> Module {
    let file = Rc::new(String::from("test.py"));
    let tokens = tokenize(source, Rc::clone(&file)).unwrap();
    parse(tokens, file).unwrap()
}

fn check(source: &str) -> Result<Module, Error> {
    let mut module = parse_source(source);
    type_check(&mut module)?;
    Ok(module)
}

fn check_ok(source: &str) -> Module {
    match check(source) {
        Ok(module) => module,
        Err(error) => panic!("unexpected {}: {}", error.get_error_name(), error.get_impl()),
    }
}

fn check_err(source: &str) -> ErrorImpl {
    match check(source) {
        Ok(_) => panic!("expected a type error in {:?}", source),
        Err(error) => error.get_impl().clone(),
    }
}

fn statement_types(module: &Module) -> Vec<TypeInfo> {
    match module.ast.kind(module.root) {
        NodeKind::File { body } => module
            .ast
            .children(*body)
            .into_iter()
            .map(|id| module.ast.node(id).type_info.clone())
            .collect(),
        kind => panic!("root is not a file: {:?}", kind),
    }
}

fn variable(module: &Module, name: &str) -> TypeInfo {
    let entry = module
        .symbols
        .lookup(Namespace::Variables, name, module.symbols.root())
        .unwrap();
    module.symbols.value(entry).clone()
}

fn function_return(module: &Module, name: &str) -> TypeInfo {
    let entry = module
        .symbols
        .lookup(Namespace::Functions, name, module.symbols.root())
        .unwrap();
    match module.symbols.value(entry) {
        TypeInfo::Function { ret, .. } => (**ret).clone(),
        other => panic!("{} is not a function: {:?}", name, other),
    }
}

fn class_type(module: &Module, name: &str) -> TypeInfo {
    let entry = module
        .symbols
        .lookup(Namespace::Classes, name, module.symbols.root())
        .unwrap();
    TypeInfo::Class(entry)
}

#[test]
fn test_numeric_promotion() {
    let module = check_ok("3 + 3\n3 - 3.0\n3.0 * 3\n3.0 - 3.0\n3 / 3\n3 // 3");
    assert_eq!(
        statement_types(&module),
        vec![
            TypeInfo::Integer,
            TypeInfo::Float,
            TypeInfo::Float,
            TypeInfo::Float,
            TypeInfo::Float,
            TypeInfo::Integer,
        ]
    );
}

#[test]
fn test_annotated_signature() {
    let module = check_ok("def f(x: int, y: str) -> str:\n    return y\n");
    assert_eq!(function_return(&module, "f"), TypeInfo::String);

    let entry = module
        .symbols
        .lookup(Namespace::Functions, "f", module.symbols.root())
        .unwrap();
    let x = module.symbols.lookup(Namespace::Variables, "x", entry).unwrap();
    let y = module.symbols.lookup(Namespace::Variables, "y", entry).unwrap();
    assert_eq!(module.symbols.value(x), &TypeInfo::Integer);
    assert_eq!(module.symbols.value(y), &TypeInfo::String);
}

#[test]
fn test_stub_body_satisfies_annotation() {
    let module = check_ok("def f(x: int, y: str) -> str: ...\n");
    assert_eq!(function_return(&module, "f"), TypeInfo::String);
}

#[test]
fn test_return_type_mismatch() {
    assert_eq!(
        check_err("def f(x: int, y: str) -> str:\n    return x\n"),
        ErrorImpl::ReturnTypeMismatch {
            function: String::from("f"),
            expected: String::from("str"),
            received: String::from("int"),
        }
    );
}

#[test]
fn test_missing_return_is_none() {
    let module = check_ok("def f():\n    pass\n");
    assert_eq!(function_return(&module, "f"), TypeInfo::None);

    assert!(matches!(
        check_err("def g() -> int:\n    pass\n"),
        ErrorImpl::ReturnTypeMismatch { .. }
    ));
}

#[test]
fn test_return_outside_function() {
    assert_eq!(check_err("return 1\n"), ErrorImpl::ReturnOutsideFunction);
    assert_eq!(
        check_err("class A:\n    return 1\n"),
        ErrorImpl::ReturnOutsideFunction
    );
}

#[test]
fn test_inconsistent_returns() {
    let source = "def f(x):\n    if x:\n        return 1\n    return 'a'\n";
    assert_eq!(
        check_err(source),
        ErrorImpl::InconsistentReturnTypes {
            first: String::from("int"),
            second: String::from("str"),
        }
    );
}

#[test]
fn test_branch_returns_agree() {
    let source = "def sign(n: int) -> int:\n    if n < 0:\n        return -1\n    elif n == 0:\n        return 0\n    else:\n        return 1\n";
    let module = check_ok(source);
    assert_eq!(function_return(&module, "sign"), TypeInfo::Integer);
}

#[test]
fn test_recursion_sees_declared_return() {
    let source = "def fact(n: int) -> int:\n    if n <= 1:\n        return 1\n    return n * fact(n - 1)\n";
    let module = check_ok(source);
    assert_eq!(function_return(&module, "fact"), TypeInfo::Integer);
}

#[test]
fn test_generator_skips_return_check() {
    let module = check_ok("def gen():\n    yield 1\n    yield 2\n");
    assert_eq!(function_return(&module, "gen"), TypeInfo::Unknown);
}

#[test]
fn test_unresolved_name() {
    assert_eq!(
        check_err("print(y)\n"),
        ErrorImpl::UnresolvedName {
            name: String::from("y")
        }
    );
}

#[test]
fn test_assignment_must_keep_type() {
    assert_eq!(
        check_err("x = 1\nx = 'a'\n"),
        ErrorImpl::TypeMatchError {
            expected: String::from("int"),
            received: String::from("str"),
        }
    );

    let module = check_ok("x = 1\nx = 2\n");
    assert_eq!(variable(&module, "x"), TypeInfo::Integer);
}

#[test]
fn test_declarations() {
    let module = check_ok("xs: list[int] = []\nname: str\n");
    assert_eq!(variable(&module, "xs"), TypeInfo::list(TypeInfo::Integer));
    assert_eq!(variable(&module, "name"), TypeInfo::String);

    assert!(matches!(
        check_err("y: int = 'a'\n"),
        ErrorImpl::TypeMatchError { .. }
    ));
}

#[test]
fn test_unknown_annotation() {
    assert_eq!(
        check_err("def f(x: Foo):\n    pass\n"),
        ErrorImpl::UnknownType {
            type_: String::from("Foo")
        }
    );
}

#[test]
fn test_typing_annotations() {
    let source = "from typing import Optional\ndef f(x: Optional[int] = None) -> int:\n    return 1\n";
    let module = check_ok(source);
    assert_eq!(function_return(&module, "f"), TypeInfo::Integer);

    let module = check_ok("def g(x: int | str) -> int | str:\n    return x\n");
    assert_eq!(
        function_return(&module, "g"),
        TypeInfo::union_of([TypeInfo::Integer, TypeInfo::String])
    );
}

#[test]
fn test_default_must_match_annotation() {
    assert!(matches!(
        check_err("def f(x: int = 'a'):\n    pass\n"),
        ErrorImpl::TypeMatchError { .. }
    ));
}

#[test]
fn test_class_attributes_and_methods() {
    let source = r#"class Point:
    def __init__(self, x: int, y: int):
        self.x = x
        self.y = y

    def norm(self) -> int:
        return self.x * self.x + self.y * self.y

p = Point(1, 2)
n = p.norm()
z = p.x
"#;
    let module = check_ok(source);
    assert_eq!(variable(&module, "p"), class_type(&module, "Point"));
    assert_eq!(variable(&module, "n"), TypeInfo::Integer);
    assert_eq!(variable(&module, "z"), TypeInfo::Integer);
}

#[test]
fn test_unresolved_attribute() {
    assert_eq!(
        check_err("class A:\n    pass\na = A()\na.missing\n"),
        ErrorImpl::UnresolvedAttribute {
            attribute: String::from("missing"),
            base: String::from("A"),
        }
    );
    assert_eq!(
        check_err("s = 'abc'\ns.shout()\n"),
        ErrorImpl::UnresolvedAttribute {
            attribute: String::from("shout"),
            base: String::from("str"),
        }
    );
}

#[test]
fn test_inherited_members() {
    let source = r#"class Animal:
    def __init__(self, name: str):
        self.name = name

    def speak(self) -> str:
        return self.name

class Dog(Animal):
    def bark(self) -> str:
        return self.speak() + "!"

d = Dog("rex")
s = d.bark()
"#;
    let module = check_ok(source);
    assert_eq!(variable(&module, "d"), class_type(&module, "Dog"));
    assert_eq!(variable(&module, "s"), TypeInfo::String);
}

#[test]
fn test_builtin_base_is_open() {
    let source = "class MyError(Exception):\n    pass\ne = MyError('bad')\nm = e.args\n";
    let module = check_ok(source);
    assert_eq!(variable(&module, "e"), class_type(&module, "MyError"));
    assert_eq!(variable(&module, "m"), TypeInfo::Unknown);
}

#[test]
fn test_staticmethod_call() {
    let source = r#"class M:
    @staticmethod
    def add(a: int, b: int) -> int:
        return a + b

r = M().add(1, 2)
"#;
    let module = check_ok(source);
    assert_eq!(variable(&module, "r"), TypeInfo::Integer);
}

#[test]
fn test_call_arity() {
    let header = "def f(a, b=1):\n    return a\n";
    assert_eq!(
        check_err(&format!("{}f()\n", header)),
        ErrorImpl::MissingArguments {
            expected: 1,
            received: 0
        }
    );
    assert_eq!(
        check_err(&format!("{}f(1, 2, 3)\n", header)),
        ErrorImpl::UnexpectedArguments {
            expected: 2,
            received: 3
        }
    );
    assert_eq!(
        check_err(&format!("{}f(1, c=2)\n", header)),
        ErrorImpl::UnknownKeywordArgument {
            name: String::from("c")
        }
    );
    check_ok(&format!("{}f(b=2, a=1)\nargs = [1]\nf(*args)\n", header));
}

#[test]
fn test_variadic_parameters() {
    let source = "def f(*args: int, **kwargs: str):\n    return args\nr = f(1, 2, key='v')\n";
    let module = check_ok(source);
    assert_eq!(variable(&module, "r"), TypeInfo::list(TypeInfo::Integer));

    assert!(matches!(
        check_err("def f(*args: int):\n    pass\nf(1, 'a')\n"),
        ErrorImpl::ArgumentTypeMatchError { .. }
    ));
}

#[test]
fn test_argument_types() {
    assert_eq!(
        check_err("def f(a: int):\n    return a\nf('x')\n"),
        ErrorImpl::ArgumentTypeMatchError {
            expected: String::from("int"),
            received: String::from("str"),
        }
    );
}

#[test]
fn test_constructor_without_init() {
    assert_eq!(
        check_err("class A:\n    pass\nA(1)\n"),
        ErrorImpl::UnexpectedArguments {
            expected: 0,
            received: 1
        }
    );
}

#[test]
fn test_not_callable_or_subscriptable() {
    assert_eq!(
        check_err("x = 1\nx()\n"),
        ErrorImpl::NotCallable {
            type_: String::from("int")
        }
    );
    assert_eq!(
        check_err("x = 1\ny = x[0]\n"),
        ErrorImpl::NotSubscriptable {
            type_: String::from("int")
        }
    );
}

#[test]
fn test_for_over_non_iterable() {
    assert_eq!(
        check_err("for x in 5:\n    pass\n"),
        ErrorImpl::NotIterable {
            type_: String::from("int")
        }
    );
}

#[test]
fn test_conditional_expression_union() {
    let module = check_ok("x = 1 if True else 'a'\ny = 1 if True else 2\n");
    assert_eq!(
        variable(&module, "x"),
        TypeInfo::union_of([TypeInfo::Integer, TypeInfo::String])
    );
    assert_eq!(variable(&module, "y"), TypeInfo::Integer);
}

#[test]
fn test_operand_errors() {
    assert_eq!(
        check_err("x = 'a' - 1\n"),
        ErrorImpl::OperandTypeError {
            operator: String::from("-"),
            left: String::from("str"),
            right: String::from("int"),
        }
    );
    assert!(matches!(
        check_err("c = 'a' < 1\n"),
        ErrorImpl::OperandTypeError { .. }
    ));
    assert!(matches!(
        check_err("n = -'a'\n"),
        ErrorImpl::UnaryOperandError { .. }
    ));
}

#[test]
fn test_comparisons_and_sequences() {
    let module = check_ok("a = 1 < 2.0\nb = 'a' == 'b'\nc = 1 < 2 < 3\ns = 'ab' * 3\nt = 'x' in 'xyz'\n");
    assert_eq!(variable(&module, "a"), TypeInfo::Boolean);
    assert_eq!(variable(&module, "b"), TypeInfo::Boolean);
    assert_eq!(variable(&module, "c"), TypeInfo::Boolean);
    assert_eq!(variable(&module, "s"), TypeInfo::String);
    assert_eq!(variable(&module, "t"), TypeInfo::Boolean);
}

#[test]
fn test_collections() {
    let source = "xs = [1, 2]\nd = {'a': 1}\nfor k, v in d.items():\n    pass\nfirst = xs[0]\nsq = [n * n for n in range(10)]\n";
    let module = check_ok(source);
    assert_eq!(variable(&module, "xs"), TypeInfo::list(TypeInfo::Integer));
    assert_eq!(
        variable(&module, "d"),
        TypeInfo::dict(TypeInfo::String, TypeInfo::Integer)
    );
    assert_eq!(variable(&module, "k"), TypeInfo::String);
    assert_eq!(variable(&module, "v"), TypeInfo::Integer);
    assert_eq!(variable(&module, "first"), TypeInfo::Integer);
    assert_eq!(variable(&module, "sq"), TypeInfo::list(TypeInfo::Integer));
}

#[test]
fn test_starred_unpacking() {
    let module = check_ok("a, *b = (1, 'x', 2.0)\n");
    assert_eq!(variable(&module, "a"), TypeInfo::Integer);
    assert_eq!(
        variable(&module, "b"),
        TypeInfo::list(TypeInfo::union_of([TypeInfo::String, TypeInfo::Float]))
    );
}

#[test]
fn test_augmented_assignment() {
    check_ok("s = 'a'\ns += 'b'\nn = 1\nn *= 3\n");
    assert!(matches!(
        check_err("x = 1\nx += 2.5\n"),
        ErrorImpl::TypeMatchError { .. }
    ));
}

#[test]
fn test_innermost_scope_wins() {
    let module = check_ok("x = 'outer'\ndef f():\n    x = 1\n    return x\n");
    assert_eq!(variable(&module, "x"), TypeInfo::String);
    assert_eq!(function_return(&module, "f"), TypeInfo::Integer);
}

#[test]
fn test_class_body_hidden_from_methods() {
    assert_eq!(
        check_err("class C:\n    limit = 3\n    def get(self):\n        return limit\n"),
        ErrorImpl::UnresolvedName {
            name: String::from("limit")
        }
    );
}

#[test]
fn test_exception_handler_binding() {
    let source = "try:\n    x = 1\nexcept ValueError as error:\n    message = error\n";
    let module = check_ok(source);
    assert_eq!(variable(&module, "error"), class_type(&module, "ValueError"));
}

#[test]
fn test_scope_stack_depth() {
    let mut module = parse_source("pass\n");
    let root = module.root;
    let scope = module.symbols.root();
    let mut arena = Arena::with_reserve(SCOPE_STACK_DEPTH);

    let mut checker = TypeChecker::new(&mut module.ast, &mut module.symbols, &mut arena).unwrap();
    for _ in 1..SCOPE_STACK_DEPTH {
        checker.push_frame(root, FrameKind::Module, scope).unwrap();
    }
    let error = checker
        .push_frame(root, FrameKind::Module, scope)
        .unwrap_err();
    assert_eq!(
        error.get_impl(),
        &ErrorImpl::SubArenaOverflow {
            ceiling: SCOPE_STACK_DEPTH
        }
    );

    drop(checker);
    assert!(arena.is_empty());
}

#[test]
fn test_comprehension_target_is_local() {
    assert_eq!(
        check_err("xs = [i for i in [1, 2]]\ny = i\n"),
        ErrorImpl::UnresolvedName {
            name: String::from("i")
        }
    );

    let module = check_ok("i = 'a'\nxs = [i for i in [1, 2]]\nks = {k: i for k, i in [('a', 1)]}\n");
    assert_eq!(variable(&module, "i"), TypeInfo::String);
    assert_eq!(variable(&module, "xs"), TypeInfo::list(TypeInfo::Integer));
    assert_eq!(
        variable(&module, "ks"),
        TypeInfo::dict(TypeInfo::String, TypeInfo::Integer)
    );
}

#[test]
fn test_comprehension_iterable_in_enclosing_scope() {
    let module = check_ok("x = [1, 2]\nys = [x for x in x]\nzs = [y for x in x for y in [x, x]]\n");
    assert_eq!(variable(&module, "ys"), TypeInfo::list(TypeInfo::Integer));
    assert_eq!(variable(&module, "zs"), TypeInfo::list(TypeInfo::Integer));
}

#[test]
fn test_operator_table() {
    assert_eq!(
        check_err("x = 'a' - 'b'\n"),
        ErrorImpl::OperandTypeError {
            operator: String::from("-"),
            left: String::from("str"),
            right: String::from("str"),
        }
    );
    assert!(matches!(
        check_err("x = True + True\n"),
        ErrorImpl::OperandTypeError { .. }
    ));
    assert!(matches!(
        check_err("x = [1] * [2]\n"),
        ErrorImpl::OperandTypeError { .. }
    ));
    assert!(matches!(
        check_err("x = 1.5 | 2\n"),
        ErrorImpl::OperandTypeError { .. }
    ));

    let module = check_ok("b = True & False\nn = 6 ^ 3\nm = 1 << 4\ns = {1} | {2}\nd = {1} - {2}\nt = 'a' + 'b'\n");
    assert_eq!(variable(&module, "b"), TypeInfo::Boolean);
    assert_eq!(variable(&module, "n"), TypeInfo::Integer);
    assert_eq!(variable(&module, "m"), TypeInfo::Integer);
    assert_eq!(variable(&module, "s"), TypeInfo::set(TypeInfo::Integer));
    assert_eq!(variable(&module, "d"), TypeInfo::set(TypeInfo::Integer));
    assert_eq!(variable(&module, "t"), TypeInfo::String);
}

#[test]
fn test_large_integer_literal() {
    let module = check_ok("x = 123456789012345678901234567890\ny = x * 2\n");
    assert_eq!(variable(&module, "x"), TypeInfo::Integer);
    assert_eq!(variable(&module, "y"), TypeInfo::Integer);
}

#[test]
fn test_long_chains() {
    let terms = vec!["1"; 500].join(" + ");
    let module = check_ok(&format!("x = {}\n", terms));
    assert_eq!(variable(&module, "x"), TypeInfo::Integer);

    let mut source = String::from("x = 0\nif x == 0:\n    y = 0\n");
    for n in 1..=300 {
        source.push_str(&format!("elif x == {}:\n    y = {}\n", n, n));
    }
    source.push_str("else:\n    y = -1\n");
    let module = check_ok(&source);
    assert_eq!(variable(&module, "y"), TypeInfo::Integer);
}

#[test]
fn test_deep_attribute_chain_rejected() {
    let source = format!("class A:\n    pass\na = A()\nz = a{}\n", ".b".repeat(MAX_NESTING_DEPTH + 10));
    let result = std::thread::Builder::new()
        .stack_size(64 << 20)
        .spawn(move || check(&source).map(|_| ()).map_err(|error| error.get_impl().clone()))
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(
        result,
        Err(ErrorImpl::NestingTooDeep {
            limit: MAX_NESTING_DEPTH
        })
    );
}

#[test]
fn test_class_object_is_not_an_instance() {
    assert!(matches!(
        check_err("class P:\n    pass\np: P = P\n"),
        ErrorImpl::TypeMatchError { .. }
    ));

    let module = check_ok("class P:\n    pass\nk = P\np = k()\n");
    let class = match class_type(&module, "P") {
        TypeInfo::Class(entry) => entry,
        other => panic!("not a class: {:?}", other),
    };
    assert_eq!(variable(&module, "k"), TypeInfo::ClassObject(class));
    assert_eq!(variable(&module, "p"), TypeInfo::Class(class));
    assert_eq!(
        TypeInfo::ClassObject(class).render(&module.symbols),
        "type[P]"
    );
}

#[test]
fn test_class_object_members() {
    let source = r#"class Outer:
    count = 0

    class Inner:
        pass

    @staticmethod
    def make(n: int) -> int:
        return n

    @classmethod
    def build(cls) -> int:
        return 1

o = Outer.Inner()
c = Outer.count
m = Outer.make(2)
b = Outer.build()
i = Outer().build()
"#;
    let module = check_ok(source);
    let outer = module
        .symbols
        .lookup(Namespace::Classes, "Outer", module.symbols.root())
        .unwrap();
    let inner = module
        .symbols
        .lookup(Namespace::Classes, "Inner", outer)
        .unwrap();
    assert_eq!(variable(&module, "o"), TypeInfo::Class(inner));
    assert_eq!(variable(&module, "c"), TypeInfo::Integer);
    assert_eq!(variable(&module, "m"), TypeInfo::Integer);
    assert_eq!(variable(&module, "b"), TypeInfo::Integer);
    assert_eq!(variable(&module, "i"), TypeInfo::Integer);

    assert!(matches!(
        check_err("class A:\n    def f(self) -> int:\n        return 1\nx = A.f()\n"),
        ErrorImpl::MissingArguments { .. }
    ));
}

#[test]
fn test_exception_tuple_binding() {
    let source = "try:\n    x = 1\nexcept (KeyError, IndexError) as error:\n    pass\n";
    let module = check_ok(source);
    assert_eq!(
        variable(&module, "error"),
        TypeInfo::union_of([class_type(&module, "KeyError"), class_type(&module, "IndexError")])
    );
}
