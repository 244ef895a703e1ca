use crate::{
    arena::arena::Id,
    lexer::tokens::{Token, TokenKind},
    parser::lookups::BindingPower,
    Position, Span,
};

use super::{
    ast::{Ast, AstNode, ChildList, NodeId, NodeKind, Operator, MAX_RENDER_DEPTH},
    types::TypeInfo,
};

fn token(kind: TokenKind, value: &str) -> Token {
    Token {
        kind,
        value: String::from(value),
        line: 1,
        column: 1,
        indent: 0,
        span: Span {
            start: Position::null(),
            end: Position::null(),
        },
    }
}

fn terminal(ast: &mut Ast, kind: TokenKind, value: &str) -> NodeId {
    ast.push(AstNode::new(token(kind, value), NodeKind::Terminal, Id::new(0)))
        .unwrap()
}

fn binary(ast: &mut Ast, op: Operator, left: NodeId, right: NodeId) -> NodeId {
    ast.push(AstNode::new(
        token(TokenKind::Plus, ""),
        NodeKind::Binary { op, left, right },
        Id::new(0),
    ))
    .unwrap()
}

#[test]
fn test_child_list_keeps_order() {
    let mut ast = Ast::new();
    let mut list = ChildList::new();
    assert!(list.is_empty());

    let a = terminal(&mut ast, TokenKind::Identifier, "a");
    let b = terminal(&mut ast, TokenKind::Identifier, "b");
    let c = terminal(&mut ast, TokenKind::Identifier, "c");
    for id in [a, b, c] {
        list.push(&mut ast, id);
    }

    assert_eq!(list.len(), 3);
    assert_eq!(ast.children(list.first()), vec![a, b, c]);
    assert!(ast.children(None).is_empty());
}

#[test]
fn test_precedence_and_render() {
    let mut ast = Ast::new();
    let a = terminal(&mut ast, TokenKind::Identifier, "a");
    let b = terminal(&mut ast, TokenKind::Integer, "2");
    let sum = binary(&mut ast, Operator::Add, a, b);
    let c = terminal(&mut ast, TokenKind::String, "s");
    let product = binary(&mut ast, Operator::Mul, sum, c);

    assert_eq!(ast.precedence_of(sum), BindingPower::Additive);
    assert_eq!(ast.precedence_of(product), BindingPower::Multiplicative);
    assert_eq!(ast.precedence_of(a), BindingPower::Primary);

    ast.node_mut(sum).parenthesized = true;
    assert_eq!(ast.precedence_of(sum), BindingPower::Primary);
    assert_eq!(ast.render(product), "(a + 2) * \"s\"");
}

#[test]
fn test_render_elides_deep_nesting() {
    let mut ast = Ast::new();
    let mut sum = terminal(&mut ast, TokenKind::Identifier, "a");
    for _ in 0..MAX_RENDER_DEPTH * 3 {
        let b = terminal(&mut ast, TokenKind::Identifier, "b");
        sum = binary(&mut ast, Operator::Add, sum, b);
    }

    let rendered = ast.render(sum);
    assert!(rendered.starts_with("..."));
    assert!(rendered.ends_with(" + b"));
    assert_eq!(rendered.matches(" + ").count(), MAX_RENDER_DEPTH + 1);
}

#[test]
fn test_operator_classes_are_canonical() {
    assert_eq!(
        Operator::Sub.binding_power(),
        Operator::Add.binding_power()
    );
    assert_eq!(
        Operator::FloorDiv.binding_power(),
        Operator::Mul.binding_power()
    );
    assert_eq!(Operator::Mod.binding_power(), Operator::Mul.binding_power());
    assert!(Operator::Pow.binding_power() > Operator::Neg.binding_power());
    assert!(Operator::Not.binding_power() < Operator::Lt.binding_power());
    assert!(Operator::IsNot.is_comparison());
}

#[test]
fn test_union_of_distinct_types() {
    let union = TypeInfo::union_of(vec![
        TypeInfo::Integer,
        TypeInfo::String,
        TypeInfo::Integer,
        TypeInfo::Float,
    ]);
    assert_eq!(
        union,
        TypeInfo::Union(
            Box::new(TypeInfo::Integer),
            Box::new(TypeInfo::Union(
                Box::new(TypeInfo::String),
                Box::new(TypeInfo::Float)
            ))
        )
    );
    assert_eq!(union.to_string(), "int | str | float");
}

#[test]
fn test_union_of_flattens_nested_unions() {
    let inner = TypeInfo::union_of(vec![TypeInfo::String, TypeInfo::Boolean]);
    let union = TypeInfo::union_of(vec![TypeInfo::Integer, inner, TypeInfo::String]);
    assert_eq!(
        union.members(),
        vec![TypeInfo::Integer, TypeInfo::String, TypeInfo::Boolean]
    );

    assert_eq!(
        TypeInfo::union_of(vec![TypeInfo::Float, TypeInfo::Float]),
        TypeInfo::Float
    );
    assert_eq!(TypeInfo::union_of(vec![]), TypeInfo::Unknown);
}

#[test]
fn test_accepts() {
    let int_or_str = TypeInfo::union_of(vec![TypeInfo::Integer, TypeInfo::String]);
    assert!(int_or_str.accepts(&TypeInfo::Integer));
    assert!(!int_or_str.accepts(&TypeInfo::Float));
    assert!(TypeInfo::Integer.accepts(&TypeInfo::Unknown));
    assert!(TypeInfo::String.accepts(&TypeInfo::NotImplemented));
    assert!(TypeInfo::list(TypeInfo::Unknown).accepts(&TypeInfo::list(TypeInfo::Integer)));
    assert!(!TypeInfo::list(TypeInfo::String).accepts(&TypeInfo::list(TypeInfo::Integer)));
    assert!(!TypeInfo::Float.accepts(&TypeInfo::Integer));

    let class = Id::new(7);
    assert!(!TypeInfo::Class(class).accepts(&TypeInfo::ClassObject(class)));
    assert!(TypeInfo::ClassObject(class).accepts(&TypeInfo::ClassObject(class)));
}

#[test]
fn test_default_type_is_unknown() {
    assert_eq!(TypeInfo::default(), TypeInfo::Unknown);
}

#[test]
fn test_iter_element() {
    assert_eq!(
        TypeInfo::list(TypeInfo::Integer).iter_element(),
        Some(TypeInfo::Integer)
    );
    assert_eq!(
        TypeInfo::dict(TypeInfo::String, TypeInfo::Float).iter_element(),
        Some(TypeInfo::String)
    );
    assert_eq!(TypeInfo::String.iter_element(), Some(TypeInfo::String));
    assert_eq!(TypeInfo::Integer.iter_element(), None);
}
