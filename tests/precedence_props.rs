use std::rc::Rc;

use proptest::prelude::*;
use pyfront::{
    ast::ast::{Ast, NodeId, NodeKind, Operator},
    lexer::{lexer::tokenize, tokens::TokenKind},
    parser::{
        lookups::BindingPower,
        parser::{parse, Module},
    },
};

fn parse_expression(source: &str) -> (Module, NodeId) {
    let file = Rc::new(String::from("props.py"));
    let tokens = tokenize(source, Rc::clone(&file)).unwrap();
    let module = parse(tokens, file).unwrap();
    let first = match module.ast.kind(module.root) {
        NodeKind::File { body } => body.unwrap(),
        kind => panic!("root is not a file: {:?}", kind),
    };
    (module, first)
}

/// Every operand binds at least as tightly as the operator above it; the
/// right operand of a left-associative operator binds strictly tighter.
fn precedence_holds(ast: &Ast, id: NodeId) -> Result<(), String> {
    match ast.kind(id) {
        NodeKind::Binary { op, left, right } => {
            let parent = op.binding_power();
            let left_bp = ast.precedence_of(*left);
            let right_bp = ast.precedence_of(*right);
            let ok = match op {
                Operator::Pow => {
                    left_bp > parent && (right_bp >= parent || right_bp == BindingPower::Unary)
                }
                _ if op.is_comparison() => left_bp > parent && right_bp > parent,
                _ => left_bp >= parent && right_bp > parent,
            };
            if !ok {
                return Err(format!("operands of `{}` bind too loosely", ast.render(id)));
            }
            precedence_holds(ast, *left)?;
            precedence_holds(ast, *right)
        }
        NodeKind::Nary { operands, .. } => {
            for operand in ast.children(Some(*operands)) {
                if ast.precedence_of(operand) <= BindingPower::Comparison {
                    return Err(format!("operand of `{}` binds too loosely", ast.render(id)));
                }
                precedence_holds(ast, operand)?;
            }
            Ok(())
        }
        NodeKind::Unary { operand, .. } => {
            if ast.precedence_of(*operand) < BindingPower::Unary {
                return Err(format!("operand of `{}` binds too loosely", ast.render(id)));
            }
            precedence_holds(ast, *operand)
        }
        NodeKind::Conditional {
            condition,
            body,
            or_else,
        } => {
            if ast.precedence_of(*body) <= BindingPower::Conditional {
                return Err(format!("body of `{}` binds too loosely", ast.render(id)));
            }
            precedence_holds(ast, *condition)?;
            precedence_holds(ast, *body)?;
            precedence_holds(ast, *or_else)
        }
        NodeKind::Call { callee, args } => {
            precedence_holds(ast, *callee)?;
            for arg in ast.children(*args) {
                precedence_holds(ast, arg)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn binary_operator() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "+", "-", "*", "/", "//", "%", "**", "<<", ">>", "&", "|", "^", "and", "or", "<", "==",
        "!=", ">=", "in", "not in", "is",
    ])
}

fn expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        "[a-d]".prop_map(String::from),
        (0u32..100).prop_map(|n| n.to_string()),
    ];
    leaf.prop_recursive(5, 48, 3, |inner| {
        prop_oneof![
            4 => (inner.clone(), binary_operator(), inner.clone())
                .prop_map(|(left, op, right)| format!("{} {} {}", left, op, right)),
            1 => inner.clone().prop_map(|e| format!("({})", e)),
            1 => inner.clone().prop_map(|e| format!("-{}", e)),
            1 => (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(body, condition, or_else)| format!("{} if ({}) else {}", body, condition, or_else)),
            1 => (inner.clone(), inner).prop_map(|(a, b)| format!("f({}, {})", a, b)),
        ]
    })
}

fn arithmetic_operator() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["+", "-", "*", "&", "|", "^"])
}

fn reference_precedence(op: &str) -> u8 {
    match op {
        "|" => 1,
        "^" => 2,
        "&" => 3,
        "+" | "-" => 4,
        _ => 5,
    }
}

fn apply(op: &str, left: i64, right: i64) -> i64 {
    match op {
        "+" => left.wrapping_add(right),
        "-" => left.wrapping_sub(right),
        "*" => left.wrapping_mul(right),
        "&" => left & right,
        "|" => left | right,
        _ => left ^ right,
    }
}

/// Operator-stack evaluation of a flat, left-associative expression.
fn reference_eval(values: &[i64], ops: &[&str]) -> i64 {
    let mut operands = vec![values[0]];
    let mut pending: Vec<&str> = vec![];
    let reduce = |operands: &mut Vec<i64>, op: &str| {
        let right = operands.pop().unwrap();
        let left = operands.pop().unwrap();
        operands.push(apply(op, left, right));
    };
    for (op, value) in ops.iter().zip(&values[1..]) {
        while let Some(top) = pending.last() {
            if reference_precedence(top) < reference_precedence(op) {
                break;
            }
            let top = pending.pop().unwrap();
            reduce(&mut operands, top);
        }
        pending.push(*op);
        operands.push(*value);
    }
    while let Some(top) = pending.pop() {
        reduce(&mut operands, top);
    }
    operands[0]
}

fn tree_eval(ast: &Ast, id: NodeId) -> i64 {
    let node = ast.node(id);
    match &node.kind {
        NodeKind::Terminal => node.token.value.parse().unwrap(),
        NodeKind::Binary { op, left, right } => {
            let symbol = op.symbol();
            apply(symbol, tree_eval(ast, *left), tree_eval(ast, *right))
        }
        kind => panic!("unexpected node {:?}", kind),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]
    #[test]
    fn precedence_invariant(source in expression()) {
        let (module, expr) = parse_expression(&format!("{}\n", source));
        if let Err(message) = precedence_holds(&module.ast, expr) {
            prop_assert!(false, "{} in {:?}", message, source);
        }
    }

    #[test]
    fn grouping_matches_reference(
        values in prop::collection::vec(0i64..50, 2..8),
        ops in prop::collection::vec(arithmetic_operator(), 7),
    ) {
        let ops = &ops[..values.len() - 1];
        let mut source = values[0].to_string();
        for (op, value) in ops.iter().zip(&values[1..]) {
            source.push_str(&format!(" {} {}", op, value));
        }

        let (module, expr) = parse_expression(&format!("{}\n", source));
        prop_assert_eq!(
            tree_eval(&module.ast, expr),
            reference_eval(&values, ops),
            "grouping differs for {:?}: {}",
            source,
            module.ast.render(expr)
        );
    }

    #[test]
    fn lexer_progresses(source in "[ -~\t\n]{0,64}") {
        let Ok(tokens) = tokenize(&source, Rc::new(String::from("props.py"))) else {
            return Ok(());
        };

        prop_assert_eq!(tokens.first().map(|token| token.kind), Some(TokenKind::File));
        prop_assert_eq!(tokens.last().map(|token| token.kind), Some(TokenKind::EndFile));

        let mut last_end = 0;
        for token in &tokens {
            let start = token.span.start.offset;
            let end = token.span.end.offset;
            prop_assert!(start <= end, "start>end for {:?} in {:?}", token.kind, source);
            prop_assert!(end as usize <= source.len(), "{:?} ends out of bounds in {:?}", token.kind, source);
            prop_assert!(start >= last_end, "{:?} moved backwards in {:?}", token.kind, source);
            last_end = end;
        }
        prop_assert!(tokens.len() <= source.len() * 2 + 8, "too many tokens for {:?}", source);
    }
}
