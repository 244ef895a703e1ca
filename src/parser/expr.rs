use crate::{
    ast::ast::{ChildList, NodeId, NodeKind, Operator},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    symbol_table::symbol_table::Namespace,
};

use super::{lookups::BindingPower, parser::Parser};

/// Precedence climbing: a prefix operand, its postfix trailers, then every
/// infix operator that binds tighter than `bp`.
pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<NodeId, Error> {
    parser.descend()?;
    let expr = climb(parser, bp);
    parser.ascend();
    expr
}

fn climb(parser: &mut Parser, bp: BindingPower) -> Result<NodeId, Error> {
    let token_kind = parser.current_token_kind();
    if token_kind == TokenKind::Not && bp > BindingPower::Not {
        return Err(parser.unexpected("`not` cannot be an operand of a tighter operator"));
    }

    let nud = match parser.get_nud_lookup().get(&token_kind) {
        Some(nud) => *nud,
        None => return Err(parser.unexpected("expected an expression")),
    };
    let mut left = nud(parser)?;
    left = parse_postfix_expr(parser, left)?;

    loop {
        let token_kind = parser.current_token_kind();
        let next_bp = match parser.get_bp_lookup().get(&token_kind) {
            Some(next_bp) if *next_bp > bp => *next_bp,
            _ => break,
        };
        // `not` continues an expression only as `not in`
        if token_kind == TokenKind::Not && parser.peek_kind() != TokenKind::In {
            break;
        }
        let led = match parser.get_led_lookup().get(&token_kind) {
            Some(led) => *led,
            None => break,
        };
        left = led(parser, left, next_bp)?;
    }

    Ok(left)
}

/// Whether the current token can begin an expression.
pub fn starts_expression(parser: &Parser) -> bool {
    let kind = parser.current_token_kind();
    kind == TokenKind::Star || parser.get_nud_lookup().contains_key(&kind)
}

/// `*expr` where a starred element is allowed, otherwise a full expression.
pub fn parse_star_or_expr(parser: &mut Parser) -> Result<NodeId, Error> {
    if parser.current_token_kind() == TokenKind::Star {
        let star = parser.advance().clone();
        let value = parse_expr(parser, BindingPower::BitOr)?;
        return parser.push_node(
            star,
            NodeKind::Starred {
                value,
                double: false,
            },
        );
    }
    parse_expr(parser, BindingPower::Default)
}

/// Comma-separated expressions; more than one, or a trailing comma, make a
/// tuple.
pub fn parse_expr_list(parser: &mut Parser) -> Result<NodeId, Error> {
    let first = parse_star_or_expr(parser)?;
    if parser.current_token_kind() != TokenKind::Comma {
        return Ok(first);
    }

    let token = parser.ast.node(first).token.clone();
    let mut elements = ChildList::new();
    parser.push_child(&mut elements, first);
    while parser.eat(TokenKind::Comma) {
        if !starts_expression(parser) {
            break;
        }
        let element = parse_star_or_expr(parser)?;
        parser.push_child(&mut elements, element);
    }

    parser.push_node(
        token,
        NodeKind::Tuple {
            elements: elements.first(),
        },
    )
}

/// Targets of `for` loops and comprehension clauses, up to `in`.
pub fn parse_target_list(parser: &mut Parser) -> Result<NodeId, Error> {
    let first = parse_target(parser)?;
    if parser.current_token_kind() != TokenKind::Comma {
        return Ok(first);
    }

    let token = parser.ast.node(first).token.clone();
    let mut elements = ChildList::new();
    parser.push_child(&mut elements, first);
    while parser.eat(TokenKind::Comma) {
        if parser.current_token_kind() == TokenKind::In {
            break;
        }
        let element = parse_target(parser)?;
        parser.push_child(&mut elements, element);
    }

    parser.push_node(
        token,
        NodeKind::Tuple {
            elements: elements.first(),
        },
    )
}

pub fn parse_target(parser: &mut Parser) -> Result<NodeId, Error> {
    if parser.current_token_kind() == TokenKind::Star {
        let star = parser.advance().clone();
        let value = parse_expr(parser, BindingPower::Comparison)?;
        return parser.push_node(
            star,
            NodeKind::Starred {
                value,
                double: false,
            },
        );
    }
    // Binds tighter than `in`, which ends the target list.
    parse_expr(parser, BindingPower::Comparison)
}

/// Integers are unbounded; float and imaginary literals must be finite.
fn parse_number(token: &Token) -> Result<(), Error> {
    let finite = |digits: &str| digits.parse::<f64>().map_or(false, f64::is_finite);
    let valid = match token.kind {
        TokenKind::Float => finite(&token.value),
        TokenKind::Complex => finite(&token.value[..token.value.len() - 1]),
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::new(
            ErrorImpl::NumberParseError {
                token: token.value.clone(),
            },
            token.span.start.clone(),
        ))
    }
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<NodeId, Error> {
    let mut token = parser.advance().clone();
    parse_number(&token)?;

    // Adjacent string literals are one literal.
    if token.kind == TokenKind::String {
        while parser.current_token_kind() == TokenKind::String {
            let next = parser.advance();
            token.value.push_str(&next.value);
            token.span.end = next.span.end.clone();
        }
    }

    parser.push_node(token, NodeKind::Terminal)
}

/// Attribute, call and subscript trailers, applied until none matches.
pub fn parse_postfix_expr(parser: &mut Parser, mut left: NodeId) -> Result<NodeId, Error> {
    loop {
        left = match parser.current_token_kind() {
            TokenKind::Dot => {
                parser.advance();
                let attr = parser.expect(TokenKind::Identifier)?;
                let name = attr.value.clone();
                parser.push_node(attr, NodeKind::Attribute { value: left, attr: name })?
            }
            TokenKind::OpenParen => parse_call_expr(parser, left)?,
            TokenKind::OpenBracket => parse_subscript_expr(parser, left)?,
            _ => return Ok(left),
        };
    }
}

fn parse_call_expr(parser: &mut Parser, callee: NodeId) -> Result<NodeId, Error> {
    let open = parser.advance().clone();
    let mut args = ChildList::new();

    while parser.current_token_kind() != TokenKind::CloseParen {
        let arg = match parser.current_token_kind() {
            TokenKind::Star | TokenKind::DoubleStar => {
                let star = parser.advance().clone();
                let value = parse_expr(parser, BindingPower::Default)?;
                let double = star.kind == TokenKind::DoubleStar;
                parser.push_node(star, NodeKind::Starred { value, double })?
            }
            TokenKind::Identifier if parser.peek_kind() == TokenKind::Assignment => {
                let name = parser.advance().clone();
                parser.advance();
                let value = parse_expr(parser, BindingPower::Default)?;
                let keyword = name.value.clone();
                parser.push_node(
                    name,
                    NodeKind::KeywordArg {
                        name: keyword,
                        value,
                    },
                )?
            }
            _ => {
                let value = parse_expr(parser, BindingPower::Default)?;
                if parser.current_token_kind() == TokenKind::For {
                    parse_generator(parser, value)?
                } else {
                    value
                }
            }
        };
        parser.push_child(&mut args, arg);

        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }

    parser.expect(TokenKind::CloseParen)?;
    parser.push_node(
        open,
        NodeKind::Call {
            callee,
            args: args.first(),
        },
    )
}

fn parse_subscript_expr(parser: &mut Parser, value: NodeId) -> Result<NodeId, Error> {
    let open = parser.advance().clone();

    let first = parse_slice_item(parser)?;
    let index = if parser.current_token_kind() == TokenKind::Comma {
        let token = parser.ast.node(first).token.clone();
        let mut items = ChildList::new();
        parser.push_child(&mut items, first);
        while parser.eat(TokenKind::Comma) {
            if parser.current_token_kind() == TokenKind::CloseBracket {
                break;
            }
            let item = parse_slice_item(parser)?;
            parser.push_child(&mut items, item);
        }
        parser.push_node(
            token,
            NodeKind::Tuple {
                elements: items.first(),
            },
        )?
    } else {
        first
    };

    parser.expect(TokenKind::CloseBracket)?;
    parser.push_node(open, NodeKind::Subscript { value, index })
}

/// An index expression or a `lower:upper:step` slice with optional parts.
fn parse_slice_item(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.current_token().clone();
    let lower = if parser.current_token_kind() == TokenKind::Colon {
        None
    } else {
        let lower = parse_expr(parser, BindingPower::Default)?;
        if parser.current_token_kind() != TokenKind::Colon {
            return Ok(lower);
        }
        Some(lower)
    };

    let slice_ends = [TokenKind::Colon, TokenKind::Comma, TokenKind::CloseBracket];
    parser.expect(TokenKind::Colon)?;
    let upper = if parser.current_token().is_one_of_many(&slice_ends) {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    let step = if parser.eat(TokenKind::Colon)
        && !parser
            .current_token()
            .is_one_of_many(&[TokenKind::Comma, TokenKind::CloseBracket])
    {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    parser.push_node(token, NodeKind::Slice { lower, upper, step })
}

pub fn parse_binary_expr(
    parser: &mut Parser,
    left: NodeId,
    bp: BindingPower,
) -> Result<NodeId, Error> {
    let operator_token = parser.advance().clone();
    let op = match Operator::binary(operator_token.kind) {
        Some(op) => op,
        None => return Err(parser.unexpected("expected a binary operator")),
    };

    let right = parse_expr(parser, bp)?;

    parser.push_node(operator_token, NodeKind::Binary { op, left, right })
}

/// `**` is right associative: its right operand may itself be a power.
pub fn parse_power_expr(
    parser: &mut Parser,
    left: NodeId,
    _bp: BindingPower,
) -> Result<NodeId, Error> {
    let operator_token = parser.advance().clone();
    let right = parse_expr(parser, BindingPower::Unary)?;

    parser.push_node(
        operator_token,
        NodeKind::Binary {
            op: Operator::Pow,
            left,
            right,
        },
    )
}

fn parse_comparison_operator(parser: &mut Parser) -> Result<Operator, Error> {
    let token = parser.advance().clone();
    match token.kind {
        TokenKind::Not => {
            parser.expect(TokenKind::In)?;
            Ok(Operator::NotIn)
        }
        TokenKind::Is if parser.eat(TokenKind::Not) => Ok(Operator::IsNot),
        kind => Operator::binary(kind).ok_or_else(|| {
            Error::new(
                ErrorImpl::UnexpectedTokenDetailed {
                    token: kind.to_string(),
                    message: String::from("expected a comparison operator"),
                },
                token.span.start.clone(),
            )
        }),
    }
}

fn at_comparison(parser: &Parser) -> bool {
    let kind = parser.current_token_kind();
    match kind {
        TokenKind::Not => parser.peek_kind() == TokenKind::In,
        _ => kind.is_comparison(),
    }
}

/// A comparison, or a chain `a < b < c` folded into one n-ary node.
pub fn parse_comparison_expr(
    parser: &mut Parser,
    left: NodeId,
    _bp: BindingPower,
) -> Result<NodeId, Error> {
    let operator_token = parser.current_token().clone();
    let mut operators = vec![];
    let mut operands = vec![left];

    loop {
        operators.push(parse_comparison_operator(parser)?);
        operands.push(parse_expr(parser, BindingPower::Comparison)?);
        if !at_comparison(parser) {
            break;
        }
    }

    if let ([op], [left, right]) = (operators.as_slice(), operands.as_slice()) {
        return parser.push_node(
            operator_token,
            NodeKind::Binary {
                op: *op,
                left: *left,
                right: *right,
            },
        );
    }

    let mut chain = ChildList::new();
    for operand in operands {
        parser.push_child(&mut chain, operand);
    }
    let first = match chain.first() {
        Some(first) => first,
        None => return Err(parser.unexpected("expected a comparison operand")),
    };
    parser.push_node(
        operator_token,
        NodeKind::Nary {
            operators,
            operands: first,
        },
    )
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<NodeId, Error> {
    let operator_token = parser.advance().clone();
    let op = match Operator::unary(operator_token.kind) {
        Some(op) => op,
        None => return Err(parser.unexpected("expected a unary operator")),
    };
    let operand = parse_expr(parser, BindingPower::Unary)?;

    parser.push_node(operator_token, NodeKind::Unary { op, operand })
}

pub fn parse_not_expr(parser: &mut Parser) -> Result<NodeId, Error> {
    let operator_token = parser.advance().clone();
    let operand = parse_expr(parser, BindingPower::Not)?;

    parser.push_node(
        operator_token,
        NodeKind::Unary {
            op: Operator::Not,
            operand,
        },
    )
}

/// `body if condition else or_else`, nesting to the right.
pub fn parse_conditional_expr(
    parser: &mut Parser,
    body: NodeId,
    _bp: BindingPower,
) -> Result<NodeId, Error> {
    let if_token = parser.advance().clone();
    let condition = parse_expr(parser, BindingPower::Conditional)?;
    parser.expect(TokenKind::Else)?;
    let or_else = parse_expr(parser, BindingPower::Walrus)?;

    parser.push_node(
        if_token,
        NodeKind::Conditional {
            condition,
            body,
            or_else,
        },
    )
}

pub fn parse_named_expr(
    parser: &mut Parser,
    target: NodeId,
    _bp: BindingPower,
) -> Result<NodeId, Error> {
    let walrus = parser.advance().clone();
    if !parser.ast.node(target).is_identifier() {
        return Err(Error::new(
            ErrorImpl::InvalidTarget {
                target: parser.ast.render(target),
            },
            walrus.span.start.clone(),
        ));
    }

    let value = parse_expr(parser, BindingPower::Walrus)?;
    let name = parser.ast.node(target).token.value.clone();
    parser.declare_variable(&name, target)?;

    parser.push_node(walrus, NodeKind::NamedExpr { target, value })
}

/// `for targets in iter if cond ...` clauses, one or more.
///
/// The clauses open a scope of their own, entered in the function
/// namespace under a name no identifier can spell, so their targets are
/// not visible after the comprehension.
pub fn parse_comprehension_clauses(parser: &mut Parser) -> Result<NodeId, Error> {
    let for_token = parser.current_token().clone();
    let name = format!("<comprehension {}:{}>", for_token.line, for_token.column);
    let enclosing = parser.scope();
    let scope = parser.declare_in(Namespace::Functions, &name, enclosing, None)?;

    let outer = parser.enter_scope(scope);
    let clauses = parse_clauses(parser);
    parser.restore_scope(outer);

    let first = clauses?;
    parser.symbols.entry_mut(scope).node = Some(first);
    Ok(first)
}

fn parse_clauses(parser: &mut Parser) -> Result<NodeId, Error> {
    let mut clauses = ChildList::new();

    while parser.current_token_kind() == TokenKind::For {
        let for_token = parser.advance().clone();
        let target = parse_target_list(parser)?;
        parser.declare_targets(target)?;
        parser.expect(TokenKind::In)?;
        let iter = parse_expr(parser, BindingPower::Conditional)?;

        let mut conditions = ChildList::new();
        while parser.eat(TokenKind::If) {
            let condition = parse_expr(parser, BindingPower::Conditional)?;
            parser.push_child(&mut conditions, condition);
        }

        let clause = parser.push_node(
            for_token,
            NodeKind::ForIf {
                target,
                iter,
                conditions: conditions.first(),
            },
        )?;
        parser.push_child(&mut clauses, clause);
    }

    match clauses.first() {
        Some(first) => Ok(first),
        None => Err(parser.unexpected("expected `for`")),
    }
}

fn parse_generator(parser: &mut Parser, element: NodeId) -> Result<NodeId, Error> {
    let token = parser.ast.node(element).token.clone();
    let clauses = parse_comprehension_clauses(parser)?;
    parser.push_node(token, NodeKind::Generator { element, clauses })
}

/// Elements after the first of a list, set or tuple display, up to `close`.
fn parse_elements(
    parser: &mut Parser,
    first: NodeId,
    close: TokenKind,
) -> Result<ChildList, Error> {
    let mut elements = ChildList::new();
    parser.push_child(&mut elements, first);
    while parser.eat(TokenKind::Comma) {
        if parser.current_token_kind() == close {
            break;
        }
        let element = parse_star_or_expr(parser)?;
        parser.push_child(&mut elements, element);
    }
    Ok(elements)
}

/// `()`, `(expr)`, `(a, b)` or `(x for x in xs)`.
pub fn parse_grouping_expr(parser: &mut Parser) -> Result<NodeId, Error> {
    let open = parser.advance().clone();

    if parser.eat(TokenKind::CloseParen) {
        let tuple = parser.push_node(open, NodeKind::Tuple { elements: None })?;
        parser.ast.node_mut(tuple).parenthesized = true;
        return Ok(tuple);
    }

    let first = parse_star_or_expr(parser)?;
    let node = match parser.current_token_kind() {
        TokenKind::For => parse_generator(parser, first)?,
        TokenKind::Comma => {
            let elements = parse_elements(parser, first, TokenKind::CloseParen)?;
            let tuple = parser.push_node(
                open,
                NodeKind::Tuple {
                    elements: elements.first(),
                },
            )?;
            parser.ast.node_mut(tuple).parenthesized = true;
            tuple
        }
        _ => {
            parser.ast.node_mut(first).parenthesized = true;
            first
        }
    };

    parser.expect(TokenKind::CloseParen)?;
    Ok(node)
}

/// `[a, b]` or `[x for x in xs]`.
pub fn parse_list_expr(parser: &mut Parser) -> Result<NodeId, Error> {
    let open = parser.advance().clone();

    if parser.eat(TokenKind::CloseBracket) {
        return parser.push_node(open, NodeKind::List { elements: None });
    }

    let first = parse_star_or_expr(parser)?;
    let node = if parser.current_token_kind() == TokenKind::For {
        let clauses = parse_comprehension_clauses(parser)?;
        parser.push_node(
            open,
            NodeKind::ListComp {
                element: first,
                clauses,
            },
        )?
    } else {
        let elements = parse_elements(parser, first, TokenKind::CloseBracket)?;
        parser.push_node(
            open,
            NodeKind::List {
                elements: elements.first(),
            },
        )?
    };

    parser.expect(TokenKind::CloseBracket)?;
    Ok(node)
}

fn parse_dict_entry(parser: &mut Parser) -> Result<NodeId, Error> {
    if parser.current_token_kind() == TokenKind::DoubleStar {
        let star = parser.advance().clone();
        let value = parse_expr(parser, BindingPower::BitOr)?;
        return parser.push_node(
            star,
            NodeKind::Starred {
                value,
                double: true,
            },
        );
    }

    let key = parse_expr(parser, BindingPower::Default)?;
    let colon = parser.expect(TokenKind::Colon)?;
    let value = parse_expr(parser, BindingPower::Default)?;
    parser.push_node(colon, NodeKind::KeyValue { key, value })
}

/// Dict and set displays and their comprehensions.
pub fn parse_brace_expr(parser: &mut Parser) -> Result<NodeId, Error> {
    let open = parser.advance().clone();

    if parser.eat(TokenKind::CloseCurly) {
        return parser.push_node(open, NodeKind::Dict { entries: None });
    }

    let is_dict = parser.current_token_kind() == TokenKind::DoubleStar;
    let first = if is_dict {
        parse_dict_entry(parser)?
    } else {
        parse_star_or_expr(parser)?
    };

    let node = if is_dict || parser.current_token_kind() == TokenKind::Colon {
        let first = if is_dict {
            first
        } else {
            let colon = parser.advance().clone();
            let value = parse_expr(parser, BindingPower::Default)?;
            parser.push_node(colon, NodeKind::KeyValue { key: first, value })?
        };

        if !is_dict && parser.current_token_kind() == TokenKind::For {
            let clauses = parse_comprehension_clauses(parser)?;
            parser.push_node(
                open,
                NodeKind::DictComp {
                    entry: first,
                    clauses,
                },
            )?
        } else {
            let mut entries = ChildList::new();
            parser.push_child(&mut entries, first);
            while parser.eat(TokenKind::Comma) {
                if parser.current_token_kind() == TokenKind::CloseCurly {
                    break;
                }
                let entry = parse_dict_entry(parser)?;
                parser.push_child(&mut entries, entry);
            }
            parser.push_node(
                open,
                NodeKind::Dict {
                    entries: entries.first(),
                },
            )?
        }
    } else if parser.current_token_kind() == TokenKind::For {
        let clauses = parse_comprehension_clauses(parser)?;
        parser.push_node(
            open,
            NodeKind::SetComp {
                element: first,
                clauses,
            },
        )?
    } else {
        let elements = parse_elements(parser, first, TokenKind::CloseCurly)?;
        let first = match elements.first() {
            Some(first) => first,
            None => return Err(parser.unexpected("expected a set element")),
        };
        parser.push_node(open, NodeKind::Set { elements: first })?
    };

    parser.expect(TokenKind::CloseCurly)?;
    Ok(node)
}
