use crate::{
    ast::{
        ast::{ChildList, NodeId, NodeKind, Operator, ParamKind},
        types::TypeInfo,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    symbol_table::symbol_table::Namespace,
};

use super::{
    expr::{parse_expr, parse_expr_list, parse_target, parse_target_list, starts_expression},
    lookups::BindingPower,
    parser::Parser,
};

/// One statement. Compound statements come from the statement lookup table;
/// anything else is a simple statement ended by `;` or a newline.
pub fn parse_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    parser.descend()?;
    let stmt = dispatch_stmt(parser);
    parser.ascend();
    stmt
}

fn dispatch_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    if let Some(handler) = parser.get_stmt_lookup().get(&parser.current_token_kind()) {
        let handler = *handler;
        return handler(parser);
    }

    let stmt = parse_simple_stmt(parser)?;
    if parser.eat(TokenKind::Semicolon) {
        parser.eat(TokenKind::Newline);
    } else {
        parser.expect(TokenKind::Newline)?;
    }
    Ok(stmt)
}

/// The body of a compound statement: an indented block, or simple
/// statements on the same line as the colon.
pub fn parse_block(parser: &mut Parser) -> Result<NodeId, Error> {
    let colon = parser.expect(TokenKind::Colon)?;
    let mut body = ChildList::new();

    if parser.eat(TokenKind::Newline) {
        parser.expect(TokenKind::Indent)?;
        while !parser
            .current_token()
            .is_one_of_many(&[TokenKind::Dedent, TokenKind::EndFile])
        {
            let stmt = parse_stmt(parser)?;
            parser.push_child(&mut body, stmt);
        }
        parser.expect(TokenKind::Dedent)?;
    } else {
        loop {
            let stmt = parse_simple_stmt(parser)?;
            parser.push_child(&mut body, stmt);
            if parser.eat(TokenKind::Semicolon) {
                if parser.eat(TokenKind::Newline) {
                    break;
                }
            } else {
                parser.expect(TokenKind::Newline)?;
                break;
            }
        }
    }

    parser.push_node(colon, NodeKind::Block { body: body.first() })
}

fn parse_simple_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    match parser.current_token_kind() {
        TokenKind::Pass => {
            let token = parser.advance().clone();
            parser.push_node(token, NodeKind::Pass)
        }
        TokenKind::Break => {
            let token = parser.advance().clone();
            parser.push_node(token, NodeKind::Break)
        }
        TokenKind::Continue => {
            let token = parser.advance().clone();
            parser.push_node(token, NodeKind::Continue)
        }
        TokenKind::Return => parse_return_stmt(parser),
        TokenKind::Yield => parse_yield_stmt(parser),
        TokenKind::Raise => parse_raise_stmt(parser),
        TokenKind::Import => parse_import_stmt(parser),
        TokenKind::From => parse_from_import_stmt(parser),
        TokenKind::Global | TokenKind::Nonlocal => parse_global_stmt(parser),
        TokenKind::Assert => parse_assert_stmt(parser),
        TokenKind::Del => parse_del_stmt(parser),
        _ => parse_expression_stmt(parser),
    }
}

fn check_single_target(parser: &Parser, target: NodeId) -> Result<(), Error> {
    let node = parser.ast.node(target);
    match node.kind {
        NodeKind::Attribute { .. } | NodeKind::Subscript { .. } => Ok(()),
        NodeKind::Terminal if node.is_identifier() => Ok(()),
        _ => Err(Error::new(
            ErrorImpl::InvalidTarget {
                target: parser.ast.render(target),
            },
            node.token.span.start.clone(),
        )),
    }
}

/// Expression statement, declaration, assignment or augmented assignment.
fn parse_expression_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let expr = parse_expr_list(parser)?;

    match parser.current_token_kind() {
        TokenKind::Colon => {
            check_single_target(parser, expr)?;
            parser.advance();
            let annotation = parse_expr(parser, BindingPower::Default)?;
            let value = if parser.eat(TokenKind::Assignment) {
                Some(parse_expr_list(parser)?)
            } else {
                None
            };

            let token = parser.ast.node(expr).token.clone();
            let decl = parser.push_node(
                token,
                NodeKind::Decl {
                    target: expr,
                    annotation,
                    value,
                },
            )?;
            if parser.ast.node(expr).is_identifier() {
                let name = parser.ast.node(expr).token.value.clone();
                parser.declare_variable(&name, decl)?;
            }
            Ok(decl)
        }
        TokenKind::Assignment => {
            let assign = parser.current_token().clone();
            let mut targets = ChildList::new();
            let mut value = expr;
            while parser.eat(TokenKind::Assignment) {
                parser.declare_targets(value)?;
                parser.push_child(&mut targets, value);
                value = parse_expr_list(parser)?;
            }

            let first = match targets.first() {
                Some(first) => first,
                None => return Err(parser.unexpected("expected an assignment target")),
            };
            parser.push_node(
                assign,
                NodeKind::Assign {
                    targets: first,
                    value,
                },
            )
        }
        kind if kind.is_augmented_assignment() => {
            check_single_target(parser, expr)?;
            let op = match Operator::binary(kind) {
                Some(op) => op,
                None => return Err(parser.unexpected("expected an augmented assignment")),
            };
            let operator_token = parser.advance().clone();
            let value = parse_expr_list(parser)?;
            parser.push_node(
                operator_token,
                NodeKind::AugAssign {
                    op,
                    target: expr,
                    value,
                },
            )
        }
        _ => Ok(expr),
    }
}

fn parse_return_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let value = if starts_expression(parser) {
        Some(parse_expr_list(parser)?)
    } else {
        None
    };
    parser.push_node(token, NodeKind::Return { value })
}

fn parse_yield_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let value = if starts_expression(parser) {
        Some(parse_expr_list(parser)?)
    } else {
        None
    };
    parser.push_node(token, NodeKind::Yield { value })
}

fn parse_raise_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let exception = if starts_expression(parser) {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };
    let cause = if exception.is_some() && parser.eat(TokenKind::From) {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };
    parser.push_node(token, NodeKind::Raise { exception, cause })
}

fn parse_assert_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let test = parse_expr(parser, BindingPower::Default)?;
    let msg = if parser.eat(TokenKind::Comma) {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };
    parser.push_node(token, NodeKind::Assert { test, msg })
}

fn parse_del_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let mut targets = ChildList::new();
    loop {
        let target = parse_expr(parser, BindingPower::Default)?;
        parser.push_child(&mut targets, target);
        if !parser.eat(TokenKind::Comma) || !starts_expression(parser) {
            break;
        }
    }

    let first = match targets.first() {
        Some(first) => first,
        None => return Err(parser.unexpected("expected a target to delete")),
    };
    parser.push_node(token, NodeKind::Del { targets: first })
}

fn parse_global_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let mut names = vec![];
    loop {
        let name = parser.expect(TokenKind::Identifier)?.value;
        if token.kind == TokenKind::Global {
            parser.redirect_global(&name);
        } else {
            parser.redirect_nonlocal(&name);
        }
        names.push(name);
        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }

    let kind = if token.kind == TokenKind::Global {
        NodeKind::Global { names }
    } else {
        NodeKind::Nonlocal { names }
    };
    parser.push_node(token, kind)
}

fn parse_dotted_name(parser: &mut Parser) -> Result<String, Error> {
    let mut name = parser.expect(TokenKind::Identifier)?.value;
    while parser.eat(TokenKind::Dot) {
        name.push('.');
        name.push_str(&parser.expect(TokenKind::Identifier)?.value);
    }
    Ok(name)
}

/// An `name [as asname]` alias; the bound name is declared as a variable.
fn parse_alias(parser: &mut Parser, dotted: bool) -> Result<NodeId, Error> {
    let token = parser.current_token().clone();
    let name = if dotted {
        parse_dotted_name(parser)?
    } else {
        parser.expect(TokenKind::Identifier)?.value
    };
    let asname = if parser.eat(TokenKind::As) {
        Some(parser.expect(TokenKind::Identifier)?.value)
    } else {
        None
    };

    // `import a.b` binds `a`
    let bound = match &asname {
        Some(asname) => asname.clone(),
        None => name.split('.').next().unwrap_or_default().to_string(),
    };
    let alias = parser.push_node(token, NodeKind::Alias { name, asname })?;
    parser.declare_variable(&bound, alias)?;
    Ok(alias)
}

fn parse_import_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let mut names = ChildList::new();
    loop {
        let alias = parse_alias(parser, true)?;
        parser.push_child(&mut names, alias);
        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }

    let first = match names.first() {
        Some(first) => first,
        None => return Err(parser.unexpected("expected a module name")),
    };
    parser.push_node(token, NodeKind::Import { names: first })
}

fn parse_from_import_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();

    // Relative imports: `from . import x`, `from ..pkg import y`
    let mut module = String::new();
    loop {
        match parser.current_token_kind() {
            TokenKind::Dot => module.push('.'),
            TokenKind::Ellipsis => module.push_str("..."),
            _ => break,
        }
        parser.advance();
    }
    if parser.current_token_kind() == TokenKind::Identifier {
        module.push_str(&parse_dotted_name(parser)?);
    }
    if module.is_empty() {
        return Err(parser.unexpected("expected a module name"));
    }

    parser.expect(TokenKind::Import)?;

    if parser.eat(TokenKind::Star) {
        return parser.push_node(token, NodeKind::ImportFrom { module, names: None });
    }

    let parenthesized = parser.eat(TokenKind::OpenParen);
    let mut names = ChildList::new();
    loop {
        let alias = parse_alias(parser, false)?;
        parser.push_child(&mut names, alias);
        if !parser.eat(TokenKind::Comma) {
            break;
        }
        if parenthesized && parser.current_token_kind() == TokenKind::CloseParen {
            break;
        }
    }
    if parenthesized {
        parser.expect(TokenKind::CloseParen)?;
    }

    parser.push_node(
        token,
        NodeKind::ImportFrom {
            module,
            names: names.first(),
        },
    )
}

/// The `elif`/`else` continuation of an `if`, nested to the right.
fn parse_elif_or_else(parser: &mut Parser) -> Result<Option<NodeId>, Error> {
    let mut clauses = vec![];
    while parser.current_token_kind() == TokenKind::Elif {
        let token = parser.advance().clone();
        let condition = parse_expr(parser, BindingPower::Default)?;
        let body = parse_block(parser)?;
        clauses.push((token, condition, body));
    }

    let mut or_else = parse_else(parser)?;
    for (token, condition, body) in clauses.into_iter().rev() {
        or_else = Some(parser.push_node(
            token,
            NodeKind::Elif {
                condition,
                body,
                or_else,
            },
        )?);
    }
    Ok(or_else)
}

fn parse_else(parser: &mut Parser) -> Result<Option<NodeId>, Error> {
    if parser.current_token_kind() != TokenKind::Else {
        return Ok(None);
    }
    let token = parser.advance().clone();
    let body = parse_block(parser)?;
    Ok(Some(parser.push_node(token, NodeKind::Else { body })?))
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let condition = parse_expr(parser, BindingPower::Default)?;
    let body = parse_block(parser)?;
    let or_else = parse_elif_or_else(parser)?;

    parser.push_node(
        token,
        NodeKind::If {
            condition,
            body,
            or_else,
        },
    )
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let condition = parse_expr(parser, BindingPower::Default)?;
    let body = parse_block(parser)?;
    let or_else = parse_else(parser)?;

    parser.push_node(
        token,
        NodeKind::While {
            condition,
            body,
            or_else,
        },
    )
}

pub fn parse_for_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let target = parse_target_list(parser)?;
    parser.declare_targets(target)?;
    parser.expect(TokenKind::In)?;
    let iter = parse_expr_list(parser)?;
    let body = parse_block(parser)?;
    let or_else = parse_else(parser)?;

    parser.push_node(
        token,
        NodeKind::For {
            target,
            iter,
            body,
            or_else,
        },
    )
}

pub fn parse_try_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();
    let body = parse_block(parser)?;

    let mut handlers = ChildList::new();
    while parser.current_token_kind() == TokenKind::Except {
        let except = parser.advance().clone();
        let exception = if parser.current_token_kind() == TokenKind::Colon {
            None
        } else {
            Some(parse_expr(parser, BindingPower::Default)?)
        };
        let name = if exception.is_some() && parser.eat(TokenKind::As) {
            Some(parser.expect(TokenKind::Identifier)?.value)
        } else {
            None
        };
        let handler_body = parse_block(parser)?;

        let handler = parser.push_node(
            except,
            NodeKind::ExceptHandler {
                exception,
                name: name.clone(),
                body: handler_body,
            },
        )?;
        if let Some(name) = name {
            parser.declare_variable(&name, handler)?;
        }
        parser.push_child(&mut handlers, handler);
    }

    let or_else = if handlers.is_empty() {
        None
    } else {
        parse_else(parser)?
    };
    let finally = if parser.eat(TokenKind::Finally) {
        Some(parse_block(parser)?)
    } else {
        None
    };

    if handlers.is_empty() && finally.is_none() {
        return Err(parser.unexpected("expected `except` or `finally`"));
    }

    parser.push_node(
        token,
        NodeKind::Try {
            body,
            handlers: handlers.first(),
            or_else,
            finally,
        },
    )
}

pub fn parse_with_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let token = parser.advance().clone();

    let mut items = ChildList::new();
    loop {
        let context_token = parser.current_token().clone();
        let context = parse_expr(parser, BindingPower::Default)?;
        let target = if parser.eat(TokenKind::As) {
            let target = parse_target(parser)?;
            parser.declare_targets(target)?;
            Some(target)
        } else {
            None
        };
        let item = parser.push_node(context_token, NodeKind::WithItem { context, target })?;
        parser.push_child(&mut items, item);

        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }

    let first = match items.first() {
        Some(first) => first,
        None => return Err(parser.unexpected("expected a context manager")),
    };
    let body = parse_block(parser)?;
    parser.push_node(token, NodeKind::With { items: first, body })
}

/// `@decorator` lines followed by a function or class definition.
pub fn parse_decorated_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    let mut decorators = ChildList::new();
    while parser.eat(TokenKind::At) {
        let decorator = parse_expr(parser, BindingPower::Default)?;
        parser.expect(TokenKind::Newline)?;
        parser.push_child(&mut decorators, decorator);
    }

    match parser.current_token_kind() {
        TokenKind::Def => parse_function(parser, decorators.first()),
        TokenKind::Class => parse_class(parser, decorators.first()),
        _ => Err(parser.unexpected("expected `def` or `class` after decorators")),
    }
}

pub fn parse_fn_def_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    parse_function(parser, None)
}

pub fn parse_class_def_stmt(parser: &mut Parser) -> Result<NodeId, Error> {
    parse_class(parser, None)
}

/// Parameters are declared in the function's scope, which is current here.
fn parse_params(parser: &mut Parser) -> Result<Option<NodeId>, Error> {
    let mut params = ChildList::new();
    let mut seen_star = false;
    let mut seen_kwargs = false;
    let mut names: Vec<String> = vec![];

    while parser.current_token_kind() != TokenKind::CloseParen {
        let token = parser.current_token().clone();
        let (kind, name) = match token.kind {
            TokenKind::Star => {
                parser.advance();
                if seen_star {
                    return Err(Error::new(
                        ErrorImpl::MultipleStarParameters,
                        token.span.start.clone(),
                    ));
                }
                seen_star = true;
                if parser.current_token_kind() == TokenKind::Identifier {
                    (ParamKind::Star, parser.advance().value.clone())
                } else {
                    (ParamKind::Separator, String::new())
                }
            }
            TokenKind::DoubleStar => {
                parser.advance();
                (
                    ParamKind::DoubleStar,
                    parser.expect(TokenKind::Identifier)?.value,
                )
            }
            _ => (
                ParamKind::Normal,
                parser.expect(TokenKind::Identifier)?.value,
            ),
        };

        if seen_kwargs {
            return Err(Error::new(
                ErrorImpl::ParameterAfterKwargs { parameter: name },
                token.span.start.clone(),
            ));
        }
        seen_kwargs = kind == ParamKind::DoubleStar;
        if kind != ParamKind::Separator {
            if names.contains(&name) {
                return Err(Error::new(
                    ErrorImpl::DuplicateParameter { parameter: name },
                    token.span.start.clone(),
                ));
            }
            names.push(name.clone());
        }

        let annotation = if kind != ParamKind::Separator && parser.eat(TokenKind::Colon) {
            Some(parse_expr(parser, BindingPower::Default)?)
        } else {
            None
        };
        let default = if parser.eat(TokenKind::Assignment) {
            Some(parse_expr(parser, BindingPower::Default)?)
        } else {
            None
        };

        let param = parser.push_node(
            token,
            NodeKind::Param {
                name: name.clone(),
                kind,
                annotation,
                default,
                entry: None,
            },
        )?;
        if kind != ParamKind::Separator {
            let scope = parser.scope();
            let declared = parser.declare_in(Namespace::Variables, &name, scope, Some(param))?;
            if let NodeKind::Param { entry, .. } = &mut parser.ast.node_mut(param).kind {
                *entry = Some(declared);
            }
        }
        parser.push_child(&mut params, param);

        if !parser.eat(TokenKind::Comma) {
            break;
        }
    }

    Ok(params.first())
}

fn parse_function(parser: &mut Parser, decorators: Option<NodeId>) -> Result<NodeId, Error> {
    let def = parser.expect(TokenKind::Def)?;
    let name = parser.expect(TokenKind::Identifier)?.value;

    // Declared before the body so the body can refer to it.
    let enclosing = parser.scope();
    let entry = parser.declare_in(Namespace::Functions, &name, enclosing, None)?;
    parser.enter_scope(entry);

    let parsed = parse_signature(parser).and_then(|(params, returns)| {
        parse_block(parser).map(|body| (params, returns, body))
    });
    parser.restore_scope(enclosing);
    let (params, returns, body) = parsed?;

    let function = parser.push_node(
        def,
        NodeKind::FunctionDef {
            name,
            entry,
            decorators,
            params,
            returns,
            body,
        },
    )?;
    parser.symbols.entry_mut(entry).node = Some(function);
    Ok(function)
}

fn parse_signature(parser: &mut Parser) -> Result<(Option<NodeId>, Option<NodeId>), Error> {
    parser.expect(TokenKind::OpenParen)?;
    let params = parse_params(parser)?;
    parser.expect(TokenKind::CloseParen)?;
    let returns = if parser.eat(TokenKind::Arrow) {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };
    Ok((params, returns))
}

fn parse_class(parser: &mut Parser, decorators: Option<NodeId>) -> Result<NodeId, Error> {
    let class = parser.expect(TokenKind::Class)?;
    let name = parser.expect(TokenKind::Identifier)?.value;

    let enclosing = parser.scope();
    let entry = parser.declare_in(Namespace::Classes, &name, enclosing, None)?;
    parser.symbols.set_value(entry, TypeInfo::Class(entry));

    let mut bases = ChildList::new();
    if parser.eat(TokenKind::OpenParen) {
        while parser.current_token_kind() != TokenKind::CloseParen {
            let base = parse_class_argument(parser)?;
            parser.push_child(&mut bases, base);
            if !parser.eat(TokenKind::Comma) {
                break;
            }
        }
        parser.expect(TokenKind::CloseParen)?;
    }

    parser.enter_scope(entry);
    let body = parse_block(parser);
    parser.restore_scope(enclosing);
    let body = body?;

    let class_def = parser.push_node(
        class,
        NodeKind::ClassDef {
            name,
            entry,
            decorators,
            bases: bases.first(),
            body,
        },
    )?;
    parser.symbols.entry_mut(entry).node = Some(class_def);
    Ok(class_def)
}

/// A base class, or a `metaclass=...` style keyword.
fn parse_class_argument(parser: &mut Parser) -> Result<NodeId, Error> {
    if parser.current_token_kind() == TokenKind::Identifier
        && parser.peek_kind() == TokenKind::Assignment
    {
        let name: Token = parser.advance().clone();
        parser.advance();
        let value = parse_expr(parser, BindingPower::Default)?;
        let keyword = name.value.clone();
        return parser.push_node(
            name,
            NodeKind::KeywordArg {
                name: keyword,
                value,
            },
        );
    }
    parse_expr(parser, BindingPower::Default)
}
