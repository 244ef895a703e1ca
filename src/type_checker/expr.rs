use crate::{
    ast::{
        ast::{NodeId, NodeKind, Operator, ParamKind},
        types::TypeInfo,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    symbol_table::symbol_table::EntryId,
};

use super::type_checker::{assign_target, Binding, FrameKind, Member, TypeChecker};

/// Infers the type of an expression and records it on the node.
pub fn type_check_expr(checker: &mut TypeChecker, id: NodeId) -> Result<TypeInfo, Error> {
    checker.descend(id)?;
    let ty = infer(checker, id);
    checker.ascend();
    let ty = ty?;
    checker.set_type(id, ty.clone());
    Ok(ty)
}

fn infer(checker: &mut TypeChecker, id: NodeId) -> Result<TypeInfo, Error> {
    let kind = checker.ast.kind(id).clone();
    match kind {
        NodeKind::Terminal => type_check_terminal(checker, id),
        NodeKind::Binary { .. } => type_check_binary_chain(checker, id),
        NodeKind::Nary {
            operators,
            operands,
        } => {
            let mut types = vec![];
            for operand in checker.ast.children(Some(operands)) {
                types.push(type_check_expr(checker, operand)?);
            }
            for (op, pair) in operators.iter().zip(types.windows(2)) {
                binary_result(checker, id, *op, &pair[0], &pair[1])?;
            }
            Ok(TypeInfo::Boolean)
        }
        NodeKind::Unary { op, operand } => {
            let operand = type_check_expr(checker, operand)?;
            unary_result(checker, id, op, &operand)
        }
        NodeKind::Call { callee, args } => type_check_call(checker, id, callee, args),
        NodeKind::KeywordArg { value, .. } | NodeKind::Starred { value, .. } => {
            type_check_expr(checker, value)
        }
        NodeKind::Subscript { value, index } => {
            let value = type_check_expr(checker, value)?;
            subscript_type(checker, id, &value, index)
        }
        NodeKind::Slice { lower, upper, step } => {
            for bound in [lower, upper, step].into_iter().flatten() {
                let ty = type_check_expr(checker, bound)?;
                if !TypeInfo::Integer.accepts(&ty) && ty != TypeInfo::None {
                    return Err(checker.type_mismatch(bound, &TypeInfo::Integer, &ty));
                }
            }
            Ok(TypeInfo::Unknown)
        }
        NodeKind::Attribute { value, attr } => {
            let base = type_check_expr(checker, value)?;
            attribute_type(checker, id, &base, &attr)
        }
        NodeKind::Conditional {
            condition,
            body,
            or_else,
        } => {
            type_check_expr(checker, condition)?;
            let body = type_check_expr(checker, body)?;
            let or_else = type_check_expr(checker, or_else)?;
            Ok(TypeInfo::union_of([body, or_else]))
        }
        NodeKind::NamedExpr { target, value } => {
            let ty = type_check_expr(checker, value)?;
            assign_target(checker, target, &ty, false)?;
            Ok(ty)
        }
        NodeKind::List { elements } => Ok(TypeInfo::list(element_union(checker, elements)?)),
        NodeKind::Set { elements } => Ok(TypeInfo::set(element_union(checker, Some(elements))?)),
        NodeKind::Tuple { elements } => {
            let mut items = vec![];
            let mut starred = false;
            for element in checker.ast.children(elements) {
                starred |= matches!(checker.ast.kind(element), NodeKind::Starred { .. });
                items.push(type_check_expr(checker, element)?);
            }
            // The length of `(a, *b)` is not known statically.
            Ok(if starred {
                TypeInfo::Unknown
            } else {
                TypeInfo::Tuple(items)
            })
        }
        NodeKind::Dict { entries } => {
            let mut keys = vec![];
            let mut values = vec![];
            for entry in checker.ast.children(entries) {
                match type_check_expr(checker, entry)? {
                    TypeInfo::KeyValue(key, value) | TypeInfo::Dict(key, value) => {
                        keys.push(*key);
                        values.push(*value);
                    }
                    TypeInfo::Unknown => {
                        keys.push(TypeInfo::Unknown);
                        values.push(TypeInfo::Unknown);
                    }
                    other => {
                        return Err(checker.type_mismatch(
                            entry,
                            &TypeInfo::dict(TypeInfo::Unknown, TypeInfo::Unknown),
                            &other,
                        ))
                    }
                }
            }
            Ok(TypeInfo::dict(
                TypeInfo::union_of(keys),
                TypeInfo::union_of(values),
            ))
        }
        NodeKind::KeyValue { key, value } => {
            let key = type_check_expr(checker, key)?;
            let value = type_check_expr(checker, value)?;
            Ok(TypeInfo::KeyValue(Box::new(key), Box::new(value)))
        }
        NodeKind::ListComp { element, clauses } | NodeKind::Generator { element, clauses } => {
            Ok(TypeInfo::list(type_check_comprehension(checker, id, element, clauses)?))
        }
        NodeKind::SetComp { element, clauses } => {
            Ok(TypeInfo::set(type_check_comprehension(checker, id, element, clauses)?))
        }
        NodeKind::DictComp { entry, clauses } => {
            match type_check_comprehension(checker, id, entry, clauses)? {
                TypeInfo::KeyValue(key, value) => Ok(TypeInfo::Dict(key, value)),
                _ => Ok(TypeInfo::dict(TypeInfo::Unknown, TypeInfo::Unknown)),
            }
        }
        _ => Ok(TypeInfo::Unknown),
    }
}

/// Types a binary operation and the binary operations nested along its
/// left operand, innermost first, without recursing down that spine.
fn type_check_binary_chain(checker: &mut TypeChecker, id: NodeId) -> Result<TypeInfo, Error> {
    let mut spine = vec![];
    let mut leftmost = id;
    while let NodeKind::Binary { op, left, right } = checker.ast.kind(leftmost) {
        spine.push((leftmost, *op, *right));
        leftmost = *left;
    }

    let mut ty = type_check_expr(checker, leftmost)?;
    for (node, op, right) in spine.into_iter().rev() {
        let right = type_check_expr(checker, right)?;
        ty = binary_result(checker, node, op, &ty, &right)?;
        checker.set_type(node, ty.clone());
    }
    Ok(ty)
}

fn type_check_terminal(checker: &TypeChecker, id: NodeId) -> Result<TypeInfo, Error> {
    let token = &checker.ast.node(id).token;
    let ty = match token.kind {
        TokenKind::Integer => TypeInfo::Integer,
        TokenKind::Float => TypeInfo::Float,
        TokenKind::Complex => TypeInfo::Complex,
        TokenKind::String => TypeInfo::String,
        TokenKind::True | TokenKind::False => TypeInfo::Boolean,
        TokenKind::None => TypeInfo::None,
        TokenKind::Ellipsis => TypeInfo::NotImplemented,
        TokenKind::Identifier => match checker.resolve(&token.value) {
            Some(binding) => checker.binding_type(binding),
            None => {
                return Err(checker.error(
                    id,
                    ErrorImpl::UnresolvedName {
                        name: token.value.clone(),
                    },
                ))
            }
        },
        _ => TypeInfo::Unknown,
    };
    Ok(ty)
}

fn element_union(checker: &mut TypeChecker, first: Option<NodeId>) -> Result<TypeInfo, Error> {
    let mut types = vec![];
    for element in checker.ast.children(first) {
        let ty = type_check_expr(checker, element)?;
        if matches!(checker.ast.kind(element), NodeKind::Starred { .. }) {
            types.push(iterable_element(checker, element, &ty)?);
        } else {
            types.push(ty);
        }
    }
    Ok(TypeInfo::union_of(types))
}

/// Types the `for ... in ... if ...` clauses of a comprehension, binding
/// their targets, then its element.
///
/// The first iterable is evaluated in the enclosing scope; everything after
/// it runs in the comprehension's own scope.
fn type_check_comprehension(
    checker: &mut TypeChecker,
    id: NodeId,
    element: NodeId,
    first: NodeId,
) -> Result<TypeInfo, Error> {
    let scope = checker.ast.node(first).scope;
    let mut entered = false;

    for clause in checker.ast.children(Some(first)) {
        if let NodeKind::ForIf {
            target,
            iter,
            conditions,
        } = checker.ast.kind(clause).clone()
        {
            let iter_ty = type_check_expr(checker, iter)?;
            if !entered {
                checker.push_frame(id, FrameKind::Comprehension, scope)?;
                entered = true;
            }
            let element = iterable_element(checker, iter, &iter_ty)?;
            assign_target(checker, target, &element, true)?;
            for condition in checker.ast.children(conditions) {
                type_check_expr(checker, condition)?;
            }
            checker.set_type(clause, element);
        }
    }

    let ty = type_check_expr(checker, element)?;
    if entered {
        checker.pop_frame();
    }
    Ok(ty)
}

/// Type of the elements produced by iterating over `ty`.
pub fn iterable_element(checker: &TypeChecker, id: NodeId, ty: &TypeInfo) -> Result<TypeInfo, Error> {
    if let Some(element) = ty.iter_element() {
        return Ok(element);
    }
    match ty {
        TypeInfo::NotImplemented => Ok(TypeInfo::Unknown),
        TypeInfo::Class(class) if checker.find_member(*class, "__iter__") != Member::Missing => {
            Ok(TypeInfo::Unknown)
        }
        _ => Err(checker.error(
            id,
            ErrorImpl::NotIterable {
                type_: checker.render_type(ty),
            },
        )),
    }
}

fn is_complex_number(ty: &TypeInfo) -> bool {
    ty.is_numeric() || *ty == TypeInfo::Complex
}

/// Type of `left op right`, or an operand error.
pub fn binary_result(
    checker: &TypeChecker,
    id: NodeId,
    op: Operator,
    left: &TypeInfo,
    right: &TypeInfo,
) -> Result<TypeInfo, Error> {
    let unknown = left.is_unknown() || right.is_unknown();
    let comparable = unknown
        || left.accepts(right)
        || right.accepts(left)
        || (is_complex_number(left) && is_complex_number(right));

    let result = match op {
        Operator::And | Operator::Or => Some(TypeInfo::union_of([left.clone(), right.clone()])),
        Operator::Is | Operator::IsNot => Some(TypeInfo::Boolean),
        Operator::Eq | Operator::NotEq => (comparable
            || *left == TypeInfo::None
            || *right == TypeInfo::None)
            .then_some(TypeInfo::Boolean),
        Operator::Lt | Operator::LtE | Operator::Gt | Operator::GtE => {
            comparable.then_some(TypeInfo::Boolean)
        }
        Operator::In | Operator::NotIn => (unknown
            || right.iter_element().is_some()
            || matches!(right, TypeInfo::Class(_)))
        .then_some(TypeInfo::Boolean),
        _ if unknown => Some(TypeInfo::Unknown),
        Operator::Div => (is_complex_number(left) && is_complex_number(right)).then(|| {
            if *left == TypeInfo::Complex || *right == TypeInfo::Complex {
                TypeInfo::Complex
            } else {
                TypeInfo::Float
            }
        }),
        Operator::FloorDiv => (left.is_numeric() && right.is_numeric()).then_some(TypeInfo::Integer),
        _ => arithmetic(op, left, right),
    };

    result.ok_or_else(|| {
        checker.error(
            id,
            ErrorImpl::OperandTypeError {
                operator: String::from(op.symbol()),
                left: checker.render_type(left),
                right: checker.render_type(right),
            },
        )
    })
}

/// Arithmetic operators over known operand types.
fn arithmetic(op: Operator, left: &TypeInfo, right: &TypeInfo) -> Option<TypeInfo> {
    if matches!(
        op,
        Operator::LShift | Operator::RShift | Operator::BitAnd | Operator::BitOr | Operator::BitXor
    ) {
        return bitwise(op, left, right);
    }
    if op == Operator::MatMul {
        return None;
    }

    if is_complex_number(left) && is_complex_number(right) {
        return Some(if left == right {
            left.clone()
        } else if *left == TypeInfo::Complex || *right == TypeInfo::Complex {
            TypeInfo::Complex
        } else {
            TypeInfo::Float
        });
    }

    if left.accepts(right) && right.accepts(left) {
        // Sequences concatenate with `+`; sets take differences with `-`.
        let defined = match left {
            TypeInfo::String | TypeInfo::List(_) | TypeInfo::Tuple(_) => op == Operator::Add,
            TypeInfo::Set(_) => op == Operator::Sub,
            _ => false,
        };
        return defined.then(|| left.clone());
    }

    match (op, left, right) {
        (Operator::Add, TypeInfo::Tuple(first), TypeInfo::Tuple(second)) => {
            Some(TypeInfo::Tuple(first.iter().chain(second).cloned().collect()))
        }
        (Operator::Mul, TypeInfo::String | TypeInfo::List(_) | TypeInfo::Tuple(_), TypeInfo::Integer) => {
            Some(left.clone())
        }
        (Operator::Mul, TypeInfo::Integer, TypeInfo::String | TypeInfo::List(_) | TypeInfo::Tuple(_)) => {
            Some(right.clone())
        }
        (Operator::Mod, TypeInfo::String, _) => Some(TypeInfo::String),
        _ => None,
    }
}

/// Shifts and bitwise operators: integers and booleans, plus set algebra
/// and dict merging with `|`.
fn bitwise(op: Operator, left: &TypeInfo, right: &TypeInfo) -> Option<TypeInfo> {
    let shift = matches!(op, Operator::LShift | Operator::RShift);
    let integral = |ty: &TypeInfo| matches!(ty, TypeInfo::Integer | TypeInfo::Boolean);
    let same = left.accepts(right) && right.accepts(left);

    match (left, right) {
        (TypeInfo::Boolean, TypeInfo::Boolean) if !shift => Some(TypeInfo::Boolean),
        _ if integral(left) && integral(right) => Some(TypeInfo::Integer),
        (TypeInfo::Set(_), TypeInfo::Set(_)) if !shift && same => Some(left.clone()),
        (TypeInfo::Dict(..), TypeInfo::Dict(..)) if op == Operator::BitOr && same => {
            Some(left.clone())
        }
        _ => None,
    }
}

fn unary_result(checker: &TypeChecker, id: NodeId, op: Operator, operand: &TypeInfo) -> Result<TypeInfo, Error> {
    let result = match op {
        Operator::Not => Some(TypeInfo::Boolean),
        _ if operand.is_unknown() => Some(TypeInfo::Unknown),
        Operator::Neg | Operator::Pos => match operand {
            TypeInfo::Boolean => Some(TypeInfo::Integer),
            ty if is_complex_number(ty) => Some(ty.clone()),
            _ => None,
        },
        Operator::Invert => {
            matches!(operand, TypeInfo::Integer | TypeInfo::Boolean).then_some(TypeInfo::Integer)
        }
        _ => None,
    };

    result.ok_or_else(|| {
        checker.error(
            id,
            ErrorImpl::UnaryOperandError {
                operator: String::from(op.symbol()),
                operand: checker.render_type(operand),
            },
        )
    })
}

fn return_type(ty: &TypeInfo) -> TypeInfo {
    match ty {
        TypeInfo::Function { ret, .. } => (**ret).clone(),
        _ => TypeInfo::Unknown,
    }
}

fn type_check_call(
    checker: &mut TypeChecker,
    id: NodeId,
    callee: NodeId,
    args: Option<NodeId>,
) -> Result<TypeInfo, Error> {
    let args = checker.ast.children(args);
    for arg in &args {
        type_check_expr(checker, *arg)?;
    }

    let callee_node = checker.ast.node(callee);
    if callee_node.is_identifier() {
        let name = callee_node.token.value.clone();
        let binding = match checker.resolve(&name) {
            Some(binding) => binding,
            None => return Err(checker.error(callee, ErrorImpl::UnresolvedName { name })),
        };
        let callee_ty = checker.binding_type(binding);
        checker.set_type(callee, callee_ty.clone());

        return match binding {
            Binding::Class(class) => construct(checker, id, class, &args),
            Binding::Function(function) => {
                check_arguments(checker, id, function, &args, false)?;
                Ok(return_type(&callee_ty))
            }
            Binding::Variable(_) => call_value(checker, id, &callee_ty, &args),
        };
    }

    if let NodeKind::Attribute { value, attr } = checker.ast.kind(callee).clone() {
        let base = type_check_expr(checker, value)?;
        let callee_ty = attribute_type(checker, callee, &base, &attr)?;
        checker.set_type(callee, callee_ty.clone());

        if let TypeInfo::Class(class) | TypeInfo::ClassObject(class) = base {
            match checker.find_member(class, &attr) {
                Member::Found(Binding::Function(method)) => {
                    let bound = match base {
                        TypeInfo::ClassObject(_) => checker.is_decorated(method, "classmethod"),
                        _ => !checker.is_decorated(method, "staticmethod"),
                    };
                    check_arguments(checker, id, method, &args, bound)?;
                    return Ok(return_type(&callee_ty));
                }
                Member::Found(Binding::Class(nested)) => return construct(checker, id, nested, &args),
                _ => {}
            }
        }
        return call_value(checker, id, &callee_ty, &args);
    }

    let callee_ty = type_check_expr(checker, callee)?;
    call_value(checker, id, &callee_ty, &args)
}

/// Calls a value whose definition is not known from the callee syntax.
fn call_value(checker: &TypeChecker, id: NodeId, ty: &TypeInfo, args: &[NodeId]) -> Result<TypeInfo, Error> {
    match ty {
        TypeInfo::Function { ret, entry } => {
            if let Some(entry) = entry {
                check_arguments(checker, id, *entry, args, false)?;
            }
            Ok((**ret).clone())
        }
        TypeInfo::Unknown | TypeInfo::NotImplemented => Ok(TypeInfo::Unknown),
        TypeInfo::ClassObject(class) => construct(checker, id, *class, args),
        TypeInfo::Class(class) => match checker.find_member(*class, "__call__") {
            Member::Found(Binding::Function(method)) => {
                check_arguments(checker, id, method, args, true)?;
                Ok(return_type(&checker.binding_type(Binding::Function(method))))
            }
            Member::Open => Ok(TypeInfo::Unknown),
            _ => Err(checker.error(
                id,
                ErrorImpl::NotCallable {
                    type_: checker.render_type(ty),
                },
            )),
        },
        _ => Err(checker.error(
            id,
            ErrorImpl::NotCallable {
                type_: checker.render_type(ty),
            },
        )),
    }
}

/// Instantiates `class`, checking the arguments against `__init__`.
fn construct(checker: &TypeChecker, id: NodeId, class: EntryId, args: &[NodeId]) -> Result<TypeInfo, Error> {
    if checker.symbols.is_builtin(class) {
        return Ok(checker.symbols.value(class).clone());
    }

    match checker.find_member(class, "__init__") {
        Member::Found(Binding::Function(init)) => check_arguments(checker, id, init, args, true)?,
        Member::Missing if !args.is_empty() => {
            return Err(checker.error(
                id,
                ErrorImpl::UnexpectedArguments {
                    expected: 0,
                    received: args.len(),
                },
            ))
        }
        _ => {}
    }
    Ok(TypeInfo::Class(class))
}

/// Matches call arguments against the parameters of `function`.
///
/// `bound` calls skip the first positional parameter. Arity is not checked
/// when the call unpacks `*args` or `**kwargs`.
fn check_arguments(
    checker: &TypeChecker,
    call: NodeId,
    function: EntryId,
    args: &[NodeId],
    bound: bool,
) -> Result<(), Error> {
    let params = match checker.symbols.entry(function).node.map(|node| checker.ast.kind(node)) {
        Some(NodeKind::FunctionDef { params, .. }) => checker.ast.children(*params),
        _ => return Ok(()),
    };

    // (name, param node, has default); positional parameters first.
    let mut named: Vec<(String, NodeId, bool)> = vec![];
    let mut keyword_only = vec![];
    let mut star = None;
    let mut double_star = None;
    let mut after_star = false;
    for param in params {
        if let NodeKind::Param {
            name,
            kind,
            default,
            ..
        } = checker.ast.kind(param)
        {
            match kind {
                ParamKind::Normal if after_star => {
                    keyword_only.push((name.clone(), param, default.is_some()))
                }
                ParamKind::Normal => named.push((name.clone(), param, default.is_some())),
                ParamKind::Star => {
                    star = Some(param);
                    after_star = true;
                }
                ParamKind::Separator => after_star = true,
                ParamKind::DoubleStar => double_star = Some(param),
            }
        }
    }
    if bound && !named.is_empty() {
        named.remove(0);
    }
    let positional_count = named.len();
    named.extend(keyword_only);

    let unpacking = args
        .iter()
        .any(|arg| matches!(checker.ast.kind(*arg), NodeKind::Starred { .. }));
    let positional: Vec<NodeId> = args
        .iter()
        .copied()
        .filter(|arg| {
            !matches!(
                checker.ast.kind(*arg),
                NodeKind::KeywordArg { .. } | NodeKind::Starred { .. }
            )
        })
        .collect();

    let mut filled = vec![false; named.len()];
    for (index, arg) in positional.iter().enumerate() {
        if index < positional_count {
            check_argument_type(checker, *arg, &checker.ast.node(named[index].1).type_info)?;
            filled[index] = true;
        } else if let Some(star) = star {
            let element = checker
                .ast
                .node(star)
                .type_info
                .iter_element()
                .unwrap_or_default();
            check_argument_type(checker, *arg, &element)?;
        } else if !unpacking {
            return Err(checker.error(
                *arg,
                ErrorImpl::UnexpectedArguments {
                    expected: positional_count,
                    received: positional.len(),
                },
            ));
        }
    }

    for arg in args {
        if let NodeKind::KeywordArg { name, .. } = checker.ast.kind(*arg) {
            match named.iter().position(|(param, _, _)| param == name) {
                Some(index) => {
                    check_argument_type(checker, *arg, &checker.ast.node(named[index].1).type_info)?;
                    filled[index] = true;
                }
                None if double_star.is_some() => {}
                None => {
                    return Err(checker.error(
                        *arg,
                        ErrorImpl::UnknownKeywordArgument { name: name.clone() },
                    ))
                }
            }
        }
    }

    if !unpacking {
        let missing = named
            .iter()
            .zip(&filled)
            .any(|((_, _, has_default), filled)| !has_default && !filled);
        if missing {
            let required = named.iter().filter(|(_, _, has_default)| !has_default).count();
            return Err(checker.error(
                call,
                ErrorImpl::MissingArguments {
                    expected: required,
                    received: args.len(),
                },
            ));
        }
    }
    Ok(())
}

fn check_argument_type(checker: &TypeChecker, arg: NodeId, expected: &TypeInfo) -> Result<(), Error> {
    let received = &checker.ast.node(arg).type_info;
    if expected.accepts(received) {
        Ok(())
    } else {
        Err(checker.error(
            arg,
            ErrorImpl::ArgumentTypeMatchError {
                expected: checker.render_type(expected),
                received: checker.render_type(received),
            },
        ))
    }
}

/// Type of `base.attr`.
pub fn attribute_type(checker: &TypeChecker, id: NodeId, base: &TypeInfo, attr: &str) -> Result<TypeInfo, Error> {
    let found = match base {
        TypeInfo::Unknown | TypeInfo::NotImplemented | TypeInfo::Function { .. } => {
            Some(TypeInfo::Unknown)
        }
        TypeInfo::Class(class) | TypeInfo::ClassObject(class) => match checker.find_member(*class, attr) {
            Member::Found(binding) => Some(checker.binding_type(binding)),
            Member::Open => Some(TypeInfo::Unknown),
            // Attributes of a class are still being defined inside its body.
            Member::Missing if checker.is_building(*class) => Some(TypeInfo::Unknown),
            Member::Missing => None,
        },
        TypeInfo::Union(..) => {
            let mut types = vec![];
            for member in base.members() {
                types.push(attribute_type(checker, id, &member, attr)?);
            }
            Some(TypeInfo::union_of(types))
        }
        _ => builtin_attribute(base, attr),
    };

    found.ok_or_else(|| {
        checker.error(
            id,
            ErrorImpl::UnresolvedAttribute {
                attribute: String::from(attr),
                base: checker.render_type(base),
            },
        )
    })
}

/// Methods and attributes of the builtin value types.
fn builtin_attribute(base: &TypeInfo, attr: &str) -> Option<TypeInfo> {
    let method = |ret: TypeInfo| Some(TypeInfo::function(ret, None));
    match base {
        TypeInfo::String => match attr {
            "upper" | "lower" | "strip" | "lstrip" | "rstrip" | "replace" | "format" | "join"
            | "capitalize" | "title" | "center" | "ljust" | "rjust" | "zfill" => {
                method(TypeInfo::String)
            }
            "split" | "rsplit" | "splitlines" => method(TypeInfo::list(TypeInfo::String)),
            "startswith" | "endswith" | "isdigit" | "isalpha" | "isalnum" | "isspace"
            | "isupper" | "islower" => method(TypeInfo::Boolean),
            "find" | "rfind" | "index" | "count" => method(TypeInfo::Integer),
            "encode" => method(TypeInfo::Unknown),
            _ => None,
        },
        TypeInfo::List(element) => match attr {
            "append" | "extend" | "insert" | "remove" | "clear" | "sort" | "reverse" => {
                method(TypeInfo::None)
            }
            "pop" => method((**element).clone()),
            "index" | "count" => method(TypeInfo::Integer),
            "copy" => method(base.clone()),
            _ => None,
        },
        TypeInfo::Dict(key, value) => match attr {
            "keys" => method(TypeInfo::list((**key).clone())),
            "values" => method(TypeInfo::list((**value).clone())),
            "items" => method(TypeInfo::list(TypeInfo::Tuple(vec![
                (**key).clone(),
                (**value).clone(),
            ]))),
            "get" | "pop" | "setdefault" => method((**value).clone()),
            "update" | "clear" => method(TypeInfo::None),
            "copy" => method(base.clone()),
            _ => None,
        },
        TypeInfo::Set(element) => match attr {
            "add" | "remove" | "discard" | "clear" | "update" => method(TypeInfo::None),
            "pop" => method((**element).clone()),
            "union" | "intersection" | "difference" | "copy" => method(base.clone()),
            "issubset" | "issuperset" | "isdisjoint" => method(TypeInfo::Boolean),
            _ => None,
        },
        TypeInfo::Complex => match attr {
            "real" | "imag" => Some(TypeInfo::Float),
            "conjugate" => method(TypeInfo::Complex),
            _ => None,
        },
        TypeInfo::Integer | TypeInfo::Float => match attr {
            "real" | "imag" => Some(base.clone()),
            "conjugate" => method(base.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Integer literal index, negative ones counted from the end.
fn literal_index(checker: &TypeChecker, index: NodeId, len: usize) -> Option<usize> {
    let node = checker.ast.node(index);
    let (negative, literal) = match &node.kind {
        NodeKind::Unary {
            op: Operator::Neg,
            operand,
        } => (true, checker.ast.node(*operand)),
        _ => (false, node),
    };
    if !matches!(literal.kind, NodeKind::Terminal) || literal.token.kind != TokenKind::Integer {
        return None;
    }
    let value: usize = literal.token.value.replace('_', "").parse().ok()?;
    if negative {
        len.checked_sub(value)
    } else {
        Some(value)
    }
}

fn subscript_type(checker: &mut TypeChecker, id: NodeId, value: &TypeInfo, index: NodeId) -> Result<TypeInfo, Error> {
    let is_slice = matches!(checker.ast.kind(index), NodeKind::Slice { .. });
    let index_ty = type_check_expr(checker, index)?;
    let integer_index = TypeInfo::Integer.accepts(&index_ty) || index_ty == TypeInfo::Boolean;

    match value {
        // Generic aliases such as `list[int]` used as values.
        TypeInfo::Unknown | TypeInfo::NotImplemented | TypeInfo::ClassObject(_) => Ok(TypeInfo::Unknown),
        TypeInfo::List(_) | TypeInfo::String | TypeInfo::Tuple(_) if is_slice => Ok(value.clone()),
        TypeInfo::List(element) if integer_index => Ok((**element).clone()),
        TypeInfo::String if integer_index => Ok(TypeInfo::String),
        TypeInfo::Tuple(items) if integer_index => Ok(literal_index(checker, index, items.len())
            .and_then(|index| items.get(index).cloned())
            .unwrap_or_else(|| TypeInfo::union_of(items.iter().cloned()))),
        TypeInfo::List(_) | TypeInfo::String | TypeInfo::Tuple(_) => {
            Err(checker.type_mismatch(index, &TypeInfo::Integer, &index_ty))
        }
        TypeInfo::Dict(key, element) => {
            if key.accepts(&index_ty) {
                Ok((**element).clone())
            } else {
                Err(checker.type_mismatch(index, key, &index_ty))
            }
        }
        TypeInfo::Class(class) => match checker.find_member(*class, "__getitem__") {
            Member::Found(binding) => Ok(return_type(&checker.binding_type(binding))),
            Member::Open => Ok(TypeInfo::Unknown),
            Member::Missing => Err(checker.error(
                id,
                ErrorImpl::NotSubscriptable {
                    type_: checker.render_type(value),
                },
            )),
        },
        _ => Err(checker.error(
            id,
            ErrorImpl::NotSubscriptable {
                type_: checker.render_type(value),
            },
        )),
    }
}
