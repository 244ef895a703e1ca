use crate::{
    arena::arena::{Arena, SubArena},
    ast::{
        ast::{Ast, NodeId, NodeKind, Operator, ParamKind},
        types::TypeInfo,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    parser::parser::{Module, MAX_NESTING_DEPTH},
    symbol_table::symbol_table::{EntryId, Namespace, ScopeId, SymbolTable},
    Position,
};

use super::expr::{binary_result, iterable_element, type_check_expr};

/// Deepest nesting of functions, classes and comprehensions the checker
/// accepts.
pub const SCOPE_STACK_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Module,
    Function(EntryId),
    Class(EntryId),
    Comprehension,
}

/// One active scope on the scope stack.
#[derive(Debug, Clone)]
pub struct Frame {
    pub scope: ScopeId,
    pub kind: FrameKind,
    /// Annotated return type of the function.
    pub declared: Option<TypeInfo>,
    /// Set once a `yield` is seen directly in this function.
    pub yielded: bool,
}

/// What a name resolved to, and in which namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Variable(EntryId),
    Function(EntryId),
    Class(EntryId),
}

/// Result of looking a name up on a class and its bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Found(Binding),
    /// Not found, but a base class is not known well enough to rule it out.
    Open,
    Missing,
}

pub struct TypeChecker<'a> {
    pub ast: &'a mut Ast,
    pub symbols: &'a mut SymbolTable,
    frames: SubArena<'a, Frame>,
    /// Expressions and statements currently being checked.
    depth: usize,
}

impl<'a> TypeChecker<'a> {
    /// Creates a checker whose scope stack holds only the module scope.
    pub fn new(
        ast: &'a mut Ast,
        symbols: &'a mut SymbolTable,
        frame_arena: &'a mut Arena<Frame>,
    ) -> Result<Self, Error> {
        let mut frames = SubArena::new(frame_arena, SCOPE_STACK_DEPTH);
        frames
            .alloc(Frame {
                scope: symbols.root(),
                kind: FrameKind::Module,
                declared: None,
                yielded: false,
            })
            .map_err(|error| Error::new(error, Position::null()))?;

        Ok(TypeChecker {
            ast,
            symbols,
            frames,
            depth: 0,
        })
    }

    /// Error at `id`, carrying a rendering of the offending subtree.
    pub fn error(&self, id: NodeId, error: ErrorImpl) -> Error {
        Error::new(error, self.ast.node(id).token.span.start.clone())
            .with_context(self.ast.render(id))
    }

    pub fn type_mismatch(&self, id: NodeId, expected: &TypeInfo, received: &TypeInfo) -> Error {
        self.error(
            id,
            ErrorImpl::TypeMatchError {
                expected: self.render_type(expected),
                received: self.render_type(received),
            },
        )
    }

    pub fn render_type(&self, ty: &TypeInfo) -> String {
        ty.render(self.symbols)
    }

    pub fn set_type(&mut self, id: NodeId, ty: TypeInfo) {
        self.ast.node_mut(id).type_info = ty;
    }

    /// Enters one level of nesting below `id`. The error carries no
    /// rendering of the subtree, which is as deep as the limit.
    pub fn descend(&mut self, id: NodeId) -> Result<(), Error> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Error::new(
                ErrorImpl::NestingTooDeep {
                    limit: MAX_NESTING_DEPTH,
                },
                self.ast.node(id).token.span.start.clone(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn push_frame(&mut self, id: NodeId, kind: FrameKind, scope: ScopeId) -> Result<(), Error> {
        self.frames
            .alloc(Frame {
                scope,
                kind,
                declared: None,
                yielded: false,
            })
            .map(|_| ())
            .map_err(|error| self.error(id, error))
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Function whose body is being checked, if the innermost scope is one.
    pub fn current_function(&self) -> Option<EntryId> {
        match self.frames.last().map(|frame| frame.kind) {
            Some(FrameKind::Function(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Class whose body is being checked, if the innermost scope is one.
    pub fn enclosing_class(&self) -> Option<EntryId> {
        match self.frames.last().map(|frame| frame.kind) {
            Some(FrameKind::Class(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Whether the body of `class` is still being checked.
    pub fn is_building(&self, class: EntryId) -> bool {
        self.frames
            .as_slice()
            .iter()
            .any(|frame| frame.kind == FrameKind::Class(class))
    }

    pub fn mark_yield(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            if matches!(frame.kind, FrameKind::Function(_)) {
                frame.yielded = true;
            }
        }
    }

    fn declare_return(&mut self, declared: Option<TypeInfo>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.declared = declared;
        }
    }

    fn declared_return(&self) -> Option<&TypeInfo> {
        self.frames.last().and_then(|frame| frame.declared.as_ref())
    }

    fn yielded(&self) -> bool {
        self.frames.last().map(|frame| frame.yielded).unwrap_or(false)
    }

    /// Resolves `name` innermost scope first, trying variables, functions
    /// and classes in each. Class bodies are only visible from themselves.
    pub fn resolve(&self, name: &str) -> Option<Binding> {
        for (depth, frame) in self.frames.as_slice().iter().rev().enumerate() {
            if depth > 0 && matches!(frame.kind, FrameKind::Class(_)) {
                continue;
            }
            if let Some(entry) = self.symbols.lookup(Namespace::Variables, name, frame.scope) {
                return Some(Binding::Variable(entry));
            }
            if let Some(entry) = self.symbols.lookup(Namespace::Functions, name, frame.scope) {
                return Some(Binding::Function(entry));
            }
            if let Some(entry) = self.symbols.lookup(Namespace::Classes, name, frame.scope) {
                return Some(Binding::Class(entry));
            }
        }
        None
    }

    /// Like [`TypeChecker::resolve`], restricted to the class namespace.
    pub fn resolve_class(&self, name: &str) -> Option<EntryId> {
        for (depth, frame) in self.frames.as_slice().iter().rev().enumerate() {
            if depth > 0 && matches!(frame.kind, FrameKind::Class(_)) {
                continue;
            }
            if let Some(entry) = self.symbols.lookup(Namespace::Classes, name, frame.scope) {
                return Some(entry);
            }
        }
        None
    }

    /// Type of a resolved name used as a value.
    pub fn binding_type(&self, binding: Binding) -> TypeInfo {
        match binding {
            Binding::Variable(entry) => self.symbols.value(entry).clone(),
            Binding::Class(entry) => TypeInfo::ClassObject(entry),
            Binding::Function(entry) => match self.symbols.value(entry) {
                ty @ TypeInfo::Function { .. } => ty.clone(),
                _ => TypeInfo::function(TypeInfo::Unknown, Some(entry)),
            },
        }
    }

    /// Base classes named by the definition of `class`, resolved from the
    /// scope it is defined in. Bases that are not plain class names are
    /// `None`.
    pub fn class_bases(&self, class: EntryId) -> Vec<Option<EntryId>> {
        let entry = self.symbols.entry(class);
        let bases = match entry.node.map(|node| self.ast.kind(node)) {
            Some(NodeKind::ClassDef { bases, .. }) => self.ast.children(*bases),
            _ => return vec![],
        };

        bases
            .into_iter()
            .filter(|base| !matches!(self.ast.kind(*base), NodeKind::KeywordArg { .. }))
            .map(|base| {
                let node = self.ast.node(base);
                if !node.is_identifier() {
                    return None;
                }
                let mut scope = entry.scope;
                while let Some(current) = scope {
                    let found =
                        self.symbols
                            .lookup(Namespace::Classes, &node.token.value, current);
                    if found.is_some() {
                        return found;
                    }
                    scope = self.symbols.entry(current).scope;
                }
                None
            })
            .collect()
    }

    /// Looks `name` up in the scope of `class`, then in its bases.
    pub fn find_member(&self, class: EntryId, name: &str) -> Member {
        let mut visited = vec![];
        self.find_member_in(class, name, &mut visited)
    }

    fn find_member_in(&self, class: EntryId, name: &str, visited: &mut Vec<EntryId>) -> Member {
        if visited.contains(&class) {
            return Member::Missing;
        }
        visited.push(class);

        if let Some(entry) = self.symbols.lookup(Namespace::Variables, name, class) {
            return Member::Found(Binding::Variable(entry));
        }
        if let Some(entry) = self.symbols.lookup(Namespace::Functions, name, class) {
            return Member::Found(Binding::Function(entry));
        }
        if let Some(entry) = self.symbols.lookup(Namespace::Classes, name, class) {
            return Member::Found(Binding::Class(entry));
        }

        // Builtin classes carry no members; only `object` is known to be empty.
        if self.symbols.is_builtin(class) {
            return if self.symbols.entry(class).name == "object" {
                Member::Missing
            } else {
                Member::Open
            };
        }

        let mut open = false;
        for base in self.class_bases(class) {
            match base {
                Some(base) => match self.find_member_in(base, name, visited) {
                    Member::Missing => {}
                    Member::Open => open = true,
                    found => return found,
                },
                None => open = true,
            }
        }

        if open {
            Member::Open
        } else {
            Member::Missing
        }
    }

    /// Type of the instances of a class named in an expression; a tuple of
    /// classes, as in `except (A, B)`, gives the union of their instances.
    pub fn instance_of(&self, ty: &TypeInfo) -> TypeInfo {
        match ty {
            TypeInfo::ClassObject(class) => self.symbols.value(*class).clone(),
            TypeInfo::Tuple(items) => {
                TypeInfo::union_of(items.iter().map(|item| self.instance_of(item)))
            }
            _ => TypeInfo::Unknown,
        }
    }

    /// Whether the definition of `function` carries the plain decorator
    /// `name`, e.g. `@staticmethod`.
    pub fn is_decorated(&self, function: EntryId, name: &str) -> bool {
        let decorators = match self.symbols.entry(function).node.map(|node| self.ast.kind(node)) {
            Some(NodeKind::FunctionDef { decorators, .. }) => *decorators,
            _ => return false,
        };
        self.ast.children(decorators).into_iter().any(|decorator| {
            let node = self.ast.node(decorator);
            node.is_identifier() && node.token.value == name
        })
    }
}

/// Type checks a parsed module in place.
///
/// Every expression node gets its `type_info`; variable, function and class
/// entries of the symbol table get their final types. The first type error
/// ends the check.
pub fn type_check(module: &mut Module) -> Result<(), Error> {
    let mut frame_arena = Arena::with_reserve(SCOPE_STACK_DEPTH);
    let mut checker = TypeChecker::new(&mut module.ast, &mut module.symbols, &mut frame_arena)?;
    type_check_stmt(&mut checker, module.root)?;
    Ok(())
}

/// Checks a statement and returns the type it returns with, if any path
/// through it reaches a `return`.
pub fn type_check_stmt(checker: &mut TypeChecker, id: NodeId) -> Result<Option<TypeInfo>, Error> {
    checker.descend(id)?;
    let returns = check_stmt(checker, id);
    checker.ascend();
    returns
}

fn check_stmt(checker: &mut TypeChecker, id: NodeId) -> Result<Option<TypeInfo>, Error> {
    let kind = checker.ast.kind(id).clone();
    let returns = match kind {
        NodeKind::File { body } | NodeKind::Block { body } => type_check_block(checker, body)?,
        NodeKind::Assign { targets, value } => {
            let ty = type_check_expr(checker, value)?;
            for target in checker.ast.children(Some(targets)) {
                assign_target(checker, target, &ty, false)?;
            }
            checker.set_type(id, ty);
            None
        }
        NodeKind::AugAssign { op, target, value } => {
            let target_ty = type_check_expr(checker, target)?;
            let value_ty = type_check_expr(checker, value)?;
            let result = binary_result(checker, id, op, &target_ty, &value_ty)?;
            if !target_ty.accepts(&result) {
                return Err(checker.type_mismatch(id, &target_ty, &result));
            }
            if target_ty.is_unknown() {
                assign_target(checker, target, &result, false)?;
            }
            checker.set_type(id, result);
            None
        }
        NodeKind::Decl {
            target,
            annotation,
            value,
        } => {
            let declared = resolve_annotation(checker, annotation)?;
            if let Some(value) = value {
                let value_ty = type_check_expr(checker, value)?;
                if !declared.accepts(&value_ty) {
                    return Err(checker.type_mismatch(value, &declared, &value_ty));
                }
            }
            declare_target(checker, target, &declared)?;
            checker.set_type(id, declared);
            None
        }
        NodeKind::If { .. } | NodeKind::Elif { .. } => check_if_chain(checker, id)?,
        NodeKind::While {
            condition,
            body,
            or_else,
        } => {
            type_check_expr(checker, condition)?;
            let body_returns = type_check_stmt(checker, body)?;
            let else_returns = match or_else {
                Some(or_else) => type_check_stmt(checker, or_else)?,
                None => None,
            };
            merge_returns(checker, id, body_returns, else_returns)?
        }
        NodeKind::Else { body } => type_check_stmt(checker, body)?,
        NodeKind::For {
            target,
            iter,
            body,
            or_else,
        } => {
            let iter_ty = type_check_expr(checker, iter)?;
            let element = iterable_element(checker, iter, &iter_ty)?;
            assign_target(checker, target, &element, true)?;
            let body_returns = type_check_stmt(checker, body)?;
            let else_returns = match or_else {
                Some(or_else) => type_check_stmt(checker, or_else)?,
                None => None,
            };
            merge_returns(checker, id, body_returns, else_returns)?
        }
        NodeKind::FunctionDef { .. } => {
            check_function(checker, id)?;
            None
        }
        NodeKind::ClassDef { .. } => {
            check_class(checker, id)?;
            None
        }
        NodeKind::Try {
            body,
            handlers,
            or_else,
            finally,
        } => {
            let mut returns = type_check_stmt(checker, body)?;
            for handler in checker.ast.children(handlers) {
                let handler_returns = check_handler(checker, handler)?;
                returns = merge_returns(checker, handler, returns, handler_returns)?;
            }
            for block in [or_else, finally].into_iter().flatten() {
                let block_returns = type_check_stmt(checker, block)?;
                returns = merge_returns(checker, block, returns, block_returns)?;
            }
            returns
        }
        NodeKind::With { items, body } => {
            for item in checker.ast.children(Some(items)) {
                if let NodeKind::WithItem { context, target } = checker.ast.kind(item).clone() {
                    let ty = type_check_expr(checker, context)?;
                    if let Some(target) = target {
                        assign_target(checker, target, &ty, true)?;
                    }
                    checker.set_type(item, ty);
                }
            }
            type_check_stmt(checker, body)?
        }
        NodeKind::Return { value } => {
            if checker.current_function().is_none() {
                return Err(checker.error(id, ErrorImpl::ReturnOutsideFunction));
            }
            let ty = match value {
                Some(value) => type_check_expr(checker, value)?,
                None => TypeInfo::None,
            };
            checker.set_type(id, ty.clone());
            // Paths of an annotated function agree through the annotation.
            match checker.declared_return() {
                Some(declared) if declared.accepts(&ty) => Some(declared.clone()),
                _ => Some(ty),
            }
        }
        NodeKind::Yield { value } => {
            if let Some(value) = value {
                let ty = type_check_expr(checker, value)?;
                checker.set_type(id, ty);
            }
            checker.mark_yield();
            None
        }
        NodeKind::Raise { exception, cause } => {
            for expr in [exception, cause].into_iter().flatten() {
                type_check_expr(checker, expr)?;
            }
            None
        }
        NodeKind::Assert { test, msg } => {
            type_check_expr(checker, test)?;
            if let Some(msg) = msg {
                type_check_expr(checker, msg)?;
            }
            None
        }
        NodeKind::Del { targets } => {
            for target in checker.ast.children(Some(targets)) {
                type_check_expr(checker, target)?;
            }
            None
        }
        NodeKind::Import { .. }
        | NodeKind::ImportFrom { .. }
        | NodeKind::Global { .. }
        | NodeKind::Nonlocal { .. }
        | NodeKind::Pass
        | NodeKind::Break
        | NodeKind::Continue => None,
        _ => {
            type_check_expr(checker, id)?;
            None
        }
    };
    Ok(returns)
}

/// Checks an `if` and its right-nested `elif` chain without recursing
/// along the chain.
fn check_if_chain(checker: &mut TypeChecker, id: NodeId) -> Result<Option<TypeInfo>, Error> {
    let mut branches = vec![];
    let mut next = Some(id);
    let mut else_returns = None;

    while let Some(current) = next {
        match checker.ast.kind(current).clone() {
            NodeKind::If {
                condition,
                body,
                or_else,
            }
            | NodeKind::Elif {
                condition,
                body,
                or_else,
            } => {
                type_check_expr(checker, condition)?;
                branches.push((current, type_check_stmt(checker, body)?));
                next = or_else;
            }
            _ => {
                else_returns = type_check_stmt(checker, current)?;
                next = None;
            }
        }
    }

    let mut returns = else_returns;
    for (branch, body_returns) in branches.into_iter().rev() {
        returns = merge_returns(checker, branch, body_returns, returns)?;
    }
    Ok(returns)
}

fn type_check_block(checker: &mut TypeChecker, first: Option<NodeId>) -> Result<Option<TypeInfo>, Error> {
    let mut returns = None;
    for stmt in checker.ast.children(first) {
        let stmt_returns = type_check_stmt(checker, stmt)?;
        returns = merge_returns(checker, stmt, returns, stmt_returns)?;
    }
    Ok(returns)
}

/// Combines the return types of two paths; both must agree when both return.
fn merge_returns(
    checker: &TypeChecker,
    id: NodeId,
    first: Option<TypeInfo>,
    second: Option<TypeInfo>,
) -> Result<Option<TypeInfo>, Error> {
    match (first, second) {
        (None, other) | (other, None) => Ok(other),
        (Some(first), Some(second)) => {
            if first.accepts(&second) {
                Ok(Some(if first.is_unknown() { second } else { first }))
            } else if second.accepts(&first) {
                Ok(Some(second))
            } else {
                Err(checker.error(
                    id,
                    ErrorImpl::InconsistentReturnTypes {
                        first: checker.render_type(&first),
                        second: checker.render_type(&second),
                    },
                ))
            }
        }
    }
}

/// Binds `ty` to an assignment target.
///
/// A name whose type is still unknown takes `ty`; otherwise `ty` must fit
/// the existing type, unless `rebind` is set (loop and comprehension
/// targets), in which case the name simply takes the new type.
pub fn assign_target(
    checker: &mut TypeChecker,
    target: NodeId,
    ty: &TypeInfo,
    rebind: bool,
) -> Result<(), Error> {
    let node = checker.ast.node(target);
    let is_identifier = node.is_identifier();
    let name = node.token.value.clone();
    let kind = node.kind.clone();

    match kind {
        NodeKind::Terminal if is_identifier => {
            let entry = match checker.resolve(&name) {
                Some(Binding::Variable(entry)) => entry,
                _ => return Err(checker.error(target, ErrorImpl::UnresolvedName { name })),
            };
            bind_entry(checker, target, entry, ty, rebind)?;
        }
        NodeKind::Tuple { elements } | NodeKind::List { elements } => {
            let targets = checker.ast.children(elements);
            let star = targets
                .iter()
                .position(|target| matches!(checker.ast.kind(*target), NodeKind::Starred { .. }));

            match ty {
                TypeInfo::Tuple(items) => {
                    let fixed = targets.len() - usize::from(star.is_some());
                    if items.len() < fixed || (star.is_none() && items.len() != fixed) {
                        return Err(checker.error(
                            target,
                            ErrorImpl::TypeMatchError {
                                expected: format!("a tuple of {} elements", fixed),
                                received: checker.render_type(ty),
                            },
                        ));
                    }
                    // Elements captured by the starred target.
                    let rest = items.len() - fixed;
                    for (index, element) in targets.iter().enumerate() {
                        match star {
                            Some(star) if index == star => {
                                let captured = TypeInfo::list(TypeInfo::union_of(
                                    items[star..star + rest].iter().cloned(),
                                ));
                                assign_target(checker, *element, &captured, rebind)?;
                            }
                            Some(star) if index > star => {
                                assign_target(checker, *element, &items[index - 1 + rest], rebind)?
                            }
                            _ => assign_target(checker, *element, &items[index], rebind)?,
                        }
                    }
                }
                _ => {
                    let item = iterable_element(checker, target, ty)?;
                    for (index, element) in targets.iter().enumerate() {
                        if Some(index) == star {
                            assign_target(checker, *element, &TypeInfo::list(item.clone()), rebind)?;
                        } else {
                            assign_target(checker, *element, &item, rebind)?;
                        }
                    }
                }
            }
            checker.set_type(target, ty.clone());
        }
        NodeKind::Starred { value, .. } => {
            let item = iterable_element(checker, target, ty)?;
            assign_target(checker, value, &TypeInfo::list(item), rebind)?;
            checker.set_type(target, ty.clone());
        }
        NodeKind::Subscript { value, index } => {
            let container = type_check_expr(checker, value)?;
            let is_slice = matches!(checker.ast.kind(index), NodeKind::Slice { .. });
            let index_ty = type_check_expr(checker, index)?;
            match &container {
                _ if is_slice => {
                    if !container.accepts(ty) {
                        return Err(checker.type_mismatch(target, &container, ty));
                    }
                }
                TypeInfo::List(element) => {
                    if !TypeInfo::Integer.accepts(&index_ty) {
                        return Err(checker.type_mismatch(index, &TypeInfo::Integer, &index_ty));
                    }
                    if !element.accepts(ty) {
                        return Err(checker.type_mismatch(target, element, ty));
                    }
                }
                TypeInfo::Dict(key, element) => {
                    if !key.accepts(&index_ty) {
                        return Err(checker.type_mismatch(index, key, &index_ty));
                    }
                    if !element.accepts(ty) {
                        return Err(checker.type_mismatch(target, element, ty));
                    }
                }
                TypeInfo::Unknown | TypeInfo::Class(_) => {}
                other => {
                    return Err(checker.error(
                        value,
                        ErrorImpl::NotSubscriptable {
                            type_: checker.render_type(other),
                        },
                    ))
                }
            }
            checker.set_type(target, ty.clone());
        }
        NodeKind::Attribute { value, attr } => {
            let base = type_check_expr(checker, value)?;
            match base {
                TypeInfo::Class(class) | TypeInfo::ClassObject(class) => match checker.find_member(class, &attr) {
                    Member::Found(Binding::Variable(entry)) => {
                        bind_entry(checker, target, entry, ty, rebind)?;
                    }
                    Member::Found(_) => {}
                    // First assignment defines the attribute on the class.
                    Member::Open | Member::Missing => {
                        checker
                            .symbols
                            .insert(Namespace::Variables, &attr, class, ty.clone(), Some(target))
                            .map_err(|error| checker.error(target, error))?;
                    }
                },
                TypeInfo::Unknown => {}
                other => {
                    return Err(checker.error(
                        target,
                        ErrorImpl::UnresolvedAttribute {
                            attribute: attr,
                            base: checker.render_type(&other),
                        },
                    ))
                }
            }
            checker.set_type(target, ty.clone());
        }
        _ => {
            return Err(checker.error(
                target,
                ErrorImpl::InvalidTarget {
                    target: checker.ast.render(target),
                },
            ))
        }
    }
    Ok(())
}

fn bind_entry(
    checker: &mut TypeChecker,
    target: NodeId,
    entry: EntryId,
    ty: &TypeInfo,
    rebind: bool,
) -> Result<(), Error> {
    let current = checker.symbols.value(entry).clone();
    if rebind || current.is_unknown() {
        checker.symbols.set_value(entry, ty.clone());
    } else if !current.accepts(ty) {
        return Err(checker.type_mismatch(target, &current, ty));
    }
    checker.set_type(target, ty.clone());
    Ok(())
}

/// Target of an annotated declaration: a plain name takes the declared type
/// outright, anything else is assigned as usual.
fn declare_target(checker: &mut TypeChecker, target: NodeId, declared: &TypeInfo) -> Result<(), Error> {
    let node = checker.ast.node(target);
    if !node.is_identifier() {
        return assign_target(checker, target, declared, false);
    }

    let name = node.token.value.clone();
    match checker.resolve(&name) {
        Some(Binding::Variable(entry)) => {
            checker.symbols.set_value(entry, declared.clone());
            checker.set_type(target, declared.clone());
            Ok(())
        }
        _ => Err(checker.error(target, ErrorImpl::UnresolvedName { name })),
    }
}

/// Resolves a type annotation through the class namespace.
///
/// Supports class names, `None`, `A | B`, `list[T]`, `set[T]`,
/// `dict[K, V]`, `tuple[...]`, the `typing` spellings of those plus
/// `Optional[T]` and `Union[...]`, and string forward references.
pub fn resolve_annotation(checker: &mut TypeChecker, id: NodeId) -> Result<TypeInfo, Error> {
    let node = checker.ast.node(id);
    let kind = node.kind.clone();
    let token_kind = node.token.kind;
    let name = node.token.value.clone();

    let ty = match kind {
        NodeKind::Terminal => match token_kind {
            TokenKind::None => TypeInfo::None,
            TokenKind::Identifier => annotation_name(checker, id, &name)?,
            TokenKind::String => match checker.resolve_class(&name) {
                Some(entry) => checker.symbols.value(entry).clone(),
                None => TypeInfo::Unknown,
            },
            TokenKind::Ellipsis => TypeInfo::Unknown,
            _ => {
                return Err(checker.error(
                    id,
                    ErrorImpl::UnknownType {
                        type_: checker.ast.render(id),
                    },
                ))
            }
        },
        NodeKind::Binary {
            op: Operator::BitOr,
            left,
            right,
        } => {
            let left = resolve_annotation(checker, left)?;
            let right = resolve_annotation(checker, right)?;
            TypeInfo::union_of([left, right])
        }
        NodeKind::Subscript { value, index } => generic_annotation(checker, value, index)?,
        // Dotted names come from modules that are not followed.
        NodeKind::Attribute { .. } => TypeInfo::Unknown,
        _ => {
            return Err(checker.error(
                id,
                ErrorImpl::UnknownType {
                    type_: checker.ast.render(id),
                },
            ))
        }
    };

    checker.set_type(id, ty.clone());
    Ok(ty)
}

fn annotation_name(checker: &TypeChecker, id: NodeId, name: &str) -> Result<TypeInfo, Error> {
    if let Some(entry) = checker.resolve_class(name) {
        return Ok(checker.symbols.value(entry).clone());
    }
    match checker.resolve(name) {
        // Imported names are not followed.
        Some(Binding::Variable(entry)) if checker.symbols.value(entry).is_unknown() => {
            Ok(TypeInfo::Unknown)
        }
        _ => Err(checker.error(
            id,
            ErrorImpl::UnknownType {
                type_: String::from(name),
            },
        )),
    }
}

fn generic_annotation(checker: &mut TypeChecker, value: NodeId, index: NodeId) -> Result<TypeInfo, Error> {
    let base = checker.ast.node(value);
    if !base.is_identifier() {
        return Ok(TypeInfo::Unknown);
    }
    let base = base.token.value.clone();
    annotation_name(checker, value, &base)?;

    let args = match checker.ast.kind(index) {
        NodeKind::Tuple { elements } => checker.ast.children(*elements),
        _ => vec![index],
    };
    let open_ended = args
        .iter()
        .any(|arg| checker.ast.node(*arg).token.kind == TokenKind::Ellipsis);
    let mut types = vec![];
    for arg in &args {
        types.push(resolve_annotation(checker, *arg)?);
    }

    let ty = match (base.as_str(), types.as_slice()) {
        ("list" | "List", [element]) => TypeInfo::list(element.clone()),
        ("set" | "Set", [element]) => TypeInfo::set(element.clone()),
        ("dict" | "Dict", [key, value]) => TypeInfo::dict(key.clone(), value.clone()),
        ("tuple" | "Tuple", _) if !open_ended => TypeInfo::Tuple(types),
        ("Optional", [inner]) => TypeInfo::union_of([inner.clone(), TypeInfo::None]),
        ("Union", _) => TypeInfo::union_of(types),
        _ => TypeInfo::Unknown,
    };
    Ok(ty)
}

/// A function body made only of `...` (and docstrings) is a stub.
fn is_stub(checker: &TypeChecker, body: NodeId) -> bool {
    let statements = match checker.ast.kind(body) {
        NodeKind::Block { body } => checker.ast.children(*body),
        _ => return false,
    };
    let mut has_ellipsis = false;
    for stmt in statements {
        let node = checker.ast.node(stmt);
        match (&node.kind, node.token.kind) {
            (NodeKind::Terminal, TokenKind::Ellipsis) => has_ellipsis = true,
            (NodeKind::Terminal, TokenKind::String) => {}
            _ => return false,
        }
    }
    has_ellipsis
}

fn check_function(checker: &mut TypeChecker, id: NodeId) -> Result<(), Error> {
    let (entry, decorators, params, returns, body) = match checker.ast.kind(id) {
        NodeKind::FunctionDef {
            entry,
            decorators,
            params,
            returns,
            body,
            ..
        } => (*entry, *decorators, *params, *returns, *body),
        _ => return Ok(()),
    };

    for decorator in checker.ast.children(decorators) {
        type_check_expr(checker, decorator)?;
    }

    let bound_class = checker
        .enclosing_class()
        .filter(|_| !checker.is_decorated(entry, "staticmethod"));
    let classmethod = checker.is_decorated(entry, "classmethod");

    // Defaults are evaluated where the function is defined.
    let params = checker.ast.children(params);
    let mut defaults = vec![];
    for param in &params {
        let default = match checker.ast.kind(*param) {
            NodeKind::Param {
                default: Some(default),
                ..
            } => Some(type_check_expr(checker, *default)?),
            _ => None,
        };
        defaults.push(default);
    }

    checker.push_frame(id, FrameKind::Function(entry), entry)?;
    let result = check_function_body(checker, id, entry, bound_class, classmethod, &params, &defaults, returns, body);
    checker.pop_frame();
    let ty = result?;

    checker.symbols.set_value(entry, ty.clone());
    checker.set_type(id, ty);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn check_function_body(
    checker: &mut TypeChecker,
    id: NodeId,
    entry: EntryId,
    bound_class: Option<EntryId>,
    classmethod: bool,
    params: &[NodeId],
    defaults: &[Option<TypeInfo>],
    returns: Option<NodeId>,
    body: NodeId,
) -> Result<TypeInfo, Error> {
    for (index, (param, default)) in params.iter().zip(defaults).enumerate() {
        let (kind, annotation, param_entry) = match checker.ast.kind(*param) {
            NodeKind::Param {
                kind,
                annotation,
                entry,
                ..
            } => (*kind, *annotation, *entry),
            _ => continue,
        };
        if kind == ParamKind::Separator {
            continue;
        }

        let ty = match (annotation, bound_class, default) {
            (Some(annotation), _, _) => {
                let declared = resolve_annotation(checker, annotation)?;
                if let Some(default) = default {
                    if !declared.accepts(default) {
                        return Err(checker.type_mismatch(*param, &declared, default));
                    }
                }
                declared
            }
            (None, Some(class), _) if index == 0 && kind == ParamKind::Normal => {
                if classmethod {
                    TypeInfo::ClassObject(class)
                } else {
                    TypeInfo::Class(class)
                }
            }
            (None, _, Some(default)) => default.clone(),
            _ => TypeInfo::Unknown,
        };
        let ty = match kind {
            ParamKind::Star => TypeInfo::list(ty),
            ParamKind::DoubleStar => TypeInfo::dict(TypeInfo::String, ty),
            _ => ty,
        };

        if let Some(param_entry) = param_entry {
            checker.symbols.set_value(param_entry, ty.clone());
        }
        checker.set_type(*param, ty);
    }

    let declared = match returns {
        Some(returns) => Some(resolve_annotation(checker, returns)?),
        None => None,
    };
    checker.declare_return(declared.clone());
    // Recorded before the body so recursive calls see it.
    checker.symbols.set_value(
        entry,
        TypeInfo::function(declared.clone().unwrap_or_default(), Some(entry)),
    );

    let body_returns = type_check_stmt(checker, body)?;

    // Generators return an iterator whatever they yield.
    if checker.yielded() {
        return Ok(TypeInfo::function(declared.unwrap_or_default(), Some(entry)));
    }

    let inferred = if is_stub(checker, body) {
        TypeInfo::NotImplemented
    } else {
        body_returns.unwrap_or(TypeInfo::None)
    };

    match declared {
        Some(declared) => {
            if !declared.accepts(&inferred) {
                return Err(checker.error(
                    id,
                    ErrorImpl::ReturnTypeMismatch {
                        function: checker.symbols.qualified_name(entry),
                        expected: checker.render_type(&declared),
                        received: checker.render_type(&inferred),
                    },
                ));
            }
            Ok(TypeInfo::function(declared, Some(entry)))
        }
        None => Ok(TypeInfo::function(inferred, Some(entry))),
    }
}

fn check_class(checker: &mut TypeChecker, id: NodeId) -> Result<(), Error> {
    let (entry, decorators, bases, body) = match checker.ast.kind(id) {
        NodeKind::ClassDef {
            entry,
            decorators,
            bases,
            body,
            ..
        } => (*entry, *decorators, *bases, *body),
        _ => return Ok(()),
    };

    for expr in checker
        .ast
        .children(decorators)
        .into_iter()
        .chain(checker.ast.children(bases))
    {
        type_check_expr(checker, expr)?;
    }

    checker.push_frame(id, FrameKind::Class(entry), entry)?;
    let result = type_check_stmt(checker, body);
    checker.pop_frame();
    result?;

    checker.set_type(id, TypeInfo::Class(entry));
    Ok(())
}

/// Types the caught exception, binds the `as` name and checks the body.
fn check_handler(checker: &mut TypeChecker, handler: NodeId) -> Result<Option<TypeInfo>, Error> {
    let (exception, name, body) = match checker.ast.kind(handler).clone() {
        NodeKind::ExceptHandler {
            exception,
            name,
            body,
        } => (exception, name, body),
        _ => return Ok(None),
    };

    let caught = match exception {
        Some(exception) => {
            let ty = type_check_expr(checker, exception)?;
            checker.instance_of(&ty)
        }
        None => TypeInfo::Unknown,
    };
    if let Some(name) = name {
        if let Some(Binding::Variable(entry)) = checker.resolve(&name) {
            checker.symbols.set_value(entry, caught.clone());
        }
    }
    checker.set_type(handler, caught);

    type_check_stmt(checker, body)
}
