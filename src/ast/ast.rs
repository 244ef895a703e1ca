use crate::{
    arena::arena::{Arena, Id},
    errors::errors::ErrorImpl,
    lexer::tokens::{Token, TokenKind},
    parser::lookups::BindingPower,
    symbol_table::symbol_table::{EntryId, ScopeId},
};

use super::types::TypeInfo;

pub type NodeId = Id<AstNode>;

/// Nesting depth past which [`Ast::render`] elides subtrees.
pub const MAX_RENDER_DEPTH: usize = 32;

/// Operators of binary, unary and comparison nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    MatMul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
    // Unary
    Not,
    Neg,
    Pos,
    Invert,
}

impl Operator {
    /// Binary operator spelled by a single token. `not in` and `is not` are
    /// two tokens and are built by the parser.
    pub fn binary(kind: TokenKind) -> Option<Operator> {
        let op = match kind {
            TokenKind::Plus | TokenKind::PlusEquals => Operator::Add,
            TokenKind::Minus | TokenKind::MinusEquals => Operator::Sub,
            TokenKind::Star | TokenKind::StarEquals => Operator::Mul,
            TokenKind::At => Operator::MatMul,
            TokenKind::Slash | TokenKind::SlashEquals => Operator::Div,
            TokenKind::DoubleSlash => Operator::FloorDiv,
            TokenKind::Percent => Operator::Mod,
            TokenKind::DoubleStar => Operator::Pow,
            TokenKind::ShiftLeft => Operator::LShift,
            TokenKind::ShiftRight => Operator::RShift,
            TokenKind::Ampersand => Operator::BitAnd,
            TokenKind::Pipe => Operator::BitOr,
            TokenKind::Caret => Operator::BitXor,
            TokenKind::And => Operator::And,
            TokenKind::Or => Operator::Or,
            TokenKind::Equals => Operator::Eq,
            TokenKind::NotEquals => Operator::NotEq,
            TokenKind::Less => Operator::Lt,
            TokenKind::LessEquals => Operator::LtE,
            TokenKind::Greater => Operator::Gt,
            TokenKind::GreaterEquals => Operator::GtE,
            TokenKind::In => Operator::In,
            TokenKind::Is => Operator::Is,
            _ => return None,
        };
        Some(op)
    }

    pub fn unary(kind: TokenKind) -> Option<Operator> {
        match kind {
            TokenKind::Not => Some(Operator::Not),
            TokenKind::Minus => Some(Operator::Neg),
            TokenKind::Plus => Some(Operator::Pos),
            TokenKind::Tilde => Some(Operator::Invert),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add | Operator::Pos => "+",
            Operator::Sub | Operator::Neg => "-",
            Operator::Mul => "*",
            Operator::MatMul => "@",
            Operator::Div => "/",
            Operator::FloorDiv => "//",
            Operator::Mod => "%",
            Operator::Pow => "**",
            Operator::LShift => "<<",
            Operator::RShift => ">>",
            Operator::BitAnd => "&",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtE => "<=",
            Operator::Gt => ">",
            Operator::GtE => ">=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Is => "is",
            Operator::IsNot => "is not",
            Operator::Not => "not",
            Operator::Invert => "~",
        }
    }

    /// Canonical precedence class; `-` shares `+`'s, `//` and `%` share `*`'s.
    pub fn binding_power(self) -> BindingPower {
        match self {
            Operator::Or => BindingPower::Or,
            Operator::And => BindingPower::And,
            Operator::Not => BindingPower::Not,
            Operator::Eq
            | Operator::NotEq
            | Operator::Lt
            | Operator::LtE
            | Operator::Gt
            | Operator::GtE
            | Operator::In
            | Operator::NotIn
            | Operator::Is
            | Operator::IsNot => BindingPower::Comparison,
            Operator::BitOr => BindingPower::BitOr,
            Operator::BitXor => BindingPower::BitXor,
            Operator::BitAnd => BindingPower::BitAnd,
            Operator::LShift | Operator::RShift => BindingPower::Shift,
            Operator::Add | Operator::Sub => BindingPower::Additive,
            Operator::Mul
            | Operator::MatMul
            | Operator::Div
            | Operator::FloorDiv
            | Operator::Mod => BindingPower::Multiplicative,
            Operator::Neg | Operator::Pos | Operator::Invert => BindingPower::Unary,
            Operator::Pow => BindingPower::Power,
        }
    }

    pub fn is_comparison(self) -> bool {
        self.binding_power() == BindingPower::Comparison
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Normal,
    /// `*args`
    Star,
    /// `**kwargs`
    DoubleStar,
    /// A bare `*`: the parameters after it are keyword-only.
    Separator,
}

/// Node payloads. `Option<NodeId>` fields named in the plural hold the first
/// node of a sibling chain.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    File {
        body: Option<NodeId>,
    },
    Block {
        body: Option<NodeId>,
    },
    /// Literal, identifier or `...`; the token says which.
    Terminal,
    Binary {
        op: Operator,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        op: Operator,
        operand: NodeId,
    },
    /// Chained comparison `a < b <= c`: one operator between each pair of
    /// operands.
    Nary {
        operators: Vec<Operator>,
        operands: NodeId,
    },
    Assign {
        targets: NodeId,
        value: NodeId,
    },
    AugAssign {
        op: Operator,
        target: NodeId,
        value: NodeId,
    },
    Decl {
        target: NodeId,
        annotation: NodeId,
        value: Option<NodeId>,
    },
    If {
        condition: NodeId,
        body: NodeId,
        or_else: Option<NodeId>,
    },
    Elif {
        condition: NodeId,
        body: NodeId,
        or_else: Option<NodeId>,
    },
    Else {
        body: NodeId,
    },
    While {
        condition: NodeId,
        body: NodeId,
        or_else: Option<NodeId>,
    },
    For {
        target: NodeId,
        iter: NodeId,
        body: NodeId,
        or_else: Option<NodeId>,
    },
    /// Comprehension clause `for target in iter if c1 if c2`.
    ForIf {
        target: NodeId,
        iter: NodeId,
        conditions: Option<NodeId>,
    },
    FunctionDef {
        name: String,
        entry: EntryId,
        decorators: Option<NodeId>,
        params: Option<NodeId>,
        returns: Option<NodeId>,
        body: NodeId,
    },
    ClassDef {
        name: String,
        entry: EntryId,
        decorators: Option<NodeId>,
        bases: Option<NodeId>,
        body: NodeId,
    },
    Param {
        name: String,
        kind: ParamKind,
        annotation: Option<NodeId>,
        default: Option<NodeId>,
        entry: Option<EntryId>,
    },
    Call {
        callee: NodeId,
        args: Option<NodeId>,
    },
    KeywordArg {
        name: String,
        value: NodeId,
    },
    Subscript {
        value: NodeId,
        index: NodeId,
    },
    Slice {
        lower: Option<NodeId>,
        upper: Option<NodeId>,
        step: Option<NodeId>,
    },
    Attribute {
        value: NodeId,
        attr: String,
    },
    Try {
        body: NodeId,
        handlers: Option<NodeId>,
        or_else: Option<NodeId>,
        finally: Option<NodeId>,
    },
    ExceptHandler {
        exception: Option<NodeId>,
        name: Option<String>,
        body: NodeId,
    },
    With {
        items: NodeId,
        body: NodeId,
    },
    WithItem {
        context: NodeId,
        target: Option<NodeId>,
    },
    /// `*value`, or `**value` when `double`.
    Starred {
        value: NodeId,
        double: bool,
    },
    KeyValue {
        key: NodeId,
        value: NodeId,
    },
    Import {
        names: NodeId,
    },
    /// `names` is absent for `from module import *`.
    ImportFrom {
        module: String,
        names: Option<NodeId>,
    },
    Alias {
        name: String,
        asname: Option<String>,
    },
    Raise {
        exception: Option<NodeId>,
        cause: Option<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Yield {
        value: Option<NodeId>,
    },
    Global {
        names: Vec<String>,
    },
    Nonlocal {
        names: Vec<String>,
    },
    Assert {
        test: NodeId,
        msg: Option<NodeId>,
    },
    Del {
        targets: NodeId,
    },
    Pass,
    Break,
    Continue,
    /// `body if condition else or_else`
    Conditional {
        condition: NodeId,
        body: NodeId,
        or_else: NodeId,
    },
    NamedExpr {
        target: NodeId,
        value: NodeId,
    },
    Generator {
        element: NodeId,
        clauses: NodeId,
    },
    List {
        elements: Option<NodeId>,
    },
    ListComp {
        element: NodeId,
        clauses: NodeId,
    },
    Set {
        elements: NodeId,
    },
    SetComp {
        element: NodeId,
        clauses: NodeId,
    },
    /// Entries are `KeyValue` or `**mapping` starred nodes.
    Dict {
        entries: Option<NodeId>,
    },
    DictComp {
        entry: NodeId,
        clauses: NodeId,
    },
    Tuple {
        elements: Option<NodeId>,
    },
}

#[derive(Debug, Clone)]
pub struct AstNode {
    pub token: Token,
    pub kind: NodeKind,
    pub type_info: TypeInfo,
    /// Next sibling in the chain this node belongs to.
    pub next: Option<NodeId>,
    /// Scope active when the node was parsed.
    pub scope: ScopeId,
    pub parenthesized: bool,
}

impl AstNode {
    pub fn new(token: Token, kind: NodeKind, scope: ScopeId) -> Self {
        AstNode {
            token,
            kind,
            type_info: TypeInfo::Unknown,
            next: None,
            scope,
            parenthesized: false,
        }
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal) && self.token.kind == TokenKind::Identifier
    }
}

/// Owner of every node of one compilation.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Arena<AstNode>,
}

impl Ast {
    pub fn new() -> Self {
        Ast {
            nodes: Arena::new(),
        }
    }

    pub fn push(&mut self, node: AstNode) -> Result<NodeId, ErrorImpl> {
        self.nodes.alloc(node)
    }

    pub fn node(&self, id: NodeId) -> &AstNode {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut AstNode {
        self.nodes.get_mut(id)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes.get(id).kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &AstNode)> {
        self.nodes.iter()
    }

    /// Ids of the sibling chain starting at `first`.
    pub fn children(&self, first: Option<NodeId>) -> Vec<NodeId> {
        let mut children = vec![];
        let mut current = first;
        while let Some(id) = current {
            children.push(id);
            current = self.nodes.get(id).next;
        }
        children
    }

    /// Precedence class of the operator at the root of `id`.
    pub fn precedence_of(&self, id: NodeId) -> BindingPower {
        let node = self.node(id);
        if node.parenthesized {
            return BindingPower::Primary;
        }
        match &node.kind {
            NodeKind::Binary { op, .. } | NodeKind::Unary { op, .. } => op.binding_power(),
            NodeKind::Nary { .. } => BindingPower::Comparison,
            NodeKind::Conditional { .. } => BindingPower::Conditional,
            NodeKind::NamedExpr { .. } => BindingPower::Walrus,
            NodeKind::Call { .. } | NodeKind::Subscript { .. } => BindingPower::Call,
            NodeKind::Attribute { .. } => BindingPower::Member,
            _ => BindingPower::Primary,
        }
    }

    fn join(&self, first: Option<NodeId>, separator: &str, depth: usize) -> String {
        self.children(first)
            .into_iter()
            .map(|child| self.render_at(child, depth))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn render_opt(&self, id: Option<NodeId>, depth: usize) -> String {
        id.map(|id| self.render_at(id, depth)).unwrap_or_default()
    }

    fn render_clauses(&self, clauses: NodeId, depth: usize) -> String {
        self.join(Some(clauses), " ", depth)
    }

    /// One-line, source-like rendering of the subtree at `id`.
    ///
    /// Statements render their header only (`def f(x: int) -> str`,
    /// `while x > 0`, ...).
    pub fn render(&self, id: NodeId) -> String {
        self.render_at(id, 0)
    }

    /// Subtrees below [`MAX_RENDER_DEPTH`] render as `...`.
    fn render_at(&self, id: NodeId, depth: usize) -> String {
        if depth > MAX_RENDER_DEPTH {
            return String::from("...");
        }
        let depth = depth + 1;
        let node = self.node(id);
        let text = match &node.kind {
            NodeKind::File { .. } => String::from("<file>"),
            NodeKind::Block { .. } => String::from("<block>"),
            NodeKind::Terminal => match node.token.kind {
                TokenKind::String => format!("{:?}", node.token.value),
                TokenKind::Ellipsis => String::from("..."),
                _ if node.token.has_value() => node.token.value.clone(),
                kind => String::from(kind.symbol()),
            },
            NodeKind::Binary { op, left, right } => {
                format!("{} {} {}", self.render_at(*left, depth), op.symbol(), self.render_at(*right, depth))
            }
            NodeKind::Unary { op, operand } => match op {
                Operator::Not => format!("not {}", self.render_at(*operand, depth)),
                op => format!("{}{}", op.symbol(), self.render_at(*operand, depth)),
            },
            NodeKind::Nary {
                operators,
                operands,
            } => {
                let mut text = String::new();
                for (index, operand) in self.children(Some(*operands)).into_iter().enumerate() {
                    if index > 0 {
                        if let Some(op) = operators.get(index - 1) {
                            text.push_str(&format!(" {} ", op.symbol()));
                        }
                    }
                    text.push_str(&self.render_at(operand, depth));
                }
                text
            }
            NodeKind::Assign { targets, value } => {
                format!("{} = {}", self.join(Some(*targets), " = ", depth), self.render_at(*value, depth))
            }
            NodeKind::AugAssign { op, target, value } => format!(
                "{} {}= {}",
                self.render_at(*target, depth),
                op.symbol(),
                self.render_at(*value, depth)
            ),
            NodeKind::Decl {
                target,
                annotation,
                value,
            } => match value {
                Some(value) => format!(
                    "{}: {} = {}",
                    self.render_at(*target, depth),
                    self.render_at(*annotation, depth),
                    self.render_at(*value, depth)
                ),
                None => format!("{}: {}", self.render_at(*target, depth), self.render_at(*annotation, depth)),
            },
            NodeKind::If { condition, .. } => format!("if {}", self.render_at(*condition, depth)),
            NodeKind::Elif { condition, .. } => format!("elif {}", self.render_at(*condition, depth)),
            NodeKind::Else { .. } => String::from("else"),
            NodeKind::While { condition, .. } => format!("while {}", self.render_at(*condition, depth)),
            NodeKind::For { target, iter, .. } | NodeKind::ForIf { target, iter, .. } => {
                let mut text = format!("for {} in {}", self.render_at(*target, depth), self.render_at(*iter, depth));
                if let NodeKind::ForIf { conditions, .. } = &node.kind {
                    for condition in self.children(*conditions) {
                        text.push_str(&format!(" if {}", self.render_at(condition, depth)));
                    }
                }
                text
            }
            NodeKind::FunctionDef {
                name,
                params,
                returns,
                ..
            } => match returns {
                Some(returns) => format!(
                    "def {}({}) -> {}",
                    name,
                    self.join(*params, ", ", depth),
                    self.render_at(*returns, depth)
                ),
                None => format!("def {}({})", name, self.join(*params, ", ", depth)),
            },
            NodeKind::ClassDef { name, bases, .. } => match bases {
                Some(_) => format!("class {}({})", name, self.join(*bases, ", ", depth)),
                None => format!("class {}", name),
            },
            NodeKind::Param {
                name,
                kind,
                annotation,
                default,
                ..
            } => {
                let mut text = match kind {
                    ParamKind::Normal => name.clone(),
                    ParamKind::Star => format!("*{}", name),
                    ParamKind::DoubleStar => format!("**{}", name),
                    ParamKind::Separator => String::from("*"),
                };
                if let Some(annotation) = annotation {
                    text.push_str(&format!(": {}", self.render_at(*annotation, depth)));
                }
                if let Some(default) = default {
                    text.push_str(&format!(" = {}", self.render_at(*default, depth)));
                }
                text
            }
            NodeKind::Call { callee, args } => {
                format!("{}({})", self.render_at(*callee, depth), self.join(*args, ", ", depth))
            }
            NodeKind::KeywordArg { name, value } => format!("{}={}", name, self.render_at(*value, depth)),
            NodeKind::Subscript { value, index } => {
                format!("{}[{}]", self.render_at(*value, depth), self.render_at(*index, depth))
            }
            NodeKind::Slice { lower, upper, step } => match step {
                Some(step) => format!(
                    "{}:{}:{}",
                    self.render_opt(*lower, depth),
                    self.render_opt(*upper, depth),
                    self.render_at(*step, depth)
                ),
                None => format!("{}:{}", self.render_opt(*lower, depth), self.render_opt(*upper, depth)),
            },
            NodeKind::Attribute { value, attr } => format!("{}.{}", self.render_at(*value, depth), attr),
            NodeKind::Try { .. } => String::from("try"),
            NodeKind::ExceptHandler {
                exception, name, ..
            } => match (exception, name) {
                (Some(exception), Some(name)) => {
                    format!("except {} as {}", self.render_at(*exception, depth), name)
                }
                (Some(exception), None) => format!("except {}", self.render_at(*exception, depth)),
                _ => String::from("except"),
            },
            NodeKind::With { items, .. } => format!("with {}", self.join(Some(*items), ", ", depth)),
            NodeKind::WithItem { context, target } => match target {
                Some(target) => format!("{} as {}", self.render_at(*context, depth), self.render_at(*target, depth)),
                None => self.render_at(*context, depth),
            },
            NodeKind::Starred { value, double } => {
                let stars = if *double { "**" } else { "*" };
                format!("{}{}", stars, self.render_at(*value, depth))
            }
            NodeKind::KeyValue { key, value } => {
                format!("{}: {}", self.render_at(*key, depth), self.render_at(*value, depth))
            }
            NodeKind::Import { names } => format!("import {}", self.join(Some(*names), ", ", depth)),
            NodeKind::ImportFrom { module, names } => match names {
                Some(_) => format!("from {} import {}", module, self.join(*names, ", ", depth)),
                None => format!("from {} import *", module),
            },
            NodeKind::Alias { name, asname } => match asname {
                Some(asname) => format!("{} as {}", name, asname),
                None => name.clone(),
            },
            NodeKind::Raise { exception, cause } => match (exception, cause) {
                (Some(exception), Some(cause)) => {
                    format!("raise {} from {}", self.render_at(*exception, depth), self.render_at(*cause, depth))
                }
                (Some(exception), None) => format!("raise {}", self.render_at(*exception, depth)),
                _ => String::from("raise"),
            },
            NodeKind::Return { value } => match value {
                Some(value) => format!("return {}", self.render_at(*value, depth)),
                None => String::from("return"),
            },
            NodeKind::Yield { value } => match value {
                Some(value) => format!("yield {}", self.render_at(*value, depth)),
                None => String::from("yield"),
            },
            NodeKind::Global { names } => format!("global {}", names.join(", ")),
            NodeKind::Nonlocal { names } => format!("nonlocal {}", names.join(", ")),
            NodeKind::Assert { test, msg } => match msg {
                Some(msg) => format!("assert {}, {}", self.render_at(*test, depth), self.render_at(*msg, depth)),
                None => format!("assert {}", self.render_at(*test, depth)),
            },
            NodeKind::Del { targets } => format!("del {}", self.join(Some(*targets), ", ", depth)),
            NodeKind::Pass => String::from("pass"),
            NodeKind::Break => String::from("break"),
            NodeKind::Continue => String::from("continue"),
            NodeKind::Conditional {
                condition,
                body,
                or_else,
            } => format!(
                "{} if {} else {}",
                self.render_at(*body, depth),
                self.render_at(*condition, depth),
                self.render_at(*or_else, depth)
            ),
            NodeKind::NamedExpr { target, value } => {
                format!("{} := {}", self.render_at(*target, depth), self.render_at(*value, depth))
            }
            NodeKind::Generator { element, clauses } => format!(
                "{} {}",
                self.render_at(*element, depth),
                self.render_clauses(*clauses, depth)
            ),
            NodeKind::List { elements } => format!("[{}]", self.join(*elements, ", ", depth)),
            NodeKind::ListComp { element, clauses } => format!(
                "[{} {}]",
                self.render_at(*element, depth),
                self.render_clauses(*clauses, depth)
            ),
            NodeKind::Set { elements } => format!("{{{}}}", self.join(Some(*elements), ", ", depth)),
            NodeKind::SetComp { element, clauses } => format!(
                "{{{} {}}}",
                self.render_at(*element, depth),
                self.render_clauses(*clauses, depth)
            ),
            NodeKind::Dict { entries } => format!("{{{}}}", self.join(*entries, ", ", depth)),
            NodeKind::DictComp { entry, clauses } => format!(
                "{{{} {}}}",
                self.render_at(*entry, depth),
                self.render_clauses(*clauses, depth)
            ),
            NodeKind::Tuple { elements } => {
                let children = self.children(*elements);
                if children.len() == 1 {
                    format!("{},", self.render_at(children[0], depth))
                } else {
                    self.join(*elements, ", ", depth)
                }
            }
        };

        let wrap = node.parenthesized || matches!(node.kind, NodeKind::Generator { .. });
        if wrap {
            format!("({})", text)
        } else {
            text
        }
    }
}

/// Builder for a sibling chain with O(1) appends.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChildList {
    first: Option<NodeId>,
    last: Option<NodeId>,
    len: usize,
}

impl ChildList {
    pub fn new() -> Self {
        ChildList::default()
    }

    pub fn push(&mut self, ast: &mut Ast, id: NodeId) {
        match self.last {
            Some(last) => ast.node_mut(last).next = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
        self.len += 1;
    }

    pub fn first(&self) -> Option<NodeId> {
        self.first
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
