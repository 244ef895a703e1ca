//! Parser implementation for building the Abstract Syntax Tree.
//!
//! This module contains the main Parser struct and the parse entry point.
//! Expressions use precedence climbing driven by NUD/LED lookup tables;
//! statements dispatch on their leading keyword. While parsing, every
//! declaration is entered into the symbol table under the scope that is
//! current at that point.
//!
//! It maintains lookup tables for:
//! - Statement handlers
//! - NUD (null denotation) handlers for prefix expressions
//! - LED (left denotation) handlers for infix expressions
//! - Binding powers for operator precedence

use std::{collections::HashMap, rc::Rc};

use crate::{
    ast::{
        ast::{Ast, AstNode, ChildList, NodeId, NodeKind},
        types::TypeInfo,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    symbol_table::symbol_table::{EntryId, Namespace, ScopeId, SymbolTable},
    Position, Span, MK_TOKEN,
};

use super::{
    lookups::{
        create_token_lookups, BPLookup, BindingPower, LEDHandler, LEDLookup, NUDHandler, NUDLookup,
        StmtHandler, StmtLookup,
    },
    stmt::parse_stmt,
};

/// Deepest nesting of expressions and statements the front end accepts.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Result of parsing one file: the tree, the populated symbol table and the
/// FILE node at its root.
#[derive(Debug)]
pub struct Module {
    pub ast: Ast,
    pub symbols: SymbolTable,
    pub root: NodeId,
    /// Number of source lines the token stream covered.
    pub lines: u32,
}

/// The main parser structure that maintains parsing state.
///
/// It owns the token stream with a cursor into it, the lookup tables, the
/// AST and symbol table under construction, and the current scope.
pub struct Parser {
    /// The list of tokens to parse; always ends with ENDFILE
    tokens: Vec<Token>,
    /// Current position in the token stream
    pos: usize,
    /// The name of the source file being parsed
    file: Rc<String>,
    /// Lookup table for statement parsing handlers
    stmt_lookup: StmtLookup,
    /// Lookup table for null denotation (prefix) expression handlers
    nud_lookup: NUDLookup,
    /// Lookup table for left denotation (infix) expression handlers
    led_lookup: LEDLookup,
    /// Lookup table for expression binding powers (precedence)
    binding_power_lookup: BPLookup,
    pub(crate) ast: Ast,
    pub(crate) symbols: SymbolTable,
    scope: ScopeId,
    /// Names a `global` or `nonlocal` statement rebinds to another scope.
    redirects: HashMap<(ScopeId, String), ScopeId>,
    /// Expressions and statements currently being parsed, innermost last.
    depth: usize,
}

impl Parser {
    /// Creates a new Parser instance.
    ///
    /// # Arguments
    ///
    /// * `tokens` - Vector of tokens to parse
    /// * `file` - Reference-counted string containing the source file name
    pub fn new(mut tokens: Vec<Token>, file: Rc<String>) -> Result<Self, Error> {
        if tokens.last().map(|token| token.kind) != Some(TokenKind::EndFile) {
            let end = tokens
                .last()
                .map(|token| token.span.end.clone())
                .unwrap_or_else(|| Position::new(0, 1, 1, Rc::clone(&file)));
            let span = Span {
                start: end.clone(),
                end,
            };
            tokens.push(MK_TOKEN!(TokenKind::EndFile, String::new(), 0, span));
        }

        let symbols = SymbolTable::new()
            .map_err(|error| Error::new(error, Position::new(0, 1, 1, Rc::clone(&file))))?;
        let scope = symbols.root();

        Ok(Parser {
            tokens,
            pos: 0,
            file,
            stmt_lookup: HashMap::new(),
            nud_lookup: HashMap::new(),
            led_lookup: HashMap::new(),
            binding_power_lookup: HashMap::new(),
            ast: Ast::new(),
            symbols,
            scope,
            redirects: HashMap::new(),
            depth: 0,
        })
    }

    /// Returns the current (lookahead) token without advancing.
    pub fn current_token(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Returns the kind of the current token.
    pub fn current_token_kind(&self) -> TokenKind {
        self.current_token().kind
    }

    /// Returns the most recently consumed token.
    pub fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    /// Kind of the token after the current one.
    pub fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|token| token.kind)
            .unwrap_or(TokenKind::EndFile)
    }

    /// Advances to the next token and returns the previous token.
    ///
    /// The cursor never moves past ENDFILE.
    pub fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    /// Expects a token of the specified kind, with optional custom error.
    pub fn expect_error(
        &mut self,
        expected_kind: TokenKind,
        error: Option<Error>,
    ) -> Result<Token, Error> {
        let token = self.current_token();
        if token.kind != expected_kind {
            return Err(error.unwrap_or_else(|| {
                Error::new(
                    ErrorImpl::UnexpectedToken {
                        expected: expected_kind,
                        found: token.kind,
                    },
                    token.span.start.clone(),
                )
            }));
        }
        Ok(self.advance().clone())
    }

    /// Expects a token of the specified kind with default error message.
    pub fn expect(&mut self, expected_kind: TokenKind) -> Result<Token, Error> {
        self.expect_error(expected_kind, None)
    }

    /// Consumes the current token if it is of `kind`.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.current_token_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Error for the current token with a description of what was expected.
    pub fn unexpected(&self, message: &str) -> Error {
        let token = self.current_token();
        let shown = if token.has_value() {
            token.value.clone()
        } else {
            token.kind.to_string()
        };
        Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: shown,
                message: String::from(message),
            },
            token.span.start.clone(),
        )
    }

    /// Checks if there are more tokens to parse.
    pub fn has_tokens(&self) -> bool {
        self.current_token_kind() != TokenKind::EndFile
    }

    /// Returns a reference to the statement lookup table.
    pub fn get_stmt_lookup(&self) -> &StmtLookup {
        &self.stmt_lookup
    }

    /// Returns a reference to the NUD (null denotation) lookup table.
    pub fn get_nud_lookup(&self) -> &NUDLookup {
        &self.nud_lookup
    }

    /// Returns a reference to the LED (left denotation) lookup table.
    pub fn get_led_lookup(&self) -> &LEDLookup {
        &self.led_lookup
    }

    /// Returns a reference to the binding power lookup table.
    pub fn get_bp_lookup(&self) -> &BPLookup {
        &self.binding_power_lookup
    }

    /// Registers a left denotation (infix) handler for a token.
    pub fn led(&mut self, kind: TokenKind, binding_power: BindingPower, led_fn: LEDHandler) {
        self.binding_power_lookup.insert(kind, binding_power);
        self.led_lookup.insert(kind, led_fn);
    }

    /// Registers a null denotation (prefix) handler for a token.
    pub fn nud(&mut self, kind: TokenKind, nud_fn: NUDHandler) {
        self.nud_lookup.insert(kind, nud_fn);
    }

    /// Registers a statement handler for a token.
    pub fn stmt(&mut self, kind: TokenKind, stmt_fn: StmtHandler) {
        self.stmt_lookup.insert(kind, stmt_fn);
    }

    /// Enters one level of expression or statement nesting.
    pub fn descend(&mut self) -> Result<(), Error> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Error::new(
                ErrorImpl::NestingTooDeep {
                    limit: MAX_NESTING_DEPTH,
                },
                self.get_position(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Returns the position of the current token.
    pub fn get_position(&self) -> Position {
        self.current_token().span.start.clone()
    }

    pub fn file(&self) -> &Rc<String> {
        &self.file
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Makes `scope` current and returns the scope it replaces.
    pub fn enter_scope(&mut self, scope: ScopeId) -> ScopeId {
        std::mem::replace(&mut self.scope, scope)
    }

    pub fn restore_scope(&mut self, scope: ScopeId) {
        self.scope = scope;
    }

    /// Allocates a node in the current scope.
    pub fn push_node(&mut self, token: Token, kind: NodeKind) -> Result<NodeId, Error> {
        let position = token.span.start.clone();
        self.ast
            .push(AstNode::new(token, kind, self.scope))
            .map_err(|error| Error::new(error, position))
    }

    pub fn push_child(&mut self, list: &mut ChildList, id: NodeId) {
        list.push(&mut self.ast, id);
    }

    pub fn node_kind(&self, id: NodeId) -> &NodeKind {
        self.ast.kind(id)
    }

    /// Enters `name` into `namespace` under `scope` unless it already exists
    /// there.
    pub fn declare_in(
        &mut self,
        namespace: Namespace,
        name: &str,
        scope: ScopeId,
        node: Option<NodeId>,
    ) -> Result<EntryId, Error> {
        if let Some(existing) = self.symbols.lookup(namespace, name, scope) {
            return Ok(existing);
        }
        let position = self.previous().span.start.clone();
        self.symbols
            .insert(namespace, name, scope, TypeInfo::Unknown, node)
            .map_err(|error| Error::new(error, position))
    }

    /// Declares a variable bound in the current scope, following any
    /// `global`/`nonlocal` redirect for the name.
    pub fn declare_variable(&mut self, name: &str, node: NodeId) -> Result<EntryId, Error> {
        let scope = self
            .redirects
            .get(&(self.scope, String::from(name)))
            .copied()
            .unwrap_or(self.scope);
        self.declare_in(Namespace::Variables, name, scope, Some(node))
    }

    /// Binds `name` in the current scope to the module scope.
    pub fn redirect_global(&mut self, name: &str) {
        let root = self.symbols.root();
        self.redirects.insert((self.scope, String::from(name)), root);
    }

    /// Binds `name` in the current scope to the nearest enclosing scope that
    /// declares it, or the immediately enclosing scope when none does.
    pub fn redirect_nonlocal(&mut self, name: &str) {
        let parent = self.symbols.entry(self.scope).scope;
        let mut current = parent;
        let mut target = parent;
        while let Some(scope) = current {
            if self.symbols.lookup(Namespace::Variables, name, scope).is_some() {
                target = Some(scope);
                break;
            }
            current = self.symbols.entry(scope).scope;
        }
        if let Some(target) = target {
            self.redirects.insert((self.scope, String::from(name)), target);
        }
    }

    /// Declares every plain name bound by an assignment target.
    pub fn declare_targets(&mut self, target: NodeId) -> Result<(), Error> {
        let node = self.ast.node(target);
        match &node.kind {
            NodeKind::Terminal if node.is_identifier() => {
                let name = node.token.value.clone();
                self.declare_variable(&name, target)?;
            }
            NodeKind::Tuple { elements } | NodeKind::List { elements } => {
                for element in self.ast.children(*elements) {
                    self.declare_targets(element)?;
                }
            }
            NodeKind::Starred { value, .. } => {
                let value = *value;
                self.declare_targets(value)?;
            }
            NodeKind::Attribute { .. } | NodeKind::Subscript { .. } => {}
            _ => {
                return Err(Error::new(
                    ErrorImpl::InvalidTarget {
                        target: self.ast.render(target),
                    },
                    node.token.span.start.clone(),
                ))
            }
        }
        Ok(())
    }
}

/// Parses a stream of tokens into an Abstract Syntax Tree.
///
/// This is the main entry point for parsing. It creates a parser instance,
/// initializes all lookup tables, and parses statements until ENDFILE.
pub fn parse(tokens: Vec<Token>, file: Rc<String>) -> Result<Module, Error> {
    let mut parser = Parser::new(tokens, file)?;
    create_token_lookups(&mut parser);

    let file_token = parser.expect(TokenKind::File)?;

    let mut body = ChildList::new();
    while parser.has_tokens() {
        let stmt = parse_stmt(&mut parser)?;
        parser.push_child(&mut body, stmt);
    }

    let lines = parser
        .tokens
        .iter()
        .filter(|token| {
            !token.is_one_of_many(&[TokenKind::File, TokenKind::EndFile, TokenKind::Dedent])
        })
        .map(|token| token.line)
        .max()
        .unwrap_or(0);
    let root = parser.push_node(file_token, NodeKind::File { body: body.first() })?;

    Ok(Module {
        ast: parser.ast,
        symbols: parser.symbols,
        root,
        lines,
    })
}
