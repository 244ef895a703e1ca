use std::fmt::Display;

use thiserror::Error;

use crate::{lexer::tokens::TokenKind, Position};

/// Compilation phase an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    Lexical,
    Syntax,
    Type,
    Internal,
}

impl Display for ErrorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPhase::Lexical => write!(f, "lexical error"),
            ErrorPhase::Syntax => write!(f, "syntax error"),
            ErrorPhase::Type => write!(f, "type error"),
            ErrorPhase::Internal => write!(f, "internal error"),
        }
    }
}

/// A fatal compilation error.
///
/// The first error raised by any stage ends the compilation; it carries
/// the position of the offending token and, for type errors, a rendering
/// of the offending subtree.
#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
    context: Option<String>,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
            context: None,
        }
    }

    /// Attaches a rendering of the source construct that caused the error.
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn phase(&self) -> ErrorPhase {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. }
            | ErrorImpl::UnterminatedString
            | ErrorImpl::TokenTooLong { .. }
            | ErrorImpl::InconsistentIndentation { .. } => ErrorPhase::Lexical,
            ErrorImpl::UnexpectedToken { .. }
            | ErrorImpl::UnexpectedTokenDetailed { .. }
            | ErrorImpl::NumberParseError { .. }
            | ErrorImpl::MultipleStarParameters
            | ErrorImpl::ParameterAfterKwargs { .. }
            | ErrorImpl::DuplicateParameter { .. }
            | ErrorImpl::InvalidTarget { .. }
            | ErrorImpl::NestingTooDeep { .. } => ErrorPhase::Syntax,
            ErrorImpl::ArenaExhausted { .. } | ErrorImpl::SubArenaOverflow { .. } => {
                ErrorPhase::Internal
            }
            _ => ErrorPhase::Type,
        }
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnterminatedString => "UnterminatedString",
            ErrorImpl::TokenTooLong { .. } => "TokenTooLong",
            ErrorImpl::InconsistentIndentation { .. } => "InconsistentIndentation",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::MultipleStarParameters => "MultipleStarParameters",
            ErrorImpl::ParameterAfterKwargs { .. } => "ParameterAfterKwargs",
            ErrorImpl::DuplicateParameter { .. } => "DuplicateParameter",
            ErrorImpl::NestingTooDeep { .. } => "NestingTooDeep",
            ErrorImpl::InvalidTarget { .. } => "InvalidTarget",
            ErrorImpl::TypeMatchError { .. } => "TypeMatchError",
            ErrorImpl::OperandTypeError { .. } => "OperandTypeError",
            ErrorImpl::UnaryOperandError { .. } => "UnaryOperandError",
            ErrorImpl::InconsistentReturnTypes { .. } => "InconsistentReturnTypes",
            ErrorImpl::ReturnTypeMismatch { .. } => "ReturnTypeMismatch",
            ErrorImpl::ReturnOutsideFunction => "ReturnOutsideFunction",
            ErrorImpl::UnresolvedName { .. } => "UnresolvedName",
            ErrorImpl::UnresolvedAttribute { .. } => "UnresolvedAttribute",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::NotCallable { .. } => "NotCallable",
            ErrorImpl::NotSubscriptable { .. } => "NotSubscriptable",
            ErrorImpl::NotIterable { .. } => "NotIterable",
            ErrorImpl::UnexpectedArguments { .. } => "UnexpectedArguments",
            ErrorImpl::MissingArguments { .. } => "MissingArguments",
            ErrorImpl::UnknownKeywordArgument { .. } => "UnknownKeywordArgument",
            ErrorImpl::ArgumentTypeMatchError { .. } => "ArgumentTypeMatchError",
            ErrorImpl::ArenaExhausted { .. } => "ArenaExhausted",
            ErrorImpl::SubArenaOverflow { .. } => "SubArenaOverflow",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnterminatedString => ErrorTip::Suggestion(String::from(
                "String literal is missing its closing quote",
            )),
            ErrorImpl::TokenTooLong { length, max } => ErrorTip::Suggestion(format!(
                "Token is {} characters long, the limit is {}",
                length, max
            )),
            ErrorImpl::InconsistentIndentation { width } => ErrorTip::Suggestion(format!(
                "Indentation of {} columns does not match any enclosing block",
                width
            )),
            ErrorImpl::UnexpectedToken { expected, found } => ErrorTip::Suggestion(format!(
                "Expected `{}`, found `{}`",
                expected, found
            )),
            ErrorImpl::UnexpectedTokenDetailed { token, message } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`, {}", token, message))
            }
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Number `{}` is too large to represent",
                token
            )),
            ErrorImpl::MultipleStarParameters => ErrorTip::Suggestion(String::from(
                "Only one `*` parameter is allowed per function",
            )),
            ErrorImpl::ParameterAfterKwargs { parameter } => ErrorTip::Suggestion(format!(
                "Parameter `{}` follows the `**` parameter",
                parameter
            )),
            ErrorImpl::DuplicateParameter { parameter } => ErrorTip::Suggestion(format!(
                "Parameter `{}` appears more than once",
                parameter
            )),
            ErrorImpl::NestingTooDeep { limit } => ErrorTip::Suggestion(format!(
                "Expressions and blocks nest at most {} levels deep",
                limit
            )),
            ErrorImpl::InvalidTarget { target } => {
                ErrorTip::Suggestion(format!("Cannot assign to `{}`", target))
            }
            ErrorImpl::TypeMatchError { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::OperandTypeError {
                operator,
                left,
                right,
            } => ErrorTip::Suggestion(format!(
                "Operator `{}` cannot be applied to `{}` and `{}`",
                operator, left, right
            )),
            ErrorImpl::UnaryOperandError { operator, operand } => ErrorTip::Suggestion(
                format!("Operator `{}` cannot be applied to `{}`", operator, operand),
            ),
            ErrorImpl::InconsistentReturnTypes { first, second } => ErrorTip::Suggestion(
                format!("Block returns both `{}` and `{}`", first, second),
            ),
            ErrorImpl::ReturnTypeMismatch {
                function,
                expected,
                received,
            } => ErrorTip::Suggestion(format!(
                "Function `{}` is annotated to return `{}` but returns `{}`",
                function, expected, received
            )),
            ErrorImpl::ReturnOutsideFunction => {
                ErrorTip::Suggestion(String::from("`return` used outside of a function"))
            }
            ErrorImpl::UnresolvedName { name } => {
                ErrorTip::Suggestion(format!("Name `{}` is not defined", name))
            }
            ErrorImpl::UnresolvedAttribute { attribute, base } => ErrorTip::Suggestion(
                format!("`{}` has no attribute `{}`", base, attribute),
            ),
            ErrorImpl::UnknownType { type_ } => {
                ErrorTip::Suggestion(format!("Unknown type `{}` found", type_))
            }
            ErrorImpl::NotCallable { type_ } => {
                ErrorTip::Suggestion(format!("Values of type `{}` cannot be called", type_))
            }
            ErrorImpl::NotSubscriptable { type_ } => ErrorTip::Suggestion(format!(
                "Values of type `{}` cannot be subscripted",
                type_
            )),
            ErrorImpl::NotIterable { type_ } => {
                ErrorTip::Suggestion(format!("Values of type `{}` cannot be iterated", type_))
            }
            ErrorImpl::UnexpectedArguments { expected, received } => ErrorTip::Suggestion(
                format!("Expected at most {} arguments, received {}", expected, received),
            ),
            ErrorImpl::MissingArguments { expected, received } => ErrorTip::Suggestion(
                format!("Expected at least {} arguments, received {}", expected, received),
            ),
            ErrorImpl::UnknownKeywordArgument { name } => {
                ErrorTip::Suggestion(format!("No parameter named `{}`", name))
            }
            ErrorImpl::ArgumentTypeMatchError { expected, received } => {
                ErrorTip::Suggestion(format!(
                    "Expected argument type `{}`, received `{}`",
                    expected, received
                ))
            }
            ErrorImpl::ArenaExhausted { capacity } => ErrorTip::Suggestion(format!(
                "Arena reserve of {} elements exhausted",
                capacity
            )),
            ErrorImpl::SubArenaOverflow { ceiling } => ErrorTip::Suggestion(format!(
                "Nesting deeper than {} scopes",
                ceiling
            )),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}: {}",
            self.phase(),
            self.position.line,
            self.position.column,
            self.internal_error
        )
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    // Lexical
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("token of length {length} exceeds the limit of {max}")]
    TokenTooLong { length: usize, max: usize },
    #[error("indentation of {width} columns does not match any outer level")]
    InconsistentIndentation { width: u32 },

    // Syntax
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: TokenKind, found: TokenKind },
    #[error("unexpected token ({message:?}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("more than one star parameter")]
    MultipleStarParameters,
    #[error("parameter {parameter:?} after the keyword parameter collector")]
    ParameterAfterKwargs { parameter: String },
    #[error("duplicate parameter {parameter:?}")]
    DuplicateParameter { parameter: String },
    #[error("nesting exceeds {limit} levels")]
    NestingTooDeep { limit: usize },
    #[error("invalid assignment target {target:?}")]
    InvalidTarget { target: String },

    // Type
    #[error("types do not match: expected {expected}, received {received}")]
    TypeMatchError { expected: String, received: String },
    #[error("unsupported operand types for {operator}: {left} and {right}")]
    OperandTypeError {
        operator: String,
        left: String,
        right: String,
    },
    #[error("unsupported operand type for {operator}: {operand}")]
    UnaryOperandError { operator: String, operand: String },
    #[error("inconsistent return types: {first} and {second}")]
    InconsistentReturnTypes { first: String, second: String },
    #[error("function {function:?} returns {received}, annotated {expected}")]
    ReturnTypeMismatch {
        function: String,
        expected: String,
        received: String,
    },
    #[error("return outside of a function")]
    ReturnOutsideFunction,
    #[error("name {name:?} is not defined")]
    UnresolvedName { name: String },
    #[error("{base} has no attribute {attribute:?}")]
    UnresolvedAttribute { attribute: String, base: String },
    #[error("unknown type {type_} found")]
    UnknownType { type_: String },
    #[error("{type_} is not callable")]
    NotCallable { type_: String },
    #[error("{type_} is not subscriptable")]
    NotSubscriptable { type_: String },
    #[error("{type_} is not iterable")]
    NotIterable { type_: String },
    #[error("unexpected arguments: expected {expected:?}, received {received:?}")]
    UnexpectedArguments { expected: usize, received: usize },
    #[error("missing arguments: expected {expected:?}, received {received:?}")]
    MissingArguments { expected: usize, received: usize },
    #[error("unknown keyword argument {name:?}")]
    UnknownKeywordArgument { name: String },
    #[error("argument types do not match: expected {expected}, received {received}")]
    ArgumentTypeMatchError { expected: String, received: String },

    // Internal
    #[error("arena exhausted its reserve of {capacity} elements")]
    ArenaExhausted { capacity: usize },
    #[error("sub-arena exceeded its ceiling of {ceiling} elements")]
    SubArenaOverflow { ceiling: usize },
}
