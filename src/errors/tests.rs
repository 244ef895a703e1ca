//! Unit tests for error handling.
//!
//! This module contains tests for error types and error reporting.

use crate::errors::errors::{Error, ErrorImpl, ErrorPhase, ErrorTip};
use crate::lexer::tokens::TokenKind;
use crate::Position;
use std::rc::Rc;

fn position(offset: u32, line: u32, column: u32) -> Position {
    Position::new(offset, line, column, Rc::new("test.py".to_string()))
}

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "$".to_string(),
        },
        position(10, 2, 3),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.phase(), ErrorPhase::Lexical);
}

#[test]
fn test_error_position() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            expected: TokenKind::Colon,
            found: TokenKind::Newline,
        },
        position(42, 3, 9),
    );

    assert_eq!(error.get_position().offset, 42);
    assert_eq!(error.get_position().line, 3);
    assert_eq!(error.get_position().column, 9);
}

#[test]
fn test_error_display() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            expected: TokenKind::Colon,
            found: TokenKind::Newline,
        },
        position(8, 1, 9),
    );

    assert_eq!(
        error.to_string(),
        "syntax error at 1:9: unexpected token: expected Colon, found Newline"
    );
}

#[test]
fn test_type_mismatch_error() {
    let error = Error::new(
        ErrorImpl::TypeMatchError {
            expected: "int".to_string(),
            received: "str".to_string(),
        },
        position(0, 1, 1),
    );

    assert_eq!(error.get_error_name(), "TypeMatchError");
    assert_eq!(error.phase(), ErrorPhase::Type);
}

#[test]
fn test_context() {
    let error = Error::new(
        ErrorImpl::UnresolvedName {
            name: "foo".to_string(),
        },
        position(0, 1, 1),
    );
    assert_eq!(error.get_context(), None);

    let error = error.with_context("foo + 1".to_string());
    assert_eq!(error.get_context(), Some("foo + 1"));
}

#[test]
fn test_return_type_mismatch_names_function() {
    let error = Error::new(
        ErrorImpl::ReturnTypeMismatch {
            function: "Point.norm".to_string(),
            expected: "int".to_string(),
            received: "str".to_string(),
        },
        position(0, 1, 1),
    );

    assert_eq!(error.get_error_name(), "ReturnTypeMismatch");
    assert!(error.get_impl().to_string().contains("Point.norm"));
}

#[test]
fn test_internal_phase() {
    let error = Error::new(
        ErrorImpl::SubArenaOverflow { ceiling: 256 },
        position(0, 1, 1),
    );

    assert_eq!(error.phase(), ErrorPhase::Internal);
    assert_eq!(error.get_error_name(), "SubArenaOverflow");
}

#[test]
fn test_error_tip_none() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "$".to_string(),
        },
        position(0, 1, 1),
    );

    assert!(matches!(error.get_tip(), ErrorTip::None));
}

#[test]
fn test_error_tip_suggestion() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            expected: TokenKind::CloseParen,
            found: TokenKind::EndFile,
        },
        position(0, 1, 1),
    );

    match error.get_tip() {
        ErrorTip::Suggestion(tip) => assert_eq!(tip, "Expected `CloseParen`, found `EndFile`"),
        _ => panic!("Expected suggestion tip"),
    }
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}

#[test]
fn test_argument_errors() {
    let error = Error::new(
        ErrorImpl::UnexpectedArguments {
            expected: 2,
            received: 3,
        },
        position(0, 1, 1),
    );
    assert_eq!(error.get_error_name(), "UnexpectedArguments");

    let error = Error::new(
        ErrorImpl::MissingArguments {
            expected: 3,
            received: 1,
        },
        position(0, 1, 1),
    );
    assert_eq!(error.get_error_name(), "MissingArguments");
    match error.get_tip() {
        ErrorTip::Suggestion(tip) => assert_eq!(tip, "Expected at least 3 arguments, received 1"),
        _ => panic!("Expected suggestion tip"),
    }
}

#[test]
fn test_structural_syntax_errors() {
    let error = Error::new(
        ErrorImpl::DuplicateParameter {
            parameter: "x".to_string(),
        },
        position(10, 1, 14),
    );
    assert_eq!(error.get_error_name(), "DuplicateParameter");
    assert_eq!(error.phase(), ErrorPhase::Syntax);
    assert_eq!(error.to_string(), "syntax error at 1:14: duplicate parameter \"x\"");

    let error = Error::new(ErrorImpl::NestingTooDeep { limit: 100 }, position(0, 1, 1));
    assert_eq!(error.get_error_name(), "NestingTooDeep");
    match error.get_tip() {
        ErrorTip::Suggestion(tip) => {
            assert_eq!(tip, "Expressions and blocks nest at most 100 levels deep")
        }
        _ => panic!("Expected suggestion tip"),
    }
}
