//! Lexical analysis module for the front end.
//!
//! This module contains the lexer that converts source text into a stream
//! of tokens for the parser. It handles:
//!
//! - Tokenization using anchored regex patterns tried in order
//! - Case-insensitive recognition of keywords and boolean/none literals
//! - Integer, float, complex and string literals
//! - Implicit line joining inside brackets
//! - INDENT/DEDENT markers from leading whitespace
//! - Line/column tracking for error reporting

pub mod lexer;
pub mod tokens;
