//! Utility macros for the front end.
//!
//! - `MK_TOKEN!` - Creates a Token instance
//! - `MK_DEFAULT_HANDLER!` - Creates a default lexer handler for fixed-spelling tokens

/// Creates a Token instance, taking line and column from the span start.
///
/// # Arguments
///
/// * `$kind` - The TokenKind
/// * `$value` - The token's string value
/// * `$indent` - Indentation level of the token's line
/// * `$span` - The source span
#[macro_export]
macro_rules! MK_TOKEN {
    ($kind:expr, $value:expr, $indent:expr, $span:expr) => {{
        let span: $crate::Span = $span;
        Token {
            kind: $kind,
            value: $value,
            line: span.start.line,
            column: span.start.column,
            indent: $indent,
            span,
        }
    }};
}

/// Creates a default lexer handler for tokens with a fixed spelling.
///
/// The generated handler pushes a token of the given kind at the current
/// position and advances the lexer past it.
///
/// # Example
///
/// ```ignore
/// RegexPattern {
///     regex: Regex::new("^\\+").unwrap(),
///     handler: MK_DEFAULT_HANDLER!(TokenKind::Plus, "+"),
/// }
/// ```
#[macro_export]
macro_rules! MK_DEFAULT_HANDLER {
    ($kind:expr, $value:literal) => {
        |lexer: &mut Lexer, _regex: &Regex| -> Result<(), Error> {
            lexer.push_token($kind, String::from($value), $value.len());
            Ok(())
        }
    };
}
