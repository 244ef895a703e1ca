#![allow(clippy::module_inception)]

use std::{path::Path, rc::Rc};

use crate::{
    errors::errors::{Error, ErrorTip},
    lexer::lexer::tokenize,
    parser::parser::{parse, Module},
    type_checker::type_checker::type_check,
};

pub mod arena;
pub mod ast;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod symbol_table;
pub mod type_checker;

extern crate regex;

/// A location in a source file: byte offset plus 1-based line and column.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
    pub file: Rc<String>,
}

impl Position {
    pub fn new(offset: u32, line: u32, column: u32, file: Rc<String>) -> Self {
        Position {
            offset,
            line,
            column,
            file,
        }
    }

    pub fn null() -> Self {
        Position::new(0, 0, 0, Rc::new(String::from("<null>")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Runs the whole front end over `source`: tokenize, parse, type check.
///
/// Returns the type-annotated module, or the first error of any stage.
pub fn compile_source(source: &str, file: &str) -> Result<Module, Error> {
    let file = Rc::new(String::from(file));
    let tokens = tokenize(source, Rc::clone(&file))?;
    let mut module = parse(tokens, file)?;
    type_check(&mut module)?;
    Ok(module)
}

/// Returns the 1-based line number, the text of the line and the byte
/// offset of `position` inside that line.
pub fn get_line_at_position(source: &str, position: u32) -> (usize, String, usize) {
    let pos = (position as usize).min(source.len());

    let mut start = 0;
    let mut line_number = 1;

    for line in source.split_inclusive('\n') {
        let end = start + line.len();

        if (start..end).contains(&pos) {
            return (line_number, line.to_string(), pos - start);
        }

        start = end;
        line_number += 1;
    }

    // Position at the very end of the input.
    if source.is_empty() || source.ends_with('\n') {
        return (line_number, String::new(), 0);
    }
    let last = source.rsplit('\n').next().unwrap_or("");
    (line_number - 1, last.to_string(), last.len())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_get_line_at_position() {
        let source = "Hello, world!\nsecond\n\nTesting { }\n";
        let (line_number, line, line_pos) = super::get_line_at_position(source, 10);
        assert_eq!(line_number, 1);
        assert_eq!(line, "Hello, world!\n");
        assert_eq!(line_pos, 10);

        let (line_number, line, line_pos) = super::get_line_at_position(source, 30);
        assert_eq!(line_number, 4);
        assert_eq!(line, "Testing { }\n");
        assert_eq!(line_pos, 8);
    }

    #[test]
    fn test_get_line_past_end() {
        let (line_number, line, line_pos) = super::get_line_at_position("x = 1", 5);
        assert_eq!(line_number, 1);
        assert_eq!(line, "x = 1");
        assert_eq!(line_pos, 5);
    }
}

/// Renders an error the way the binary reports it.
///
/// ```text
/// Error: UnexpectedToken (Expected `Colon`, found `Newline`)
/// -> main.py:3:10
///   |
/// 3 | if x > 0
///   | --------^
/// ```
pub fn format_error(error: &Error, source: &str, file: &Path) -> String {
    let position = error.get_position();
    let (line, line_text, line_pos) = get_line_at_position(source, position.offset);

    let line_string = line.to_string();
    let padding = line_string.len() + 2;
    let mut out = String::new();

    if let ErrorTip::None = error.get_tip() {
        out.push_str(&format!("Error: {}\n", error.get_error_name()));
    } else {
        out.push_str(&format!(
            "Error: {} ({})\n",
            error.get_error_name(),
            error.get_tip()
        ));
    }
    out.push_str(&format!(
        "-> {}:{}:{}\n",
        file.as_os_str().to_string_lossy(),
        position.line,
        position.column
    ));
    out.push_str(&format!("{:>padding$}\n", "|"));

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    out.push_str(&format!("{} | {}\n", line_string, line_text_removed.trim_end()));

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;
    out.push_str(&format!("{:>padding$} {:->arrows$}\n", "|", "^"));

    if let Some(context) = error.get_context() {
        out.push_str(&format!("{:>padding$} in: {}\n", "=", context));
    }

    out
}

pub fn display_error(error: &Error, source: &str, file: &Path) {
    eprint!("{}", format_error(error, source, file));
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let mut start = 0;
    for c in string.chars() {
        if c == ' ' || c == '\t' {
            start += 1;
        } else {
            break;
        }
    }

    (String::from(&string[start..]), start)
}
