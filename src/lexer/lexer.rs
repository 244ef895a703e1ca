use std::{collections::VecDeque, rc::Rc};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position, Span, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Token, TokenKind, RESERVED_LOOKUP};

/// Columns a tab advances the indentation by.
pub const TAB_WIDTH: u32 = 4;

/// Longest identifier or number literal accepted.
pub const MAX_TOKEN_LENGTH: usize = 1024;

pub type RegexHandler = fn(&mut Lexer, &Regex) -> Result<(), Error>;

pub struct RegexPattern {
    regex: Regex,
    handler: RegexHandler,
}

lazy_static! {
    /// Patterns tried in order at the current position; the first match wins,
    /// so longer operators come before their one-character prefixes.
    static ref PATTERNS: Vec<RegexPattern> = vec![
        RegexPattern { regex: Regex::new(r"^[ \t\x0C]+").unwrap(), handler: skip_handler },
        RegexPattern { regex: Regex::new(r"^\\\r?\n").unwrap(), handler: continuation_handler },
        RegexPattern { regex: Regex::new(r"^#[^\n]*").unwrap(), handler: skip_handler },
        RegexPattern { regex: Regex::new(r"^\r?\n").unwrap(), handler: newline_handler },
        RegexPattern { regex: Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*").unwrap(), handler: symbol_handler },
        RegexPattern { regex: Regex::new(r"^[0-9]+(\.[0-9]*)?[jJ]?").unwrap(), handler: number_handler },
        RegexPattern { regex: Regex::new(r#"^("""|'''|"|')"#).unwrap(), handler: string_handler },
        RegexPattern { regex: Regex::new(r"^\.\.\.").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Ellipsis, "...") },
        RegexPattern { regex: Regex::new(r"^[(\[{]").unwrap(), handler: open_handler },
        RegexPattern { regex: Regex::new(r"^[)\]}]").unwrap(), handler: close_handler },
        RegexPattern { regex: Regex::new(r"^\*\*").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::DoubleStar, "**") },
        RegexPattern { regex: Regex::new(r"^//").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::DoubleSlash, "//") },
        RegexPattern { regex: Regex::new(r"^<<").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::ShiftLeft, "<<") },
        RegexPattern { regex: Regex::new(r"^>>").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::ShiftRight, ">>") },
        RegexPattern { regex: Regex::new(r"^<=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::LessEquals, "<=") },
        RegexPattern { regex: Regex::new(r"^>=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::GreaterEquals, ">=") },
        RegexPattern { regex: Regex::new(r"^==").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Equals, "==") },
        RegexPattern { regex: Regex::new(r"^!=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::NotEquals, "!=") },
        RegexPattern { regex: Regex::new(r"^->").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Arrow, "->") },
        RegexPattern { regex: Regex::new(r"^:=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Walrus, ":=") },
        RegexPattern { regex: Regex::new(r"^\+=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::PlusEquals, "+=") },
        RegexPattern { regex: Regex::new(r"^-=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::MinusEquals, "-=") },
        RegexPattern { regex: Regex::new(r"^\*=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::StarEquals, "*=") },
        RegexPattern { regex: Regex::new(r"^/=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::SlashEquals, "/=") },
        RegexPattern { regex: Regex::new(r"^,").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Comma, ",") },
        RegexPattern { regex: Regex::new(r"^:").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Colon, ":") },
        RegexPattern { regex: Regex::new(r"^;").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Semicolon, ";") },
        RegexPattern { regex: Regex::new(r"^\.").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Dot, ".") },
        RegexPattern { regex: Regex::new(r"^@").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::At, "@") },
        RegexPattern { regex: Regex::new(r"^\+").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Plus, "+") },
        RegexPattern { regex: Regex::new(r"^-").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Minus, "-") },
        RegexPattern { regex: Regex::new(r"^\*").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Star, "*") },
        RegexPattern { regex: Regex::new(r"^/").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Slash, "/") },
        RegexPattern { regex: Regex::new(r"^%").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Percent, "%") },
        RegexPattern { regex: Regex::new(r"^&").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Ampersand, "&") },
        RegexPattern { regex: Regex::new(r"^\|").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Pipe, "|") },
        RegexPattern { regex: Regex::new(r"^\^").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Caret, "^") },
        RegexPattern { regex: Regex::new(r"^~").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Tilde, "~") },
        RegexPattern { regex: Regex::new(r"^<").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Less, "<") },
        RegexPattern { regex: Regex::new(r"^>").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Greater, ">") },
        RegexPattern { regex: Regex::new(r"^=").unwrap(), handler: MK_DEFAULT_HANDLER!(TokenKind::Assignment, "=") },
    ];
}

/// Indentation-sensitive tokenizer.
///
/// Tokens are produced on demand through [`Lexer::next_token`]. The stream
/// always starts with `File` and ends with `EndFile`; logical lines end with
/// `Newline` and changes of indentation produce `Indent`/`Dedent` markers.
pub struct Lexer {
    source: String,
    pos: usize,
    line: u32,
    line_start: usize,
    file: Rc<String>,
    /// Open `(`, `[` and `{` not yet closed; newlines inside are whitespace.
    nesting: u32,
    indent_stack: Vec<u32>,
    /// Indentation of the current logical line in `TAB_WIDTH` units.
    current_indent: u32,
    at_line_start: bool,
    pending: VecDeque<Token>,
    last_pushed: Option<TokenKind>,
    finished: bool,
}

impl Lexer {
    pub fn new(source: String, file: Rc<String>) -> Lexer {
        Lexer {
            source,
            pos: 0,
            line: 1,
            line_start: 0,
            file,
            nesting: 0,
            indent_stack: vec![0],
            current_indent: 0,
            at_line_start: true,
            pending: VecDeque::new(),
            last_pushed: None,
            finished: false,
        }
    }

    /// Advances and returns the next token.
    ///
    /// Once the input is exhausted every further call returns `EndFile`.
    pub fn next_token(&mut self) -> Result<Token, Error> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }

            if self.last_pushed.is_none() {
                self.push_token(TokenKind::File, String::new(), 0);
                continue;
            }

            if self.finished {
                return Ok(self.marker(TokenKind::EndFile));
            }

            if self.at_eof() {
                self.finish();
                continue;
            }

            if self.at_line_start {
                self.at_line_start = false;
                self.measure_indentation()?;
                continue;
            }

            self.scan()?;
        }
    }

    fn scan(&mut self) -> Result<(), Error> {
        for pattern in PATTERNS.iter() {
            if pattern.regex.is_match(self.remainder()) {
                return (pattern.handler)(self, &pattern.regex);
            }
        }

        let unrecognised = self.remainder().chars().next().unwrap_or_default();
        Err(Error::new(
            ErrorImpl::UnrecognisedToken {
                token: unrecognised.to_string(),
            },
            self.position(),
        ))
    }

    fn finish(&mut self) {
        if !matches!(
            self.last_pushed,
            Some(TokenKind::Newline) | Some(TokenKind::File) | Some(TokenKind::Dedent)
        ) {
            self.push_token(TokenKind::Newline, String::new(), 0);
        }

        self.current_indent = 0;
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push_token(TokenKind::Dedent, String::new(), 0);
        }

        self.push_token(TokenKind::EndFile, String::new(), 0);
        self.finished = true;
    }

    /// Compares the leading whitespace of a new logical line with the indent
    /// stack. Blank and comment-only lines leave the indentation untouched.
    fn measure_indentation(&mut self) -> Result<(), Error> {
        let mut width = 0;
        let mut offset = 0;
        for c in self.remainder().chars() {
            match c {
                ' ' => width += 1,
                '\t' => width += TAB_WIDTH,
                '\x0C' => {}
                _ => break,
            }
            offset += c.len_utf8();
        }

        match self.remainder()[offset..].chars().next() {
            None | Some('\n') | Some('\r') | Some('#') => return Ok(()),
            _ => {}
        }

        self.advance_n(offset);
        let top = self.indent_stack.last().copied().unwrap_or(0);

        if width > top {
            self.indent_stack.push(width);
            self.current_indent = width / TAB_WIDTH;
            self.push_token(TokenKind::Indent, String::new(), 0);
        } else if width < top {
            self.current_indent = width / TAB_WIDTH;
            while self.indent_stack.last().is_some_and(|level| *level > width) {
                self.indent_stack.pop();
                self.push_token(TokenKind::Dedent, String::new(), 0);
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                return Err(Error::new(
                    ErrorImpl::InconsistentIndentation { width },
                    self.position(),
                ));
            }
        } else {
            self.current_indent = width / TAB_WIDTH;
        }

        Ok(())
    }

    /// Pushes a token of `len` bytes starting at the current position and
    /// moves past it.
    pub fn push_token(&mut self, kind: TokenKind, value: String, len: usize) {
        let start = self.position();
        self.advance_n(len);
        let end = self.position();
        self.push(MK_TOKEN!(kind, value, self.current_indent, Span { start, end }));
    }

    fn marker(&self, kind: TokenKind) -> Token {
        let position = self.position();
        MK_TOKEN!(
            kind,
            String::new(),
            0,
            Span {
                start: position.clone(),
                end: position
            }
        )
    }

    pub fn push(&mut self, token: Token) {
        self.last_pushed = Some(token.kind);
        self.pending.push_back(token);
    }

    pub fn advance_n(&mut self, n: usize) {
        self.pos += n;
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.line_start = self.pos;
    }

    pub fn remainder(&self) -> &str {
        &self.source[self.pos..]
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    pub fn position(&self) -> Position {
        Position::new(
            self.pos as u32,
            self.line,
            (self.pos - self.line_start) as u32 + 1,
            Rc::clone(&self.file),
        )
    }

    fn matched_len(&self, regex: &Regex) -> usize {
        regex.find(self.remainder()).map_or(0, |m| m.end())
    }

    fn check_length(&self, length: usize) -> Result<(), Error> {
        if length > MAX_TOKEN_LENGTH {
            return Err(Error::new(
                ErrorImpl::TokenTooLong {
                    length,
                    max: MAX_TOKEN_LENGTH,
                },
                self.position(),
            ));
        }
        Ok(())
    }
}

fn skip_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched_len(regex);
    lexer.advance_n(matched);
    Ok(())
}

fn continuation_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched_len(regex);
    lexer.advance_n(matched);
    lexer.new_line();
    Ok(())
}

fn newline_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched_len(regex);

    if lexer.nesting > 0 {
        lexer.advance_n(matched);
        lexer.new_line();
        return Ok(());
    }

    if matches!(
        lexer.last_pushed,
        Some(TokenKind::Newline) | Some(TokenKind::File)
    ) {
        lexer.advance_n(matched);
    } else {
        lexer.push_token(TokenKind::Newline, String::from("\n"), matched);
    }
    lexer.new_line();
    lexer.at_line_start = true;
    Ok(())
}

fn open_handler(lexer: &mut Lexer, _regex: &Regex) -> Result<(), Error> {
    let kind = match lexer.remainder().as_bytes()[0] {
        b'(' => TokenKind::OpenParen,
        b'[' => TokenKind::OpenBracket,
        _ => TokenKind::OpenCurly,
    };
    lexer.nesting += 1;
    lexer.push_token(kind, String::from(kind.symbol()), 1);
    Ok(())
}

fn close_handler(lexer: &mut Lexer, _regex: &Regex) -> Result<(), Error> {
    let kind = match lexer.remainder().as_bytes()[0] {
        b')' => TokenKind::CloseParen,
        b']' => TokenKind::CloseBracket,
        _ => TokenKind::CloseCurly,
    };
    lexer.nesting = lexer.nesting.saturating_sub(1);
    lexer.push_token(kind, String::from(kind.symbol()), 1);
    Ok(())
}

fn number_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched_len(regex);
    lexer.check_length(matched)?;
    let value = lexer.remainder()[..matched].to_string();

    let kind = if value.ends_with(['j', 'J']) {
        TokenKind::Complex
    } else if value.contains('.') {
        TokenKind::Float
    } else {
        TokenKind::Integer
    };

    lexer.push_token(kind, value, matched);
    Ok(())
}

fn symbol_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched_len(regex);
    lexer.check_length(matched)?;
    let value = lexer.remainder()[..matched].to_string();

    let kind = RESERVED_LOOKUP
        .get(value.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(TokenKind::Identifier);

    lexer.push_token(kind, value, matched);
    Ok(())
}

/// Scans a string literal up to its matching quote.
///
/// The contents are kept verbatim; a backslash only stops the following
/// character from closing the literal. Only triple-quoted literals may span
/// lines.
fn string_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let quote_len = lexer.matched_len(regex);
    let quote = lexer.remainder()[..quote_len].to_string();
    let triple = quote_len == 3;

    let start = lexer.position();
    let body = &lexer.remainder()[quote_len..];

    let mut end = None;
    let mut newlines = Vec::new();
    let mut escaped = false;
    for (index, c) in body.char_indices() {
        if escaped {
            escaped = false;
            if c == '\n' {
                newlines.push(index);
            }
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\n' if !triple => break,
            '\n' => newlines.push(index),
            _ if body[index..].starts_with(quote.as_str()) => {
                end = Some(index);
                break;
            }
            _ => {}
        }
    }

    let Some(end) = end else {
        return Err(Error::new(ErrorImpl::UnterminatedString, start));
    };

    let value = body[..end].to_string();
    let total = quote_len + end + quote_len;

    // Lines crossed by a triple-quoted literal still count.
    let literal_start = lexer.pos + quote_len;
    lexer.advance_n(total);
    let end_position = lexer.position();
    if let Some(last) = newlines.last() {
        lexer.line += newlines.len() as u32;
        lexer.line_start = literal_start + last + 1;
    }

    let end_position = Position {
        line: lexer.line,
        column: (lexer.pos - lexer.line_start) as u32 + 1,
        ..end_position
    };
    let indent = lexer.current_indent;
    lexer.push(MK_TOKEN!(
        TokenKind::String,
        value,
        indent,
        Span {
            start,
            end: end_position
        }
    ));
    Ok(())
}

/// Tokenizes the whole of `source`, from `File` through `EndFile`.
pub fn tokenize(source: &str, file: Rc<String>) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer::new(String::from(source), file);
    let mut tokens = vec![];

    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::EndFile;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
