use lazy_static::lazy_static;
use std::{collections::HashMap, fmt::Display};

use crate::Span;

lazy_static! {
    /// Reserved words, keyed by their lowercase spelling.
    ///
    /// Identifiers are matched against this table case-insensitively.
    pub static ref RESERVED_LOOKUP: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("true", TokenKind::True);
        map.insert("false", TokenKind::False);
        map.insert("none", TokenKind::None);
        map.insert("and", TokenKind::And);
        map.insert("or", TokenKind::Or);
        map.insert("not", TokenKind::Not);
        map.insert("in", TokenKind::In);
        map.insert("is", TokenKind::Is);
        map.insert("if", TokenKind::If);
        map.insert("elif", TokenKind::Elif);
        map.insert("else", TokenKind::Else);
        map.insert("while", TokenKind::While);
        map.insert("for", TokenKind::For);
        map.insert("def", TokenKind::Def);
        map.insert("class", TokenKind::Class);
        map.insert("return", TokenKind::Return);
        map.insert("yield", TokenKind::Yield);
        map.insert("raise", TokenKind::Raise);
        map.insert("try", TokenKind::Try);
        map.insert("except", TokenKind::Except);
        map.insert("finally", TokenKind::Finally);
        map.insert("with", TokenKind::With);
        map.insert("as", TokenKind::As);
        map.insert("import", TokenKind::Import);
        map.insert("from", TokenKind::From);
        map.insert("global", TokenKind::Global);
        map.insert("nonlocal", TokenKind::Nonlocal);
        map.insert("pass", TokenKind::Pass);
        map.insert("break", TokenKind::Break);
        map.insert("continue", TokenKind::Continue);
        map.insert("assert", TokenKind::Assert);
        map.insert("del", TokenKind::Del);
        map
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    // Structural
    File,
    EndFile,
    Indent,
    Dedent,
    Newline,

    // Literals
    Integer,
    Float,
    Complex,
    String,
    Identifier,
    True,
    False,
    None,

    // Delimiters
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenCurly,
    CloseCurly,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Ellipsis, // ...
    Arrow,    // ->
    Walrus,   // :=
    At,

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar, // **
    Slash,
    DoubleSlash, // //
    Percent,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    ShiftLeft,  // <<
    ShiftRight, // >>
    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    Equals,    // ==
    NotEquals, // !=
    Assignment, // =
    PlusEquals,
    MinusEquals,
    StarEquals,
    SlashEquals,

    // Reserved
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Elif,
    Else,
    While,
    For,
    Def,
    Class,
    Return,
    Yield,
    Raise,
    Try,
    Except,
    Finally,
    With,
    As,
    Import,
    From,
    Global,
    Nonlocal,
    Pass,
    Break,
    Continue,
    Assert,
    Del,
}

impl TokenKind {
    pub fn is_augmented_assignment(self) -> bool {
        matches!(
            self,
            TokenKind::PlusEquals
                | TokenKind::MinusEquals
                | TokenKind::StarEquals
                | TokenKind::SlashEquals
        )
    }

    /// The binary operator an augmented assignment applies.
    pub fn augmented_operator(self) -> Option<TokenKind> {
        match self {
            TokenKind::PlusEquals => Some(TokenKind::Plus),
            TokenKind::MinusEquals => Some(TokenKind::Minus),
            TokenKind::StarEquals => Some(TokenKind::Star),
            TokenKind::SlashEquals => Some(TokenKind::Slash),
            _ => None,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenKind::Less
                | TokenKind::LessEquals
                | TokenKind::Greater
                | TokenKind::GreaterEquals
                | TokenKind::Equals
                | TokenKind::NotEquals
                | TokenKind::In
                | TokenKind::Is
        )
    }

    /// Source spelling of operators and keywords.
    pub fn symbol(self) -> &'static str {
        match self {
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenBracket => "[",
            TokenKind::CloseBracket => "]",
            TokenKind::OpenCurly => "{",
            TokenKind::CloseCurly => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Dot => ".",
            TokenKind::Ellipsis => "...",
            TokenKind::Arrow => "->",
            TokenKind::Walrus => ":=",
            TokenKind::At => "@",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::DoubleStar => "**",
            TokenKind::Slash => "/",
            TokenKind::DoubleSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::Ampersand => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::ShiftLeft => "<<",
            TokenKind::ShiftRight => ">>",
            TokenKind::Less => "<",
            TokenKind::LessEquals => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEquals => ">=",
            TokenKind::Equals => "==",
            TokenKind::NotEquals => "!=",
            TokenKind::Assignment => "=",
            TokenKind::PlusEquals => "+=",
            TokenKind::MinusEquals => "-=",
            TokenKind::StarEquals => "*=",
            TokenKind::SlashEquals => "/=",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::In => "in",
            TokenKind::Is => "is",
            TokenKind::True => "True",
            TokenKind::False => "False",
            TokenKind::None => "None",
            _ => "",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: u32,
    pub column: u32,
    /// Indentation of the line this token sits on, in tab-width units.
    pub indent: u32,
    pub span: Span,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_value() {
            write!(f, "{}({}) {}:{}", self.kind, self.value, self.line, self.column)
        } else {
            write!(f, "{} {}:{}", self.kind, self.line, self.column)
        }
    }
}

impl Token {
    pub fn is_one_of_many(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }

    pub fn has_value(&self) -> bool {
        self.is_one_of_many(&[
            TokenKind::Integer,
            TokenKind::Float,
            TokenKind::Complex,
            TokenKind::String,
            TokenKind::Identifier,
        ])
    }
}
