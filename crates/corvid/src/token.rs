//! Token kinds and the `Token` type the lexer produces and the parser consumes.

use std::fmt;

/// The keyword set recognized by the lexer. `true`/`false` are lexed as
/// keywords but immediately re-tagged as `Boolean` tokens (see `lexer.rs`).
pub const KEYWORDS: &[&str] = &[
    "nil", "bool", "true", "false", "int", "float", "str", "tuple", "list", "fn", "import", "for",
    "if", "elif", "else", "continue", "break", "return", "class",
];

/// Multi-character operators, longest first so the lexer's regex alternation
/// never lets a short operator shadow a longer one that starts with it.
pub const MULTI_CHAR_OPERATORS: &[&str] = &[
    "+=", "-=", "*=", "/=", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "->", "=>",
];

pub const SINGLE_CHAR_OPERATORS: &[char] = &[
    '+', '-', '*', '/', '%', '=', '<', '>', '!', '&', '|', '^', '~', '?', ':', ';', ',', '.', '(',
    ')', '{', '}', '[', ']',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Integer,
    Float,
    Boolean,
    Str,
    Operator,
    Comment,
    Error,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Integer => "INTEGER_LITERAL",
            TokenKind::Float => "FLOAT_LITERAL",
            TokenKind::Boolean => "BOOLEAN_LITERAL",
            TokenKind::Str => "STRING_LITERAL",
            TokenKind::Operator => "OPERATOR",
            TokenKind::Comment => "COMMENT",
            TokenKind::Error => "ERROR",
            TokenKind::Eof => "EOF",
        };
        f.write_str(name)
    }
}

/// A single lexed token: its kind, its original spelling, and its source
/// position (1-indexed line/column, matching the original lexer).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    /// Byte offset of the token's first byte in the source text.
    pub pos: usize,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        line: usize,
        column: usize,
        pos: usize,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
            pos,
        }
    }

    pub fn eof(line: usize, column: usize, pos: usize) -> Self {
        Self::new(TokenKind::Eof, "", line, column, pos)
    }

    /// The string literal's text with its surrounding quotes stripped.
    pub fn unquoted(&self) -> &str {
        self.text
            .strip_prefix(['"', '\''])
            .and_then(|s| s.strip_suffix(['"', '\'']))
            .unwrap_or(&self.text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token<{}, {:?}, Line:{}, Column:{}>",
            self.kind, self.text, self.line, self.column
        )
    }
}
