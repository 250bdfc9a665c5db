//! Regex-driven tokenizer. Consumes source text and produces a finite,
//! EOF-terminated token stream; never aborts on its own — an unrecognized
//! character becomes an `Error`-kind token and lexing continues, leaving the
//! decision to fail the pipeline to the parser (see `error.rs`).

use regex::Regex;
use std::sync::LazyLock;

use crate::token::{Token, TokenKind, KEYWORDS};

static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<comment>//[^\n]*|/\*[\s\S]*?\*/)",
        r"|(?P<string>\x22(?:\\.|[^\x22\\])*\x22|'(?:\\.|[^'\\])*')",
        r"|(?P<float>\b\d+\.\d*(?:[eE][+-]?\d+)?\b|\b\d*\.\d+(?:[eE][+-]?\d+)?\b)",
        r"|(?P<int>\b\d+\b)",
        r"|(?P<boolean>\b(?:true|false)\b)",
        r"|(?P<ident>\b[A-Za-z_][A-Za-z0-9_]*\b)",
        r"|(?P<op>\+=|-=|\*=|/=|==|!=|<=|>=|&&|\|\||\+\+|--|->|=>|[-+*/%=<>!&|^~?:;,.(){}\[\]])",
        r"|(?P<newline>\n)",
        r"|(?P<skip>[ \t\r]+)",
        r"|(?P<mismatch>.)"
    ))
    .expect("token regex is a fixed, valid pattern")
});

pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line = 1usize;
    let mut column = 1usize;

    while pos < source.len() {
        let Some(caps) = TOKEN_REGEX.captures(&source[pos..]) else {
            break;
        };
        // The regex always matches at the current offset because every
        // alternative (down to `mismatch`) accepts a single arbitrary byte.
        let m = caps
            .iter()
            .skip(1)
            .flatten()
            .next()
            .expect("one named group always matches");
        debug_assert_eq!(m.start(), 0, "token regex must match at the cursor");
        let text = m.as_str();
        let len = text.len();

        if caps.name("newline").is_some() {
            line += 1;
            column = 1;
        } else if caps.name("skip").is_some() {
            column += len;
        } else if caps.name("comment").is_some() {
            tokens.push(Token::new(TokenKind::Comment, text, line, column, pos));
            column += len;
        } else if caps.name("string").is_some() {
            tokens.push(Token::new(TokenKind::Str, text, line, column, pos));
            column += len;
        } else if caps.name("float").is_some() {
            tokens.push(Token::new(TokenKind::Float, text, line, column, pos));
            column += len;
        } else if caps.name("int").is_some() {
            tokens.push(Token::new(TokenKind::Integer, text, line, column, pos));
            column += len;
        } else if caps.name("boolean").is_some() {
            tokens.push(Token::new(TokenKind::Boolean, text, line, column, pos));
            column += len;
        } else if caps.name("ident").is_some() {
            let kind = if text == "true" || text == "false" {
                TokenKind::Boolean
            } else if KEYWORDS.contains(&text) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token::new(kind, text, line, column, pos));
            column += len;
        } else if caps.name("op").is_some() {
            tokens.push(Token::new(TokenKind::Operator, text, line, column, pos));
            column += len;
        } else {
            // mismatch: one unrecognized byte/char
            tokens.push(Token::new(TokenKind::Error, text, line, column, pos));
            column += len;
        }

        pos += len;
    }

    tokens.push(Token::eof(line, column, pos));
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_keywords_and_identifiers() {
        let toks = tokenize("fn main() -> int { return 0; }");
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(toks[0].text, "fn");
        assert_eq!(toks[0].kind, TokenKind::Keyword);
        assert_eq!(toks[1].text, "main");
        assert_eq!(toks[1].kind, TokenKind::Identifier);
        assert_eq!(*kinds.last().unwrap(), TokenKind::Eof);
    }

    #[test]
    fn booleans_are_not_identifiers() {
        let toks = tokenize("true false");
        assert_eq!(toks[0].kind, TokenKind::Boolean);
        assert_eq!(toks[1].kind, TokenKind::Boolean);
    }

    #[test]
    fn multi_char_operators_win_over_single_char() {
        let toks = tokenize("a += 1; b <= 2;");
        assert_eq!(toks[1].text, "+=");
        assert_eq!(toks[4].text, "<=");
    }

    #[test]
    fn strings_and_comments() {
        let toks = tokenize("\"hi\" // trailing\n'c'");
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].text, "\"hi\"");
        assert_eq!(toks[1].kind, TokenKind::Comment);
        assert_eq!(toks[2].kind, TokenKind::Str);
        assert_eq!(toks[2].text, "'c'");
    }

    #[test]
    fn unrecognized_character_becomes_error_token() {
        let toks = tokenize("int x = 1 @ 2;");
        assert!(toks.iter().any(|t| t.kind == TokenKind::Error && t.text == "@"));
    }

    #[test]
    fn line_and_column_tracking() {
        let toks = tokenize("int x;\nint y;");
        let y_tok = toks.iter().find(|t| t.text == "y").unwrap();
        assert_eq!(y_tok.line, 2);
    }
}
