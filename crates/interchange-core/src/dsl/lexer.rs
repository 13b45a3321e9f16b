//! Lexer for the rep_interchange DSL
//!
//! Splits source text into delimiters and atoms. The lexer is total: anything
//! it cannot classify becomes an [`TokenKind::Unrecognized`] token and is
//! reported later by the parser.

use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use std::str::CharIndices;

/// Token types recognized by the lexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Symbol(String),
    IntLiteral(i64),
    Unrecognized(String),
}

/// Token with location information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

/// Lazy tokenizer over a source string.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Line and column just past the last character consumed.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, ch)) = next {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    /// Consume a maximal run of atom characters starting at `start`.
    fn read_atom(&mut self, start: usize) -> &'a str {
        let mut end = start;
        while let Some(&(offset, ch)) = self.chars.peek() {
            if ch.is_whitespace() || is_delimiter(ch) {
                break;
            }
            end = offset + ch.len_utf8();
            self.advance();
        }
        &self.source[start..end]
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.skip_whitespace();

        let line = self.line;
        let column = self.column;
        let &(offset, ch) = self.chars.peek()?;

        let kind = match ch {
            '(' => {
                self.advance();
                TokenKind::OpenParen
            }
            ')' => {
                self.advance();
                TokenKind::CloseParen
            }
            '[' => {
                self.advance();
                TokenKind::OpenBracket
            }
            ']' => {
                self.advance();
                TokenKind::CloseBracket
            }
            _ => {
                let text = self.read_atom(offset);
                return Some(Token {
                    kind: classify_atom(text),
                    line,
                    column,
                    offset,
                    length: text.len(),
                });
            }
        };

        Some(Token {
            kind,
            line,
            column,
            offset,
            length: 1,
        })
    }
}

/// Tokenize the entire input
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Whether `text` would lex as a single symbol.
pub fn is_valid_symbol(text: &str) -> bool {
    !text.is_empty() && matches!(classify_atom(text), TokenKind::Symbol(_))
}

fn is_delimiter(ch: char) -> bool {
    matches!(ch, '(' | ')' | '[' | ']')
}

fn is_symbol_char(ch: char) -> bool {
    ch.is_alphanumeric()
        || matches!(
            ch,
            '_' | '-' | '+' | '*' | '/' | '<' | '>' | '=' | '?' | '!' | '\'' | '.' | '%' | '&' | ':'
        )
}

fn classify_atom(text: &str) -> TokenKind {
    let digits = text.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        // Out-of-range literals stay unrecognized rather than wrapping.
        return match text.parse::<i64>() {
            Ok(value) => TokenKind::IntLiteral(value),
            Err(_) => TokenKind::Unrecognized(text.to_string()),
        };
    }

    let starts_with_digit = text.chars().next().is_some_and(|c| c.is_ascii_digit());
    if !starts_with_digit && text.chars().all(is_symbol_char) {
        TokenKind::Symbol(text.to_string())
    } else {
        TokenKind::Unrecognized(text.to_string())
    }
}
