//! Parser for the rep_interchange DSL
//!
//! Recursive descent over a token stream with one token of lookahead. `lam`
//! and `if` are keywords only in the head position of a form; anywhere else
//! they parse as plain symbols and are left for the validator to reject.

use std::iter::Peekable;

use crate::dsl::ast::{Expr, IF_KEYWORD, LAMBDA_KEYWORD};
use crate::dsl::lexer::{Lexer, Token, TokenKind};
use crate::error::ParseError;

/// Default limit on nested forms.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Largest nesting limit whose trees the entry codec can still decode.
pub const MAX_SUPPORTED_DEPTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    line: usize,
    column: usize,
}

impl From<&Token> for Position {
    fn from(token: &Token) -> Self {
        Self {
            line: token.line,
            column: token.column,
        }
    }
}

enum Head {
    Lambda,
    If,
    Apply,
}

/// Parser for the rep_interchange DSL
pub struct Parser<I: Iterator<Item = Token>> {
    tokens: Peekable<I>,
    max_depth: usize,
    depth: usize,
    end: Position,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    /// Create a new parser over the given tokens
    pub fn new<T>(tokens: T) -> Self
    where
        T: IntoIterator<Item = Token, IntoIter = I>,
    {
        Self {
            tokens: tokens.into_iter().peekable(),
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
            end: Position { line: 1, column: 1 },
        }
    }

    /// Limit nesting. Values above [`MAX_SUPPORTED_DEPTH`] are capped.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.min(MAX_SUPPORTED_DEPTH);
        self
    }

    /// Parse exactly one top-level expression, rejecting trailing tokens.
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        match self.tokens.next() {
            None => Ok(expr),
            Some(token) => Err(syntax_error(
                (&token).into(),
                format!(
                    "unexpected {} after a complete expression",
                    describe(&token.kind)
                ),
            )),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.next_token()? else {
            return Err(syntax_error(
                self.end,
                "expected an expression, found end of input",
            ));
        };

        match &token.kind {
            TokenKind::Symbol(name) => Ok(Expr::Symbol(name.clone())),
            TokenKind::IntLiteral(value) => Ok(Expr::IntLiteral(*value)),
            TokenKind::OpenParen => {
                self.depth += 1;
                if self.depth > self.max_depth {
                    return Err(ParseError::NestingTooDeep {
                        limit: self.max_depth,
                        line: token.line,
                        column: token.column,
                    });
                }
                let form = self.parse_form(&token);
                self.depth -= 1;
                form
            }
            TokenKind::CloseParen => Err(syntax_error((&token).into(), "unmatched ')'")),
            TokenKind::OpenBracket => Err(syntax_error(
                (&token).into(),
                "'[' may only open a lambda parameter list",
            )),
            TokenKind::CloseBracket => Err(syntax_error((&token).into(), "unmatched ']'")),
            TokenKind::Unrecognized(text) => Err(unrecognized(&token, text)),
        }
    }

    /// Parse the remainder of a form whose `(` has been consumed.
    fn parse_form(&mut self, open: &Token) -> Result<Expr, ParseError> {
        let end = self.end;
        let head = match self.peek()? {
            None => return Err(syntax_error(end, unclosed(open))),
            Some(token) if token.kind == TokenKind::CloseParen => {
                return Err(syntax_error(open.into(), "empty form '()'"));
            }
            Some(Token {
                kind: TokenKind::Symbol(name),
                ..
            }) if name == LAMBDA_KEYWORD => Head::Lambda,
            Some(Token {
                kind: TokenKind::Symbol(name),
                ..
            }) if name == IF_KEYWORD => Head::If,
            Some(_) => Head::Apply,
        };

        match head {
            Head::Lambda => {
                self.next_token()?;
                self.parse_lambda(open)
            }
            Head::If => {
                self.next_token()?;
                self.parse_if(open)
            }
            Head::Apply => {
                let operator = self.parse_expr()?;
                let args = self.parse_until_close(open)?;
                Ok(Expr::Apply {
                    operator: Box::new(operator),
                    args,
                })
            }
        }
    }

    /// `(lam [p1 p2 ...] body)` after the keyword.
    fn parse_lambda(&mut self, open: &Token) -> Result<Expr, ParseError> {
        match self.next_token()? {
            Some(token) if token.kind == TokenKind::OpenBracket => {}
            Some(token) => {
                return Err(lambda_error(
                    (&token).into(),
                    format!(
                        "expected '[' to open the parameter list, found {}",
                        describe(&token.kind)
                    ),
                ))
            }
            None => {
                return Err(lambda_error(
                    self.end,
                    "expected '[' to open the parameter list, found end of input",
                ))
            }
        }

        let mut params = Vec::new();
        loop {
            match self.next_token()? {
                Some(Token {
                    kind: TokenKind::Symbol(name),
                    ..
                }) => params.push(name),
                Some(Token {
                    kind: TokenKind::CloseBracket,
                    ..
                }) => break,
                Some(token) => {
                    return Err(lambda_error(
                        (&token).into(),
                        format!("parameters must be symbols, found {}", describe(&token.kind)),
                    ))
                }
                None => return Err(lambda_error(self.end, "unclosed parameter list")),
            }
        }

        let end = self.end;
        match self.peek()? {
            Some(token) if token.kind == TokenKind::CloseParen => {
                return Err(lambda_error(token.into(), "missing lambda body"));
            }
            None => return Err(syntax_error(end, unclosed(open))),
            Some(_) => {}
        }
        let body = self.parse_expr()?;

        match self.next_token()? {
            Some(token) if token.kind == TokenKind::CloseParen => Ok(Expr::Lambda {
                params,
                body: Box::new(body),
            }),
            Some(token) => Err(lambda_error(
                (&token).into(),
                "a lambda takes exactly one body expression",
            )),
            None => Err(syntax_error(self.end, unclosed(open))),
        }
    }

    /// `(if cond then else)` after the keyword.
    fn parse_if(&mut self, open: &Token) -> Result<Expr, ParseError> {
        let parts = self.parse_until_close(open)?;
        let found = parts.len();
        match <[Expr; 3]>::try_from(parts) {
            Ok([cond, then_branch, else_branch]) => Ok(Expr::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            }),
            Err(_) => Err(if_error(
                open.into(),
                format!(
                    "expected a condition, a then branch and an else branch, found {} sub-expression{}",
                    found,
                    if found == 1 { "" } else { "s" }
                ),
            )),
        }
    }

    /// Parse expressions up to and including the `)` that closes `open`.
    fn parse_until_close(&mut self, open: &Token) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        loop {
            let end = self.end;
            match self.peek()? {
                None => return Err(syntax_error(end, unclosed(open))),
                Some(token) if token.kind == TokenKind::CloseParen => {
                    self.next_token()?;
                    return Ok(items);
                }
                Some(_) => items.push(self.parse_expr()?),
            }
        }
    }

    /// Look at the next token, failing on unrecognized input.
    fn peek(&mut self) -> Result<Option<&Token>, ParseError> {
        match self.tokens.peek() {
            Some(token) => match &token.kind {
                TokenKind::Unrecognized(text) => Err(unrecognized(token, text)),
                _ => Ok(Some(token)),
            },
            None => Ok(None),
        }
    }

    /// Consume the next token, failing on unrecognized input.
    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        let Some(token) = self.tokens.next() else {
            return Ok(None);
        };
        if let TokenKind::Unrecognized(text) = &token.kind {
            return Err(unrecognized(&token, text));
        }
        self.end = Position {
            line: token.line,
            column: token.column + width(&token),
        };
        Ok(Some(token))
    }
}

/// Parse a single program with the default nesting limit.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    parse_with_max_depth(source, DEFAULT_MAX_DEPTH)
}

pub fn parse_with_max_depth(source: &str, max_depth: usize) -> Result<Expr, ParseError> {
    Parser::new(Lexer::new(source))
        .with_max_depth(max_depth)
        .parse()
}

fn width(token: &Token) -> usize {
    match &token.kind {
        TokenKind::Symbol(text) | TokenKind::Unrecognized(text) => text.chars().count(),
        _ => token.length,
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::OpenParen => "'('".to_string(),
        TokenKind::CloseParen => "')'".to_string(),
        TokenKind::OpenBracket => "'['".to_string(),
        TokenKind::CloseBracket => "']'".to_string(),
        TokenKind::Symbol(name) => format!("symbol `{}`", name),
        TokenKind::IntLiteral(value) => format!("integer {}", value),
        TokenKind::Unrecognized(text) => format!("unrecognized `{}`", text),
    }
}

fn unclosed(open: &Token) -> String {
    format!(
        "unclosed '(' opened at line {}, column {}",
        open.line, open.column
    )
}

fn unrecognized(token: &Token, text: &str) -> ParseError {
    syntax_error(token.into(), format!("unrecognized token `{}`", text))
}

fn syntax_error(at: Position, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        message: message.into(),
        line: at.line,
        column: at.column,
    }
}

fn lambda_error(at: Position, message: impl Into<String>) -> ParseError {
    ParseError::MalformedLambda {
        message: message.into(),
        line: at.line,
        column: at.column,
    }
}

fn if_error(at: Position, message: impl Into<String>) -> ParseError {
    ParseError::MalformedIf {
        message: message.into(),
        line: at.line,
        column: at.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Expr {
        Expr::symbol(name)
    }

    #[test]
    fn test_lambda_with_conditional_body() {
        let expr = parse("(lam [x] (if x 1 2))").unwrap();
        assert_eq!(
            expr,
            Expr::lambda(["x"], Expr::if_then_else(sym("x"), Expr::int(1), Expr::int(2)))
        );
    }

    #[test]
    fn test_bare_atoms_are_programs() {
        assert_eq!(parse("x").unwrap(), sym("x"));
        assert_eq!(parse("  -42\n").unwrap(), Expr::int(-42));
    }

    #[test]
    fn test_application() {
        assert_eq!(
            parse("(f 1 (g y))").unwrap(),
            Expr::apply(
                sym("f"),
                vec![Expr::int(1), Expr::apply(sym("g"), vec![sym("y")])]
            )
        );
        assert_eq!(parse("(f)").unwrap(), Expr::apply(sym("f"), vec![]));
        assert_eq!(
            parse("((lam [a b] a) 1 2)").unwrap(),
            Expr::apply(
                Expr::lambda(["a", "b"], sym("a")),
                vec![Expr::int(1), Expr::int(2)]
            )
        );
    }

    #[test]
    fn test_empty_parameter_list() {
        assert_eq!(
            parse("(lam [] 0)").unwrap(),
            Expr::lambda(Vec::<String>::new(), Expr::int(0))
        );
    }

    #[test]
    fn test_keywords_outside_head_position_parse_as_symbols() {
        assert_eq!(
            parse("(f if)").unwrap(),
            Expr::apply(sym("f"), vec![sym("if")])
        );
    }

    #[test]
    fn test_syntax_errors() {
        for source in [
            "$$$$$!",
            "",
            "   ",
            "(",
            ")",
            "(f x",
            "(f x))",
            "x y",
            "()",
            "[x]",
            "(f ])",
            "(f $)",
            "(if x 1 2",
        ] {
            assert!(
                matches!(parse(source), Err(ParseError::Syntax { .. })),
                "expected syntax error for {:?}, got {:?}",
                source,
                parse(source)
            );
        }
    }

    #[test]
    fn test_malformed_lambdas() {
        for source in [
            "(lam)",
            "(lam x x)",
            "(lam [x])",
            "(lam [x] x y)",
            "(lam [1] x)",
            "(lam [(x)] x)",
            "(lam [x x)",
            "(lam [x",
        ] {
            assert!(
                matches!(parse(source), Err(ParseError::MalformedLambda { .. })),
                "expected malformed lambda for {:?}, got {:?}",
                source,
                parse(source)
            );
        }
    }

    #[test]
    fn test_malformed_ifs() {
        for source in ["(if)", "(if x)", "(if x 1)", "(if x 1 2 3)"] {
            assert!(
                matches!(parse(source), Err(ParseError::MalformedIf { .. })),
                "expected malformed if for {:?}, got {:?}",
                source,
                parse(source)
            );
        }
    }

    #[test]
    fn test_error_positions() {
        let err = parse("(f\n  $x)").unwrap_err();
        assert_eq!(err.position(), (2, 3));

        // End of input points just past the last token.
        let err = parse("(f ab").unwrap_err();
        assert_eq!(err.position(), (1, 6));

        let err = parse("(if x 1)").unwrap_err();
        assert_eq!(err.position(), (1, 1));
    }

    #[test]
    fn test_nesting_limit() {
        let shallow = "(f (f (f x)))";
        assert!(parse_with_max_depth(shallow, 3).is_ok());
        assert_eq!(
            parse_with_max_depth(shallow, 2),
            Err(ParseError::NestingTooDeep {
                limit: 2,
                line: 1,
                column: 7
            })
        );

        let deep = format!("{}x{}", "(f ".repeat(100), ")".repeat(100));
        assert!(matches!(
            parse(&deep),
            Err(ParseError::NestingTooDeep { limit: DEFAULT_MAX_DEPTH, .. })
        ));
    }

    #[test]
    fn test_nesting_limit_is_capped() {
        let at_cap = format!(
            "{}x{}",
            "(f ".repeat(MAX_SUPPORTED_DEPTH),
            ")".repeat(MAX_SUPPORTED_DEPTH)
        );
        assert!(parse_with_max_depth(&at_cap, 1000).is_ok());

        let past_cap = format!("(g {})", at_cap);
        assert!(matches!(
            parse_with_max_depth(&past_cap, 1000),
            Err(ParseError::NestingTooDeep { limit: MAX_SUPPORTED_DEPTH, .. })
        ));
    }

    #[test]
    fn test_rendering_reparses_to_same_tree() {
        let source = "( lam [f  x]\n  (if (f x) (f (f x)) -1) )";
        let expr = parse(source).unwrap();
        assert_eq!(expr.to_string(), "(lam [f x] (if (f x) (f (f x)) -1))");
        assert_eq!(parse(&expr.to_string()).unwrap(), expr);
    }

    #[test]
    fn test_parser_accepts_any_token_iterator() {
        let tokens = crate::dsl::lexer::tokenize("(g 1)");
        let expr = Parser::new(tokens).parse().unwrap();
        assert_eq!(expr, Expr::apply(sym("g"), vec![Expr::int(1)]));
    }
}
