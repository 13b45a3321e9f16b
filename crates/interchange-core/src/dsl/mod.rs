//! rep_interchange DSL front end
//!
//! Lexing, parsing and structural validation. The language is never
//! evaluated; a program is accepted once it parses and validates.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod validator;


pub use ast::Expr;
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parser::{parse, parse_with_max_depth, Parser, DEFAULT_MAX_DEPTH, MAX_SUPPORTED_DEPTH};
pub use validator::validate;
