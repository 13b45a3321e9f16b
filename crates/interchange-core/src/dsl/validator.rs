//! Structural checks that the grammar alone cannot enforce.

use std::collections::HashSet;

use crate::dsl::ast::{Expr, KEYWORDS};
use crate::dsl::lexer::is_valid_symbol;
use crate::error::ValidationError;

/// Validate a parsed expression.
///
/// Rejects lambdas that bind the same name twice and any use of `lam` or
/// `if` as an ordinary name, either as a parameter or as a symbol outside
/// head position. Names in trees built by hand must also be valid symbols,
/// so every accepted tree renders to source that parses back to itself.
/// Nothing is evaluated.
pub fn validate(expr: &Expr) -> Result<(), ValidationError> {
    match expr {
        Expr::Symbol(name) => check_name(name),
        Expr::IntLiteral(_) => Ok(()),
        Expr::Lambda { params, body } => {
            let mut seen = HashSet::with_capacity(params.len());
            for param in params {
                check_name(param)?;
                if !seen.insert(param.as_str()) {
                    return Err(ValidationError::DuplicateParam {
                        name: param.clone(),
                    });
                }
            }
            validate(body)
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
        } => {
            validate(cond)?;
            validate(then_branch)?;
            validate(else_branch)
        }
        Expr::Apply { operator, args } => {
            validate(operator)?;
            args.iter().try_for_each(validate)
        }
    }
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    if KEYWORDS.contains(&name) {
        return Err(ValidationError::ReservedName {
            name: name.to_string(),
        });
    }
    if !is_valid_symbol(name) {
        return Err(ValidationError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
