//! Abstract Syntax Tree definitions for the rep_interchange DSL

use serde::{Deserialize, Serialize};
use std::fmt;

/// Keyword introducing a lambda form.
pub const LAMBDA_KEYWORD: &str = "lam";
/// Keyword introducing a conditional form.
pub const IF_KEYWORD: &str = "if";
/// Names that may only appear in head position of a form.
pub const KEYWORDS: [&str; 2] = [LAMBDA_KEYWORD, IF_KEYWORD];

/// A parsed expression.
///
/// Trees carry no source positions, so equality is purely structural and two
/// programs that differ only in whitespace produce equal trees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    Symbol(String),
    IntLiteral(i64),
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Apply {
        operator: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn int(value: i64) -> Self {
        Expr::IntLiteral(value)
    }

    pub fn lambda<I, S>(params: I, body: Expr) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expr::Lambda {
            params: params.into_iter().map(Into::into).collect(),
            body: Box::new(body),
        }
    }

    pub fn if_then_else(cond: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn apply(operator: Expr, args: Vec<Expr>) -> Self {
        Expr::Apply {
            operator: Box::new(operator),
            args,
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Symbol(_) | Expr::IntLiteral(_) => 1,
            Expr::Lambda { body, .. } => 1 + body.node_count(),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => 1 + cond.node_count() + then_branch.node_count() + else_branch.node_count(),
            Expr::Apply { operator, args } => {
                1 + operator.node_count() + args.iter().map(Expr::node_count).sum::<usize>()
            }
        }
    }

    /// Parenthesised nesting depth, matching what the parser counts.
    pub fn form_depth(&self) -> usize {
        match self {
            Expr::Symbol(_) | Expr::IntLiteral(_) => 0,
            Expr::Lambda { body, .. } => 1 + body.form_depth(),
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                1 + cond
                    .form_depth()
                    .max(then_branch.form_depth())
                    .max(else_branch.form_depth())
            }
            Expr::Apply { operator, args } => {
                1 + args
                    .iter()
                    .map(Expr::form_depth)
                    .fold(operator.form_depth(), usize::max)
            }
        }
    }

    /// Whether the tree nests more than `limit` forms deep.
    ///
    /// Walks with an explicit stack, so arbitrarily deep trees are safe to
    /// inspect before any recursive pass runs over them.
    pub fn exceeds_depth(&self, limit: usize) -> bool {
        let mut stack = vec![(self, 0usize)];
        while let Some((expr, depth)) = stack.pop() {
            let children: Vec<&Expr> = match expr {
                Expr::Symbol(_) | Expr::IntLiteral(_) => continue,
                Expr::Lambda { body, .. } => vec![&**body],
                Expr::If {
                    cond,
                    then_branch,
                    else_branch,
                } => vec![&**cond, &**then_branch, &**else_branch],
                Expr::Apply { operator, args } => {
                    std::iter::once(&**operator).chain(args.iter()).collect()
                }
            };
            let depth = depth + 1;
            if depth > limit {
                return true;
            }
            stack.extend(children.into_iter().map(|child| (child, depth)));
        }
        false
    }
}

/// Canonical source rendering. Parsing the output yields an equal tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Symbol(name) => f.write_str(name),
            Expr::IntLiteral(value) => write!(f, "{}", value),
            Expr::Lambda { params, body } => {
                write!(f, "({} [{}] {})", LAMBDA_KEYWORD, params.join(" "), body)
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => write!(
                f,
                "({} {} {} {})",
                IF_KEYWORD, cond, then_branch, else_branch
            ),
            Expr::Apply { operator, args } => {
                write!(f, "({}", operator)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}
