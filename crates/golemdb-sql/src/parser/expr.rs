//! WHERE-clause expressions.
//!
//! The adapter's expression language is deliberately small: column
//! references, literals, comparisons, LIKE, NULL tests, BETWEEN, IN, and
//! boolean combinators. Anything else in a WHERE clause (arithmetic over
//! columns, function calls, subqueries) cannot be pushed to the backing
//! store and is rejected during lowering.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlparser::ast as sql_ast;

use golemdb_common::{DbError, DbResult};

use super::types::Literal;

/// A WHERE-clause expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A column reference.
    Column(String),
    /// A literal value.
    Literal(Literal),
    /// A comparison or boolean combination.
    BinaryOp {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOperator,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Logical NOT.
    Not(Box<Expr>),
    /// `expr IS NULL`.
    IsNull(Box<Expr>),
    /// `expr IS NOT NULL`.
    IsNotNull(Box<Expr>),
    /// `expr [NOT] BETWEEN low AND high`.
    Between {
        /// Tested expression.
        expr: Box<Expr>,
        /// Lower bound (inclusive).
        low: Box<Expr>,
        /// Upper bound (inclusive).
        high: Box<Expr>,
        /// NOT BETWEEN.
        negated: bool,
    },
    /// `expr [NOT] IN (v1, ..., vn)`.
    InList {
        /// Tested expression.
        expr: Box<Expr>,
        /// Candidate values.
        list: Vec<Expr>,
        /// NOT IN.
        negated: bool,
    },
    /// `expr [NOT] LIKE pattern`.
    Like {
        /// Tested expression.
        expr: Box<Expr>,
        /// Pattern (must be a string literal).
        pattern: Box<Expr>,
        /// NOT LIKE.
        negated: bool,
    },
    /// A parenthesized expression.
    Nested(Box<Expr>),
}

impl Expr {
    /// Converts from sqlparser's Expr.
    pub fn from_sql_ast(expr: sql_ast::Expr) -> DbResult<Self> {
        match expr {
            sql_ast::Expr::Identifier(ident) => Ok(Expr::Column(ident.value)),
            sql_ast::Expr::CompoundIdentifier(idents) => {
                // table.column — the table qualifier is redundant in
                // single-table statements; keep the column part.
                match idents.last() {
                    Some(last) if idents.len() <= 2 => Ok(Expr::Column(last.value.clone())),
                    _ => Err(DbError::not_supported(
                        "compound identifier with more than 2 parts".to_string(),
                    )),
                }
            }
            sql_ast::Expr::Value(value) => Ok(Expr::Literal(Literal::from_sql_ast(&value)?)),
            sql_ast::Expr::BinaryOp { left, op, right } => Ok(Expr::BinaryOp {
                left: Box::new(Expr::from_sql_ast(*left)?),
                op: BinaryOperator::from_sql_ast(&op)?,
                right: Box::new(Expr::from_sql_ast(*right)?),
            }),
            sql_ast::Expr::UnaryOp { op, expr } => match op {
                sql_ast::UnaryOperator::Not => {
                    Ok(Expr::Not(Box::new(Expr::from_sql_ast(*expr)?)))
                }
                sql_ast::UnaryOperator::Minus => {
                    // Fold negative numeric literals.
                    match Expr::from_sql_ast(*expr)? {
                        Expr::Literal(lit) => Ok(Expr::Literal(lit.negate()?)),
                        _ => Err(DbError::not_supported(
                            "arithmetic negation of non-literal expressions".to_string(),
                        )),
                    }
                }
                sql_ast::UnaryOperator::Plus => Expr::from_sql_ast(*expr),
                other => Err(DbError::not_supported(format!("unary operator {other:?}"))),
            },
            sql_ast::Expr::IsNull(expr) => {
                Ok(Expr::IsNull(Box::new(Expr::from_sql_ast(*expr)?)))
            }
            sql_ast::Expr::IsNotNull(expr) => {
                Ok(Expr::IsNotNull(Box::new(Expr::from_sql_ast(*expr)?)))
            }
            sql_ast::Expr::Between {
                expr,
                negated,
                low,
                high,
            } => Ok(Expr::Between {
                expr: Box::new(Expr::from_sql_ast(*expr)?),
                low: Box::new(Expr::from_sql_ast(*low)?),
                high: Box::new(Expr::from_sql_ast(*high)?),
                negated,
            }),
            sql_ast::Expr::InList {
                expr,
                list,
                negated,
            } => {
                let list: DbResult<Vec<_>> = list.into_iter().map(Expr::from_sql_ast).collect();
                Ok(Expr::InList {
                    expr: Box::new(Expr::from_sql_ast(*expr)?),
                    list: list?,
                    negated,
                })
            }
            sql_ast::Expr::Like {
                negated,
                expr,
                pattern,
                ..
            } => Ok(Expr::Like {
                expr: Box::new(Expr::from_sql_ast(*expr)?),
                pattern: Box::new(Expr::from_sql_ast(*pattern)?),
                negated,
            }),
            sql_ast::Expr::Nested(expr) => {
                Ok(Expr::Nested(Box::new(Expr::from_sql_ast(*expr)?)))
            }
            sql_ast::Expr::InSubquery { .. } | sql_ast::Expr::Subquery(_) => {
                Err(DbError::not_supported("subqueries".to_string()))
            }
            sql_ast::Expr::Function(func) => Err(DbError::not_supported(format!(
                "function call {} in expression",
                func.name
            ))),
            other => Err(DbError::not_supported(format!("expression {other:?}"))),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{name}"),
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::BinaryOp { left, op, right } => write!(f, "({left} {op} {right})"),
            Expr::Not(expr) => write!(f, "NOT {expr}"),
            Expr::IsNull(expr) => write!(f, "{expr} IS NULL"),
            Expr::IsNotNull(expr) => write!(f, "{expr} IS NOT NULL"),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expr} {not}BETWEEN {low} AND {high}")
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                let items: Vec<_> = list.iter().map(|e| e.to_string()).collect();
                write!(f, "{expr} {not}IN ({})", items.join(", "))
            }
            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{expr} {not}LIKE {pattern}")
            }
            Expr::Nested(expr) => write!(f, "({expr})"),
        }
    }
}

/// Binary operators available in WHERE clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// `=`
    Eq,
    /// `!=` / `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl BinaryOperator {
    /// True for `=`, `!=`, `<`, `<=`, `>`, `>=`.
    pub fn is_comparison(&self) -> bool {
        !matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    /// Converts from sqlparser's BinaryOperator.
    pub fn from_sql_ast(op: &sql_ast::BinaryOperator) -> DbResult<Self> {
        match op {
            sql_ast::BinaryOperator::Eq => Ok(BinaryOperator::Eq),
            sql_ast::BinaryOperator::NotEq => Ok(BinaryOperator::NotEq),
            sql_ast::BinaryOperator::Lt => Ok(BinaryOperator::Lt),
            sql_ast::BinaryOperator::LtEq => Ok(BinaryOperator::LtEq),
            sql_ast::BinaryOperator::Gt => Ok(BinaryOperator::Gt),
            sql_ast::BinaryOperator::GtEq => Ok(BinaryOperator::GtEq),
            sql_ast::BinaryOperator::And => Ok(BinaryOperator::And),
            sql_ast::BinaryOperator::Or => Ok(BinaryOperator::Or),
            other => Err(DbError::not_supported(format!("operator {other:?}"))),
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        };
        write!(f, "{s}")
    }
}
