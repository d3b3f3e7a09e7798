//! WHERE-clause normalization and lowering.
//!
//! A WHERE expression becomes a tree whose leaves are
//! `(column, op, typed value)` and whose internal nodes are AND/OR/NOT.
//! Normalization pushes NOT down to the leaves (De Morgan plus operator
//! inversion) and flattens nested conjunctions. Lowering turns the tree
//! into a backing-store predicate fragment plus a list of residual
//! conditions that must be evaluated in-core after rows are decoded.

use golemdb_common::{DbError, DbResult};

use crate::catalog::TableDef;
use crate::codec::{self, EncodedValue};
use crate::parser::{BinaryOperator, Expr, Literal, SqlType};
use crate::value::Value;

/// Comparison operators at predicate leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
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
    /// `LIKE` (post-filtered unless it is a plain prefix pattern).
    Like,
    /// `NOT LIKE` (always post-filtered).
    NotLike,
    /// `IS NULL` (always post-filtered; absence of an annotation is not
    /// queryable).
    IsNull,
    /// `IS NOT NULL` (always post-filtered).
    IsNotNull,
}

impl CompareOp {
    /// The operator satisfied by exactly the complement set of rows.
    fn inverted(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::NotEq,
            CompareOp::NotEq => CompareOp::Eq,
            CompareOp::Lt => CompareOp::GtEq,
            CompareOp::LtEq => CompareOp::Gt,
            CompareOp::Gt => CompareOp::LtEq,
            CompareOp::GtEq => CompareOp::Lt,
            CompareOp::Like => CompareOp::NotLike,
            CompareOp::NotLike => CompareOp::Like,
            CompareOp::IsNull => CompareOp::IsNotNull,
            CompareOp::IsNotNull => CompareOp::IsNull,
        }
    }

    /// Mirror image, for rewriting `literal op column` as `column op'
    /// literal`.
    fn flipped(self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::LtEq => CompareOp::GtEq,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::GtEq => CompareOp::LtEq,
            other => other,
        }
    }

    fn store_op(self) -> Option<&'static str> {
        match self {
            CompareOp::Eq => Some("="),
            CompareOp::Lt => Some("<"),
            CompareOp::LtEq => Some("<="),
            CompareOp::Gt => Some(">"),
            CompareOp::GtEq => Some(">="),
            _ => None,
        }
    }
}

/// A predicate leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Column name.
    pub column: String,
    /// Operator.
    pub op: CompareOp,
    /// Comparison value, already checked against the column type. For
    /// LIKE it is the pattern; for the NULL tests it is `Value::Null`.
    pub value: Value,
}

/// A normalized predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateNode {
    /// All children must hold.
    And(Vec<PredicateNode>),
    /// At least one child must hold.
    Or(Vec<PredicateNode>),
    /// Negation. Eliminated by [`normalize`].
    Not(Box<PredicateNode>),
    /// A leaf condition.
    Leaf(Condition),
}

/// Builds a predicate tree from a WHERE expression, resolving columns and
/// typing literals against the table definition.
pub fn build(expr: &Expr, table: &TableDef) -> DbResult<PredicateNode> {
    match expr {
        Expr::Nested(inner) => build(inner, table),
        Expr::Not(inner) => Ok(PredicateNode::Not(Box::new(build(inner, table)?))),
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => Ok(PredicateNode::And(vec![
                build(left, table)?,
                build(right, table)?,
            ])),
            BinaryOperator::Or => Ok(PredicateNode::Or(vec![
                build(left, table)?,
                build(right, table)?,
            ])),
            comparison => {
                let op = match comparison {
                    BinaryOperator::Eq => CompareOp::Eq,
                    BinaryOperator::NotEq => CompareOp::NotEq,
                    BinaryOperator::Lt => CompareOp::Lt,
                    BinaryOperator::LtEq => CompareOp::LtEq,
                    BinaryOperator::Gt => CompareOp::Gt,
                    BinaryOperator::GtEq => CompareOp::GtEq,
                    _ => unreachable!("And/Or handled above"),
                };
                comparison_leaf(left, op, right, table)
            }
        },
        Expr::IsNull(inner) => null_test(inner, CompareOp::IsNull, table),
        Expr::IsNotNull(inner) => null_test(inner, CompareOp::IsNotNull, table),
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let range = PredicateNode::And(vec![
                comparison_leaf(expr, CompareOp::GtEq, low, table)?,
                comparison_leaf(expr, CompareOp::LtEq, high, table)?,
            ]);
            Ok(if *negated {
                PredicateNode::Not(Box::new(range))
            } else {
                range
            })
        }
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            if list.is_empty() {
                return Err(DbError::ParseFailure {
                    message: "IN with an empty list".to_string(),
                });
            }
            let branches: DbResult<Vec<_>> = list
                .iter()
                .map(|item| comparison_leaf(expr, CompareOp::Eq, item, table))
                .collect();
            let any = PredicateNode::Or(branches?);
            Ok(if *negated {
                PredicateNode::Not(Box::new(any))
            } else {
                any
            })
        }
        Expr::Like {
            expr,
            pattern,
            negated,
        } => {
            let column = column_name(expr)?;
            let column_def = table.column_required(&column)?;
            let ty = column_def.sql_type()?;
            if !matches!(ty, SqlType::Char(_) | SqlType::Varchar(_) | SqlType::Text) {
                return Err(DbError::TypeMismatch {
                    column: column.clone(),
                    expected: "a string column for LIKE".to_string(),
                    actual: ty.to_string(),
                });
            }
            let pattern = match pattern.as_ref() {
                Expr::Literal(Literal::String(s)) => s.clone(),
                other => {
                    return Err(DbError::not_supported(format!(
                        "non-literal LIKE pattern {other}"
                    )))
                }
            };
            Ok(PredicateNode::Leaf(Condition {
                column,
                op: if *negated {
                    CompareOp::NotLike
                } else {
                    CompareOp::Like
                },
                value: Value::String(pattern),
            }))
        }
        other => Err(DbError::not_supported(format!(
            "WHERE construct {other}"
        ))),
    }
}

fn column_name(expr: &Expr) -> DbResult<String> {
    match expr {
        Expr::Column(name) => Ok(name.clone()),
        Expr::Nested(inner) => column_name(inner),
        other => Err(DbError::not_supported(format!(
            "expression {other}; expected a column reference"
        ))),
    }
}

fn literal_of(expr: &Expr) -> Option<&Literal> {
    match expr {
        Expr::Literal(lit) => Some(lit),
        Expr::Nested(inner) => literal_of(inner),
        _ => None,
    }
}

fn comparison_leaf(
    left: &Expr,
    op: CompareOp,
    right: &Expr,
    table: &TableDef,
) -> DbResult<PredicateNode> {
    let (column, op, literal) = match (literal_of(left), literal_of(right)) {
        (None, Some(lit)) => (column_name(left)?, op, lit),
        (Some(lit), None) => (column_name(right)?, op.flipped(), lit),
        _ => {
            return Err(DbError::not_supported(format!(
                "comparison {left} vs {right}; one side must be a column and the other a literal"
            )))
        }
    };

    let column_def = table.column_required(&column)?;
    let ty = column_def.sql_type()?;
    let value = Value::from_literal(literal, &ty, &column)?;

    Ok(PredicateNode::Leaf(Condition { column, op, value }))
}

fn null_test(expr: &Expr, op: CompareOp, table: &TableDef) -> DbResult<PredicateNode> {
    let column = column_name(expr)?;
    table.column_required(&column)?;
    Ok(PredicateNode::Leaf(Condition {
        column,
        op,
        value: Value::Null,
    }))
}

/// Pushes NOT to the leaves and flattens nested AND/OR chains.
pub fn normalize(node: PredicateNode) -> PredicateNode {
    match node {
        PredicateNode::Not(inner) => negate(*inner),
        PredicateNode::And(children) => {
            let mut flat = Vec::with_capacity(children.len());
            for child in children {
                match normalize(child) {
                    PredicateNode::And(grandchildren) => flat.extend(grandchildren),
                    other => flat.push(other),
                }
            }
            unwrap_single(PredicateNode::And(flat))
        }
        PredicateNode::Or(children) => {
            let mut flat = Vec::with_capacity(children.len());
            for child in children {
                match normalize(child) {
                    PredicateNode::Or(grandchildren) => flat.extend(grandchildren),
                    other => flat.push(other),
                }
            }
            unwrap_single(PredicateNode::Or(flat))
        }
        leaf => leaf,
    }
}

/// The normalized negation of a tree.
pub fn negate(node: PredicateNode) -> PredicateNode {
    match node {
        PredicateNode::Not(inner) => normalize(*inner),
        PredicateNode::And(children) => normalize(PredicateNode::Or(
            children
                .into_iter()
                .map(|c| PredicateNode::Not(Box::new(c)))
                .collect(),
        )),
        PredicateNode::Or(children) => normalize(PredicateNode::And(
            children
                .into_iter()
                .map(|c| PredicateNode::Not(Box::new(c)))
                .collect(),
        )),
        PredicateNode::Leaf(mut cond) => {
            cond.op = cond.op.inverted();
            PredicateNode::Leaf(cond)
        }
    }
}

fn unwrap_single(node: PredicateNode) -> PredicateNode {
    match node {
        PredicateNode::And(mut children) if children.len() == 1 => children.remove(0),
        PredicateNode::Or(mut children) if children.len() == 1 => children.remove(0),
        other => other,
    }
}

/// Result of lowering a predicate tree.
#[derive(Debug, Default)]
pub struct Lowered {
    /// Backing-store predicate fragments, implicitly ANDed.
    pub fragments: Vec<String>,
    /// Residual trees evaluated in-core on decoded rows, implicitly ANDed.
    pub post_filters: Vec<PredicateNode>,
}

/// Lowers a normalized tree into predicate fragments and post-filters.
pub fn lower(node: &PredicateNode, table: &TableDef) -> DbResult<Lowered> {
    let mut out = Lowered::default();
    lower_into(node, table, &mut out)?;
    Ok(out)
}

fn lower_into(node: &PredicateNode, table: &TableDef, out: &mut Lowered) -> DbResult<()> {
    match node {
        PredicateNode::And(children) => {
            for child in children {
                lower_into(child, table, out)?;
            }
            Ok(())
        }
        PredicateNode::Or(children) => {
            // An OR can only be pushed down whole: if any branch needs
            // in-core evaluation, evaluate the whole disjunction in-core.
            let mut branches = Vec::with_capacity(children.len());
            let mut pushable = true;
            for child in children {
                let mut branch = Lowered::default();
                lower_into(child, table, &mut branch)?;
                if branch.post_filters.is_empty() && branch.fragments.len() == 1 {
                    branches.push(branch.fragments.remove(0));
                } else if branch.post_filters.is_empty() && !branch.fragments.is_empty() {
                    // Parenthesize so the conjunction binds before `||`.
                    branches.push(format!("({})", branch.fragments.join(" && ")));
                } else {
                    pushable = false;
                    break;
                }
            }
            if pushable {
                out.fragments.push(format!("({})", branches.join(" || ")));
            } else {
                out.post_filters.push(node.clone());
            }
            Ok(())
        }
        PredicateNode::Not(_) => Err(DbError::internal(
            "NOT survived predicate normalization".to_string(),
        )),
        PredicateNode::Leaf(cond) => {
            match lower_leaf(cond, table)? {
                Some(fragment) => out.fragments.push(fragment),
                None => out.post_filters.push(node.clone()),
            }
            Ok(())
        }
    }
}

/// Lowers one leaf. `Ok(None)` means the condition is valid but must be
/// evaluated in-core.
fn lower_leaf(cond: &Condition, table: &TableDef) -> DbResult<Option<String>> {
    let column_def = table.column_required(&cond.column)?;
    let ty = column_def.sql_type()?;

    // Predicates over payload-only types cannot be served, not even by
    // post-filtering: their values have no store-side order to anchor to.
    if !ty.is_indexable() {
        return Err(DbError::not_supported(format!(
            "column {} is not indexable",
            cond.column
        )));
    }

    if matches!(
        cond.op,
        CompareOp::IsNull | CompareOp::IsNotNull | CompareOp::NotLike
    ) {
        return Ok(None);
    }
    if !table.is_indexed(&cond.column) {
        return Ok(None);
    }
    if cond.value.is_null() {
        // A comparison against NULL matches nothing; the post-filter
        // evaluates it to false uniformly.
        return Ok(None);
    }

    let key = golemdb_common::constants::index_key(&cond.column);

    if cond.op == CompareOp::Like {
        let Value::String(pattern) = &cond.value else {
            return Err(DbError::internal("LIKE with non-string pattern".to_string()));
        };
        let Some(prefix) = like_prefix(pattern) else {
            return Err(DbError::not_supported(format!(
                "LIKE pattern {pattern:?} on indexed column {}; only a single trailing % is supported",
                cond.column
            )));
        };
        let glob = format!("{}*", escape_glob_literal(&prefix));
        return Ok(Some(format!("{key} ~ \"{}\"", escape_string(&glob))));
    }

    let encoded = codec::encode_value(&cond.value, &ty)?;
    let rendered = match &encoded {
        EncodedValue::Numeric(u) => u.to_string(),
        EncodedValue::Str(s) => format!("\"{}\"", escape_string(s)),
    };

    if cond.op == CompareOp::NotEq {
        // The store grammar has no inequality operator; split the range.
        // Rows with a NULL value carry no idx_ annotation and fall out of
        // both branches, matching SQL semantics.
        return Ok(Some(format!("({key}<{rendered} || {key}>{rendered})")));
    }

    let op = cond
        .op
        .store_op()
        .ok_or_else(|| DbError::internal(format!("unloweable operator {:?}", cond.op)))?;
    Ok(Some(format!("{key}{op}{rendered}")))
}

/// Extracts the prefix of a `prefix%` LIKE pattern.
///
/// Returns `None` unless the pattern is exactly one trailing unescaped `%`
/// with no other wildcards. Backslash escapes (`\%`, `\_`, `\\`) in the
/// prefix are unescaped.
fn like_prefix(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut prefix = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                prefix.push(chars[i + 1]);
                i += 2;
            }
            '%' => {
                // Must be the final character.
                return if i == chars.len() - 1 {
                    Some(prefix)
                } else {
                    None
                };
            }
            '_' => return None,
            c => {
                prefix.push(c);
                i += 1;
            }
        }
    }
    // No wildcard at all; an exact match is still a valid glob.
    Some(prefix)
}

/// Escapes glob metacharacters so they match literally.
fn escape_glob_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '*' | '?' | '[' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            other => out.push(other),
        }
    }
    out
}

/// Escapes a string for inclusion in a double-quoted predicate literal.
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
