//! In-core post-filtering.
//!
//! Conditions the backing store cannot evaluate (NULL tests, NOT LIKE,
//! predicates on non-indexed columns, OR groups with such branches) are
//! applied here, on decoded rows, with SQL three-valued semantics: a
//! comparison involving NULL is unknown and excludes the row, and only the
//! explicit NULL tests observe missing values.

use std::collections::BTreeMap;

use crate::value::Value;

use super::predicate::{negate, CompareOp, Condition, PredicateNode};

/// True if the decoded row satisfies the predicate tree.
pub fn row_matches(node: &PredicateNode, row: &BTreeMap<String, Value>) -> bool {
    match node {
        PredicateNode::And(children) => children.iter().all(|c| row_matches(c, row)),
        PredicateNode::Or(children) => children.iter().any(|c| row_matches(c, row)),
        PredicateNode::Not(inner) => row_matches(&negate((**inner).clone()), row),
        PredicateNode::Leaf(cond) => leaf_matches(cond, row),
    }
}

fn leaf_matches(cond: &Condition, row: &BTreeMap<String, Value>) -> bool {
    let actual = row.get(&cond.column).unwrap_or(&Value::Null);

    match cond.op {
        CompareOp::IsNull => return actual.is_null(),
        CompareOp::IsNotNull => return !actual.is_null(),
        _ => {}
    }

    if actual.is_null() || cond.value.is_null() {
        return false;
    }

    match cond.op {
        CompareOp::Eq => actual == &cond.value,
        CompareOp::NotEq => actual != &cond.value,
        CompareOp::Lt => actual < &cond.value,
        CompareOp::LtEq => actual <= &cond.value,
        CompareOp::Gt => actual > &cond.value,
        CompareOp::GtEq => actual >= &cond.value,
        CompareOp::Like | CompareOp::NotLike => {
            let (Value::String(text), Value::String(pattern)) = (actual, &cond.value) else {
                return false;
            };
            let matched = like_match(pattern, text);
            if cond.op == CompareOp::Like {
                matched
            } else {
                !matched
            }
        }
        CompareOp::IsNull | CompareOp::IsNotNull => unreachable!("handled above"),
    }
}

/// SQL LIKE matching: `%` any sequence, `_` any single character, `\`
/// escapes the next character.
pub fn like_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    like_match_at(&pattern, 0, &text, 0)
}

fn like_match_at(pattern: &[char], mut p: usize, text: &[char], mut t: usize) -> bool {
    while p < pattern.len() {
        match pattern[p] {
            '%' => {
                while p + 1 < pattern.len() && pattern[p + 1] == '%' {
                    p += 1;
                }
                if p + 1 == pattern.len() {
                    return true;
                }
                for start in t..=text.len() {
                    if like_match_at(pattern, p + 1, text, start) {
                        return true;
                    }
                }
                return false;
            }
            '_' => {
                if t >= text.len() {
                    return false;
                }
                p += 1;
                t += 1;
            }
            '\\' if p + 1 < pattern.len() => {
                if t >= text.len() || text[t] != pattern[p + 1] {
                    return false;
                }
                p += 2;
                t += 1;
            }
            c => {
                if t >= text.len() || text[t] != c {
                    return false;
                }
                p += 1;
                t += 1;
            }
        }
    }
    t == text.len()
}
