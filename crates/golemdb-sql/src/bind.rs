//! Named-parameter binding.
//!
//! Parameters are substituted into the SQL text before parsing, the way the
//! adapter's host bindings expect: the canonical style is `%(name)s`, and
//! the `:name` style is accepted and treated identically. Positional styles
//! (`?`, `$1`) are rejected. Substitution skips string literals and
//! double-quoted identifiers, and renders each value as a properly escaped
//! SQL literal.

use std::collections::BTreeMap;

use golemdb_common::{DbError, DbResult};

/// A parameter value supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Exact decimal, as text (e.g. `"10.50"`).
    Decimal(String),
    /// String.
    Str(String),
    /// Binary.
    Bytes(Vec<u8>),
}

impl ParamValue {
    /// Renders this value as a SQL literal.
    fn render(&self) -> String {
        match self {
            ParamValue::Null => "NULL".to_string(),
            ParamValue::Bool(true) => "TRUE".to_string(),
            ParamValue::Bool(false) => "FALSE".to_string(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => {
                let mut s = f.to_string();
                if !s.contains('.') && !s.contains('e') && !s.contains("inf") && !s.contains("NaN")
                {
                    s.push_str(".0");
                }
                s
            }
            ParamValue::Decimal(d) => d.clone(),
            ParamValue::Str(s) => format!("'{}'", s.replace('\'', "''")),
            ParamValue::Bytes(b) => {
                let mut out = String::with_capacity(b.len() * 2 + 3);
                out.push_str("X'");
                for byte in b {
                    out.push_str(&format!("{byte:02X}"));
                }
                out.push('\'');
                out
            }
        }
    }
}

/// Named parameters for one statement execution.
pub type Params = BTreeMap<String, ParamValue>;

/// Substitutes `%(name)s` and `:name` placeholders with rendered literals.
///
/// Placeholders inside single-quoted strings and double-quoted identifiers
/// are left alone. A placeholder with no matching parameter is an error; so
/// is any positional placeholder.
pub fn substitute(sql: &str, params: &Params) -> DbResult<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            // Single-quoted string literal; '' is the escape.
            '\'' => {
                out.push('\'');
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            out.push('\'');
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            // Double-quoted identifier.
            '"' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '"' {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '%' if chars.get(i + 1) == Some(&'(') => {
                let start = i + 2;
                let Some(rel_end) = chars[start..].iter().position(|&c| c == ')') else {
                    return Err(DbError::Parameter {
                        message: "unterminated %(name)s placeholder".to_string(),
                    });
                };
                let end = start + rel_end;
                if chars.get(end + 1) != Some(&'s') {
                    return Err(DbError::Parameter {
                        message: "malformed placeholder; expected %(name)s".to_string(),
                    });
                }
                let name: String = chars[start..end].iter().collect();
                out.push_str(&lookup(params, &name)?);
                i = end + 2;
            }
            ':' => {
                // A cast operator `::` or a bare colon is not a placeholder.
                if chars.get(i + 1) == Some(&':') {
                    out.push_str("::");
                    i += 2;
                    continue;
                }
                let start = i + 1;
                let mut end = start;
                while end < chars.len()
                    && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                if end == start {
                    out.push(':');
                    i += 1;
                    continue;
                }
                let name: String = chars[start..end].iter().collect();
                out.push_str(&lookup(params, &name)?);
                i = end;
            }
            '?' => {
                return Err(DbError::not_supported(
                    "positional '?' parameters; use %(name)s".to_string(),
                ));
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

fn lookup(params: &Params, name: &str) -> DbResult<String> {
    params
        .get(name)
        .map(ParamValue::render)
        .ok_or_else(|| DbError::Parameter {
            message: format!("no value bound for parameter '{name}'"),
        })
}
