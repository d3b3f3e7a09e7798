//! Runtime SQL values.
//!
//! A `Value` is a literal after it has been checked against a declared
//! column type. Conversions are strict: the analyzer refuses values the
//! codec could not encode, so type errors surface before anything touches
//! the backing store.

use std::cmp::Ordering;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use golemdb_common::{DbError, DbResult};

use crate::codec::decimal;
use crate::parser::{Literal, SqlType};

/// A typed runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL.
    Null,
    /// BOOLEAN.
    Boolean(bool),
    /// TINYINT.
    TinyInt(i8),
    /// SMALLINT.
    SmallInt(i16),
    /// INTEGER.
    Int(i32),
    /// BIGINT.
    BigInt(i64),
    /// FLOAT / REAL.
    Float(f32),
    /// DOUBLE.
    Double(f64),
    /// DECIMAL, as an unscaled integer at the column's declared scale.
    Decimal {
        /// Unscaled value (`123.45` at scale 2 is `12345`).
        unscaled: i128,
        /// Declared scale.
        scale: u8,
    },
    /// CHAR / VARCHAR / TEXT.
    String(String),
    /// BLOB / VARBINARY.
    Bytes(Vec<u8>),
    /// DATETIME / TIMESTAMP, as Unix epoch seconds.
    Timestamp(i64),
}

impl Value {
    /// True for NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts a parsed literal into a value of the declared column type.
    pub fn from_literal(lit: &Literal, ty: &SqlType, column: &str) -> DbResult<Self> {
        let mismatch = || DbError::TypeMismatch {
            column: column.to_string(),
            expected: ty.to_string(),
            actual: lit.type_name().to_string(),
        };

        match lit {
            Literal::Null => Ok(Value::Null),
            Literal::Boolean(b) => match ty {
                SqlType::Boolean => Ok(Value::Boolean(*b)),
                _ => Err(mismatch()),
            },
            Literal::Integer(i) => match ty {
                SqlType::Boolean => match i {
                    0 => Ok(Value::Boolean(false)),
                    1 => Ok(Value::Boolean(true)),
                    _ => Err(mismatch()),
                },
                SqlType::TinyInt => int_in_range(*i, ty, column).map(|v| Value::TinyInt(v as i8)),
                SqlType::SmallInt => {
                    int_in_range(*i, ty, column).map(|v| Value::SmallInt(v as i16))
                }
                SqlType::Int => int_in_range(*i, ty, column).map(|v| Value::Int(v as i32)),
                SqlType::BigInt => Ok(Value::BigInt(*i)),
                SqlType::Float => Ok(Value::Float(*i as f32)),
                SqlType::Double => Ok(Value::Double(*i as f64)),
                SqlType::Decimal { precision, scale } => {
                    let unscaled = decimal::parse_decimal(&i.to_string(), *precision, *scale)?;
                    Ok(Value::Decimal {
                        unscaled,
                        scale: *scale,
                    })
                }
                SqlType::Timestamp => {
                    if *i < 0 {
                        Err(DbError::data(format!(
                            "timestamp for column '{column}' precedes the Unix epoch: {i}"
                        )))
                    } else {
                        Ok(Value::Timestamp(*i))
                    }
                }
                _ => Err(mismatch()),
            },
            Literal::Number(n) => match ty {
                SqlType::Float => n
                    .parse::<f32>()
                    .map(Value::Float)
                    .map_err(|_| mismatch()),
                SqlType::Double => n
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| mismatch()),
                SqlType::Decimal { precision, scale } => {
                    let unscaled = decimal::parse_decimal(n, *precision, *scale)?;
                    Ok(Value::Decimal {
                        unscaled,
                        scale: *scale,
                    })
                }
                _ => Err(mismatch()),
            },
            Literal::String(s) => match ty {
                SqlType::Char(limit) | SqlType::Varchar(limit) => {
                    check_char_length(s, *limit, ty, column)?;
                    Ok(Value::String(s.clone()))
                }
                SqlType::Text => Ok(Value::String(s.clone())),
                _ => Err(mismatch()),
            },
            Literal::Blob(b) => match ty {
                SqlType::Blob => Ok(Value::Bytes(b.clone())),
                _ => Err(mismatch()),
            },
        }
    }

    /// Canonical JSON form used in entity payloads.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::TinyInt(i) => serde_json::Value::from(*i),
            Value::SmallInt(i) => serde_json::Value::from(*i),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::BigInt(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f as f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Decimal { unscaled, scale } => {
                serde_json::Value::String(decimal::format_decimal(*unscaled, *scale))
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(BASE64.encode(b)),
            Value::Timestamp(t) => serde_json::Value::from(*t),
        }
    }

    /// Decodes a payload JSON value into the declared column type.
    pub fn from_json(json: &serde_json::Value, ty: &SqlType, column: &str) -> DbResult<Self> {
        let malformed = |detail: &str| {
            DbError::data(format!(
                "column '{column}' has a malformed payload value: {detail}"
            ))
        };

        if json.is_null() {
            return Ok(Value::Null);
        }

        match ty {
            SqlType::Boolean => json
                .as_bool()
                .map(Value::Boolean)
                .ok_or_else(|| malformed("expected boolean")),
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Int | SqlType::BigInt => {
                let i = json.as_i64().ok_or_else(|| malformed("expected integer"))?;
                match ty {
                    SqlType::TinyInt => int_in_range(i, ty, column).map(|v| Value::TinyInt(v as i8)),
                    SqlType::SmallInt => {
                        int_in_range(i, ty, column).map(|v| Value::SmallInt(v as i16))
                    }
                    SqlType::Int => int_in_range(i, ty, column).map(|v| Value::Int(v as i32)),
                    _ => Ok(Value::BigInt(i)),
                }
            }
            SqlType::Float => json
                .as_f64()
                .map(|f| Value::Float(f as f32))
                .ok_or_else(|| malformed("expected number")),
            SqlType::Double => json
                .as_f64()
                .map(Value::Double)
                .ok_or_else(|| malformed("expected number")),
            SqlType::Decimal { precision, scale } => {
                let text = match json {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => return Err(malformed("expected decimal string")),
                };
                let unscaled = decimal::parse_decimal(&text, *precision, *scale)?;
                Ok(Value::Decimal {
                    unscaled,
                    scale: *scale,
                })
            }
            SqlType::Char(_) | SqlType::Varchar(_) | SqlType::Text => json
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| malformed("expected string")),
            SqlType::Blob => {
                let text = json.as_str().ok_or_else(|| malformed("expected base64 string"))?;
                BASE64
                    .decode(text)
                    .map(Value::Bytes)
                    .map_err(|_| malformed("invalid base64"))
            }
            SqlType::Timestamp => {
                let t = json.as_i64().ok_or_else(|| malformed("expected integer"))?;
                if t < 0 {
                    Err(malformed("timestamp precedes the Unix epoch"))
                } else {
                    Ok(Value::Timestamp(t))
                }
            }
        }
    }

    /// Numeric view used for cross-type comparisons in sorts.
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::TinyInt(i) => Some(*i as f64),
            Value::SmallInt(i) => Some(*i as f64),
            Value::Int(i) => Some(*i as f64),
            Value::BigInt(i) => Some(*i as f64),
            Value::Float(f) => Some(*f as f64),
            Value::Double(f) => Some(*f),
            Value::Decimal { unscaled, scale } => {
                Some(*unscaled as f64 / 10f64.powi(*scale as i32))
            }
            Value::Timestamp(t) => Some(*t as f64),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "boolean",
            Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_) => "integer",
            Value::Float(_) | Value::Double(_) => "float",
            Value::Decimal { .. } => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "blob",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

fn int_in_range(i: i64, ty: &SqlType, column: &str) -> DbResult<i64> {
    let (min, max) = match ty {
        SqlType::TinyInt => (i8::MIN as i64, i8::MAX as i64),
        SqlType::SmallInt => (i16::MIN as i64, i16::MAX as i64),
        SqlType::Int => (i32::MIN as i64, i32::MAX as i64),
        _ => (i64::MIN, i64::MAX),
    };
    if i < min || i > max {
        Err(DbError::data(format!(
            "integer out of range for {ty} column '{column}': {i}"
        )))
    } else {
        Ok(i)
    }
}

fn check_char_length(s: &str, limit: Option<u32>, ty: &SqlType, column: &str) -> DbResult<()> {
    if let Some(limit) = limit {
        let chars = s.chars().count();
        if chars > limit as usize {
            return Err(DbError::data(format!(
                "value of {chars} characters exceeds {ty} for column '{column}'"
            )));
        }
    }
    Ok(())
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // NULL sorts before any value.
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,

            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::TinyInt(a), Value::TinyInt(b)) => a.cmp(b),
            (Value::SmallInt(a), Value::SmallInt(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::BigInt(a), Value::BigInt(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (
                Value::Decimal {
                    unscaled: a,
                    scale: sa,
                },
                Value::Decimal {
                    unscaled: b,
                    scale: sb,
                },
            ) if sa == sb => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),

            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(fa), Some(fb)) => fa.partial_cmp(&fb).unwrap_or(Ordering::Equal),
                _ => a.to_string().cmp(&b.to_string()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::TinyInt(i) => write!(f, "{i}"),
            Value::SmallInt(i) => write!(f, "{i}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::BigInt(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Decimal { unscaled, scale } => {
                write!(f, "{}", decimal::format_decimal(*unscaled, *scale))
            }
            Value::String(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "{}", BASE64.encode(b)),
            Value::Timestamp(t) => write!(f, "{t}"),
        }
    }
}
