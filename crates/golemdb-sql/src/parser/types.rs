//! SQL data types and literals.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlparser::ast as sql_ast;

use golemdb_common::{DbError, DbResult};

/// Default precision for DECIMAL columns declared without one.
pub const DEFAULT_DECIMAL_PRECISION: u8 = 18;

/// Maximum supported DECIMAL precision (bounded by i128 arithmetic).
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// SQL scalar types supported by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    /// BOOLEAN.
    Boolean,
    /// 8-bit signed integer.
    TinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// 32-bit floating point. Payload-only; not indexable.
    Float,
    /// 64-bit floating point. Payload-only; not indexable.
    Double,
    /// Exact decimal with declared precision and scale.
    Decimal {
        /// Total significant digits.
        precision: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Fixed-length string; length in characters.
    Char(Option<u32>),
    /// Variable-length string; length limit in characters.
    Varchar(Option<u32>),
    /// Unlimited text.
    Text,
    /// Binary data. Payload-only; not indexable.
    Blob,
    /// Point in time, stored as Unix epoch seconds.
    Timestamp,
}

impl SqlType {
    /// True for the signed integer family.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Int | SqlType::BigInt
        )
    }

    /// True for types that encode into numeric (u64) annotations.
    pub fn is_numeric_annotation(&self) -> bool {
        self.is_integer() || matches!(self, SqlType::Boolean | SqlType::Timestamp)
    }

    /// True for types that encode into string annotations.
    pub fn is_string_annotation(&self) -> bool {
        matches!(
            self,
            SqlType::Char(_) | SqlType::Varchar(_) | SqlType::Text | SqlType::Decimal { .. }
        )
    }

    /// True if a column of this type can carry an index annotation.
    pub fn is_indexable(&self) -> bool {
        self.is_numeric_annotation() || self.is_string_annotation()
    }

    /// Bit width of an integer type.
    ///
    /// Callers must only ask for integer types; anything else is an
    /// internal error.
    pub fn bit_width(&self) -> DbResult<u32> {
        match self {
            SqlType::TinyInt => Ok(8),
            SqlType::SmallInt => Ok(16),
            SqlType::Int => Ok(32),
            SqlType::BigInt => Ok(64),
            other => Err(DbError::internal(format!(
                "bit_width requested for non-integer type {other}"
            ))),
        }
    }

    /// Converts from sqlparser's DataType.
    pub fn from_sql_ast(dt: &sql_ast::DataType) -> DbResult<Self> {
        match dt {
            sql_ast::DataType::Boolean => Ok(SqlType::Boolean),
            sql_ast::DataType::TinyInt(_) => Ok(SqlType::TinyInt),
            sql_ast::DataType::SmallInt(_) => Ok(SqlType::SmallInt),
            sql_ast::DataType::Int(_) | sql_ast::DataType::Integer(_) => Ok(SqlType::Int),
            sql_ast::DataType::BigInt(_) => Ok(SqlType::BigInt),
            sql_ast::DataType::Float(_) | sql_ast::DataType::Real => Ok(SqlType::Float),
            sql_ast::DataType::Double | sql_ast::DataType::DoublePrecision => Ok(SqlType::Double),
            sql_ast::DataType::Decimal(info)
            | sql_ast::DataType::Numeric(info)
            | sql_ast::DataType::Dec(info) => {
                let (precision, scale) = match info {
                    sql_ast::ExactNumberInfo::None => (DEFAULT_DECIMAL_PRECISION, 0),
                    sql_ast::ExactNumberInfo::Precision(p) => (*p as u8, 0),
                    sql_ast::ExactNumberInfo::PrecisionAndScale(p, s) => (*p as u8, *s as u8),
                };
                if precision == 0 || precision > MAX_DECIMAL_PRECISION {
                    return Err(DbError::ParseFailure {
                        message: format!(
                            "DECIMAL precision must be between 1 and {MAX_DECIMAL_PRECISION}, got {precision}"
                        ),
                    });
                }
                if scale > precision {
                    return Err(DbError::ParseFailure {
                        message: format!(
                            "DECIMAL scale {scale} exceeds precision {precision}"
                        ),
                    });
                }
                Ok(SqlType::Decimal { precision, scale })
            }
            sql_ast::DataType::Char(len) | sql_ast::DataType::Character(len) => {
                Ok(SqlType::Char(len.as_ref().and_then(extract_char_length)))
            }
            sql_ast::DataType::Varchar(len) | sql_ast::DataType::CharacterVarying(len) => {
                Ok(SqlType::Varchar(len.as_ref().and_then(extract_char_length)))
            }
            sql_ast::DataType::Text => Ok(SqlType::Text),
            sql_ast::DataType::Blob(_)
            | sql_ast::DataType::Bytea
            | sql_ast::DataType::Varbinary(_)
            | sql_ast::DataType::Binary(_) => Ok(SqlType::Blob),
            sql_ast::DataType::Timestamp(_, _) | sql_ast::DataType::Datetime(_) => {
                Ok(SqlType::Timestamp)
            }
            _ => Err(DbError::not_supported(format!("data type {dt}"))),
        }
    }

    /// Base type name as stored in the catalog (`VARCHAR`, `DECIMAL`, ...).
    pub fn base_name(&self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Int => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Decimal { .. } => "DECIMAL",
            SqlType::Char(_) => "CHAR",
            SqlType::Varchar(_) => "VARCHAR",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
            SqlType::Timestamp => "DATETIME",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            SqlType::Char(Some(n)) => write!(f, "CHAR({n})"),
            SqlType::Varchar(Some(n)) => write!(f, "VARCHAR({n})"),
            other => write!(f, "{}", other.base_name()),
        }
    }
}

fn extract_char_length(cl: &sql_ast::CharacterLength) -> Option<u32> {
    match cl {
        sql_ast::CharacterLength::IntegerLength { length, .. } => Some(*length as u32),
        sql_ast::CharacterLength::Max => None,
    }
}

/// A literal value appearing in SQL text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// NULL.
    Null,
    /// TRUE / FALSE.
    Boolean(bool),
    /// A numeric literal without a fractional part.
    Integer(i64),
    /// A numeric literal with a fractional part or exponent, kept as raw
    /// text so DECIMAL columns see the exact digits.
    Number(String),
    /// A quoted string.
    String(String),
    /// A hex blob literal (`X'...'`).
    Blob(Vec<u8>),
}

impl Literal {
    /// True for NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Converts from sqlparser's Value.
    pub fn from_sql_ast(value: &sql_ast::Value) -> DbResult<Self> {
        match value {
            sql_ast::Value::Null => Ok(Literal::Null),
            sql_ast::Value::Boolean(b) => Ok(Literal::Boolean(*b)),
            sql_ast::Value::Number(n, _) => {
                if let Ok(i) = n.parse::<i64>() {
                    Ok(Literal::Integer(i))
                } else if n.parse::<f64>().is_ok() {
                    Ok(Literal::Number(n.clone()))
                } else {
                    Err(DbError::ParseFailure {
                        message: format!("invalid numeric literal: {n}"),
                    })
                }
            }
            sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::DoubleQuotedString(s) => {
                Ok(Literal::String(s.clone()))
            }
            sql_ast::Value::HexStringLiteral(h) => Ok(Literal::Blob(hex_to_bytes(h)?)),
            other => Err(DbError::not_supported(format!("literal {other:?}"))),
        }
    }

    /// Negates a numeric literal. Used to fold unary minus.
    pub fn negate(&self) -> DbResult<Self> {
        match self {
            Literal::Integer(i) => {
                i.checked_neg().map(Literal::Integer).ok_or_else(|| {
                    DbError::data(format!("integer literal -({i}) out of range"))
                })
            }
            Literal::Number(n) => {
                if let Some(stripped) = n.strip_prefix('-') {
                    Ok(Literal::Number(stripped.to_string()))
                } else {
                    Ok(Literal::Number(format!("-{n}")))
                }
            }
            other => Err(DbError::ParseFailure {
                message: format!("cannot negate non-numeric literal {other}"),
            }),
        }
    }

    /// Short description used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Null => "NULL",
            Literal::Boolean(_) => "boolean",
            Literal::Integer(_) => "integer",
            Literal::Number(_) => "number",
            Literal::String(_) => "string",
            Literal::Blob(_) => "blob",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Blob(b) => {
                write!(f, "X'")?;
                for byte in b {
                    write!(f, "{byte:02X}")?;
                }
                write!(f, "'")
            }
        }
    }
}

fn hex_to_bytes(hex: &str) -> DbResult<Vec<u8>> {
    let hex = hex.trim_start_matches("0x").trim_start_matches("0X");
    if hex.len() % 2 != 0 {
        return Err(DbError::ParseFailure {
            message: "odd hex string length".to_string(),
        });
    }
    hex.as_bytes()
        .chunks(2)
        .map(|chunk| {
            let s = std::str::from_utf8(chunk).map_err(|_| DbError::ParseFailure {
                message: "invalid hex character".to_string(),
            })?;
            u8::from_str_radix(s, 16).map_err(|_| DbError::ParseFailure {
                message: format!("invalid hex: {s}"),
            })
        })
        .collect()
}

/// Validates an identifier against the `[A-Za-z_][A-Za-z0-9_]*` rule.
pub fn validate_identifier(name: &str) -> DbResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DbError::ParseFailure {
            message: format!("invalid identifier: {name:?}"),
        })
    }
}
