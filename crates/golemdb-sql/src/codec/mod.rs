//! Order-preserving value encodings.
//!
//! The backing store ranks numeric annotations by u64 order and string
//! annotations by byte order. Every indexable SQL type therefore encodes to
//! a representation whose native order agrees with the type's semantic
//! order:
//!
//! - signed integers flip the sign bit of their 64-bit representation
//!   (`v + 2^63 mod 2^64`), so `i64::MIN` maps to 0 and `i64::MAX` to
//!   `u64::MAX`; narrower widths use the same map with tighter range checks
//! - booleans map to 0/1
//! - timestamps are Unix epoch seconds (pre-epoch values are rejected)
//! - decimals encode to strings whose byte order matches numeric order
//!   ([`decimal`])
//! - strings pass through as raw UTF-8
//!
//! All encoders are pure and total over their validated domains, and
//! round-trip exactly.

pub mod decimal;

use golemdb_common::{DbError, DbResult};

use crate::parser::SqlType;
use crate::value::Value;

const SIGN_BIT: u64 = 1 << 63;

/// An encoded annotation value, ready to be attached to an entity or
/// spliced into a predicate string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedValue {
    /// Goes into the numeric annotation map.
    Numeric(u64),
    /// Goes into the string annotation map.
    Str(String),
}

/// Encodes a signed integer of the given bit width into an
/// order-preserving u64.
pub fn encode_signed(v: i64, bits: u32) -> DbResult<u64> {
    check_width(v, bits)?;
    Ok((v as u64) ^ SIGN_BIT)
}

/// Reverses [`encode_signed`].
pub fn decode_signed(u: u64, bits: u32) -> DbResult<i64> {
    let v = (u ^ SIGN_BIT) as i64;
    check_width(v, bits)?;
    Ok(v)
}

fn check_width(v: i64, bits: u32) -> DbResult<()> {
    let (min, max) = match bits {
        8 => (i8::MIN as i64, i8::MAX as i64),
        16 => (i16::MIN as i64, i16::MAX as i64),
        32 => (i32::MIN as i64, i32::MAX as i64),
        64 => (i64::MIN, i64::MAX),
        other => {
            return Err(DbError::internal(format!(
                "unsupported integer bit width {other}"
            )))
        }
    };
    if v < min || v > max {
        return Err(DbError::data(format!(
            "integer {v} out of range for {bits}-bit column"
        )));
    }
    Ok(())
}

/// Encodes a boolean: `false` to 0, `true` to 1.
pub fn encode_bool(b: bool) -> u64 {
    u64::from(b)
}

/// Encodes Unix epoch seconds. Pre-epoch instants are rejected.
pub fn encode_timestamp(secs: i64) -> DbResult<u64> {
    if secs < 0 {
        return Err(DbError::data(format!(
            "timestamp precedes the Unix epoch: {secs}"
        )));
    }
    Ok(secs as u64)
}

/// Encodes a non-NULL value of the given declared type into its annotation
/// representation.
///
/// Callers must have excluded NULLs and non-indexable types; hitting either
/// here is a codec invariant violation.
pub fn encode_value(value: &Value, ty: &SqlType) -> DbResult<EncodedValue> {
    match (value, ty) {
        (Value::Boolean(b), SqlType::Boolean) => Ok(EncodedValue::Numeric(encode_bool(*b))),
        (Value::TinyInt(i), _) => Ok(EncodedValue::Numeric(encode_signed(*i as i64, 8)?)),
        (Value::SmallInt(i), _) => Ok(EncodedValue::Numeric(encode_signed(*i as i64, 16)?)),
        (Value::Int(i), _) => Ok(EncodedValue::Numeric(encode_signed(*i as i64, 32)?)),
        (Value::BigInt(i), _) => Ok(EncodedValue::Numeric(encode_signed(*i, 64)?)),
        (Value::Timestamp(t), _) => Ok(EncodedValue::Numeric(encode_timestamp(*t)?)),
        (Value::Decimal { unscaled, .. }, SqlType::Decimal { precision, scale }) => Ok(
            EncodedValue::Str(decimal::encode_decimal(*unscaled, *precision, *scale)?),
        ),
        (Value::String(s), SqlType::Char(_) | SqlType::Varchar(_) | SqlType::Text) => {
            Ok(EncodedValue::Str(s.clone()))
        }
        (value, ty) => Err(DbError::internal(format!(
            "cannot encode {} value for {ty} annotation",
            value.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary_values(bits: u32) -> Vec<i64> {
        let (min, max) = match bits {
            8 => (i8::MIN as i64, i8::MAX as i64),
            16 => (i16::MIN as i64, i16::MAX as i64),
            32 => (i32::MIN as i64, i32::MAX as i64),
            _ => (i64::MIN, i64::MAX),
        };
        vec![min, min + 1, -1, 0, 1, max - 1, max]
    }

    #[test]
    fn test_signed_monotonicity_all_widths() {
        for bits in [8, 16, 32, 64] {
            let values = boundary_values(bits);
            for (i, &a) in values.iter().enumerate() {
                for &b in &values[i + 1..] {
                    let ea = encode_signed(a, bits).unwrap();
                    let eb = encode_signed(b, bits).unwrap();
                    assert!(
                        ea < eb,
                        "{bits}-bit: {a} < {b} but {ea} >= {eb}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_signed_round_trip() {
        for bits in [8, 16, 32, 64] {
            for v in boundary_values(bits) {
                let encoded = encode_signed(v, bits).unwrap();
                assert_eq!(decode_signed(encoded, bits).unwrap(), v);
            }
        }
    }

    #[test]
    fn test_known_encodings() {
        // Zero maps to the sign bit; 30 lands just above it. These constants
        // are visible in predicate strings and must not drift.
        assert_eq!(encode_signed(0, 64).unwrap(), 0x8000_0000_0000_0000);
        assert_eq!(encode_signed(30, 32).unwrap(), 9_223_372_036_854_775_838);
        assert_eq!(encode_signed(i64::MIN, 64).unwrap(), 0);
        assert_eq!(encode_signed(i64::MAX, 64).unwrap(), u64::MAX);
    }

    #[test]
    fn test_width_range_enforced() {
        assert!(encode_signed(128, 8).is_err());
        assert!(encode_signed(-129, 8).is_err());
        assert!(encode_signed(32_768, 16).is_err());
        assert!(encode_signed(1 << 31, 32).is_err());
        assert!(encode_signed(i64::MAX, 64).is_ok());

        // Decoding a u64 that came from a wider value fails the width check.
        let wide = encode_signed(1 << 20, 64).unwrap();
        assert!(decode_signed(wide, 16).is_err());
    }

    #[test]
    fn test_bool_and_timestamp() {
        assert_eq!(encode_bool(false), 0);
        assert_eq!(encode_bool(true), 1);

        assert_eq!(encode_timestamp(1_703_509_800).unwrap(), 1_703_509_800);
        assert!(encode_timestamp(-1).is_err());

        let t1 = encode_timestamp(100).unwrap();
        let t2 = encode_timestamp(200).unwrap();
        assert!(t1 < t2);
    }

    #[test]
    fn test_encode_value_dispatch() {
        let encoded = encode_value(&Value::Int(-5), &SqlType::Int).unwrap();
        assert_eq!(encoded, EncodedValue::Numeric(encode_signed(-5, 32).unwrap()));

        let encoded = encode_value(
            &Value::String("Al".to_string()),
            &SqlType::Varchar(Some(50)),
        )
        .unwrap();
        assert_eq!(encoded, EncodedValue::Str("Al".to_string()));

        let encoded = encode_value(
            &Value::Decimal {
                unscaled: 1050,
                scale: 2,
            },
            &SqlType::Decimal {
                precision: 8,
                scale: 2,
            },
        )
        .unwrap();
        assert_eq!(encoded, EncodedValue::Str(".000010.50".to_string()));

        assert!(encode_value(&Value::Double(1.0), &SqlType::Double).is_err());
        assert!(encode_value(&Value::Null, &SqlType::Int).is_err());
    }
}
