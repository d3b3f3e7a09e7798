//! DECIMAL(p,s) handling.
//!
//! Decimals are kept as unscaled i128 integers at the column's declared
//! scale and encode to strings whose byte-lexicographic order matches
//! numeric order. The encoding for a non-negative value at `DECIMAL(p,s)`
//! is `'.' || zeropad(int_digits, p-s) || '.' || frac_digits`; with `s = 0`
//! the fractional section is omitted. Negative values take the positive
//! encoding of their magnitude, replace both separators with `'-'`, and
//! invert every digit. Since `'-'` (0x2D) sorts below `'.'` (0x2E), which
//! sorts below every digit, negatives order below positives and inverted
//! digits order more-negative values first. All encodings of one column
//! have identical length and separator positions, so comparisons only ever
//! see digit-against-digit.

use golemdb_common::{DbError, DbResult};

fn pow10(exp: u8) -> i128 {
    10i128.pow(exp as u32)
}

fn out_of_range(text: &str, precision: u8, scale: u8) -> DbError {
    DbError::data(format!(
        "numeric out of range for DECIMAL({precision},{scale}): {text}"
    ))
}

/// Parses decimal text into an unscaled integer at the declared scale.
///
/// Trailing fractional zeros beyond the scale are tolerated; any non-zero
/// digit beyond it, or too many integer digits, is a data error.
pub fn parse_decimal(text: &str, precision: u8, scale: u8) -> DbResult<i128> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    if digits.is_empty() || digits.contains(['e', 'E']) {
        return Err(out_of_range(text, precision, scale));
    }

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(out_of_range(text, precision, scale));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(out_of_range(text, precision, scale));
    }

    // Normalize the fraction to exactly `scale` digits.
    let frac_trimmed = frac_part.trim_end_matches('0');
    if frac_trimmed.len() > scale as usize {
        return Err(out_of_range(text, precision, scale));
    }
    let mut frac = String::from(frac_trimmed);
    while frac.len() < scale as usize {
        frac.push('0');
    }

    let int_trimmed = int_part.trim_start_matches('0');
    if int_trimmed.len() > (precision - scale) as usize {
        return Err(out_of_range(text, precision, scale));
    }

    let mut unscaled: i128 = 0;
    for b in int_trimmed.bytes().chain(frac.bytes()) {
        unscaled = unscaled * 10 + i128::from(b - b'0');
    }
    Ok(if negative { -unscaled } else { unscaled })
}

/// Renders an unscaled decimal as plain text (`1050` at scale 2 is
/// `"10.50"`).
pub fn format_decimal(unscaled: i128, scale: u8) -> String {
    if scale == 0 {
        return unscaled.to_string();
    }
    let sign = if unscaled < 0 { "-" } else { "" };
    let abs = unscaled.unsigned_abs();
    let divisor = pow10(scale) as u128;
    format!(
        "{sign}{}.{:0width$}",
        abs / divisor,
        abs % divisor,
        width = scale as usize
    )
}

/// Encodes an unscaled decimal into its order-preserving string form.
pub fn encode_decimal(unscaled: i128, precision: u8, scale: u8) -> DbResult<String> {
    let abs = unscaled.checked_abs().ok_or_else(|| {
        DbError::internal("decimal unscaled value overflows i128".to_string())
    })?;
    if abs >= pow10(precision) {
        return Err(out_of_range(
            &format_decimal(unscaled, scale),
            precision,
            scale,
        ));
    }

    let digits = format!("{abs:0width$}", width = precision as usize);
    let (int_digits, frac_digits) = digits.split_at((precision - scale) as usize);

    let mut out = String::with_capacity(precision as usize + 2);
    if unscaled >= 0 {
        out.push('.');
        out.push_str(int_digits);
        if scale > 0 {
            out.push('.');
            out.push_str(frac_digits);
        }
    } else {
        out.push('-');
        out.extend(int_digits.bytes().map(invert_digit));
        if scale > 0 {
            out.push('-');
            out.extend(frac_digits.bytes().map(invert_digit));
        }
    }
    Ok(out)
}

/// Decodes an encoded decimal back to its unscaled value and scale.
pub fn decode_decimal(encoded: &str) -> DbResult<(i128, u8)> {
    let malformed =
        || DbError::internal(format!("malformed decimal encoding: {encoded:?}"));

    let (negative, rest, separator) = match encoded.chars().next() {
        Some('.') => (false, &encoded[1..], '.'),
        Some('-') => (true, &encoded[1..], '-'),
        _ => return Err(malformed()),
    };

    let (int_digits, frac_digits) = match rest.split_once(separator) {
        Some((i, f)) => (i, f),
        None => (rest, ""),
    };
    if frac_digits.len() > u8::MAX as usize {
        return Err(malformed());
    }

    let mut unscaled: i128 = 0;
    for b in int_digits.bytes().chain(frac_digits.bytes()) {
        if !b.is_ascii_digit() {
            return Err(malformed());
        }
        let digit = if negative {
            invert_digit(b) as u8 - b'0'
        } else {
            b - b'0'
        };
        unscaled = unscaled * 10 + i128::from(digit);
    }

    Ok((
        if negative { -unscaled } else { unscaled },
        frac_digits.len() as u8,
    ))
}

fn invert_digit(b: u8) -> char {
    (b'0' + (b'9' - b)) as char
}
