//! Conversion of row values into SQL literal text.
//!
//! Only values go through these functions. Identifiers are never derived from
//! row data and are handled by the dialect instead.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::database::sql_value::{ColumnKind, SqlValue};

pub const NULL_LITERAL: &str = "NULL";

const QUOTE: char = '\'';

/// Encodes a text value as a quoted literal.
///
/// `None` and the empty string both encode to `NULL`. Embedded quote
/// delimiters are doubled, every other character is kept as is.
pub fn encode_text(value: Option<&str>) -> String {
    match value {
        None | Some("") => NULL_LITERAL.to_string(),
        Some(value) => {
            let mut literal = String::with_capacity(value.len() + 2);
            literal.push(QUOTE);
            for c in value.chars() {
                if c == QUOTE {
                    literal.push(QUOTE);
                }
                literal.push(c);
            }
            literal.push(QUOTE);
            literal
        }
    }
}

/// Encodes a numeric value as an unquoted literal in canonical decimal form.
///
/// A value that is missing, blank or not a number encodes to `NULL`. An
/// unparseable number is treated as missing data, never as an error.
pub fn encode_numeric(value: Option<&str>) -> String {
    value.and_then(canonical_number).unwrap_or_else(|| NULL_LITERAL.to_string())
}

/// Whether `value` is accepted by [`encode_numeric`] as a number.
pub fn is_numeric(value: &str) -> bool {
    split_number(value.trim()).is_some()
}

/// Encodes a row value using the rule of the column it is written to.
pub fn encode_value(value: &SqlValue, kind: ColumnKind) -> String {
    let raw = value.as_raw_string();
    match kind {
        ColumnKind::Numeric => encode_numeric(raw.as_deref()),
        ColumnKind::Text | ColumnKind::Date => encode_text(raw.as_deref()),
    }
}

/// Applies the same missing-value policy as [`encode_value`] to a value that
/// will be bound as a parameter instead of inlined.
pub fn coerce_value(value: &SqlValue, kind: ColumnKind) -> SqlValue {
    match (kind, value) {
        (_, SqlValue::Text(text)) if text.is_empty() => SqlValue::Null,
        (ColumnKind::Numeric, SqlValue::Text(text)) if !is_numeric(text) => SqlValue::Null,
        (ColumnKind::Numeric, SqlValue::Float(float)) if !float.is_finite() => SqlValue::Null,
        (ColumnKind::Numeric, SqlValue::Date(_)) => SqlValue::Null,
        _ => value.clone(),
    }
}

struct NumberParts<'a> {
    negative: bool,
    mantissa: &'a str,
    exponent: Option<&'a str>,
}

/// Splits `[+-]digits[.digits][(e|E)[+-]digits]` into its parts, requiring at
/// least one mantissa digit.
fn split_number(value: &str) -> Option<NumberParts<'_>> {
    let (negative, unsigned) = match value.as_bytes().first()? {
        b'-' => (true, &value[1..]),
        b'+' => (false, &value[1..]),
        _ => (false, value),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
        None => (unsigned, None),
    };

    let mut digits = 0;
    let mut dots = 0;
    for b in mantissa.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }

    if let Some(exponent) = exponent {
        let exponent_digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if exponent_digits.is_empty() || !exponent_digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    Some(NumberParts { negative, mantissa, exponent })
}

fn canonical_number(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let parts = split_number(trimmed)?;

    let mut mantissa = String::with_capacity(parts.mantissa.len() + 3);
    if parts.negative {
        mantissa.push('-');
    }
    if parts.mantissa.starts_with('.') {
        mantissa.push('0');
    }
    mantissa.push_str(parts.mantissa);
    if parts.mantissa.ends_with('.') {
        mantissa.push('0');
    }

    let parsed = match parts.exponent {
        None => Decimal::from_str(&mantissa),
        Some(exponent) => {
            let exponent = exponent.strip_prefix('+').unwrap_or(exponent);
            Decimal::from_scientific(&format!("{}e{}", mantissa, exponent))
        }
    };

    match parsed {
        // Decimal rounds past 28 digits instead of failing, so only trust it when exact
        Ok(decimal)
            if significant_digits(&decimal.to_string()) == significant_digits(&mantissa) =>
        {
            if decimal.is_zero() {
                Some("0".to_string())
            } else {
                Some(decimal.normalize().to_string())
            }
        }
        _ if parts.exponent.is_none() => Some(canonical_plain(parts.negative, parts.mantissa)),
        // already validated by the grammar, keep the digits verbatim
        _ => Some(trimmed.strip_prefix('+').unwrap_or(trimmed).to_string()),
    }
}

/// Number of digits between the first and last non-zero digit.
fn significant_digits(number: &str) -> usize {
    let digits: Vec<u8> = number.bytes().filter(u8::is_ascii_digit).collect();
    match (digits.iter().position(|&d| d != b'0'), digits.iter().rposition(|&d| d != b'0')) {
        (Some(first), Some(last)) => last - first + 1,
        _ => 0,
    }
}

/// Canonical form of `digits[.digits]` computed on the text itself, for
/// values with more precision than `Decimal` holds.
fn canonical_plain(negative: bool, mantissa: &str) -> String {
    let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let integer = integer.trim_start_matches('0');
    let fraction = fraction.trim_end_matches('0');

    if integer.is_empty() && fraction.is_empty() {
        return "0".to_string();
    }

    let mut canonical = String::with_capacity(integer.len() + fraction.len() + 3);
    if negative {
        canonical.push('-');
    }
    canonical.push_str(if integer.is_empty() { "0" } else { integer });
    if !fraction.is_empty() {
        canonical.push('.');
        canonical.push_str(fraction);
    }
    canonical
}
