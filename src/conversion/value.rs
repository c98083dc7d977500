//! Unit conversion and type casting of raw source strings.

use thiserror::Error;

use crate::mapping::DeclaredType;
use crate::types::{DataType, TypedValue, Value};

/// A unit factor was configured but the source value is not a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply unit factor '{factor}' to '{raw}': {message}")]
pub struct UnitConversionError {
    pub raw: String,
    pub factor: String,
    pub message: String,
}

/// Result of converting one raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// `None` when the declared type is not recognized.
    pub value: Option<TypedValue>,
    /// Set when unit conversion was skipped; `value` then holds the unconverted input.
    pub warning: Option<UnitConversionError>,
}

/// Apply the unit factor (if any) and cast to the declared type.
pub fn convert(raw: &str, unit_factor: &str, declared: &DeclaredType, unit: &str) -> Conversion {
    let (text, warning) = if unit_factor.is_empty() {
        (raw.to_string(), None)
    } else {
        match apply_unit_factor(raw, unit_factor) {
            Ok(converted) => (converted, None),
            Err(err) => (raw.to_string(), Some(err)),
        }
    };

    let value = match declared {
        DeclaredType::Known(data_type) => Some(cast(&text, *data_type, unit)),
        DeclaredType::Unrecognized(_) => None,
    };
    Conversion { value, warning }
}

/// Multiply a numeric string by `factor` and render it fixed-point with 16 decimals.
///
/// An unparseable factor counts as `0`.
///
/// ```
/// use oscem_converter::conversion::value::apply_unit_factor;
///
/// assert_eq!(apply_unit_factor("10", "0.5").unwrap(), "5.0000000000000000");
/// assert!(apply_unit_factor("n/a", "0.5").is_err());
/// ```
pub fn apply_unit_factor(raw: &str, factor: &str) -> Result<String, UnitConversionError> {
    let number = raw.parse::<f64>().map_err(|e| UnitConversionError {
        raw: raw.to_string(),
        factor: factor.to_string(),
        message: e.to_string(),
    })?;
    let factor = factor.parse::<f64>().unwrap_or(0.0);
    Ok(format!("{:.16}", number * factor))
}

/// Cast text to `data_type`. Always produces a set value.
///
/// Numbers are read best-effort from the start of the text; when nothing numeric is found the
/// result is the type's zero, still marked as set. Booleans are `true` only for a
/// case-insensitive `"true"`. The unit is kept for numeric types only.
pub fn cast(text: &str, data_type: DataType, unit: &str) -> TypedValue {
    match data_type {
        DataType::Int64 => TypedValue::set(Value::Int64(scan_int(text).unwrap_or(0)), unit),
        DataType::Float64 => TypedValue::set(Value::Float64(scan_float(text).unwrap_or(0.0)), unit),
        DataType::Bool => TypedValue::set(Value::Bool(text.eq_ignore_ascii_case("true")), ""),
        DataType::Utf8 => TypedValue::set(Value::Utf8(text.to_string()), ""),
    }
}

/// Leading decimal integer: optional whitespace, optional sign, digits.
fn scan_int(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

/// Leading decimal float: sign, digits with optional fraction, optional exponent. Also accepts
/// `inf`, `infinity` and `nan`. An exponent marker without digits fails the scan.
fn scan_float(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    for special in ["infinity", "inf", "nan"] {
        let word = s.get(end..end + special.len());
        if word.is_some_and(|w| w.eq_ignore_ascii_case(special)) {
            return s[..end + special.len()].parse().ok();
        }
    }

    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end == exp_digits {
            return None;
        }
        end = exp_end;
    }
    s[..end].parse().ok()
}
