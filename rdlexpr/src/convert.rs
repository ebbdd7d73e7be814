//! The conversion table.
//!
//! Every non-authoritative evaluator goes through these functions, so the
//! rules below are the only coercions the engine performs:
//!
//! | from \ to | Boolean | Int32 | Double | Decimal | String | DateTime |
//! |-----------|---------|-------|--------|---------|--------|----------|
//! | Boolean   | id | 1 / 0 | 1 / 0 | 1 / 0 | `True` / `False` | error |
//! | Int32     | non-zero | id | exact | exact | digits | error |
//! | Double    | non-zero | half-even, range checked | id | shortest repr, finite only | shortest repr | error |
//! | Decimal   | non-zero | half-even, range checked | nearest | id | plain | error |
//! | String    | `true`/`false` | parse | parse | parse | id | ISO 8601 |
//! | DateTime  | error | error | error | error | ISO 8601 | id |
//! | Empty     | false | 0 | 0 | 0 | empty | 0001-01-01T00:00:00 |
//!
//! Strings are trimmed before parsing and parsed locale-invariantly. Any
//! conversion marked `error` (or a failed parse) yields
//! [`Error::Conversion`](crate::Error::Conversion).
use std::str::FromStr;

use bigdecimal::{BigDecimal, FromPrimitive, RoundingMode, Signed, ToPrimitive, Zero};
use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    error::{Error, Result},
    kind::ValueKind,
    value::Value,
};

/// Accepted input layouts for string to date-time conversion, tried in order.
const DATETIME_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn incompatible(value: &Value, to: ValueKind) -> Error {
    Error::Conversion {
        value: value.to_string(),
        from: value.kind(),
        to,
    }
}

/// Out-of-range decimal, rendered in exponent form so the digits are never expanded.
fn decimal_out_of_range(v: &BigDecimal, to: ValueKind) -> Error {
    let (digits, scale) = v.as_bigint_and_exponent();
    Error::Conversion {
        value: format!("{}e{}", digits, -scale),
        from: ValueKind::Decimal,
        to,
    }
}

/// Decimal order of magnitude `m`, with `10^(m-1) <= |v| < 10^m` for non-zero
/// `v`. Read from the digit count and scale, without rescaling.
fn magnitude(v: &BigDecimal) -> i64 {
    let (_, scale) = v.as_bigint_and_exponent();
    (v.digits() as i64).saturating_sub(scale)
}

fn round_to_int32(value: &Value, rounded: Option<i32>) -> Result<i32> {
    rounded.ok_or_else(|| incompatible(value, ValueKind::Int32))
}

/// The date-time an empty value converts to.
pub fn empty_datetime() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

impl Value {
    pub fn to_boolean(&self) -> Result<bool> {
        match self {
            Value::Empty => Ok(false),
            Value::Boolean(v) => Ok(*v),
            Value::Int32(v) => Ok(*v != 0),
            Value::Double(v) => Ok(*v != 0.0),
            Value::Decimal(v) => Ok(!v.is_zero()),
            Value::String(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(incompatible(self, ValueKind::Boolean))
                }
            }
            Value::DateTime(_) => Err(incompatible(self, ValueKind::Boolean)),
        }
    }

    pub fn to_int32(&self) -> Result<i32> {
        match self {
            Value::Empty => Ok(0),
            Value::Boolean(v) => Ok(i32::from(*v)),
            Value::Int32(v) => Ok(*v),
            Value::Double(v) => {
                let rounded = v.round_ties_even();
                let fits = rounded.is_finite()
                    && rounded >= f64::from(i32::MIN)
                    && rounded <= f64::from(i32::MAX);
                round_to_int32(self, fits.then_some(rounded as i32))
            }
            // Below 0.1 rounds to zero; ten or more integer digits never fit.
            Value::Decimal(v) if v.is_zero() || magnitude(v) < 0 => Ok(0),
            Value::Decimal(v) if magnitude(v) > 10 => Err(decimal_out_of_range(v, ValueKind::Int32)),
            Value::Decimal(v) => round_to_int32(
                self,
                v.with_scale_round(0, RoundingMode::HalfEven).to_i32(),
            ),
            Value::String(s) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| incompatible(self, ValueKind::Int32)),
            Value::DateTime(_) => Err(incompatible(self, ValueKind::Int32)),
        }
    }

    pub fn to_double(&self) -> Result<f64> {
        match self {
            Value::Empty => Ok(0.0),
            Value::Boolean(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Value::Int32(v) => Ok(f64::from(*v)),
            Value::Double(v) => Ok(*v),
            Value::Decimal(v) if !v.is_zero() && magnitude(v) > 309 => {
                Ok(if v.is_negative() { f64::NEG_INFINITY } else { f64::INFINITY })
            }
            Value::Decimal(v) if v.is_zero() || magnitude(v) < -324 => {
                Ok(if v.is_negative() { -0.0 } else { 0.0 })
            }
            Value::Decimal(v) => v.to_f64().ok_or_else(|| incompatible(self, ValueKind::Double)),
            Value::String(s) => parse_double(s.trim()).ok_or_else(|| incompatible(self, ValueKind::Double)),
            Value::DateTime(_) => Err(incompatible(self, ValueKind::Double)),
        }
    }

    pub fn to_decimal(&self) -> Result<BigDecimal> {
        match self {
            Value::Empty => Ok(BigDecimal::zero()),
            Value::Boolean(v) => Ok(BigDecimal::from(i32::from(*v))),
            Value::Int32(v) => Ok(BigDecimal::from(*v)),
            Value::Double(v) if v.is_finite() => {
                // Shortest round-trip digits, not the exact binary expansion.
                BigDecimal::from_str(&v.to_string())
                    .ok()
                    .or_else(|| BigDecimal::from_f64(*v))
                    .ok_or_else(|| incompatible(self, ValueKind::Decimal))
            }
            Value::Double(_) => Err(incompatible(self, ValueKind::Decimal)),
            Value::Decimal(v) => Ok(v.clone()),
            Value::String(s) => {
                BigDecimal::from_str(s.trim()).map_err(|_| incompatible(self, ValueKind::Decimal))
            }
            Value::DateTime(_) => Err(incompatible(self, ValueKind::Decimal)),
        }
    }

    /// Conversion to the `String` kind. Never fails.
    pub fn to_text(&self) -> Result<String> {
        Ok(match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn to_datetime(&self) -> Result<NaiveDateTime> {
        match self {
            Value::Empty => Ok(empty_datetime()),
            Value::DateTime(v) => Ok(*v),
            Value::String(s) => {
                parse_datetime(s.trim()).ok_or_else(|| incompatible(self, ValueKind::DateTime))
            }
            _ => Err(incompatible(self, ValueKind::DateTime)),
        }
    }

    /// Converts the value to `kind`. Converting to `Variant` is the identity.
    pub fn convert(self, kind: ValueKind) -> Result<Value> {
        if self.kind() == kind || kind.is_variant() {
            return Ok(self);
        }

        Ok(match kind {
            ValueKind::Boolean => Value::Boolean(self.to_boolean()?),
            ValueKind::Int32 => Value::Int32(self.to_int32()?),
            ValueKind::Double => Value::Double(self.to_double()?),
            ValueKind::Decimal => Value::Decimal(self.to_decimal()?),
            ValueKind::String => Value::String(self.to_text()?),
            ValueKind::DateTime => Value::DateTime(self.to_datetime()?),
            ValueKind::Variant => self,
        })
    }
}

fn parse_double(s: &str) -> Option<f64> {
    match s {
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        // Rust also accepts "inf" / "nan" spellings, which the table does not.
        _ if s.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) => None,
        _ => s.parse::<f64>().ok(),
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
