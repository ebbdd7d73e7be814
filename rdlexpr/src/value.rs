//! Runtime values produced by evaluation.
use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

use crate::kind::ValueKind;

/// Format used for date-time values everywhere a string is produced.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A single evaluated value.
///
/// `Empty` is the "no value" result (e.g. a `Switch` without a matching
/// branch). It reports the `Variant` kind.
#[derive(Debug, Clone, PartialEq, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Empty,
    Boolean(bool),
    Int32(i32),
    Double(f64),
    Decimal(BigDecimal),
    String(String),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Kind of the value as observed at runtime.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Empty => ValueKind::Variant,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Int32(_) => ValueKind::Int32,
            Value::Double(_) => ValueKind::Double,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::String(_) => ValueKind::String,
            Value::DateTime(_) => ValueKind::DateTime,
        }
    }

    /// Strict identity: like `==`, except that two NaN doubles are identical
    /// and `0.0` differs from `-0.0`.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()),
            (Value::Decimal(a), Value::Decimal(b)) => a == b && a.to_string() == b.to_string(),
            _ => self == other,
        }
    }

    /// Orders two values of the same kind. Numeric values of different kinds
    /// are compared as decimals when both are finite, as doubles otherwise.
    /// `Empty` sorts before everything else.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Empty, Value::Empty) => Some(Ordering::Equal),
            (Value::Empty, _) => Some(Ordering::Less),
            (_, Value::Empty) => Some(Ordering::Greater),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (a, b) if a.kind().is_numeric() && b.kind().is_numeric() => {
                match (a.to_decimal(), b.to_decimal()) {
                    (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                    _ => a.to_double().ok()?.partial_cmp(&b.to_double().ok()?),
                }
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    /// Locale-invariant default formatting, used by the conversion to `String`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Boolean(true) => f.write_str("True"),
            Value::Boolean(false) => f.write_str("False"),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Double(v) if v.is_nan() => f.write_str("NaN"),
            Value::Double(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::DateTime(v) => write!(f, "{}", v.format(DATETIME_FORMAT)),
        }
    }
}

macro_rules! define_value_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Value {
            fn from(value: $typ) -> Self {
                Value::$variant(value)
            }
        }
    };
}

define_value_from!(bool, Boolean);
define_value_from!(i32, Int32);
define_value_from!(f64, Double);
define_value_from!(BigDecimal, Decimal);
define_value_from!(String, String);
define_value_from!(NaiveDateTime, DateTime);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Empty, Into::into)
    }
}
