//! Aggregate accumulators filled before row evaluation.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use bigdecimal::{BigDecimal, Zero};
use strum::{EnumIter, IntoEnumIterator};

use crate::{
    error::{Error, Result},
    kind::ValueKind,
    value::Value,
};

/// Built-in aggregate functions.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIter)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AggregateFn {
    Sum,
    Count,
    Min,
    Max,
    Avg,
    First,
    Last,
}

impl AggregateFn {
    /// Creates an [`AggregateFn`] from its string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        AggregateFn::iter().find(|f| f.to_str().eq_ignore_ascii_case(s))
    }

    /// Returns the string representation of the [`AggregateFn`].
    pub fn to_str(&self) -> &'static str {
        match self {
            AggregateFn::Sum => "Sum",
            AggregateFn::Count => "Count",
            AggregateFn::Min => "Min",
            AggregateFn::Max => "Max",
            AggregateFn::Avg => "Avg",
            AggregateFn::First => "First",
            AggregateFn::Last => "Last",
        }
    }

    /// Kind of the aggregate result given the kind of its input expression.
    pub fn result_kind(&self, input: ValueKind) -> ValueKind {
        match self {
            AggregateFn::Sum | AggregateFn::Avg => ValueKind::Decimal,
            AggregateFn::Count => ValueKind::Int32,
            AggregateFn::Min | AggregateFn::Max | AggregateFn::First | AggregateFn::Last => input,
        }
    }
}

/// Running state of one aggregate over the rows of a dataset.
///
/// Empty values are skipped by every function. Sums are accumulated as
/// decimals so that mixed numeric inputs never lose precision.
#[derive(Debug, Clone)]
pub struct Accumulator {
    func: AggregateFn,
    count: u64,
    sum: BigDecimal,
    selected: Option<Value>,
}

impl Accumulator {
    pub fn new(func: AggregateFn) -> Self {
        Self {
            func,
            count: 0,
            sum: BigDecimal::zero(),
            selected: None,
        }
    }

    pub fn func(&self) -> AggregateFn {
        self.func
    }

    pub fn push(&mut self, value: Value) -> Result<()> {
        if value.is_empty() {
            return Ok(());
        }

        match self.func {
            AggregateFn::Sum | AggregateFn::Avg => self.sum += value.to_decimal()?,
            AggregateFn::Count => {}
            AggregateFn::First => {
                if self.selected.is_none() {
                    self.selected = Some(value);
                }
            }
            AggregateFn::Last => self.selected = Some(value),
            AggregateFn::Min | AggregateFn::Max => {
                let wanted = if self.func == AggregateFn::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let replace = match &self.selected {
                    None => true,
                    Some(current) => value.compare(current) == Some(wanted),
                };
                if replace {
                    self.selected = Some(value);
                }
            }
        }

        self.count += 1;
        Ok(())
    }

    /// Final value. Aggregates over no values are `Empty`, except `Count` (0).
    ///
    /// A `Count` past `i32::MAX` fails with [`Error::Overflow`].
    pub fn finish(self) -> Result<Value> {
        Ok(match self.func {
            AggregateFn::Count => Value::Int32(i32::try_from(self.count).map_err(|_| Error::Overflow {
                op: "count",
                kind: ValueKind::Int32,
            })?),
            _ if self.count == 0 => Value::Empty,
            AggregateFn::Sum => Value::Decimal(self.sum),
            AggregateFn::Avg => Value::Decimal(self.sum / BigDecimal::from(self.count)),
            AggregateFn::Min | AggregateFn::Max | AggregateFn::First | AggregateFn::Last => {
                self.selected.unwrap_or(Value::Empty)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn run(func: AggregateFn, values: &[Value]) -> Value {
        let mut acc = Accumulator::new(func);
        for value in values {
            acc.push(value.clone()).unwrap();
        }
        acc.finish().unwrap()
    }

    #[test]
    fn numeric_aggregates() {
        let values = [
            Value::Int32(4),
            Value::Empty,
            Value::Double(1.5),
            Value::Decimal(BigDecimal::from_str("2.5").unwrap()),
        ];
        assert_eq!(
            run(AggregateFn::Sum, &values),
            Value::Decimal(BigDecimal::from(8))
        );
        assert_eq!(run(AggregateFn::Count, &values), Value::Int32(3));
        assert_eq!(run(AggregateFn::Min, &values), Value::Double(1.5));
        assert_eq!(run(AggregateFn::Max, &values), Value::Int32(4));
        assert_eq!(run(AggregateFn::First, &values), Value::Int32(4));
        let avg = run(AggregateFn::Avg, &values).to_double().unwrap();
        assert!((avg - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input() {
        assert_eq!(run(AggregateFn::Sum, &[]), Value::Empty);
        assert_eq!(run(AggregateFn::Count, &[Value::Empty]), Value::Int32(0));
    }

    #[test]
    fn count_past_int32_range_overflows() {
        let mut acc = Accumulator::new(AggregateFn::Count);
        acc.count = i32::MAX as u64;
        acc.push(Value::Int32(1)).unwrap();
        assert_eq!(
            acc.finish().unwrap_err(),
            Error::Overflow {
                op: "count",
                kind: ValueKind::Int32,
            }
        );

        let mut acc = Accumulator::new(AggregateFn::Count);
        acc.count = i32::MAX as u64 - 1;
        acc.push(Value::Int32(1)).unwrap();
        assert_eq!(acc.finish().unwrap(), Value::Int32(i32::MAX));
    }

    #[test]
    fn sum_of_text_fails_with_conversion() {
        let mut acc = Accumulator::new(AggregateFn::Sum);
        assert!(acc.push(Value::from("abc")).unwrap_err().is_conversion());
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(AggregateFn::from_str("sum"), Some(AggregateFn::Sum));
        assert_eq!(AggregateFn::from_str("Median"), None);
    }
}
