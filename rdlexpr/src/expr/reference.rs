//! References resolved against the evaluation context.
//!
//! None of these nodes is constant. Each resolves a value and converts it to
//! its declared kind; a reference that resolves to nothing raises
//! [`Error::UnboundReference`].
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::{
    context::{ReportContext, RowAccess},
    error::{Error, Result},
    kind::ValueKind,
    value::Value,
};

fn resolve(value: Option<Value>, kind: ValueKind, name: impl FnOnce() -> String) -> Result<Value> {
    match value {
        Some(value) => value.convert(kind),
        None => Err(Error::UnboundReference { name: name() }),
    }
}

/// Column of the current row, bound by index.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldRef {
    pub index: usize,
    pub name: String,
    pub kind: ValueKind,
}

impl FieldRef {
    pub fn eval<R: RowAccess + ?Sized>(&self, row: &R) -> Result<Value> {
        resolve(row.field(self.index).cloned(), self.kind, || {
            format!("Fields!{}", self.name)
        })
    }
}

/// Report parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterRef {
    pub name: String,
    pub kind: ValueKind,
}

impl ParameterRef {
    pub fn eval(&self, rpt: &ReportContext) -> Result<Value> {
        resolve(rpt.parameter(&self.name).cloned(), self.kind, || {
            format!("Parameters!{}", self.name)
        })
    }
}

/// Pre-computed aggregate, looked up by name in the report context.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggregateRef {
    pub name: String,
    pub kind: ValueKind,
}

impl AggregateRef {
    pub fn eval(&self, rpt: &ReportContext) -> Result<Value> {
        resolve(rpt.aggregate(&self.name), self.kind, || {
            format!("Aggregates!{}", self.name)
        })
    }
}

/// Job-wide globals.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIter)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Global {
    PageNumber,
    TotalPages,
    ExecutionTime,
    ReportName,
}

impl Global {
    /// Creates a [`Global`] from its string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        Global::iter().find(|global| global.to_str() == s)
    }

    /// Returns the string representation of the [`Global`].
    pub fn to_str(&self) -> &'static str {
        match self {
            Global::PageNumber => "PageNumber",
            Global::TotalPages => "TotalPages",
            Global::ExecutionTime => "ExecutionTime",
            Global::ReportName => "ReportName",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Global::PageNumber | Global::TotalPages => ValueKind::Int32,
            Global::ExecutionTime => ValueKind::DateTime,
            Global::ReportName => ValueKind::String,
        }
    }

    pub fn eval(&self, rpt: &ReportContext) -> Result<Value> {
        let page = |n: u32| {
            i32::try_from(n).map_err(|_| Error::Overflow {
                op: self.to_str(),
                kind: ValueKind::Int32,
            })
        };

        match self {
            Global::PageNumber => page(rpt.page_number()).map(Value::Int32),
            Global::TotalPages => page(rpt.total_pages()).map(Value::Int32),
            Global::ExecutionTime => Ok(Value::DateTime(rpt.execution_time())),
            Global::ReportName => Ok(Value::String(rpt.name().to_string())),
        }
    }
}
