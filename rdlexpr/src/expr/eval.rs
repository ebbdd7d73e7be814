//! Typed evaluators.
//!
//! [`Expr::eval`] is the authoritative evaluator: it yields a value of the
//! node's declared kind (or [`Value::Empty`] for an unmatched `Switch`). The
//! per-kind evaluators are thin views over it which route the result through
//! the conversion table, so every kind observes the same value.
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;

use crate::{
    context::{ReportContext, RowAccess},
    error::Result,
    expr::Expr,
    value::Value,
};

impl Expr {
    /// Evaluates the tree against a report and a row.
    ///
    /// Children are evaluated left to right, depth first. Errors propagate
    /// unchanged to the caller.
    pub fn eval<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<Value> {
        match self {
            Expr::Constant(value) => Ok(value.clone()),
            Expr::Binary(node) => node.eval(rpt, row),
            Expr::Unary(node) => node.eval(rpt, row),
            Expr::Logical(node) => node.eval(rpt, row),
            Expr::Switch(node) => node.eval(rpt, row),
            Expr::Iif(node) => node.eval(rpt, row),
            Expr::Convert(node) => node.eval(rpt, row),
            Expr::Field(node) => node.eval(row),
            Expr::Parameter(node) => node.eval(rpt),
            Expr::Global(global) => global.eval(rpt),
            Expr::Aggregate(node) => node.eval(rpt),
        }
    }

    pub fn eval_boolean<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<bool> {
        match self {
            Expr::Constant(Value::Boolean(v)) => Ok(*v),
            _ => self.eval(rpt, row)?.to_boolean(),
        }
    }

    pub fn eval_int32<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<i32> {
        match self {
            Expr::Constant(Value::Int32(v)) => Ok(*v),
            _ => self.eval(rpt, row)?.to_int32(),
        }
    }

    pub fn eval_double<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<f64> {
        match self {
            Expr::Constant(Value::Double(v)) => Ok(*v),
            _ => self.eval(rpt, row)?.to_double(),
        }
    }

    pub fn eval_decimal<R: RowAccess + ?Sized>(
        &self,
        rpt: &ReportContext,
        row: &R,
    ) -> Result<BigDecimal> {
        self.eval(rpt, row)?.to_decimal()
    }

    pub fn eval_string<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<String> {
        self.eval(rpt, row)?.to_text()
    }

    pub fn eval_datetime<R: RowAccess + ?Sized>(
        &self,
        rpt: &ReportContext,
        row: &R,
    ) -> Result<NaiveDateTime> {
        self.eval(rpt, row)?.to_datetime()
    }
}
