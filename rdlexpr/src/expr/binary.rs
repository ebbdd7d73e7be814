//! Binary arithmetic and comparison operators.
//!
//! A single node shape covers the whole operator × kind matrix: the operator
//! is a field and the native kind selects the [`Native`] implementation the
//! operands are evaluated in. Both operands are always evaluated, left first.
//!
//! Arithmetic identities per native kind:
//! - `int32`: two's complement under [`OverflowPolicy`]; division and modulo
//!   by zero fail with [`Error::DivideByZero`]
//! - `double`: IEEE 754, division by zero yields an infinity or NaN
//! - `decimal`: exact `+ - *`, division by zero fails with
//!   [`Error::DivideByZero`]
//! - `string`: `+` concatenates, comparisons are ordinal
//! - `boolean`, `datetime`: comparisons only
use std::cmp::Ordering;

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDateTime;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::{
    context::{ReportContext, RowAccess},
    error::{Error, Result},
    expr::Expr,
    kind::ValueKind,
    optimize::fold_constant,
    value::Value,
};

/// Binary operators.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIter)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Creates a [`BinaryOp`] from its string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        BinaryOp::iter().find(|op| op.to_str() == s)
    }

    /// Returns the string representation of the [`BinaryOp`].
    pub fn to_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "plus",
            BinaryOp::Sub => "minus",
            BinaryOp::Mul => "mult",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "lte",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "gte",
        }
    }

    /// Operator as written in report expressions.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "Mod",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        !self.is_comparison()
    }

    /// Returns true if the operator is defined over operands of `kind`.
    pub fn supports(&self, kind: ValueKind) -> bool {
        if self.is_comparison() {
            kind.is_comparable()
        } else {
            kind.is_numeric() || (*self == BinaryOp::Add && kind == ValueKind::String)
        }
    }

    /// Kind of the result when operands are evaluated in `operand_kind`.
    pub fn result_kind(&self, operand_kind: ValueKind) -> ValueKind {
        if self.is_comparison() {
            ValueKind::Boolean
        } else {
            operand_kind
        }
    }

    /// Decides a comparison from the ordering of its operands. Unordered
    /// operands (NaN) are only ever "not equal".
    fn test(&self, ordering: Option<Ordering>) -> bool {
        match self {
            BinaryOp::Eq => ordering == Some(Ordering::Equal),
            BinaryOp::Ne => ordering != Some(Ordering::Equal),
            BinaryOp::Lt => ordering == Some(Ordering::Less),
            BinaryOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            BinaryOp::Gt => ordering == Some(Ordering::Greater),
            BinaryOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            _ => false,
        }
    }
}

/// Policy for fixed-width integer overflow.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, EnumIter)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OverflowPolicy {
    /// Wrap around (two's complement)
    #[default]
    Wrap,
    /// Fail with [`Error::Overflow`]
    Trap,
    /// Clamp to the representable range
    Saturate,
}

impl OverflowPolicy {
    /// Creates an [`OverflowPolicy`] from its string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        OverflowPolicy::iter().find(|policy| policy.to_str() == s)
    }

    /// Returns the string representation of the [`OverflowPolicy`].
    pub fn to_str(&self) -> &'static str {
        match self {
            OverflowPolicy::Wrap => "wrap",
            OverflowPolicy::Trap => "trap",
            OverflowPolicy::Saturate => "saturate",
        }
    }

    /// Picks the result mandated by the policy among the three candidates.
    pub(crate) fn resolve<T>(
        &self,
        op: &'static str,
        checked: Option<T>,
        wrapped: T,
        saturated: T,
    ) -> Result<T> {
        match self {
            OverflowPolicy::Wrap => Ok(wrapped),
            OverflowPolicy::Saturate => Ok(saturated),
            OverflowPolicy::Trap => checked.ok_or(Error::Overflow {
                op,
                kind: ValueKind::Int32,
            }),
        }
    }
}

fn unsupported(op: BinaryOp, kind: ValueKind) -> Error {
    Error::UnsupportedOperator {
        op: op.to_str(),
        kind,
    }
}

fn divide_by_zero(op: BinaryOp, kind: ValueKind) -> Error {
    Error::DivideByZero {
        op: op.to_str(),
        kind,
    }
}

/// Rust type an operator computes in for one native kind.
trait Native: Sized {
    const KIND: ValueKind;

    /// Evaluates `expr` in this kind.
    fn extract<R: RowAccess + ?Sized>(expr: &Expr, rpt: &ReportContext, row: &R) -> Result<Self>;

    fn compare(lhs: &Self, rhs: &Self) -> Option<Ordering>;

    fn arith(op: BinaryOp, _overflow: OverflowPolicy, _lhs: Self, _rhs: Self) -> Result<Self> {
        Err(unsupported(op, Self::KIND))
    }

    fn into_value(self) -> Value;
}

impl Native for i32 {
    const KIND: ValueKind = ValueKind::Int32;

    fn extract<R: RowAccess + ?Sized>(expr: &Expr, rpt: &ReportContext, row: &R) -> Result<Self> {
        expr.eval_int32(rpt, row)
    }

    fn compare(lhs: &Self, rhs: &Self) -> Option<Ordering> {
        Some(lhs.cmp(rhs))
    }

    fn arith(op: BinaryOp, overflow: OverflowPolicy, lhs: Self, rhs: Self) -> Result<Self> {
        if matches!(op, BinaryOp::Div | BinaryOp::Mod) && rhs == 0 {
            return Err(divide_by_zero(op, Self::KIND));
        }

        let (checked, wrapped, saturated) = match op {
            BinaryOp::Add => (
                lhs.checked_add(rhs),
                lhs.wrapping_add(rhs),
                lhs.saturating_add(rhs),
            ),
            BinaryOp::Sub => (
                lhs.checked_sub(rhs),
                lhs.wrapping_sub(rhs),
                lhs.saturating_sub(rhs),
            ),
            BinaryOp::Mul => (
                lhs.checked_mul(rhs),
                lhs.wrapping_mul(rhs),
                lhs.saturating_mul(rhs),
            ),
            BinaryOp::Div => (
                lhs.checked_div(rhs),
                lhs.wrapping_div(rhs),
                lhs.saturating_div(rhs),
            ),
            // MIN % -1 is mathematically 0; only the checked form reports it.
            BinaryOp::Mod => (
                lhs.checked_rem(rhs),
                lhs.wrapping_rem(rhs),
                lhs.wrapping_rem(rhs),
            ),
            _ => return Err(unsupported(op, Self::KIND)),
        };

        overflow.resolve(op.to_str(), checked, wrapped, saturated)
    }

    fn into_value(self) -> Value {
        Value::Int32(self)
    }
}

impl Native for f64 {
    const KIND: ValueKind = ValueKind::Double;

    fn extract<R: RowAccess + ?Sized>(expr: &Expr, rpt: &ReportContext, row: &R) -> Result<Self> {
        expr.eval_double(rpt, row)
    }

    fn compare(lhs: &Self, rhs: &Self) -> Option<Ordering> {
        lhs.partial_cmp(rhs)
    }

    fn arith(op: BinaryOp, _overflow: OverflowPolicy, lhs: Self, rhs: Self) -> Result<Self> {
        match op {
            BinaryOp::Add => Ok(lhs + rhs),
            BinaryOp::Sub => Ok(lhs - rhs),
            BinaryOp::Mul => Ok(lhs * rhs),
            BinaryOp::Div => Ok(lhs / rhs),
            BinaryOp::Mod => Ok(lhs % rhs),
            _ => Err(unsupported(op, Self::KIND)),
        }
    }

    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

impl Native for BigDecimal {
    const KIND: ValueKind = ValueKind::Decimal;

    fn extract<R: RowAccess + ?Sized>(expr: &Expr, rpt: &ReportContext, row: &R) -> Result<Self> {
        expr.eval_decimal(rpt, row)
    }

    fn compare(lhs: &Self, rhs: &Self) -> Option<Ordering> {
        Some(lhs.cmp(rhs))
    }

    fn arith(op: BinaryOp, _overflow: OverflowPolicy, lhs: Self, rhs: Self) -> Result<Self> {
        if matches!(op, BinaryOp::Div | BinaryOp::Mod) && rhs.is_zero() {
            return Err(divide_by_zero(op, Self::KIND));
        }

        match op {
            BinaryOp::Add => Ok(lhs + rhs),
            BinaryOp::Sub => Ok(lhs - rhs),
            BinaryOp::Mul => Ok(lhs * rhs),
            BinaryOp::Div => Ok(lhs / rhs),
            BinaryOp::Mod => Ok(lhs % rhs),
            _ => Err(unsupported(op, Self::KIND)),
        }
    }

    fn into_value(self) -> Value {
        Value::Decimal(self)
    }
}

impl Native for String {
    const KIND: ValueKind = ValueKind::String;

    fn extract<R: RowAccess + ?Sized>(expr: &Expr, rpt: &ReportContext, row: &R) -> Result<Self> {
        expr.eval_string(rpt, row)
    }

    fn compare(lhs: &Self, rhs: &Self) -> Option<Ordering> {
        Some(lhs.cmp(rhs))
    }

    fn arith(op: BinaryOp, _overflow: OverflowPolicy, mut lhs: Self, rhs: Self) -> Result<Self> {
        match op {
            BinaryOp::Add => {
                lhs.push_str(&rhs);
                Ok(lhs)
            }
            _ => Err(unsupported(op, Self::KIND)),
        }
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl Native for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn extract<R: RowAccess + ?Sized>(expr: &Expr, rpt: &ReportContext, row: &R) -> Result<Self> {
        expr.eval_boolean(rpt, row)
    }

    fn compare(lhs: &Self, rhs: &Self) -> Option<Ordering> {
        Some(lhs.cmp(rhs))
    }

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl Native for NaiveDateTime {
    const KIND: ValueKind = ValueKind::DateTime;

    fn extract<R: RowAccess + ?Sized>(expr: &Expr, rpt: &ReportContext, row: &R) -> Result<Self> {
        expr.eval_datetime(rpt, row)
    }

    fn compare(lhs: &Self, rhs: &Self) -> Option<Ordering> {
        Some(lhs.cmp(rhs))
    }

    fn into_value(self) -> Value {
        Value::DateTime(self)
    }
}

/// `lhs op rhs` with both operands evaluated in `operand_kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    /// Kind both operands are evaluated in.
    pub operand_kind: ValueKind,
    /// Only consulted by `int32` arithmetic.
    pub overflow: OverflowPolicy,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

impl BinaryExpr {
    /// Creates the node. Operands are expected to be typed to `operand_kind`
    /// already; they are converted on evaluation otherwise.
    pub fn new(op: BinaryOp, operand_kind: ValueKind, lhs: Expr, rhs: Expr) -> Result<Self> {
        if !op.supports(operand_kind) {
            return Err(unsupported(op, operand_kind));
        }

        Ok(Self {
            op,
            operand_kind,
            overflow: OverflowPolicy::default(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.op.result_kind(self.operand_kind)
    }

    pub fn eval<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<Value> {
        match self.operand_kind {
            ValueKind::Boolean => self.eval_native::<bool, R>(rpt, row),
            ValueKind::Int32 => self.eval_native::<i32, R>(rpt, row),
            ValueKind::Double => self.eval_native::<f64, R>(rpt, row),
            ValueKind::Decimal => self.eval_native::<BigDecimal, R>(rpt, row),
            ValueKind::String => self.eval_native::<String, R>(rpt, row),
            ValueKind::DateTime => self.eval_native::<NaiveDateTime, R>(rpt, row),
            ValueKind::Variant => Err(unsupported(self.op, ValueKind::Variant)),
        }
    }

    fn eval_native<T: Native, R: RowAccess + ?Sized>(
        &self,
        rpt: &ReportContext,
        row: &R,
    ) -> Result<Value> {
        let lhs = T::extract(&self.lhs, rpt, row)?;
        let rhs = T::extract(&self.rhs, rpt, row)?;

        if self.op.is_comparison() {
            Ok(Value::Boolean(self.op.test(T::compare(&lhs, &rhs))))
        } else {
            T::arith(self.op, self.overflow, lhs, rhs).map(T::into_value)
        }
    }

    /// True when `rhs` is a constant that leaves `lhs` unchanged under `op`.
    ///
    /// Only identities exact for every left value qualify: `x + 0.0` is not
    /// one (`-0.0 + 0.0` is `0.0`). Decimal `* 1` and `/ 1` may change the
    /// scale of the result and are left alone.
    fn is_right_identity(&self) -> bool {
        let Expr::Constant(constant) = &*self.rhs else {
            return false;
        };

        match (self.operand_kind, self.op, constant) {
            (ValueKind::Int32, BinaryOp::Add | BinaryOp::Sub, Value::Int32(0)) => true,
            (ValueKind::Int32, BinaryOp::Mul | BinaryOp::Div, Value::Int32(1)) => true,
            (ValueKind::Double, BinaryOp::Sub, Value::Double(z)) => {
                *z == 0.0 && z.is_sign_positive()
            }
            (ValueKind::Double, BinaryOp::Mul | BinaryOp::Div, Value::Double(one)) => *one == 1.0,
            (ValueKind::Decimal, BinaryOp::Add | BinaryOp::Sub, Value::Decimal(z)) => {
                z.is_zero() && z.as_bigint_and_exponent().1 <= 0
            }
            (ValueKind::String, BinaryOp::Add, Value::String(s)) => s.is_empty(),
            _ => false,
        }
    }

    pub(crate) fn fold(self) -> Expr {
        let node = Self {
            lhs: Box::new((*self.lhs).fold()),
            rhs: Box::new((*self.rhs).fold()),
            ..self
        };

        if node.lhs.is_constant() && node.rhs.is_constant() {
            // Errors are left for the first real evaluation to raise.
            return fold_constant(Expr::Binary(node));
        }

        if node.is_right_identity()
            && node.lhs.kind() == node.kind()
            && !node.lhs.may_yield_empty()
        {
            return *node.lhs;
        }

        Expr::Binary(node)
    }
}
