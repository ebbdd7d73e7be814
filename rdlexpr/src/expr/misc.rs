//! Unary operators, short-circuit logic and explicit conversions.
use bigdecimal::BigDecimal;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::{
    context::{ReportContext, RowAccess},
    error::{Error, Result},
    expr::{Expr, OverflowPolicy},
    kind::ValueKind,
    optimize::fold_constant,
    value::Value,
};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIter)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnaryOp {
    /// Arithmetic negation on numeric kinds
    Negate,
    /// Logical negation on `boolean`
    Not,
}

impl UnaryOp {
    /// Creates a [`UnaryOp`] from its string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        UnaryOp::iter().find(|op| op.to_str() == s)
    }

    /// Returns the string representation of the [`UnaryOp`].
    pub fn to_str(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "neg",
            UnaryOp::Not => "not",
        }
    }
}

/// `-operand` or `Not operand`, of the operand's kind.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand_kind: ValueKind,
    pub overflow: OverflowPolicy,
    pub operand: Box<Expr>,
}

impl UnaryExpr {
    pub fn new(op: UnaryOp, operand: Expr) -> Result<Self> {
        let operand_kind = operand.kind();
        match op {
            UnaryOp::Negate if !operand_kind.is_numeric() => {
                return Err(Error::UnsupportedOperator {
                    op: op.to_str(),
                    kind: operand_kind,
                });
            }
            UnaryOp::Not if operand_kind != ValueKind::Boolean => {
                return Err(Error::KindMismatch {
                    expected: ValueKind::Boolean,
                    found: operand_kind,
                });
            }
            _ => {}
        }

        Ok(Self {
            op,
            operand_kind,
            overflow: OverflowPolicy::default(),
            operand: Box::new(operand),
        })
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.operand_kind
    }

    pub fn eval<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<Value> {
        let op = self.op.to_str();
        match (self.op, self.operand_kind) {
            (UnaryOp::Not, _) => Ok(Value::Boolean(!self.operand.eval_boolean(rpt, row)?)),
            (UnaryOp::Negate, ValueKind::Int32) => {
                let v = self.operand.eval_int32(rpt, row)?;
                self.overflow
                    .resolve(op, v.checked_neg(), v.wrapping_neg(), v.saturating_neg())
                    .map(Value::Int32)
            }
            (UnaryOp::Negate, ValueKind::Double) => {
                Ok(Value::Double(-self.operand.eval_double(rpt, row)?))
            }
            (UnaryOp::Negate, ValueKind::Decimal) => {
                let v: BigDecimal = self.operand.eval_decimal(rpt, row)?;
                Ok(Value::Decimal(-v))
            }
            (UnaryOp::Negate, kind) => Err(Error::UnsupportedOperator { op, kind }),
        }
    }

    pub(crate) fn fold(self) -> Expr {
        let node = Self {
            operand: Box::new((*self.operand).fold()),
            ..self
        };

        if node.operand.is_constant() {
            fold_constant(Expr::Unary(node))
        } else {
            Expr::Unary(node)
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIter)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    /// Creates a [`LogicalOp`] from its string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        LogicalOp::iter().find(|op| op.to_str() == s)
    }

    /// Returns the string representation of the [`LogicalOp`].
    pub fn to_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }

    /// Left operand value that decides the result on its own.
    fn short_circuit(&self) -> bool {
        matches!(self, LogicalOp::Or)
    }
}

/// Short-circuit `AndAlso` / `OrElse`. The right operand is only evaluated
/// when the left one does not decide the result.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpr {
    pub op: LogicalOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

impl LogicalExpr {
    pub fn new(op: LogicalOp, lhs: Expr, rhs: Expr) -> Self {
        Self {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn eval<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<Value> {
        let lhs = self.lhs.eval_boolean(rpt, row)?;
        if lhs == self.op.short_circuit() {
            return Ok(Value::Boolean(lhs));
        }
        self.rhs.eval_boolean(rpt, row).map(Value::Boolean)
    }

    pub(crate) fn fold(self) -> Expr {
        let op = self.op;
        let lhs = (*self.lhs).fold();
        let rhs = (*self.rhs).fold();

        let decided = match &lhs {
            Expr::Constant(value) => value.to_boolean().ok(),
            _ => None,
        };

        match decided {
            Some(value) if value == op.short_circuit() => Expr::Constant(Value::Boolean(value)),
            Some(_) if rhs.is_constant() => fold_constant(Expr::Logical(Self::new(op, lhs, rhs))),
            Some(_) if rhs.kind() == ValueKind::Boolean && !rhs.may_yield_empty() => rhs,
            _ => Expr::Logical(Self::new(op, lhs, rhs)),
        }
    }
}

/// Explicit conversion of `inner` to `kind` through the conversion table.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertExpr {
    pub inner: Box<Expr>,
    pub kind: ValueKind,
}

impl ConvertExpr {
    pub fn new(inner: Expr, kind: ValueKind) -> Self {
        Self {
            inner: Box::new(inner),
            kind,
        }
    }

    pub fn eval<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<Value> {
        self.inner.eval(rpt, row)?.convert(self.kind)
    }

    pub(crate) fn fold(self) -> Expr {
        let kind = self.kind;
        let inner = (*self.inner).fold();

        if inner.kind() == kind && (kind.is_variant() || !inner.may_yield_empty()) {
            inner
        } else if inner.is_constant() && kind != ValueKind::Variant {
            fold_constant(Expr::convert(inner, kind))
        } else {
            Expr::convert(inner, kind)
        }
    }
}
