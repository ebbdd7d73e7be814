//! Expression trees.
//!
//! [`Expr`] is a closed sum type over every node shape the engine knows.
//! Each node declares a [`ValueKind`] which stays stable once constructed;
//! the optimizer may replace a node only by one declaring the same kind.
//! Submodules hold the node families:
//!
//! - `binary`: arithmetic and comparison operators for every native kind
//! - `conditional`: `Switch` and `Iif`
//! - `misc`: unary operators, short-circuit logic and explicit conversions
//! - `reference`: fields, parameters, globals and aggregates
//! - `eval`: the typed evaluators shared by all nodes
//! - `fmt`: textual rendering of trees
use auto_enums::auto_enum;
use strum::EnumTryAs;

use crate::{
    error::Result,
    kind::ValueKind,
    value::Value,
};

pub mod binary;
pub mod conditional;
pub mod eval;
pub mod fmt;
pub mod misc;
pub mod reference;

pub use binary::{BinaryExpr, BinaryOp, OverflowPolicy};
pub use conditional::{IifExpr, SwitchExpr};
pub use misc::{ConvertExpr, LogicalExpr, LogicalOp, UnaryExpr, UnaryOp};
pub use reference::{AggregateRef, FieldRef, Global, ParameterRef};

/// A node of an expression tree.
#[derive(Debug, Clone, PartialEq, EnumTryAs)]
pub enum Expr {
    /// Literal (or folded) value.
    Constant(Value),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Logical(LogicalExpr),
    Switch(SwitchExpr),
    Iif(IifExpr),
    Convert(ConvertExpr),
    Field(FieldRef),
    Parameter(ParameterRef),
    Global(Global),
    Aggregate(AggregateRef),
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    /// Binary operator evaluated in `operand_kind`, wrapping on integer overflow.
    pub fn binary(op: BinaryOp, operand_kind: ValueKind, lhs: Expr, rhs: Expr) -> Result<Self> {
        BinaryExpr::new(op, operand_kind, lhs, rhs).map(Expr::Binary)
    }

    /// `lhs - rhs` in `kind`.
    pub fn minus(kind: ValueKind, lhs: Expr, rhs: Expr) -> Result<Self> {
        Self::binary(BinaryOp::Sub, kind, lhs, rhs)
    }

    /// `Switch(cond1, result1, cond2, result2, ...)`.
    pub fn switch(children: Vec<Expr>) -> Result<Self> {
        SwitchExpr::new(children).map(Expr::Switch)
    }

    pub fn iif(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Iif(IifExpr::new(condition, then, otherwise))
    }

    pub fn convert(inner: Expr, kind: ValueKind) -> Self {
        Expr::Convert(ConvertExpr::new(inner, kind))
    }

    pub fn negate(operand: Expr) -> Result<Self> {
        UnaryExpr::new(UnaryOp::Negate, operand).map(Expr::Unary)
    }

    pub fn not(operand: Expr) -> Result<Self> {
        UnaryExpr::new(UnaryOp::Not, operand).map(Expr::Unary)
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Self {
        Expr::Logical(LogicalExpr::new(LogicalOp::And, lhs, rhs))
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Self {
        Expr::Logical(LogicalExpr::new(LogicalOp::Or, lhs, rhs))
    }

    pub fn parameter(name: impl Into<String>, kind: ValueKind) -> Self {
        Expr::Parameter(ParameterRef {
            name: name.into(),
            kind,
        })
    }

    pub fn aggregate(name: impl Into<String>, kind: ValueKind) -> Self {
        Expr::Aggregate(AggregateRef {
            name: name.into(),
            kind,
        })
    }

    /// Declared kind of the node.
    pub fn kind(&self) -> ValueKind {
        match self {
            Expr::Constant(value) => value.kind(),
            Expr::Binary(node) => node.kind(),
            Expr::Unary(node) => node.kind(),
            Expr::Logical(_) => ValueKind::Boolean,
            Expr::Switch(node) => node.kind(),
            Expr::Iif(node) => node.kind(),
            Expr::Convert(node) => node.kind,
            Expr::Field(node) => node.kind,
            Expr::Parameter(node) => node.kind,
            Expr::Global(global) => global.kind(),
            Expr::Aggregate(node) => node.kind,
        }
    }

    /// True when the value cannot vary across rows and can be computed ahead of time.
    ///
    /// References are never constant, and neither is `Switch`.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Constant(_) => true,
            Expr::Binary(node) => node.lhs.is_constant() && node.rhs.is_constant(),
            Expr::Unary(node) => node.operand.is_constant(),
            Expr::Logical(node) => node.lhs.is_constant() && node.rhs.is_constant(),
            Expr::Switch(_) => false,
            Expr::Iif(node) => node.children().all(Expr::is_constant),
            Expr::Convert(node) => node.inner.is_constant(),
            Expr::Field(_) | Expr::Parameter(_) | Expr::Global(_) | Expr::Aggregate(_) => false,
        }
    }

    /// True when evaluation may produce [`Value::Empty`] although the declared
    /// kind is not `Variant`. Only an unmatched `Switch` does so; the
    /// optimizer must not drop a conversion that would have replaced it.
    pub fn may_yield_empty(&self) -> bool {
        match self {
            Expr::Switch(node) => !node.kind().is_variant(),
            Expr::Iif(node) => {
                node.then.may_yield_empty()
                    || (node.otherwise.kind() == node.kind() && node.otherwise.may_yield_empty())
            }
            _ => false,
        }
    }

    /// Direct children, in evaluation order.
    #[auto_enum(Iterator)]
    pub fn children(&self) -> impl Iterator<Item = &Expr> {
        match self {
            Expr::Binary(node) => [&*node.lhs, &*node.rhs].into_iter(),
            Expr::Unary(node) => std::iter::once(&*node.operand),
            Expr::Logical(node) => [&*node.lhs, &*node.rhs].into_iter(),
            Expr::Switch(node) => node.children().iter(),
            Expr::Iif(node) => node.children(),
            Expr::Convert(node) => std::iter::once(&*node.inner),
            Expr::Constant(_)
            | Expr::Field(_)
            | Expr::Parameter(_)
            | Expr::Global(_)
            | Expr::Aggregate(_) => std::iter::empty::<&Expr>(),
        }
    }

    /// Number of nodes in the tree rooted here.
    pub fn node_count(&self) -> usize {
        1 + self.children().map(Expr::node_count).sum::<usize>()
    }
}

macro_rules! define_expr_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Expr {
            fn from(node: $typ) -> Self {
                Expr::$variant(node)
            }
        }
    };
}

define_expr_from!(Value, Constant);
define_expr_from!(BinaryExpr, Binary);
define_expr_from!(UnaryExpr, Unary);
define_expr_from!(LogicalExpr, Logical);
define_expr_from!(SwitchExpr, Switch);
define_expr_from!(IifExpr, Iif);
define_expr_from!(ConvertExpr, Convert);
define_expr_from!(FieldRef, Field);
define_expr_from!(ParameterRef, Parameter);
define_expr_from!(Global, Global);
define_expr_from!(AggregateRef, Aggregate);
