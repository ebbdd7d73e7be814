//! Multi-branch (`Switch`) and two-way (`Iif`) conditionals.
use log::debug;

use crate::{
    context::{ReportContext, RowAccess},
    error::{Error, Result},
    expr::Expr,
    kind::ValueKind,
    value::Value,
};

/// `Switch(cond1, result1, cond2, result2, ...)`.
///
/// Conditions are evaluated left to right and only the result paired with
/// the first true condition is evaluated. Without a match the result is
/// [`Value::Empty`].
///
/// The declared kind is the kind of the first result. That first result is
/// trusted as is, later results are converted when their kind differs.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchExpr {
    children: Vec<Expr>,
    kind: ValueKind,
}

impl SwitchExpr {
    pub fn new(children: Vec<Expr>) -> Result<Self> {
        if children.is_empty() || children.len() % 2 != 0 {
            return Err(Error::InvalidArity {
                function: "Switch",
                expected: "a positive even number of",
                found: children.len(),
            });
        }

        let kind = children[1].kind();
        Ok(Self { children, kind })
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Children in declaration order, conditions at even indices.
    pub fn children(&self) -> &[Expr] {
        &self.children
    }

    /// `(condition, result)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&Expr, &Expr)> {
        self.children
            .chunks_exact(2)
            .map(|pair| (&pair[0], &pair[1]))
    }

    pub fn eval<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<Value> {
        for (index, (condition, result)) in self.pairs().enumerate() {
            if !condition.eval_boolean(rpt, row)? {
                continue;
            }

            let value = result.eval(rpt, row)?;
            return if index == 0 || result.kind() == self.kind {
                Ok(value)
            } else {
                value.convert(self.kind)
            };
        }

        Ok(Value::Empty)
    }

    /// Folds every child. The node itself always survives since a `Switch`
    /// is never considered constant.
    pub(crate) fn fold(self) -> Expr {
        Expr::Switch(Self {
            children: self.children.into_iter().map(Expr::fold).collect(),
            kind: self.kind,
        })
    }
}

/// `Iif(condition, then, otherwise)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IifExpr {
    pub condition: Box<Expr>,
    pub then: Box<Expr>,
    pub otherwise: Box<Expr>,
}

impl IifExpr {
    pub fn new(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        Self {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Kind of the `then` branch.
    pub fn kind(&self) -> ValueKind {
        self.then.kind()
    }

    pub fn children(&self) -> impl Iterator<Item = &Expr> {
        [&*self.condition, &*self.then, &*self.otherwise].into_iter()
    }

    pub fn eval<R: RowAccess + ?Sized>(&self, rpt: &ReportContext, row: &R) -> Result<Value> {
        if self.condition.eval_boolean(rpt, row)? {
            self.then.eval(rpt, row)
        } else if self.otherwise.kind() == self.kind() {
            self.otherwise.eval(rpt, row)
        } else {
            self.otherwise.eval(rpt, row)?.convert(self.kind())
        }
    }

    pub(crate) fn fold(self) -> Expr {
        let kind = self.kind();
        let condition = (*self.condition).fold();
        let then = (*self.then).fold();
        let otherwise = (*self.otherwise).fold();

        let Expr::Constant(value) = &condition else {
            return Expr::Iif(Self::new(condition, then, otherwise));
        };

        match value.to_boolean() {
            Ok(true) => then,
            Ok(false) if otherwise.kind() == kind => otherwise,
            Ok(false) => Expr::convert(otherwise, kind).fold(),
            Err(err) => {
                debug!("Keeping `Iif` unfolded, condition `{}`: {}", value, err);
                Expr::Iif(Self::new(condition, then, otherwise))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{Row, Schema},
        expr::BinaryOp,
    };

    fn schema() -> Schema {
        Schema::new()
            .with_field("flag", ValueKind::Boolean)
            .with_field("n", ValueKind::Int32)
    }

    fn row(flag: bool, n: i32) -> Row {
        Row::new(0, vec![Value::Boolean(flag), Value::Int32(n)])
    }

    #[test]
    fn switch_arity() {
        assert!(Expr::switch(vec![]).unwrap_err().is_invalid_arity());
        assert!(
            Expr::switch(vec![Expr::constant(true)])
                .unwrap_err()
                .is_invalid_arity()
        );
    }

    #[test]
    fn switch_first_match_wins() {
        let schema = schema();
        let n = schema.field_ref("n").unwrap();
        let big = Expr::binary(BinaryOp::Gt, ValueKind::Int32, n.clone(), Expr::constant(10)).unwrap();
        let small = Expr::binary(BinaryOp::Gt, ValueKind::Int32, n, Expr::constant(0)).unwrap();
        let switch = Expr::switch(vec![
            big,
            Expr::constant("big"),
            small,
            Expr::constant("small"),
        ])
        .unwrap();

        let rpt = ReportContext::detached();
        assert_eq!(switch.kind(), ValueKind::String);
        assert_eq!(switch.eval(&rpt, &row(true, 42)).unwrap(), Value::from("big"));
        assert_eq!(switch.eval(&rpt, &row(true, 3)).unwrap(), Value::from("small"));
        assert_eq!(switch.eval(&rpt, &row(true, -1)).unwrap(), Value::Empty);
    }

    #[test]
    fn switch_converts_later_branches_only() {
        let flag = schema().field_ref("flag").unwrap();
        let switch = Expr::switch(vec![
            flag,
            Expr::constant(1),
            Expr::constant(true),
            Expr::constant("2"),
        ])
        .unwrap();

        let rpt = ReportContext::detached();
        assert_eq!(switch.eval(&rpt, &row(false, 0)).unwrap(), Value::Int32(2));

        let bad = Expr::switch(vec![
            Expr::constant(false),
            Expr::constant(1),
            Expr::constant(true),
            Expr::constant("two"),
        ])
        .unwrap();
        assert!(bad.eval(&rpt, &Row::empty()).unwrap_err().is_conversion());
    }

    #[test]
    fn switch_is_never_constant_but_folds_children() {
        let switch = Expr::switch(vec![
            Expr::constant(true),
            Expr::minus(ValueKind::Int32, Expr::constant(3), Expr::constant(1)).unwrap(),
        ])
        .unwrap();
        assert!(!switch.is_constant());

        let folded = switch.fold();
        let Expr::Switch(node) = &folded else {
            panic!("expected a switch, got {:?}", folded);
        };
        assert_eq!(node.children()[1], Expr::constant(2));
    }

    #[test]
    fn iif_branches() {
        let flag = schema().field_ref("flag").unwrap();
        let iif = Expr::iif(flag, Expr::constant(1.5), Expr::constant(2));
        let rpt = ReportContext::detached();

        assert_eq!(iif.kind(), ValueKind::Double);
        assert_eq!(iif.eval(&rpt, &row(true, 0)).unwrap(), Value::Double(1.5));
        assert_eq!(iif.eval(&rpt, &row(false, 0)).unwrap(), Value::Double(2.0));
    }

    #[test]
    fn iif_folds_on_constant_condition() {
        let iif = Expr::iif(Expr::constant(false), Expr::constant(1.5), Expr::constant(2));
        assert_eq!(iif.fold(), Expr::constant(2.0));

        let n = schema().field_ref("n").unwrap();
        let iif = Expr::iif(Expr::constant(true), n.clone(), Expr::constant(0));
        assert_eq!(iif.fold(), n);
    }
}
