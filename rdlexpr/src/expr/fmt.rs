//! Textual rendering of expression trees, in report expression notation.
use std::fmt;

use crate::{
    expr::{Expr, LogicalOp, UnaryOp},
    kind::ValueKind,
    value::{DATETIME_FORMAT, Value},
};

/// Name of the conversion function targeting `kind`.
fn conversion_function(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Boolean => "CBool",
        ValueKind::Int32 => "CInt",
        ValueKind::Double => "CDbl",
        ValueKind::Decimal => "CDec",
        ValueKind::String => "CStr",
        ValueKind::DateTime => "CDate",
        ValueKind::Variant => "CObj",
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Empty => f.write_str("Nothing"),
        Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
        Value::DateTime(dt) => write!(f, "#{}#", dt.format(DATETIME_FORMAT)),
        other => write!(f, "{}", other),
    }
}

fn write_call<'a>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    args: impl IntoIterator<Item = &'a Expr>,
) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, arg) in args.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", arg)?;
    }
    f.write_str(")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(value) => write_literal(f, value),
            Expr::Binary(node) => {
                let op = node.op.symbol();
                let op = if op == "+" && node.operand_kind == ValueKind::String {
                    "&"
                } else {
                    op
                };
                write!(f, "({} {} {})", node.lhs, op, node.rhs)
            }
            Expr::Unary(node) => match node.op {
                UnaryOp::Negate => write!(f, "-{}", node.operand),
                UnaryOp::Not => write!(f, "Not {}", node.operand),
            },
            Expr::Logical(node) => {
                let op = match node.op {
                    LogicalOp::And => "AndAlso",
                    LogicalOp::Or => "OrElse",
                };
                write!(f, "({} {} {})", node.lhs, op, node.rhs)
            }
            Expr::Switch(node) => write_call(f, "Switch", node.children()),
            Expr::Iif(node) => write_call(f, "IIf", node.children()),
            Expr::Convert(node) => {
                write_call(f, conversion_function(node.kind), [&*node.inner])
            }
            Expr::Field(node) => write!(f, "Fields!{}.Value", node.name),
            Expr::Parameter(node) => write!(f, "Parameters!{}.Value", node.name),
            Expr::Global(global) => write!(f, "Globals!{}", global.to_str()),
            Expr::Aggregate(node) => write!(f, "Aggregates!{}", node.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::Schema, expr::BinaryOp};

    #[test]
    fn renders_report_notation() {
        let amount = Schema::new()
            .with_field("Amount", ValueKind::Int32)
            .field_ref("Amount")
            .unwrap();
        let expr = Expr::switch(vec![
            Expr::binary(BinaryOp::Gt, ValueKind::Int32, amount, Expr::constant(100)).unwrap(),
            Expr::constant("say \"hi\""),
            Expr::constant(true),
            Expr::convert(Expr::parameter("Fallback", ValueKind::Int32), ValueKind::String),
        ])
        .unwrap();

        assert_eq!(
            expr.to_string(),
            "Switch((Fields!Amount.Value > 100), \"say \"\"hi\"\"\", True, CStr(Parameters!Fallback.Value))"
        );
    }

    #[test]
    fn renders_concatenation_and_nothing() {
        let concat = Expr::binary(
            BinaryOp::Add,
            ValueKind::String,
            Expr::constant("a"),
            Expr::Constant(Value::Empty),
        )
        .unwrap();
        assert_eq!(concat.to_string(), "(\"a\" & Nothing)");
    }
}
