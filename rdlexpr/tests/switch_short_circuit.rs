use std::cell::RefCell;

use rdlexpr::{
    Expr, Value, ValueKind,
    context::{ReportContext, RowAccess, Schema},
    expr::BinaryOp,
    optimize::optimize,
};

/// Row that records every field read, in order.
struct RecordingRow {
    values: Vec<Value>,
    reads: RefCell<Vec<usize>>,
}

impl RecordingRow {
    fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            reads: RefCell::new(Vec::new()),
        }
    }

    fn reads(&self) -> Vec<usize> {
        self.reads.borrow().clone()
    }
}

impl RowAccess for RecordingRow {
    fn field(&self, index: usize) -> Option<&Value> {
        self.reads.borrow_mut().push(index);
        self.values.get(index)
    }
}

fn schema() -> Schema {
    Schema::new()
        .with_field("c0", ValueKind::Boolean)
        .with_field("r0", ValueKind::Int32)
        .with_field("c1", ValueKind::Boolean)
        .with_field("r1", ValueKind::Int32)
        .with_field("c2", ValueKind::Boolean)
        .with_field("r2", ValueKind::Int32)
}

fn switch(schema: &Schema) -> Expr {
    let children = ["c0", "r0", "c1", "r1", "c2", "r2"]
        .iter()
        .map(|name| schema.field_ref(name).unwrap())
        .collect();
    Expr::switch(children).unwrap()
}

fn row(conditions: [bool; 3]) -> RecordingRow {
    RecordingRow::new(vec![
        Value::Boolean(conditions[0]),
        Value::Int32(10),
        Value::Boolean(conditions[1]),
        Value::Int32(11),
        Value::Boolean(conditions[2]),
        Value::Int32(12),
    ])
}

#[test]
fn nothing_after_the_match_is_evaluated() {
    let schema = schema();
    let (switch, _) = optimize(switch(&schema));
    let rpt = ReportContext::detached();

    let first = row([true, true, true]);
    assert_eq!(switch.eval(&rpt, &first).unwrap(), Value::Int32(10));
    assert_eq!(first.reads(), vec![0, 1]);

    let second = row([false, true, true]);
    assert_eq!(switch.eval(&rpt, &second).unwrap(), Value::Int32(11));
    assert_eq!(second.reads(), vec![0, 2, 3]);

    let none = row([false, false, false]);
    assert_eq!(switch.eval(&rpt, &none).unwrap(), Value::Empty);
    assert_eq!(none.reads(), vec![0, 2, 4]);
}

#[test]
fn failing_branches_after_the_match_are_never_reached() {
    let schema = Schema::new().with_field("flag", ValueKind::Boolean);
    let flag = schema.field_ref("flag").unwrap();
    let div_by_zero =
        Expr::binary(BinaryOp::Div, ValueKind::Int32, Expr::constant(1), Expr::constant(0)).unwrap();

    let (switch, _) = optimize(
        Expr::switch(vec![
            flag,
            Expr::constant(1),
            Expr::constant(true),
            div_by_zero,
        ])
        .unwrap(),
    );

    let rpt = ReportContext::detached();
    let hit = RecordingRow::new(vec![Value::Boolean(true)]);
    assert_eq!(switch.eval(&rpt, &hit).unwrap(), Value::Int32(1));

    let miss = RecordingRow::new(vec![Value::Boolean(false)]);
    assert!(switch.eval(&rpt, &miss).unwrap_err().is_divide_by_zero());
}

#[test]
fn binary_operands_are_read_left_to_right() {
    let schema = schema();
    let expr = Expr::binary(
        BinaryOp::Add,
        ValueKind::Int32,
        schema.field_ref("r2").unwrap(),
        schema.field_ref("r0").unwrap(),
    )
    .unwrap();

    let row = row([false; 3]);
    assert_eq!(
        expr.eval(&ReportContext::detached(), &row).unwrap(),
        Value::Int32(22)
    );
    assert_eq!(row.reads(), vec![5, 1]);
}
