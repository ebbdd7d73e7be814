use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rdlexpr::{
    Error, Expr, Value, ValueKind,
    bigdecimal::{BigDecimal, Zero},
    context::{ReportContext, Row, Schema},
    expr::BinaryOp,
    optimize::{CompiledExpr, optimize},
};

const KINDS: [ValueKind; 5] = [
    ValueKind::Boolean,
    ValueKind::Int32,
    ValueKind::Double,
    ValueKind::Decimal,
    ValueKind::String,
];

fn schema() -> Schema {
    Schema::new()
        .with_field("b", ValueKind::Boolean)
        .with_field("i", ValueKind::Int32)
        .with_field("d", ValueKind::Double)
        .with_field("m", ValueKind::Decimal)
        .with_field("s", ValueKind::String)
}

fn field_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Boolean => "b",
        ValueKind::Int32 => "i",
        ValueKind::Double => "d",
        ValueKind::Decimal => "m",
        _ => "s",
    }
}

fn literal(rng: &mut ChaCha8Rng, kind: ValueKind) -> Value {
    match kind {
        ValueKind::Boolean => Value::Boolean(rng.random_bool(0.5)),
        ValueKind::Int32 => Value::Int32(rng.random_range(-3..=3)),
        ValueKind::Double => Value::Double(f64::from(rng.random_range(-6i32..=6)) / 2.0),
        ValueKind::Decimal => Value::Decimal(BigDecimal::new(rng.random_range(-300i64..=300).into(), 2)),
        _ => Value::String(
            ["", "0", "1", "2.5", "abc", "true"][rng.random_range(0..6)].to_string(),
        ),
    }
}

/// Random tree of the given declared kind, mixing constants and field
/// references so that both folded and residual subtrees appear.
struct TreeGen<'a> {
    rng: ChaCha8Rng,
    schema: &'a Schema,
}

impl TreeGen<'_> {
    fn leaf(&mut self, kind: ValueKind) -> Expr {
        if self.rng.random_bool(0.6) {
            Expr::Constant(literal(&mut self.rng, kind))
        } else {
            self.schema.field_ref(field_name(kind)).unwrap()
        }
    }

    fn any_kind(&mut self) -> ValueKind {
        KINDS[self.rng.random_range(0..KINDS.len())]
    }

    fn tree(&mut self, kind: ValueKind, depth: usize) -> Expr {
        if depth == 0 || self.rng.random_bool(0.2) {
            return self.leaf(kind);
        }
        let depth = depth - 1;

        match (kind, self.rng.random_range(0..6)) {
            (ValueKind::Boolean, 0) => {
                let operand = self.any_kind();
                let op = [
                    BinaryOp::Eq,
                    BinaryOp::Ne,
                    BinaryOp::Lt,
                    BinaryOp::Le,
                    BinaryOp::Gt,
                    BinaryOp::Ge,
                ][self.rng.random_range(0..6)];
                let lhs = self.tree(operand, depth);
                let rhs = self.tree(operand, depth);
                Expr::binary(op, operand, lhs, rhs).unwrap()
            }
            (ValueKind::Boolean, 1) => {
                let lhs = self.tree(kind, depth);
                let rhs = self.tree(kind, depth);
                if self.rng.random_bool(0.5) {
                    Expr::and(lhs, rhs)
                } else {
                    Expr::or(lhs, rhs)
                }
            }
            (ValueKind::Boolean, 2) => Expr::not(self.tree(kind, depth)).unwrap(),
            (ValueKind::String, 0 | 1) => {
                let lhs = self.tree(kind, depth);
                let rhs = self.tree(kind, depth);
                Expr::binary(BinaryOp::Add, kind, lhs, rhs).unwrap()
            }
            (ValueKind::Int32 | ValueKind::Double | ValueKind::Decimal, 0 | 1) => {
                let op = [
                    BinaryOp::Add,
                    BinaryOp::Sub,
                    BinaryOp::Mul,
                    BinaryOp::Div,
                    BinaryOp::Mod,
                ][self.rng.random_range(0..5)];
                let lhs = self.tree(kind, depth);
                let rhs = self.tree(kind, depth);
                Expr::binary(op, kind, lhs, rhs).unwrap()
            }
            (ValueKind::Int32 | ValueKind::Double | ValueKind::Decimal, 2) => {
                Expr::negate(self.tree(kind, depth)).unwrap()
            }
            (_, 3) => {
                let from = self.any_kind();
                Expr::convert(self.tree(from, depth), kind)
            }
            (_, 4) => {
                let condition = self.tree(ValueKind::Boolean, depth);
                let then = self.tree(kind, depth);
                let otherwise_kind = self.any_kind();
                let otherwise = self.tree(otherwise_kind, depth);
                Expr::iif(condition, then, otherwise)
            }
            _ => {
                let mut children = Vec::new();
                for i in 0..self.rng.random_range(1..=3) {
                    children.push(self.tree(ValueKind::Boolean, depth));
                    let result_kind = if i == 0 { kind } else { self.any_kind() };
                    children.push(self.tree(result_kind, depth));
                }
                Expr::switch(children).unwrap()
            }
        }
    }

    fn row(&mut self, position: usize) -> Row {
        Row::new(
            position,
            KINDS
                .iter()
                .map(|kind| literal(&mut self.rng, *kind))
                .collect(),
        )
    }
}

fn same(lhs: &Result<Value, Error>, rhs: &Result<Value, Error>) -> bool {
    match (lhs, rhs) {
        (Ok(a), Ok(b)) => a == b || a.identical(b),
        (Err(a), Err(b)) => a == b,
        _ => false,
    }
}

#[test]
fn folding_preserves_results_on_every_row() {
    let schema = schema();
    let mut generator = TreeGen {
        rng: ChaCha8Rng::seed_from_u64(0xf01d),
        schema: &schema,
    };
    let rpt = ReportContext::new("fold");

    for _ in 0..300 {
        let kind = generator.any_kind();
        let tree = generator.tree(kind, 4);
        let (folded, stats) = optimize(tree.clone());

        assert_eq!(folded.kind(), tree.kind(), "kind changed folding {}", tree);
        assert!(stats.nodes_after <= stats.nodes_before);

        let mut rows: Vec<Row> = (0..8).map(|i| generator.row(i)).collect();
        // Unbound fields must fail identically too.
        rows.push(Row::empty());

        for row in &rows {
            let before = tree.eval(&rpt, row);
            let after = folded.eval(&rpt, row);
            assert!(
                same(&before, &after),
                "{} folded to {} on {:?}: {:?} vs {:?}",
                tree,
                folded,
                row.values(),
                before,
                after
            );
        }
    }
}

#[test]
fn folding_is_idempotent() {
    let schema = schema();
    let mut generator = TreeGen {
        rng: ChaCha8Rng::seed_from_u64(0x1de0),
        schema: &schema,
    };

    for _ in 0..300 {
        let kind = generator.any_kind();
        let once = generator.tree(kind, 5).fold();
        let twice = once.clone().fold();
        // Debug output compares NaN constants as equal.
        assert_eq!(format!("{:?}", once), format!("{:?}", twice));
    }
}

#[test]
fn minus_self_folds_to_zero_for_every_numeric_kind() {
    let cases = [
        Value::Int32(17),
        Value::Double(2.75),
        Value::Decimal("12.340".parse::<BigDecimal>().unwrap()),
    ];

    for value in cases {
        let kind = value.kind();
        let x = Expr::Constant(value);
        let (folded, _) = optimize(Expr::minus(kind, x.clone(), x).unwrap());

        let Expr::Constant(zero) = folded.as_expr() else {
            panic!("{} did not fold to a constant", folded);
        };
        assert_eq!(zero.kind(), kind);
        match zero {
            Value::Int32(v) => assert_eq!(*v, 0),
            Value::Double(v) => assert_eq!(*v, 0.0),
            Value::Decimal(v) => assert!(v.is_zero()),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn minus_zero_drops_to_operand() {
    let schema = schema();
    for (kind, zero) in [
        (ValueKind::Int32, Value::Int32(0)),
        (ValueKind::Double, Value::Double(0.0)),
        (ValueKind::Decimal, Value::Decimal(BigDecimal::zero())),
    ] {
        let x = schema.field_ref(field_name(kind)).unwrap();
        let (folded, _) = optimize(Expr::minus(kind, x.clone(), Expr::Constant(zero)).unwrap());
        assert_eq!(*folded, x);
    }

    // `x - (-0.0)` is not an identity for `x = -0.0`.
    let d = schema.field_ref("d").unwrap();
    let kept = Expr::minus(ValueKind::Double, d, Expr::constant(-0.0)).unwrap();
    assert_eq!(*optimize(kept.clone()).0, kept);
}

#[test]
fn unmatched_switch_keeps_its_conversion() {
    let i = schema().field_ref("i").unwrap();
    let switch = Expr::switch(vec![Expr::constant(false), i]).unwrap();
    let plus_zero = Expr::binary(BinaryOp::Add, ValueKind::Int32, switch, Expr::constant(0)).unwrap();

    let (folded, _) = optimize(plus_zero.clone());
    assert_eq!(*folded, plus_zero);
    assert_eq!(
        folded
            .eval(&ReportContext::detached(), &Row::empty())
            .unwrap(),
        Value::Int32(0)
    );
}

#[test]
fn constant_errors_are_deferred_to_evaluation() {
    let div = Expr::binary(
        BinaryOp::Div,
        ValueKind::Decimal,
        Expr::constant(BigDecimal::from(1)),
        Expr::constant(BigDecimal::zero()),
    )
    .unwrap();
    let wrapped = Expr::binary(BinaryOp::Add, ValueKind::Decimal, div, Expr::constant(BigDecimal::from(2)))
        .unwrap();

    let (folded, stats) = optimize(wrapped.clone());
    assert_eq!(*folded, wrapped);
    assert_eq!(stats.removed(), 0);
    assert!(
        folded
            .eval(&ReportContext::detached(), &Row::empty())
            .unwrap_err()
            .is_divide_by_zero()
    );
}

#[test]
fn compiled_trees_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CompiledExpr>();
    assert_send_sync::<ReportContext>();

    let schema = schema();
    let i = schema.field_ref("i").unwrap();
    let (compiled, _) = optimize(
        Expr::binary(BinaryOp::Mul, ValueKind::Int32, i, Expr::constant(2)).unwrap(),
    );
    let rpt = ReportContext::detached();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let compiled = compiled.clone();
                let rpt = &rpt;
                scope.spawn(move || {
                    let row = Row::new(n, vec![Value::Boolean(true), Value::Int32(n as i32)]);
                    compiled.eval_int32(rpt, &row).unwrap()
                })
            })
            .collect();
        let results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![0, 2, 4, 6]);
    });
}
